// src/path.rs

//! Placing item names under a root
//!
//! Item names double as relative paths inside a stage (`docs/foo.txt`).
//! Names come from whatever was ingested, so writers resolve them through
//! [`safe_join`] and never through a bare `Path::join`.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Normalize an item name into a relative path
///
/// Leading slashes and `.` components are dropped; `..` is rejected.
pub fn relative_path(name: &str) -> Result<PathBuf> {
    let mut normalized = PathBuf::new();

    for component in Path::new(name.trim_start_matches('/')).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return Err(Error::PathTraversal(name.to_string())),
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath(format!("empty item name: {:?}", name)));
    }
    Ok(normalized)
}

/// Join an item name onto `root`, refusing anything that would escape it
pub fn safe_join(root: &Path, name: &str) -> Result<PathBuf> {
    Ok(root.join(relative_path(name)?))
}

/// Render a relative path with `/` separators
pub fn slash_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Check a single path component such as a stage or segment identifier
pub fn check_component(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidPath("empty path component".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(Error::PathTraversal(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("docs/foo.txt").unwrap(), PathBuf::from("docs/foo.txt"));
        assert_eq!(relative_path("/docs/./foo.txt").unwrap(), PathBuf::from("docs/foo.txt"));
        assert!(matches!(relative_path("../etc/passwd"), Err(Error::PathTraversal(_))));
        assert!(matches!(relative_path("a/../../b"), Err(Error::PathTraversal(_))));
        assert!(matches!(relative_path("/"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_safe_join() {
        let root = Path::new("/stage/data/seg-1");
        assert_eq!(
            safe_join(root, "docs/foo.txt").unwrap(),
            PathBuf::from("/stage/data/seg-1/docs/foo.txt")
        );
        assert!(safe_join(root, "../../escape").is_err());
    }

    #[test]
    fn test_check_component() {
        assert!(check_component("stage_1").is_ok());
        assert!(check_component("a/b").is_err());
        assert!(check_component("..").is_err());
        assert!(check_component("").is_err());
    }
}
