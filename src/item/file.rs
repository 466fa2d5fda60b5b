// src/item/file.rs

//! Items backed by local filesystem paths

use super::{DeleteOutcome, Item, ItemHandle, OpenMode};
use crate::error::{Error, Result};
use crate::path::slash_name;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file on local disk
///
/// When constructed with a root, the item's name is the path relative to
/// that root (e.g. `docs/foo.txt`), which is what writers use to place the
/// file inside a stage. Without a root the name is the full path.
#[derive(Debug, Clone)]
pub struct FileItem {
    path: PathBuf,
    root: Option<PathBuf>,
    name: String,
}

impl FileItem {
    /// Item named by its full path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.to_string_lossy().into_owned();
        Self {
            path,
            root: None,
            name,
        }
    }

    /// Item named relative to `root`
    ///
    /// Fails if `path` does not live under `root`.
    pub fn with_root(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let root = root.into();
        let relative = path.strip_prefix(&root).map_err(|_| {
            Error::InvalidPath(format!(
                "{} is not under root {}",
                path.display(),
                root.display()
            ))
        })?;
        if relative.as_os_str().is_empty() {
            return Err(Error::InvalidPath(format!(
                "{} names the root itself",
                path.display()
            )));
        }

        let name = slash_name(relative);
        Ok(Self {
            path,
            root: Some(root),
            name,
        })
    }

    /// Item at `path` that reports an explicit name
    pub fn with_name(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            root: None,
            name: name.into(),
        }
    }

    /// Backing path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Root the name was computed against, if any
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl Item for FileItem {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn open(&self, mode: OpenMode) -> Result<ItemHandle> {
        let file = match mode {
            OpenMode::Read => File::open(&self.path)?,
            OpenMode::Write | OpenMode::Append => {
                if let Some(parent) = self.path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent)?;
                }
                let mut options = OpenOptions::new();
                if mode == OpenMode::Write {
                    options.write(true).create(true).truncate(true);
                } else {
                    options.append(true).create(true);
                }
                options.open(&self.path)?
            }
        };
        Ok(ItemHandle::from_file(self.name.clone(), mode, file))
    }

    fn delete(&self, final_delete: bool) -> DeleteOutcome {
        if !final_delete {
            return DeleteOutcome::WouldRemove(self.name.clone());
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed {}", self.path.display());
                DeleteOutcome::Removed(self.name.clone())
            }
            Err(e) => DeleteOutcome::Failed {
                name: self.name.clone(),
                reason: e.to_string(),
            },
        }
    }

    fn size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn local_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docs").join("foo.txt");
        let item = FileItem::with_root(&path, temp_dir.path()).unwrap();
        assert_eq!(item.name(), "docs/foo.txt");
        assert_eq!(item.root(), Some(temp_dir.path()));
    }

    #[test]
    fn test_with_root_rejects_outside_path() {
        let result = FileItem::with_root("/etc/passwd", "/var/data");
        assert!(matches!(result, Err(Error::InvalidPath(_))));

        let result = FileItem::with_root("/var/data", "/var/data");
        assert!(result.is_err());
    }

    #[test]
    fn test_write_creates_parents_and_size() {
        let temp_dir = TempDir::new().unwrap();
        let item = FileItem::new(temp_dir.path().join("a/b/c.bin"));
        assert!(!item.exists());

        let mut handle = item.open(OpenMode::Write).unwrap();
        handle.write(b"12345").unwrap();
        handle.close().unwrap();

        assert!(item.exists());
        assert_eq!(item.size().unwrap(), 5);
        assert_eq!(item.read_all().unwrap(), b"12345");
    }

    #[test]
    fn test_append_mode() {
        let temp_dir = TempDir::new().unwrap();
        let item = FileItem::new(temp_dir.path().join("log.txt"));

        for line in [b"one\n".as_slice(), b"two\n".as_slice()] {
            let mut handle = item.open_mode("ab").unwrap();
            handle.write(line).unwrap();
        }
        assert_eq!(item.read_all().unwrap(), b"one\ntwo\n");
    }

    #[test]
    fn test_text_mode_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let item = FileItem::new(temp_dir.path().join("x.txt"));
        assert!(matches!(item.open_mode("r"), Err(Error::TextMode { .. })));
    }

    #[test]
    fn test_delete_dry_run_keeps_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keep.txt");
        fs::write(&path, b"data").unwrap();
        let item = FileItem::new(&path);

        let outcome = item.delete(false);
        assert!(matches!(outcome, DeleteOutcome::WouldRemove(_)));
        assert!(path.exists());

        let outcome = item.delete(true);
        assert!(outcome.removed());
        assert!(!path.exists());

        let outcome = item.delete(true);
        assert!(matches!(outcome, DeleteOutcome::Failed { .. }));
    }
}
