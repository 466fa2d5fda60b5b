// src/pairtree.rs

//! Pairtree addressing and namaste tags
//!
//! An identifier maps to a directory by escaping it per the pairtree
//! convention and splitting the result into two-character "shorties":
//! `ab12cd3` → `ab/12/cd/3`. The mapping is reversible, so the identifier
//! alone determines where an object lives and can be recovered from that
//! location.
//!
//! Escaping: bytes outside visible ASCII and the characters
//! `" * + , < = > ? \ ^ |` become `^xx` hex; then `/` → `=`, `:` → `+`,
//! `.` → `,`.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Root directory name of a pairtree
pub const PAIRTREE_ROOT: &str = "pairtree_root";

/// Namaste tag written at the top of a pairtree
pub const PAIRTREE_TAG: (&str, &str) = ("pairtree", "0.1");

/// Namaste tag written in each archived resource directory
pub const ARF_TAG: (&str, &str) = ("arf", "0.1");

/// Encapsulation directory for archived resources
pub const ARF_DIR: &str = "arf";

const SHORTY_LEN: usize = 2;

fn needs_hex(byte: u8) -> bool {
    !(0x21..=0x7e).contains(&byte) || b"\"*+,<=>?\\^|".contains(&byte)
}

/// Escape an identifier into its pairtree-clean form
pub fn clean_identifier(identifier: &str) -> String {
    let mut cleaned = String::with_capacity(identifier.len());
    for byte in identifier.bytes() {
        if needs_hex(byte) {
            cleaned.push_str(&format!("^{:02x}", byte));
        } else {
            cleaned.push(match byte {
                b'/' => '=',
                b':' => '+',
                b'.' => ',',
                other => other as char,
            });
        }
    }
    cleaned
}

/// Reverse [`clean_identifier`]
pub fn unclean_identifier(cleaned: &str) -> Result<String> {
    let bytes = cleaned.as_bytes();
    let mut raw = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'^' => {
                let hex = cleaned
                    .get(i + 1..i + 3)
                    .ok_or_else(|| Error::InvalidPath(format!("truncated escape in {}", cleaned)))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|_| Error::InvalidPath(format!("bad escape ^{} in {}", hex, cleaned)))?;
                raw.push(byte);
                i += 3;
                continue;
            }
            b'=' => raw.push(b'/'),
            b'+' => raw.push(b':'),
            b',' => raw.push(b'.'),
            other => raw.push(other),
        }
        i += 1;
    }
    String::from_utf8(raw)
        .map_err(|_| Error::InvalidPath(format!("{} does not decode to UTF-8", cleaned)))
}

/// Relative shorty path for an identifier, e.g. `ab/12/cd/3`
pub fn identifier_to_path(identifier: &str) -> Result<PathBuf> {
    if identifier.is_empty() {
        return Err(Error::InvalidPath("empty pairtree identifier".to_string()));
    }
    let cleaned = clean_identifier(identifier);
    let mut path = PathBuf::new();
    // cleaned is pure ASCII, so byte chunks are valid str slices
    for chunk in cleaned.as_bytes().chunks(SHORTY_LEN) {
        path.push(String::from_utf8_lossy(chunk).as_ref());
    }
    Ok(path)
}

/// Recover an identifier from a shorty path relative to the pairtree root
///
/// Components longer than a shorty end the path (they are the object's
/// encapsulation directory), as do components after a short final shorty.
pub fn path_to_identifier(relative: &Path) -> Result<String> {
    let mut cleaned = String::new();
    for component in relative.components() {
        let part = component.as_os_str().to_string_lossy();
        if part.len() > SHORTY_LEN {
            break;
        }
        cleaned.push_str(&part);
        if part.len() < SHORTY_LEN {
            break;
        }
    }
    if cleaned.is_empty() {
        return Err(Error::InvalidPath(format!(
            "{} holds no pairtree identifier",
            relative.display()
        )));
    }
    unclean_identifier(&cleaned)
}

/// Absolute object directory for an identifier under `archive_root`
pub fn object_dir(archive_root: &Path, identifier: &str) -> Result<PathBuf> {
    Ok(archive_root
        .join(PAIRTREE_ROOT)
        .join(identifier_to_path(identifier)?))
}

/// Write a namaste marker `0=<tag>_<version>` into `dir`
pub fn write_namaste(dir: &Path, tag: (&str, &str)) -> Result<PathBuf> {
    let (name, version) = tag;
    let value = format!("{}_{}", name, version);
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("0={}", value));
    fs::write(&path, format!("{}\n", value))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_identifier_to_path() {
        assert_eq!(
            identifier_to_path("ab12cd3").unwrap(),
            PathBuf::from("ab/12/cd/3")
        );
        assert_eq!(identifier_to_path("abcd").unwrap(), PathBuf::from("ab/cd"));
        assert!(identifier_to_path("").is_err());
    }

    #[test]
    fn test_escaping() {
        assert_eq!(clean_identifier("ark:/13030/xt12t3"), "ark+=13030=xt12t3");
        assert_eq!(clean_identifier("a.b c"), "a,b^20c");
        assert_eq!(clean_identifier("x^y"), "x^5ey");
        for id in ["ark:/13030/xt12t3", "a.b c", "x^y", "caf\u{e9}"] {
            assert_eq!(unclean_identifier(&clean_identifier(id)).unwrap(), id);
        }
    }

    #[test]
    fn test_path_to_identifier() {
        let uuid = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";
        let path = identifier_to_path(uuid).unwrap().join(ARF_DIR).join("content.file");
        assert_eq!(path_to_identifier(&path).unwrap(), uuid);

        let odd = identifier_to_path("abc").unwrap().join(ARF_DIR);
        assert_eq!(path_to_identifier(&odd).unwrap(), "abc");
        assert!(path_to_identifier(Path::new("arf")).is_err());
    }

    #[test]
    fn test_write_namaste() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_namaste(temp_dir.path(), PAIRTREE_TAG).unwrap();
        assert_eq!(path.file_name().unwrap(), "0=pairtree_0.1");
        assert_eq!(fs::read_to_string(path).unwrap(), "pairtree_0.1\n");
    }
}
