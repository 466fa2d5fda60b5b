// src/serialize/manifest.rs

//! Per-segment append-only manifest
//!
//! Format: one `<relative path>\t<sha256>` line per written file. The file
//! is only ever opened in append mode, so every run adds its lines after the
//! previous runs' lines.

use crate::error::Result;
use crate::item::{FileItem, Item, ItemHandle, OpenMode};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub sha256: String,
}

/// Appends lines to a manifest file
pub struct ManifestWriter {
    path: PathBuf,
    handle: ItemHandle,
    written: usize,
}

impl ManifestWriter {
    /// Open (creating if needed) in append mode
    pub fn open(path: &Path) -> Result<Self> {
        let item = FileItem::new(path);
        let handle = item.open(OpenMode::Append)?;
        Ok(Self {
            path: path.to_path_buf(),
            handle,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, name: &str, sha256: &str) -> Result<()> {
        self.handle.write(format!("{}\t{}\n", name, sha256).as_bytes())?;
        self.written += 1;
        Ok(())
    }

    /// Lines appended through this writer
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush to disk; returns the number of lines appended
    pub fn close(mut self) -> Result<usize> {
        self.handle.close()?;
        Ok(self.written)
    }
}

/// Parse a manifest file, skipping blank or malformed lines
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match line.rsplit_once('\t') {
            Some((name, sha256)) => entries.push(ManifestEntry {
                name: name.to_string(),
                sha256: sha256.to_string(),
            }),
            None => tracing::warn!(
                "Malformed manifest line {} in {}",
                line_num + 1,
                path.display()
            ),
        }
    }
    Ok(entries)
}
