// src/item/handle.rs

//! Scoped read/write handle returned by [`Item::open`](super::Item::open)

use super::OpenMode;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, Read, Write};
use tempfile::NamedTempFile;

/// An open item
///
/// Dropping the handle closes it. For URL items the handle also owns the
/// temporary file the download was materialised into, which is removed at
/// the same time.
#[derive(Debug)]
pub struct ItemHandle {
    name: String,
    mode: OpenMode,
    file: Option<File>,
    materialized: Option<NamedTempFile>,
}

impl ItemHandle {
    pub(crate) fn from_file(name: impl Into<String>, mode: OpenMode, file: File) -> Self {
        Self {
            name: name.into(),
            mode,
            file: Some(file),
            materialized: None,
        }
    }

    /// Read-only handle over a materialised temporary file
    pub(crate) fn materialized(name: impl Into<String>, temp: NamedTempFile) -> Result<Self> {
        let file = temp.reopen()?;
        Ok(Self {
            name: name.into(),
            mode: OpenMode::Read,
            file: Some(file),
            materialized: Some(temp),
        })
    }

    /// Mode this handle was opened with
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Whether the handle has not been closed yet
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| Error::NotOpen(self.name.clone()))
    }

    /// Read up to `blocksize` bytes
    ///
    /// Short reads from the OS are retried so a returned block is only
    /// shorter than `blocksize` at end of stream. An empty block means the
    /// source is exhausted.
    pub fn read(&mut self, blocksize: usize) -> Result<Vec<u8>> {
        let file = self.file_mut()?;
        let mut block = Vec::new();
        file.take(blocksize as u64).read_to_end(&mut block)?;
        Ok(block)
    }

    /// Read everything that is left
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let file = self.file_mut()?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Write a block of bytes
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.mode.is_write() {
            return Err(Error::NotWritable(self.name.clone()));
        }
        let file = self.file_mut()?;
        file.write_all(bytes)?;
        Ok(())
    }

    /// Flush and release the handle
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            if self.mode.is_write() {
                file.flush()?;
                file.sync_all()?;
            }
        }
        self.materialized = None;
        Ok(())
    }
}

impl Read for ItemHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("item {} is not open", self.name),
            )),
        }
    }
}
