// src/item/mod.rs

//! Byte-addressable resources
//!
//! An [`Item`] is anything with a name whose bytes can be read (and possibly
//! written or deleted): a file on local disk, or a remote URL. Every data
//! movement in the crate goes through the [`ItemCopier`](crate::copier::ItemCopier),
//! which only ever talks to items through this trait.
//!
//! Items are binary-only. Opening one hands back an [`ItemHandle`], which
//! releases the underlying OS handle (and any temporary file backing it)
//! when it is closed or dropped, so early returns and `?` never leak.

mod file;
mod handle;
mod url;

pub use file::FileItem;
pub use handle::ItemHandle;
pub use self::url::UrlItem;

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// Block size used by the default streaming [`Item::size`]
pub const SIZE_BLOCK: usize = 1024 * 1024;

/// How an item is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

impl OpenMode {
    /// Parse a mode string such as `"rb"` or `"wb"`
    ///
    /// Text modes (anything without `b`, or with `t`) are rejected.
    pub fn parse(name: &str, mode: &str) -> Result<Self> {
        let text_mode = || Error::TextMode {
            name: name.to_string(),
            mode: mode.to_string(),
        };

        if !mode.contains('b') || mode.contains('t') {
            return Err(text_mode());
        }

        match mode.replace('b', "").as_str() {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "a" => Ok(Self::Append),
            _ => Err(text_mode()),
        }
    }

    /// Whether a handle in this mode accepts writes
    #[inline]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write | Self::Append)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "rb"),
            Self::Write => write!(f, "wb"),
            Self::Append => write!(f, "ab"),
        }
    }
}

/// Result of [`Item::delete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Dry run: the item would have been removed
    WouldRemove(String),
    /// The item was removed
    Removed(String),
    /// Removal was attempted and failed
    Failed { name: String, reason: String },
}

impl DeleteOutcome {
    /// True only when something was actually removed
    pub fn removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }

    /// Human readable description of what happened
    pub fn message(&self) -> String {
        match self {
            Self::WouldRemove(name) => format!("would remove {}", name),
            Self::Removed(name) => format!("removed {}", name),
            Self::Failed { name, reason } => format!("failed to remove {}: {}", name, reason),
        }
    }
}

/// A named, byte-addressable resource
pub trait Item: fmt::Debug + Send + Sync {
    /// Name used for display and for relative addressing inside a stage
    fn name(&self) -> &str;

    /// Whether the resource currently exists. Safe to call at any time.
    fn exists(&self) -> bool;

    /// Open the item. The returned handle closes itself on drop.
    fn open(&self, mode: OpenMode) -> Result<ItemHandle>;

    /// Remove the item. With `final_delete == false` nothing is removed.
    fn delete(&self, final_delete: bool) -> DeleteOutcome;

    /// Size of the content in bytes
    ///
    /// The default streams the content in [`SIZE_BLOCK`] blocks and sums the
    /// lengths, which is correct even for non-seekable sources.
    fn size(&self) -> Result<u64> {
        let mut handle = self.open(OpenMode::Read)?;
        let mut total = 0u64;
        loop {
            let block = handle.read(SIZE_BLOCK)?;
            if block.is_empty() {
                break;
            }
            total += block.len() as u64;
        }
        Ok(total)
    }

    /// Local path backing this item, when there is one
    fn local_path(&self) -> Option<&Path> {
        None
    }

    /// Open with a mode string, rejecting text modes
    fn open_mode(&self, mode: &str) -> Result<ItemHandle> {
        let mode = OpenMode::parse(self.name(), mode)?;
        self.open(mode)
    }

    /// Read the whole content into memory
    fn read_all(&self) -> Result<Vec<u8>> {
        let mut handle = self.open(OpenMode::Read)?;
        handle.read_to_end()
    }
}
