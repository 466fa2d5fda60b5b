// src/copier.rs

//! Equality-verified item copies
//!
//! [`ItemCopier`] is the only way content moves anywhere in the crate:
//! ingest into scratch space, stage serialization, archive serialization.
//!
//! # Policy
//!
//! The configured [`EqDetect`] metric decides whether a copy is *necessary*
//! (destination already present and equal). A copy that was actually
//! performed is always audited byte-for-byte, whatever the metric. A failed
//! audit retries the whole streamed copy up to `max_retries` more times.
//!
//! | dst exists | clobber | equal (metric) | result |
//! |------------|---------|----------------|--------|
//! | no         | -       | -              | copy + verify |
//! | yes        | false   | -              | skip, `copied=false` |
//! | yes        | true    | yes            | skip, `src_eqs_dst=true` |
//! | yes        | true    | no             | copy + verify, `clobbered_dst=true` |
//!
//! A destination that is the source file itself counts as equal and is
//! never opened for writing. An existing local destination is replaced
//! through a temporary file in its directory, so a failed copy leaves the
//! old bytes in place.

use crate::error::{Error, Result};
use crate::hash::{self, HashAlgorithm};
use crate::item::{Item, OpenMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Default I/O block size (100 MiB)
pub const DEFAULT_BUFFERING: usize = 100 * 1024 * 1024;

/// Default number of re-attempts after a failed verification
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Strategy used to decide whether two items hold the same content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqDetect {
    /// Stream both items in lockstep and compare every block
    #[default]
    Bytes,
    /// Compare declared item names
    Name,
    /// Compare stream-summed lengths
    Size,
    Md5,
    Sha256,
    Crc32,
    Adler32,
}

impl EqDetect {
    /// Every supported metric
    pub const ALL: [EqDetect; 7] = [
        Self::Bytes,
        Self::Name,
        Self::Size,
        Self::Md5,
        Self::Sha256,
        Self::Crc32,
        Self::Adler32,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bytes => "bytes",
            Self::Name => "name",
            Self::Size => "size",
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Crc32 => "crc32",
            Self::Adler32 => "adler32",
        }
    }

    /// Digest family behind a hash metric
    fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            Self::Md5 => Some(HashAlgorithm::Md5),
            Self::Sha256 => Some(HashAlgorithm::Sha256),
            Self::Crc32 => Some(HashAlgorithm::Crc32),
            Self::Adler32 => Some(HashAlgorithm::Adler32),
            Self::Bytes | Self::Name | Self::Size => None,
        }
    }
}

impl fmt::Display for EqDetect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for EqDetect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.name() == s.to_lowercase())
            .ok_or_else(|| Error::UnknownEqDetect(s.to_string()))
    }
}

/// Outcome of [`ItemCopier::copy`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReport {
    pub eq_detect: EqDetect,
    pub clobber_setting: bool,
    /// `None` when no comparison was made (existing destination, no clobber)
    pub src_eqs_dst: Option<bool>,
    pub copied: bool,
    pub dst_existed: bool,
    pub clobbered_dst: bool,
}

impl CopyReport {
    /// True when the destination is known to equal the source
    pub fn verified(&self) -> bool {
        self.src_eqs_dst == Some(true)
    }
}

/// Copier defaults shared by packagers and writers (`[copy]` in the config)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopySettings {
    pub eq_detect: EqDetect,
    pub max_retries: u32,
    pub buffering: usize,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            eq_detect: EqDetect::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            buffering: DEFAULT_BUFFERING,
        }
    }
}

/// Copies one item onto another and verifies the result
///
/// # Example
///
/// ```ignore
/// use ldrstage::copier::{EqDetect, ItemCopier};
/// use ldrstage::item::FileItem;
///
/// let src = FileItem::new("/ingest/foo.txt");
/// let dst = FileItem::new("/stage/data/foo.txt");
/// let report = ItemCopier::new(&src, &dst)
///     .clobber(true)
///     .eq_detect(EqDetect::Sha256)
///     .copy(false)?;
/// assert!(report.verified());
/// ```
pub struct ItemCopier<'a> {
    src: &'a dyn Item,
    dst: &'a dyn Item,
    clobber: bool,
    eq_detect: EqDetect,
    max_retries: u32,
    buffering: usize,
}

impl<'a> ItemCopier<'a> {
    pub fn new(src: &'a dyn Item, dst: &'a dyn Item) -> Self {
        Self {
            src,
            dst,
            clobber: false,
            eq_detect: EqDetect::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            buffering: DEFAULT_BUFFERING,
        }
    }

    /// Copier configured from shared settings, clobber off
    pub fn with_settings(src: &'a dyn Item, dst: &'a dyn Item, settings: &CopySettings) -> Self {
        Self::new(src, dst)
            .eq_detect(settings.eq_detect)
            .max_retries(settings.max_retries)
            .buffering(settings.buffering)
    }

    /// Overwrite an existing, differing destination
    pub fn clobber(mut self, clobber: bool) -> Self {
        self.clobber = clobber;
        self
    }

    /// Metric used to decide whether a copy is necessary
    pub fn eq_detect(mut self, eq_detect: EqDetect) -> Self {
        self.eq_detect = eq_detect;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// I/O block size; zero is treated as one byte
    pub fn buffering(mut self, buffering: usize) -> Self {
        self.buffering = buffering.max(1);
        self
    }

    /// Copy `src` onto `dst`
    ///
    /// With `eat_exceptions`, running out of retries returns the failing
    /// report instead of [`Error::CopyIntegrity`]. I/O errors are never eaten.
    pub fn copy(&self, eat_exceptions: bool) -> Result<CopyReport> {
        let dst_existed = self.dst.exists();
        let mut report = CopyReport {
            eq_detect: self.eq_detect,
            clobber_setting: self.clobber,
            src_eqs_dst: None,
            copied: false,
            dst_existed,
            clobbered_dst: false,
        };

        if dst_existed && !self.clobber {
            debug!(
                "Not copying {} -> {}: destination exists and clobber is off",
                self.src.name(),
                self.dst.name()
            );
            return Ok(report);
        }

        if dst_existed && self.same_local_file() {
            debug!(
                "Not copying {} -> {}: both name the same file",
                self.src.name(),
                self.dst.name()
            );
            report.src_eqs_dst = Some(true);
            return Ok(report);
        }

        if dst_existed && self.are_the_same(self.eq_detect)? {
            debug!(
                "Destination {} already matches {} ({})",
                self.dst.name(),
                self.src.name(),
                self.eq_detect
            );
            report.src_eqs_dst = Some(true);
            return Ok(report);
        }

        let attempts = self.max_retries + 1;
        for attempt in 1..=attempts {
            self.stream_copy()?;
            report.copied = true;
            report.clobbered_dst = dst_existed;

            if self.are_the_same(EqDetect::Bytes)? {
                debug!(
                    "Copied {} -> {} (attempt {})",
                    self.src.name(),
                    self.dst.name(),
                    attempt
                );
                report.src_eqs_dst = Some(true);
                return Ok(report);
            }

            warn!(
                "Verification of {} -> {} failed (attempt {}/{})",
                self.src.name(),
                self.dst.name(),
                attempt,
                attempts
            );
        }

        report.src_eqs_dst = Some(false);
        if eat_exceptions {
            return Ok(report);
        }
        Err(Error::CopyIntegrity {
            src: self.src.name().to_string(),
            dst: self.dst.name().to_string(),
            eq_detect: EqDetect::Bytes.to_string(),
            attempts,
        })
    }

    /// True when both items are backed by the same file on disk
    fn same_local_file(&self) -> bool {
        let (Some(src), Some(dst)) = (self.src.local_path(), self.dst.local_path()) else {
            return false;
        };
        match (fs::canonicalize(src), fs::canonicalize(dst)) {
            (Ok(src), Ok(dst)) => src == dst,
            _ => false,
        }
    }

    fn stream_copy(&self) -> Result<()> {
        if let Some(path) = self.dst.local_path()
            && path.is_file()
        {
            return self.staged_copy(path);
        }

        let mut src = self.src.open(OpenMode::Read)?;
        let mut dst = self.dst.open(OpenMode::Write)?;
        loop {
            let block = src.read(self.buffering)?;
            if block.is_empty() {
                break;
            }
            dst.write(&block)?;
        }
        dst.close()?;
        src.close()
    }

    /// Replace an existing local file through a temporary sibling, so the
    /// old content stays in place until the new bytes are complete
    fn staged_copy(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(parent)?;

        let mut src = self.src.open(OpenMode::Read)?;
        loop {
            let block = src.read(self.buffering)?;
            if block.is_empty() {
                break;
            }
            temp.write_all(&block)?;
        }
        src.close()?;

        temp.as_file().sync_all()?;
        temp.as_file().set_permissions(fs::metadata(path)?.permissions())?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Compare `src` and `dst` with the given metric
    pub fn are_the_same(&self, eq_detect: EqDetect) -> Result<bool> {
        match eq_detect {
            EqDetect::Bytes => self.bytes_equal(),
            EqDetect::Name => Ok(self.src.name() == self.dst.name()),
            EqDetect::Size => Ok(self.src.size()? == self.dst.size()?),
            EqDetect::Md5 | EqDetect::Sha256 | EqDetect::Crc32 | EqDetect::Adler32 => {
                let algorithm = eq_detect
                    .hash_algorithm()
                    .ok_or_else(|| Error::UnknownEqDetect(eq_detect.to_string()))?;
                let mut src = self.src.open(OpenMode::Read)?;
                let mut dst = self.dst.open(OpenMode::Read)?;
                let src_hash = hash::hash_reader(algorithm, &mut src)?;
                let dst_hash = hash::hash_reader(algorithm, &mut dst)?;
                Ok(src_hash == dst_hash)
            }
        }
    }

    fn bytes_equal(&self) -> Result<bool> {
        let mut src = self.src.open(OpenMode::Read)?;
        let mut dst = self.dst.open(OpenMode::Read)?;
        loop {
            let src_block = src.read(self.buffering)?;
            let dst_block = dst.read(self.buffering)?;
            if src_block != dst_block {
                return Ok(false);
            }
            if src_block.is_empty() {
                return Ok(true);
            }
        }
    }
}
