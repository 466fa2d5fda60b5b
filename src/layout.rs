// src/layout.rs

//! The plain on-disk stage layout
//!
//! ```text
//! <stage_root>/<stage_id>/
//!   data/<segment>/<content name>
//!   data/<segment>/<content name>.presform[.<ext>]
//!   admin/<segment>/PREMIS/<content name>.premis.xml
//!   admin/<segment>/TECHMD/<content name>.fits.xml
//!   admin/<segment>/manifest.txt
//!   admin/accessionrecords/<name>
//!   admin/adminnotes/<name>
//!   admin/legalnotes/<name>
//! ```
//!
//! Shared by [`FileSystemStageWriter`](crate::serialize::FileSystemStageWriter)
//! and [`FileSystemStageReader`](crate::packager::FileSystemStageReader) so
//! both halves agree on every path.

use crate::error::Result;
use crate::path::{check_component, safe_join};
use std::path::{Path, PathBuf};

pub const DATA_DIR: &str = "data";
pub const ADMIN_DIR: &str = "admin";
pub const PREMIS_DIR: &str = "PREMIS";
pub const TECHMD_DIR: &str = "TECHMD";
pub const MANIFEST_FILE: &str = "manifest.txt";
pub const PREMIS_SUFFIX: &str = ".premis.xml";
pub const TECHMD_SUFFIX: &str = ".fits.xml";

/// The three free-form document lists of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    AccessionRecords,
    AdminNotes,
    LegalNotes,
}

impl NoteKind {
    pub const ALL: [NoteKind; 3] = [Self::AccessionRecords, Self::AdminNotes, Self::LegalNotes];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::AccessionRecords => "accessionrecords",
            Self::AdminNotes => "adminnotes",
            Self::LegalNotes => "legalnotes",
        }
    }
}

/// Paths inside one stage directory
#[derive(Debug, Clone)]
pub struct StageLayout {
    root: PathBuf,
}

impl StageLayout {
    /// Layout of `<stage_root>/<stage_id>`
    pub fn new(stage_root: &Path, stage_id: &str) -> Result<Self> {
        check_component(stage_id)?;
        Ok(Self {
            root: stage_root.join(stage_id),
        })
    }

    /// Layout of an existing stage directory
    pub fn at(stage_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: stage_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn admin_dir(&self) -> PathBuf {
        self.root.join(ADMIN_DIR)
    }

    pub fn note_dir(&self, kind: NoteKind) -> PathBuf {
        self.admin_dir().join(kind.dir_name())
    }

    pub fn segment_data_dir(&self, segment: &str) -> PathBuf {
        self.data_dir().join(segment)
    }

    pub fn segment_admin_dir(&self, segment: &str) -> PathBuf {
        self.admin_dir().join(segment)
    }

    pub fn premis_dir(&self, segment: &str) -> PathBuf {
        self.segment_admin_dir(segment).join(PREMIS_DIR)
    }

    pub fn techmd_dir(&self, segment: &str) -> PathBuf {
        self.segment_admin_dir(segment).join(TECHMD_DIR)
    }

    pub fn manifest_path(&self, segment: &str) -> PathBuf {
        self.segment_admin_dir(segment).join(MANIFEST_FILE)
    }

    pub fn content_path(&self, segment: &str, name: &str) -> Result<PathBuf> {
        safe_join(&self.segment_data_dir(segment), name)
    }

    pub fn premis_path(&self, segment: &str, name: &str) -> Result<PathBuf> {
        safe_join(&self.premis_dir(segment), &format!("{}{}", name, PREMIS_SUFFIX))
    }

    pub fn techmd_path(&self, segment: &str, name: &str) -> Result<PathBuf> {
        safe_join(&self.techmd_dir(segment), &format!("{}{}", name, TECHMD_SUFFIX))
    }

    pub fn note_path(&self, kind: NoteKind, name: &str) -> Result<PathBuf> {
        safe_join(&self.note_dir(kind), name)
    }

    /// Every directory a written stage is expected to have
    pub fn skeleton(&self, segments: &[String]) -> Vec<PathBuf> {
        let mut dirs = vec![self.data_dir(), self.admin_dir()];
        dirs.extend(NoteKind::ALL.iter().map(|kind| self.note_dir(*kind)));
        for segment in segments {
            dirs.push(self.segment_data_dir(segment));
            dirs.push(self.segment_admin_dir(segment));
        }
        dirs
    }
}
