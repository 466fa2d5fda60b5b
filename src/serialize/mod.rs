// src/serialize/mod.rs

//! Serialization writers: the "write" half
//!
//! A writer refuses any stage that fails validation, then places every item
//! through the [`ItemCopier`] with clobber on. A copy that cannot be shown
//! identical to its source stops the write immediately with
//! [`Error::UnverifiedWrite`]; files already written stay in place and a
//! re-run skips them through the copier's equality check.
//!
//! Within one suite node, content is written before PREMIS and PREMIS before
//! technical metadata; presforms follow their parent.

mod archive_writer;
mod fixup;
mod manifest;
mod stage_writer;

pub use archive_writer::{
    ADMIN_MANIFEST, AdminManifest, AdminManifestEntry, ArchiveKind, DATA_MANIFEST, DataManifest,
    DataManifestEntry, PairtreeArchiveWriter, WRITE_FINISHED, WriteFinished,
};
pub use fixup::{fixup_fits, fixup_premis, rewrite_elements};
pub use manifest::{ManifestEntry, ManifestWriter, read_manifest};
pub use stage_writer::FileSystemStageWriter;

use crate::copier::{CopyReport, CopySettings, ItemCopier};
use crate::error::{Error, Result};
use crate::item::Item;
use crate::premis::PremisRecord;
use crate::structure::{MaterialSuite, Stage, Structure, SuiteNodeId};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Something that can persist a whole stage
pub trait StageWriter {
    fn write(&self, stage: &Stage) -> Result<WriteSummary>;
}

/// Counts from one writer run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// Items whose bytes were copied
    pub copied: usize,
    /// Items already present and equal at the destination
    pub unchanged: usize,
    /// Manifest lines (or manifest entries) recorded
    pub manifest_entries: usize,
}

impl WriteSummary {
    fn record(&mut self, report: &CopyReport) {
        if report.copied {
            self.copied += 1;
        } else {
            self.unchanged += 1;
        }
    }
}

/// Refuse stages that fail validation
fn ensure_valid(stage: &Stage) -> Result<()> {
    let problems = stage.problems();
    if problems.is_empty() {
        return Ok(());
    }
    Err(Error::InvalidStructure(format!(
        "stage {}: {}",
        stage.identifier(),
        problems.join("; ")
    )))
}

/// Clobbering copy that must end verified
fn verified_copy(src: &dyn Item, dst: &dyn Item, settings: &CopySettings) -> Result<CopyReport> {
    let report = ItemCopier::with_settings(src, dst, settings)
        .clobber(true)
        .copy(false)?;
    if !report.verified() {
        return Err(Error::UnverifiedWrite(format!("{} -> {}", src.name(), dst.name())));
    }
    Ok(report)
}

/// Name of every node of a suite as it appears inside a stage
///
/// The original is named by its content; when the content is gone (pruned)
/// the PREMIS original name stands in, then the identifier. Presforms append
/// `.presform<extension>` to their parent's name.
fn node_names(suite: &MaterialSuite) -> Result<HashMap<SuiteNodeId, String>> {
    let root = suite.root();
    let root_name = match suite.content_name(SuiteNodeId::ROOT) {
        Some(name) => name,
        None => match &root.premis {
            Some(premis) => {
                let record = PremisRecord::from_item(premis.as_ref())?;
                match record.first_object().and_then(|o| o.original_name.clone()) {
                    Some(name) => name,
                    None => record.object_identifier()?.to_string(),
                }
            }
            None => return Err(Error::MissingPremis(root.describe())),
        },
    };

    let mut names = HashMap::new();
    for id in suite.walk() {
        let node = suite.node(id);
        let name = match (node.parent(), node.extension()) {
            (Some(parent), Some(extension)) => {
                format!("{}.presform{}", names[&parent], extension)
            }
            _ => root_name.clone(),
        };
        names.insert(id, name);
    }
    Ok(names)
}

/// File name to store a note under
///
/// Notes named by an absolute path keep only their file name.
fn note_name(item: &dyn Item) -> String {
    let name = item.name();
    if Path::new(name).is_absolute() {
        Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string())
    } else {
        name.to_string()
    }
}
