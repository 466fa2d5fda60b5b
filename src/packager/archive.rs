// src/packager/archive.rs

//! Reading a stage back out of a pairtree archive
//!
//! The archive itself is keyed by identifier only; grouping into segments and
//! presform chains comes from the stage's `data_manifest.json`. An archive
//! run without `WRITE_FINISHED.json` is treated as incomplete and refused.

use super::{MaterialSuitePackager, PresformPackager, assemble};
use crate::error::{Error, Result};
use crate::item::{FileItem, Item};
use crate::layout::{ADMIN_DIR, NoteKind};
use crate::path::safe_join;
use crate::serialize::{
    ADMIN_MANIFEST, AdminManifest, ArchiveKind, DATA_MANIFEST, DataManifest, DataManifestEntry,
    WRITE_FINISHED,
};
use crate::structure::{Segment, Stage};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reads one stage's worth of an archive
pub struct ArchiveReader {
    archive_root: PathBuf,
    stage_id: String,
}

impl ArchiveReader {
    pub fn new(archive_root: impl Into<PathBuf>, stage_id: impl Into<String>) -> Self {
        Self {
            archive_root: archive_root.into(),
            stage_id: stage_id.into(),
        }
    }

    fn admin_dir(&self) -> Result<PathBuf> {
        crate::path::check_component(&self.stage_id)?;
        Ok(self.archive_root.join(ADMIN_DIR).join(&self.stage_id))
    }

    pub fn read(&self) -> Result<Stage> {
        let admin_dir = self.admin_dir()?;
        if !admin_dir.join(WRITE_FINISHED).is_file() {
            return Err(Error::Layout {
                expected: admin_dir.join(WRITE_FINISHED).display().to_string(),
                observed: "archive write for this stage never finished".to_string(),
            });
        }

        let data: DataManifest = serde_json::from_slice(&fs::read(admin_dir.join(DATA_MANIFEST))?)?;
        let admin: AdminManifest =
            serde_json::from_slice(&fs::read(admin_dir.join(ADMIN_MANIFEST))?)?;

        let mut stage = Stage::new(self.stage_id.clone());

        let mut segment_order: Vec<String> = Vec::new();
        let mut by_segment: HashMap<String, Vec<&DataManifestEntry>> = HashMap::new();
        for entry in &data.entries {
            if !by_segment.contains_key(&entry.segment) {
                segment_order.push(entry.segment.clone());
            }
            by_segment.entry(entry.segment.clone()).or_default().push(entry);
        }

        for segment_id in segment_order {
            let mut segment = Segment::from_identifier(&segment_id)?;
            for node in self.build_nodes(&by_segment[&segment_id])? {
                let mut packager = ArchiveSuitePackager { node };
                segment.add_materialsuite(assemble(&mut packager)?);
            }
            stage.add_segment(segment);
        }

        for entry in &admin.entries {
            let kind = NoteKind::ALL
                .into_iter()
                .find(|k| k.dir_name() == entry.kind)
                .ok_or_else(|| Error::Layout {
                    expected: "accessionrecords, adminnotes or legalnotes".to_string(),
                    observed: entry.kind.clone(),
                })?;
            let path = safe_join(&self.archive_root, &entry.destination)?;
            let item: Box<dyn Item> =
                Box::new(FileItem::with_root(path, admin_dir.join(kind.dir_name()))?);
            match kind {
                NoteKind::AccessionRecords => stage.add_accessionrecord(item),
                NoteKind::AdminNotes => stage.add_adminnote(item),
                NoteKind::LegalNotes => stage.add_legalnote(item),
            }
        }

        info!(
            "Read stage {} from archive {} ({} material suites)",
            stage.identifier(),
            self.archive_root.display(),
            stage.suite_count()
        );
        Ok(stage)
    }

    /// Turn a segment's manifest entries into presform trees of originals
    fn build_nodes(&self, entries: &[&DataManifestEntry]) -> Result<Vec<ArchiveNode>> {
        let mut order: Vec<String> = Vec::new();
        let mut nodes: HashMap<String, ArchiveNode> = HashMap::new();
        let mut parents: HashMap<String, Option<String>> = HashMap::new();

        for entry in entries {
            let node = nodes.entry(entry.identifier.clone()).or_insert_with(|| {
                order.push(entry.identifier.clone());
                ArchiveNode {
                    name: entry.name.clone(),
                    extension: entry.extension.clone().unwrap_or_default(),
                    ..Default::default()
                }
            });
            parents.insert(entry.identifier.clone(), entry.parent.clone());
            let item = FileItem::with_name(
                safe_join(&self.archive_root, &entry.destination)?,
                match entry.kind {
                    ArchiveKind::Content => entry.name.clone(),
                    _ => entry.destination.clone(),
                },
            );
            match entry.kind {
                ArchiveKind::Content => node.content = Some(item),
                ArchiveKind::Premis => node.premis = Some(item),
                ArchiveKind::Techmd => node.techmd.push(item),
            }
        }

        // Children appear after their parents, so attach deepest-last
        for identifier in order.iter().rev() {
            if let Some(Some(parent)) = parents.get(identifier)
                && nodes.contains_key(parent)
                && let Some(child) = nodes.remove(identifier)
            {
                if let Some(parent_node) = nodes.get_mut(parent) {
                    parent_node.presforms.insert(0, child);
                }
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|identifier| nodes.remove(&identifier))
            .collect())
    }
}

#[derive(Debug, Default)]
struct ArchiveNode {
    name: String,
    extension: String,
    content: Option<FileItem>,
    premis: Option<FileItem>,
    techmd: Vec<FileItem>,
    presforms: Vec<ArchiveNode>,
}

struct ArchiveSuitePackager {
    node: ArchiveNode,
}

impl MaterialSuitePackager for ArchiveSuitePackager {
    fn origin(&self) -> String {
        format!("archive:{}", self.node.name)
    }

    fn get_premis(&mut self) -> Result<Option<Box<dyn Item>>> {
        Ok(self.node.premis.take().map(|i| Box::new(i) as Box<dyn Item>))
    }

    fn get_content(&mut self) -> Result<Option<Box<dyn Item>>> {
        Ok(self.node.content.take().map(|i| Box::new(i) as Box<dyn Item>))
    }

    fn get_techmd_list(&mut self) -> Result<Vec<Box<dyn Item>>> {
        Ok(self
            .node
            .techmd
            .drain(..)
            .map(|i| Box::new(i) as Box<dyn Item>)
            .collect())
    }

    fn get_presform_list(&mut self) -> Result<Vec<PresformPackager>> {
        Ok(self
            .node
            .presforms
            .drain(..)
            .map(|node| PresformPackager {
                extension: node.extension.clone(),
                packager: Box::new(ArchiveSuitePackager { node }),
            })
            .collect())
    }
}

/// Stage identifiers with a finished archive write under `archive_root`
pub fn archived_stages(archive_root: &Path) -> Result<Vec<String>> {
    let admin = archive_root.join(ADMIN_DIR);
    if !admin.is_dir() {
        return Ok(Vec::new());
    }
    let mut stages = Vec::new();
    for entry in fs::read_dir(admin)? {
        let entry = entry?;
        if entry.path().join(WRITE_FINISHED).is_file() {
            stages.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    stages.sort();
    Ok(stages)
}
