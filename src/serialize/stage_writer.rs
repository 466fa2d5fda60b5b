// src/serialize/stage_writer.rs

//! Writer for the plain stage layout (see [`crate::layout`])

use super::{StageWriter, WriteSummary, ensure_valid, node_names, note_name, verified_copy};
use crate::copier::CopySettings;
use crate::error::{Error, Result};
use crate::hash::{self, HashAlgorithm};
use crate::item::{FileItem, Item, OpenMode};
use crate::layout::{NoteKind, StageLayout};
use crate::serialize::ManifestWriter;
use crate::structure::{MaterialSuite, Stage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes a stage under `<stage_root>/<stage_id>`
pub struct FileSystemStageWriter {
    stage_root: PathBuf,
    copy: CopySettings,
}

impl FileSystemStageWriter {
    pub fn new(stage_root: impl Into<PathBuf>) -> Self {
        Self {
            stage_root: stage_root.into(),
            copy: CopySettings::default(),
        }
    }

    pub fn copy_settings(mut self, settings: CopySettings) -> Self {
        self.copy = settings;
        self
    }

    fn write_suite(
        &self,
        layout: &StageLayout,
        segment: &str,
        suite: &MaterialSuite,
        manifest: &mut ManifestWriter,
        summary: &mut WriteSummary,
    ) -> Result<()> {
        let names = node_names(suite)?;

        for id in suite.walk() {
            let node = suite.node(id);
            let name = &names[&id];

            if node.technicalmetadata.len() > 1 {
                return Err(Error::TooManyTechmd {
                    name: name.clone(),
                    count: node.technicalmetadata.len(),
                });
            }

            if let Some(content) = &node.content {
                let dst = layout.content_path(segment, name)?;
                self.place(layout, content.as_ref(), &dst, manifest, summary)?;
            }

            let premis = node
                .premis
                .as_deref()
                .ok_or_else(|| Error::MissingPremis(name.clone()))?;
            let dst = layout.premis_path(segment, name)?;
            self.place(layout, premis, &dst, manifest, summary)?;

            if let Some(techmd) = node.technicalmetadata.first() {
                let dst = layout.techmd_path(segment, name)?;
                self.place(layout, techmd.as_ref(), &dst, manifest, summary)?;
            }
        }
        Ok(())
    }

    /// Copy one item into place and record it in the manifest
    fn place(
        &self,
        layout: &StageLayout,
        src: &dyn Item,
        dst_path: &Path,
        manifest: &mut ManifestWriter,
        summary: &mut WriteSummary,
    ) -> Result<()> {
        let relative = dst_path
            .strip_prefix(layout.root())
            .map(crate::path::slash_name)
            .unwrap_or_else(|_| dst_path.display().to_string());
        let dst = FileItem::with_name(dst_path, relative.clone());

        let report = verified_copy(src, &dst, &self.copy)?;
        summary.record(&report);

        let mut handle = dst.open(OpenMode::Read)?;
        let digest = hash::hash_reader(HashAlgorithm::Sha256, &mut handle)?;
        manifest.append(&relative, digest.as_str())?;
        summary.manifest_entries += 1;
        debug!("Wrote {} ({})", relative, if report.copied { "copied" } else { "unchanged" });
        Ok(())
    }

    fn write_notes(&self, layout: &StageLayout, stage: &Stage, summary: &mut WriteSummary) -> Result<()> {
        for kind in NoteKind::ALL {
            let notes = match kind {
                NoteKind::AccessionRecords => stage.accessionrecords(),
                NoteKind::AdminNotes => stage.adminnotes(),
                NoteKind::LegalNotes => stage.legalnotes(),
            };
            for note in notes {
                let name = note_name(note.as_ref());
                let dst = FileItem::with_name(layout.note_path(kind, &name)?, name);
                let report = verified_copy(note.as_ref(), &dst, &self.copy)?;
                summary.record(&report);
            }
        }
        Ok(())
    }
}

impl StageWriter for FileSystemStageWriter {
    fn write(&self, stage: &Stage) -> Result<WriteSummary> {
        ensure_valid(stage)?;
        let layout = StageLayout::new(&self.stage_root, stage.identifier())?;

        let segment_ids: Vec<String> = stage.segments().iter().map(|s| s.identifier()).collect();
        for dir in layout.skeleton(&segment_ids) {
            fs::create_dir_all(dir)?;
        }

        let mut summary = WriteSummary::default();
        self.write_notes(&layout, stage, &mut summary)?;

        for (segment, segment_id) in stage.segments().iter().zip(&segment_ids) {
            let mut manifest = ManifestWriter::open(&layout.manifest_path(segment_id))?;
            for suite in segment.materialsuites() {
                self.write_suite(&layout, segment_id, suite, &mut manifest, &mut summary)?;
            }
            manifest.close()?;
        }

        info!(
            "Wrote stage {} to {}: {} copied, {} unchanged",
            stage.identifier(),
            layout.root().display(),
            summary.copied,
            summary.unchanged
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::premis::{Identifier, PremisObject, PremisRecord};
    use crate::structure::{Segment, SuiteNodeId};
    use tempfile::TempDir;

    fn suite_in(dir: &Path, name: &str, id: &str) -> MaterialSuite {
        let content_path = dir.join(format!("{}.src", id));
        fs::write(&content_path, format!("content of {}", name)).unwrap();
        let premis_path = dir.join(format!("{}.premis", id));
        PremisRecord::with_object(PremisObject {
            identifiers: vec![Identifier::new("uuid", id)],
            ..Default::default()
        })
        .write_to_path(&premis_path)
        .unwrap();

        let mut suite = MaterialSuite::with_content(Box::new(FileItem::with_name(content_path, name)));
        suite.root_mut().premis = Some(Box::new(FileItem::new(premis_path)));
        suite
    }

    #[test]
    fn test_writes_layout() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();

        let mut suite = suite_in(src.path(), "docs/foo.txt", "id1");
        let presform = suite_in(src.path(), "ignored", "id2");
        suite
            .attach_presform(SuiteNodeId::ROOT, crate::structure::Presform::new(".pdf", presform))
            .unwrap();
        let mut segment = Segment::new("seg", 1).unwrap();
        segment.add_materialsuite(suite);
        let mut stage = Stage::new("s1");
        stage.add_segment(segment);

        let summary = FileSystemStageWriter::new(root.path()).write(&stage).unwrap();
        assert_eq!(summary.copied, 4);
        assert_eq!(summary.manifest_entries, 4);

        let base = root.path().join("s1");
        assert_eq!(
            fs::read_to_string(base.join("data/seg-1/docs/foo.txt")).unwrap(),
            "content of docs/foo.txt"
        );
        assert!(base.join("data/seg-1/docs/foo.txt.presform.pdf").is_file());
        assert!(base.join("admin/seg-1/PREMIS/docs/foo.txt.premis.xml").is_file());
        assert!(base.join("admin/seg-1/PREMIS/docs/foo.txt.presform.pdf.premis.xml").is_file());
        assert!(base.join("admin/accessionrecords").is_dir());

        let manifest = crate::serialize::read_manifest(&base.join("admin/seg-1/manifest.txt")).unwrap();
        assert_eq!(manifest[0].name, "data/seg-1/docs/foo.txt");
        assert_eq!(manifest[0].sha256, hash::sha256(b"content of docs/foo.txt"));
        assert_eq!(manifest[1].name, "admin/seg-1/PREMIS/docs/foo.txt.premis.xml");
    }

    #[test]
    fn test_rejects_invalid_stage() {
        let root = TempDir::new().unwrap();
        let mut segment = Segment::new("seg", 1).unwrap();
        segment.add_materialsuite(MaterialSuite::with_content(Box::new(FileItem::new("/x"))));
        let mut stage = Stage::new("s1");
        stage.add_segment(segment);

        let err = FileSystemStageWriter::new(root.path()).write(&stage).unwrap_err();
        assert!(matches!(err, Error::InvalidStructure(_)));
        assert!(!root.path().join("s1").exists());
    }

    #[test]
    fn test_too_many_techmd() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let mut suite = suite_in(src.path(), "a.txt", "id1");
        suite.root_mut().technicalmetadata = vec![
            Box::new(FileItem::new(src.path().join("id1.src"))),
            Box::new(FileItem::new(src.path().join("id1.src"))),
        ];
        let mut segment = Segment::new("seg", 1).unwrap();
        segment.add_materialsuite(suite);
        let mut stage = Stage::new("s1");
        stage.add_segment(segment);

        let err = FileSystemStageWriter::new(root.path()).write(&stage).unwrap_err();
        assert!(matches!(err, Error::TooManyTechmd { count: 2, .. }));
    }
}
