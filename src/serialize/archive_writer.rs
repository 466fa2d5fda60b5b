// src/serialize/archive_writer.rs

//! Writer for the pairtree archive layout
//!
//! ```text
//! <archive_root>/
//!   0=pairtree_0.1
//!   pairtree_root/<shorty path of identifier>/arf/
//!     0=arf_0.1
//!     content.file
//!     premis.xml
//!     TECHMD/<sha256 of record>.fits.xml
//!   admin/<stage_id>/
//!     accessionrecords/ adminnotes/ legalnotes/
//!     admin_manifest.json
//!     data_manifest.json
//!     WRITE_FINISHED.json
//! ```
//!
//! Each suite node is addressed by its own identifier, independent of the
//! segment or stage it came from. After copying, PREMIS and FITS records are
//! rewritten to name the archived content file. `WRITE_FINISHED.json` is
//! written last and removed at the start of every run, so its presence means
//! the manifests are complete.

use super::{StageWriter, WriteSummary, ensure_valid, fixup, node_names, note_name, verified_copy};
use crate::copier::CopySettings;
use crate::error::{Error, Result};
use crate::hash::{self, HashAlgorithm};
use crate::item::{FileItem, Item, OpenMode};
use crate::layout::{ADMIN_DIR, NoteKind};
use crate::pairtree::{self, ARF_DIR, ARF_TAG, PAIRTREE_TAG};
use crate::path::slash_name;
use crate::structure::{MaterialSuite, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ADMIN_MANIFEST: &str = "admin_manifest.json";
pub const DATA_MANIFEST: &str = "data_manifest.json";
pub const WRITE_FINISHED: &str = "WRITE_FINISHED.json";

const CONTENT_FILE: &str = "content.file";
const PREMIS_FILE: &str = "premis.xml";
const TECHMD_DIR: &str = "TECHMD";
const TECHMD_SUFFIX: &str = ".fits.xml";

/// What an archived bytestream is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    Content,
    Premis,
    Techmd,
}

/// One bytestream in `data_manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataManifestEntry {
    /// Item name at the source
    pub origin: String,
    /// Path relative to the archive root
    pub destination: String,
    pub kind: ArchiveKind,
    pub md5: String,
    pub sha256: String,
    /// Identifier of the suite node this belongs to
    pub identifier: String,
    pub segment: String,
    /// Identifier of the node this one is a presform of
    pub parent: Option<String>,
    /// Presform extension, for presform nodes
    #[serde(default)]
    pub extension: Option<String>,
    /// Content name inside the stage
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataManifest {
    pub stage: String,
    pub entries: Vec<DataManifestEntry>,
}

/// One note in `admin_manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminManifestEntry {
    pub origin: String,
    pub destination: String,
    /// `accessionrecords`, `adminnotes` or `legalnotes`
    pub kind: String,
    pub md5: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminManifest {
    pub stage: String,
    pub entries: Vec<AdminManifestEntry>,
}

/// Completion marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFinished {
    pub stage: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub data_entries: usize,
    pub admin_entries: usize,
}

/// Writes stages into a pairtree archive rooted at `archive_root`
pub struct PairtreeArchiveWriter {
    archive_root: PathBuf,
    copy: CopySettings,
}

impl PairtreeArchiveWriter {
    pub fn new(archive_root: impl Into<PathBuf>) -> Self {
        Self {
            archive_root: archive_root.into(),
            copy: CopySettings::default(),
        }
    }

    pub fn copy_settings(mut self, settings: CopySettings) -> Self {
        self.copy = settings;
        self
    }

    /// `admin/<stage_id>` under the archive root
    pub fn admin_dir(&self, stage_id: &str) -> Result<PathBuf> {
        crate::path::check_component(stage_id)?;
        Ok(self.archive_root.join(ADMIN_DIR).join(stage_id))
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.archive_root)
            .map(slash_name)
            .unwrap_or_else(|_| path.display().to_string())
    }

    /// Verified copy into place, named relative to the archive root
    fn place(&self, src: &dyn Item, dst_path: &Path, summary: &mut WriteSummary) -> Result<FileItem> {
        let dst = FileItem::with_name(dst_path, self.relative(dst_path));
        let report = verified_copy(src, &dst, &self.copy)?;
        summary.record(&report);
        Ok(dst)
    }

    fn digests(item: &dyn Item) -> Result<(String, String)> {
        let mut handle = item.open(OpenMode::Read)?;
        let digests =
            hash::hash_reader_multi(&[HashAlgorithm::Md5, HashAlgorithm::Sha256], &mut handle)?;
        Ok((digests[0].value.clone(), digests[1].value.clone()))
    }

    fn write_suite(
        &self,
        segment: &str,
        suite: &MaterialSuite,
        entries: &mut Vec<DataManifestEntry>,
        summary: &mut WriteSummary,
    ) -> Result<()> {
        let names = node_names(suite)?;
        let mut identifiers = std::collections::HashMap::new();

        for id in suite.walk() {
            let node = suite.node(id);
            let name = &names[&id];
            let identifier = match node.identifier() {
                Some(identifier) => identifier.to_string(),
                None => node.read_identifier()?,
            };
            identifiers.insert(id, identifier.clone());
            let parent = node.parent().and_then(|p| identifiers.get(&p).cloned());

            if node.technicalmetadata.len() > 1 {
                return Err(Error::TooManyTechmd {
                    name: name.clone(),
                    count: node.technicalmetadata.len(),
                });
            }

            let arf = pairtree::object_dir(&self.archive_root, &identifier)?.join(ARF_DIR);
            pairtree::write_namaste(&arf, ARF_TAG)?;

            let content_path = arf.join(CONTENT_FILE);
            let mut placed: Vec<(ArchiveKind, String, FileItem)> = Vec::new();
            if let Some(content) = &node.content {
                let dst = self.place(content.as_ref(), &content_path, summary)?;
                placed.push((ArchiveKind::Content, content.name().to_string(), dst));
            }

            let premis = node
                .premis
                .as_deref()
                .ok_or_else(|| Error::MissingPremis(name.clone()))?;
            let premis_dst = self.place(premis, &arf.join(PREMIS_FILE), summary)?;
            if node.content.is_some() {
                fixup::fixup_premis(premis_dst.path(), &content_path.to_string_lossy())?;
            }
            placed.push((ArchiveKind::Premis, premis.name().to_string(), premis_dst));

            if let Some(techmd) = node.technicalmetadata.first() {
                let (_, sha256) = Self::digests(techmd.as_ref())?;
                let path = arf.join(TECHMD_DIR).join(format!("{}{}", sha256, TECHMD_SUFFIX));
                let dst = self.place(techmd.as_ref(), &path, summary)?;
                fixup::fixup_fits(dst.path(), &content_path)?;
                placed.push((ArchiveKind::Techmd, techmd.name().to_string(), dst));
            }

            // Digests are taken after fixup so they match what is on disk
            for (kind, origin, dst) in placed {
                let (md5, sha256) = Self::digests(&dst)?;
                entries.push(DataManifestEntry {
                    origin,
                    destination: dst.name().to_string(),
                    kind,
                    md5,
                    sha256,
                    identifier: identifier.clone(),
                    segment: segment.to_string(),
                    parent: parent.clone(),
                    extension: node.extension().map(str::to_string),
                    name: name.clone(),
                });
                summary.manifest_entries += 1;
            }

            debug!("Archived {} as {}", name, identifier);
        }
        Ok(())
    }

    fn write_notes(
        &self,
        admin_dir: &Path,
        stage: &Stage,
        summary: &mut WriteSummary,
    ) -> Result<Vec<AdminManifestEntry>> {
        let mut entries = Vec::new();
        for kind in NoteKind::ALL {
            let notes = match kind {
                NoteKind::AccessionRecords => stage.accessionrecords(),
                NoteKind::AdminNotes => stage.adminnotes(),
                NoteKind::LegalNotes => stage.legalnotes(),
            };
            let dir = admin_dir.join(kind.dir_name());
            fs::create_dir_all(&dir)?;
            for note in notes {
                let path = crate::path::safe_join(&dir, &note_name(note.as_ref()))?;
                let dst = self.place(note.as_ref(), &path, summary)?;
                let (md5, sha256) = Self::digests(&dst)?;
                entries.push(AdminManifestEntry {
                    origin: note.name().to_string(),
                    destination: dst.name().to_string(),
                    kind: kind.dir_name().to_string(),
                    md5,
                    sha256,
                });
            }
        }
        Ok(entries)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

impl StageWriter for PairtreeArchiveWriter {
    fn write(&self, stage: &Stage) -> Result<WriteSummary> {
        ensure_valid(stage)?;
        let admin_dir = self.admin_dir(stage.identifier())?;
        fs::create_dir_all(&admin_dir)?;

        let finished_path = admin_dir.join(WRITE_FINISHED);
        if finished_path.exists() {
            fs::remove_file(&finished_path)?;
        }

        pairtree::write_namaste(&self.archive_root, PAIRTREE_TAG)?;
        fs::create_dir_all(self.archive_root.join(pairtree::PAIRTREE_ROOT))?;

        let mut summary = WriteSummary::default();
        let admin_entries = self.write_notes(&admin_dir, stage, &mut summary)?;

        let mut data_entries = Vec::new();
        for segment in stage.segments() {
            let segment_id = segment.identifier();
            for suite in segment.materialsuites() {
                self.write_suite(&segment_id, suite, &mut data_entries, &mut summary)?;
            }
        }

        let stage_id = stage.identifier().to_string();
        write_json(
            &admin_dir.join(ADMIN_MANIFEST),
            &AdminManifest {
                stage: stage_id.clone(),
                entries: admin_entries.clone(),
            },
        )?;
        write_json(
            &admin_dir.join(DATA_MANIFEST),
            &DataManifest {
                stage: stage_id.clone(),
                entries: data_entries.clone(),
            },
        )?;
        write_json(
            &finished_path,
            &WriteFinished {
                stage: stage_id,
                timestamp: Utc::now(),
                status: "complete".to_string(),
                data_entries: data_entries.len(),
                admin_entries: admin_entries.len(),
            },
        )?;

        info!(
            "Archived stage {} to {}: {} bytestreams, {} notes",
            stage.identifier(),
            self.archive_root.display(),
            data_entries.len(),
            admin_entries.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::premis::{Identifier, PremisObject, PremisRecord};
    use crate::structure::Segment;
    use tempfile::TempDir;

    fn stage_with_one_suite(src: &Path, id: &str) -> Stage {
        let content_path = src.join("foo.txt");
        fs::write(&content_path, b"archived bytes").unwrap();
        let premis_path = src.join("foo.premis.xml");
        let mut object = PremisObject {
            identifiers: vec![Identifier::new("uuid", id)],
            ..Default::default()
        };
        object.set_content_location(content_path.to_string_lossy());
        PremisRecord::with_object(object).write_to_path(&premis_path).unwrap();

        let mut suite =
            MaterialSuite::with_content(Box::new(FileItem::with_name(&content_path, "foo.txt")));
        suite.root_mut().premis = Some(Box::new(FileItem::new(premis_path)));
        suite.root_mut().set_identifier(id);

        let mut segment = Segment::new("seg", 1).unwrap();
        segment.add_materialsuite(suite);
        let mut stage = Stage::new("s1");
        stage.add_segment(segment);
        stage
    }

    #[test]
    fn test_archive_layout() {
        let src = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        let stage = stage_with_one_suite(src.path(), "abcdef");

        PairtreeArchiveWriter::new(archive.path()).write(&stage).unwrap();

        let arf = archive.path().join("pairtree_root/ab/cd/ef/arf");
        assert!(archive.path().join("0=pairtree_0.1").is_file());
        assert!(arf.join("0=arf_0.1").is_file());
        assert_eq!(fs::read(arf.join("content.file")).unwrap(), b"archived bytes");

        let record = PremisRecord::from_path(&arf.join("premis.xml")).unwrap();
        assert_eq!(
            record.first_object().unwrap().content_location(),
            Some(arf.join("content.file").to_string_lossy().as_ref())
        );

        let admin = archive.path().join("admin/s1");
        let manifest: DataManifest =
            serde_json::from_slice(&fs::read(admin.join(DATA_MANIFEST)).unwrap()).unwrap();
        assert_eq!(manifest.entries.len(), 2);
        assert_eq!(manifest.entries[0].kind, ArchiveKind::Content);
        assert_eq!(manifest.entries[0].destination, "pairtree_root/ab/cd/ef/arf/content.file");
        assert_eq!(manifest.entries[0].sha256, hash::sha256(b"archived bytes"));
        assert_eq!(manifest.entries[1].kind, ArchiveKind::Premis);

        let finished: WriteFinished =
            serde_json::from_slice(&fs::read(admin.join(WRITE_FINISHED)).unwrap()).unwrap();
        assert_eq!(finished.status, "complete");
        assert_eq!(finished.data_entries, 2);
    }

    #[test]
    fn test_identifier_alone_determines_location() {
        let src_a = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        let stage = stage_with_one_suite(src_a.path(), "0011");
        PairtreeArchiveWriter::new(archive.path()).write(&stage).unwrap();
        assert!(archive.path().join("pairtree_root/00/11/arf/content.file").is_file());
    }
}
