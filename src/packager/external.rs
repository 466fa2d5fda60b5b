// src/packager/external.rs

//! Packaging files that arrive from outside the repository
//!
//! External files carry no provenance. The packager copies the file into a
//! scratch directory through the verified copier, then synthesizes a PREMIS
//! record for the copy: an object (fixity, size, formats, original name,
//! original location), an ingestion event and the software agent, with the
//! object and event linked to each other.

use super::{MaterialSuitePackager, assemble};
use crate::copier::{CopySettings, ItemCopier};
use crate::error::{Error, Result};
use crate::item::{FileItem, Item};
use crate::premis;
use crate::structure::Segment;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;
use walkdir::WalkDir;

/// Default agent name recorded in synthesized PREMIS
pub const DEFAULT_AGENT: &str = "ldrstage";

struct Ingested {
    content: FileItem,
    premis: FileItem,
}

/// Packager for one file on local disk
pub struct ExternalFilePackager {
    source: FileItem,
    agent: String,
    copy: CopySettings,
    scratch: Option<Arc<TempDir>>,
    ingested: Option<Ingested>,
}

impl ExternalFilePackager {
    /// Package `source`; its name (relative to its root, if it has one)
    /// becomes the content name inside the stage
    pub fn new(source: FileItem) -> Self {
        Self {
            source,
            agent: DEFAULT_AGENT.to_string(),
            copy: CopySettings::default(),
            scratch: None,
            ingested: None,
        }
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    pub fn copy_settings(mut self, settings: CopySettings) -> Self {
        self.copy = settings;
        self
    }

    /// Copy into scratch and synthesize PREMIS, once
    fn ingest(&mut self) -> Result<&Ingested> {
        if self.ingested.is_none() {
            let scratch = Arc::new(TempDir::new()?);
            let name = self.source.name().to_string();

            let content_path = scratch.path().join("content");
            let content = FileItem::with_name(&content_path, name.clone());
            let report = ItemCopier::with_settings(&self.source, &content, &self.copy)
                .clobber(true)
                .copy(false)?;
            if !report.verified() {
                return Err(Error::UnverifiedWrite(name));
            }

            let mut description = premis::describe_item(&content, &name)?;
            description.content_location =
                Some(self.source.path().to_string_lossy().into_owned());
            let record = premis::ingest_record(&description, &self.agent);

            let premis_path = scratch.path().join("premis.xml");
            record.write_to_path(&premis_path)?;
            let premis = FileItem::with_name(premis_path, format!("{}.premis.xml", name));

            info!("Packaged {} as {}", name, description.identifier);
            self.scratch = Some(scratch);
            self.ingested = Some(Ingested { content, premis });
        }
        self.ingested
            .as_ref()
            .ok_or_else(|| Error::IoError(format!("{} was not ingested", self.source.name())))
    }
}

impl MaterialSuitePackager for ExternalFilePackager {
    fn origin(&self) -> String {
        self.source.path().display().to_string()
    }

    fn get_premis(&mut self) -> Result<Option<Box<dyn Item>>> {
        Ok(Some(Box::new(self.ingest()?.premis.clone())))
    }

    fn get_content(&mut self) -> Result<Option<Box<dyn Item>>> {
        Ok(Some(Box::new(self.ingest()?.content.clone())))
    }

    fn take_scratch(&mut self) -> Vec<Arc<TempDir>> {
        self.scratch.take().into_iter().collect()
    }
}

/// Package every file under `dir` into a new segment
///
/// Files are visited in name order; content names are relative to `dir`.
pub fn package_directory(
    dir: &Path,
    label: &str,
    run: u32,
    agent: &str,
    copy: &CopySettings,
) -> Result<Segment> {
    let mut segment = Segment::new(label, run)?;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let source = FileItem::with_root(entry.path(), dir)?;
        let mut packager = ExternalFilePackager::new(source)
            .agent(agent)
            .copy_settings(copy.clone());
        segment.add_materialsuite(assemble(&mut packager)?);
    }

    info!(
        "Packaged {} files from {} into {}",
        segment.materialsuites().len(),
        dir.display(),
        segment.identifier()
    );
    Ok(segment)
}
