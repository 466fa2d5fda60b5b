// src/processors/mod.rs

//! Stage processors
//!
//! A processor walks every material suite of every segment of a stage,
//! including every presform node, and changes the stage in memory. Updated
//! PREMIS records and tool output are written into scratch directories owned
//! by the suite they belong to; persisting them is the job of a
//! [`StageWriter`](crate::serialize::StageWriter).

mod converter;
mod premis_creator;
mod pruner;
mod restriction;
mod techmd;

pub use converter::Converter;
pub use premis_creator::PremisCreator;
pub use pruner::Pruner;
pub use restriction::RestrictionSetter;
pub use techmd::TechmdCreator;

use crate::copier::ItemCopier;
use crate::error::{Error, Result};
use crate::item::{FileItem, Item};
use crate::premis::{PremisRecord, mint_identifier};
use crate::structure::{MaterialSuite, Stage, SuiteNodeId};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

/// What a processor run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorReport {
    pub processor: String,
    /// Nodes changed
    pub processed: usize,
    /// Nodes the processor did not apply to
    pub skipped: usize,
    /// Nodes where an external tool failed (recorded in PREMIS)
    pub failed: usize,
}

impl ProcessorReport {
    fn new(processor: &str) -> Self {
        Self {
            processor: processor.to_string(),
            ..Default::default()
        }
    }
}

/// An in-memory transformation of a stage
pub trait Processor {
    fn name(&self) -> &'static str;

    /// Checked against every suite before any suite is processed
    fn precheck(&self, _suite: &MaterialSuite) -> Result<()> {
        Ok(())
    }

    fn process_suite(&mut self, suite: &mut MaterialSuite, report: &mut ProcessorReport) -> Result<()>;

    fn run(&mut self, stage: &mut Stage) -> Result<ProcessorReport> {
        for segment in stage.segments() {
            for suite in segment.materialsuites() {
                self.precheck(suite)?;
            }
        }

        let mut report = ProcessorReport::new(self.name());
        for segment in stage.segments_mut() {
            for suite in segment.materialsuites_mut() {
                self.process_suite(suite, &mut report)?;
            }
        }
        info!(
            "{}: {} processed, {} skipped, {} failed",
            report.processor, report.processed, report.skipped, report.failed
        );
        Ok(report)
    }
}

/// Fail with `MissingPremis` unless every node of the suite has PREMIS
fn require_premis(suite: &MaterialSuite) -> Result<()> {
    for id in suite.walk() {
        let node = suite.node(id);
        if node.premis.is_none() {
            return Err(Error::MissingPremis(
                suite.content_name(id).unwrap_or_else(|| node.describe()),
            ));
        }
    }
    Ok(())
}

/// Lazily created scratch directory for one suite's processor output
///
/// Once the suite is processed, [`Scratch::hand_to`] passes ownership of the
/// directory to the suite so the files outlive the processor.
pub(crate) struct Scratch {
    dir: Option<Arc<TempDir>>,
}

impl Scratch {
    pub(crate) fn new() -> Self {
        Self { dir: None }
    }

    /// A fresh path inside the scratch directory
    pub(crate) fn path(&mut self, file_name: &str) -> Result<PathBuf> {
        let dir = match self.dir.take() {
            Some(dir) => dir,
            None => Arc::new(TempDir::new()?),
        };
        let path = dir.path().join(format!("{}-{}", mint_identifier(), file_name));
        self.dir = Some(dir);
        Ok(path)
    }

    pub(crate) fn hand_to(self, suite: &mut MaterialSuite) {
        if let Some(dir) = self.dir {
            suite.hold_scratch(dir);
        }
    }
}

/// Name for a node in messages and item names
fn node_label(suite: &MaterialSuite, id: SuiteNodeId) -> String {
    suite
        .content_name(id)
        .or_else(|| suite.node(id).identifier().map(str::to_string))
        .unwrap_or_else(|| suite.node(id).describe())
}

/// Serialize `record` into scratch and make it the node's PREMIS
fn replace_premis(
    suite: &mut MaterialSuite,
    id: SuiteNodeId,
    record: &PremisRecord,
    scratch: &mut Scratch,
) -> Result<()> {
    let label = node_label(suite, id);
    let path = scratch.path("premis.xml")?;
    record.write_to_path(&path)?;
    let identifier = record.object_identifier()?.to_string();

    let node = suite.node_mut(id);
    node.premis = Some(Box::new(FileItem::with_name(path, format!("{}.premis.xml", label))));
    node.set_identifier(identifier);
    Ok(())
}

/// A local file holding the item's bytes, copying into scratch when needed
fn local_copy(item: &dyn Item, scratch: &mut Scratch) -> Result<PathBuf> {
    if let Some(path) = item.local_path() {
        return Ok(path.to_path_buf());
    }
    let file_name = std::path::Path::new(item.name())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "content".to_string());
    let path = scratch.path(&file_name)?;
    let dst = FileItem::new(&path);
    ItemCopier::new(item, &dst).clobber(true).copy(false)?;
    Ok(path)
}
