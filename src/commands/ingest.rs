// src/commands/ingest.rs

//! Packaging a directory into a stage

use super::copy_settings;
use crate::cli::CopyArgs;
use anyhow::{Context, Result, bail};
use ldrstage::packager::package_directory;
use ldrstage::{FileSystemStageReader, FileSystemStageWriter, Stage, StageConfig, StageWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// Package every file under `source` into a new segment of `stage_id`
///
/// An existing stage is read first so its segments are kept; the new
/// segment's run defaults to one past the highest run already using `label`.
pub fn cmd_ingest(
    source: &Path,
    stage_root: Option<PathBuf>,
    stage_id: &str,
    label: &str,
    run: Option<u32>,
    copy: &CopyArgs,
    config: &StageConfig,
) -> Result<()> {
    if !source.is_dir() {
        bail!("Source {} is not a directory", source.display());
    }
    let stage_root = stage_root
        .or_else(|| config.stage.root.clone())
        .context("No stage root given and none configured in [stage] root")?;
    let settings = copy_settings(config, copy)?;

    let stage_dir = stage_root.join(stage_id);
    let mut stage = if stage_dir.is_dir() {
        info!("Adding to existing stage {}", stage_dir.display());
        FileSystemStageReader::new(&stage_dir).read()?
    } else {
        Stage::new(stage_id)
    };

    let run = match run {
        Some(run) => run,
        None => {
            stage
                .segments()
                .iter()
                .filter(|s| s.label() == label)
                .map(|s| s.run())
                .max()
                .unwrap_or(0)
                + 1
        }
    };

    let segment = package_directory(source, label, run, &config.agent.name, &settings)?;
    let identifier = segment.identifier();
    let count = segment.materialsuites().len();
    if stage.find_segment(&identifier).is_some() {
        bail!("Segment {} already exists in stage {}", identifier, stage_id);
    }
    stage.add_segment(segment);

    let summary = FileSystemStageWriter::new(&stage_root)
        .copy_settings(settings)
        .write(&stage)?;

    println!(
        "Ingested {} files from {} into {} segment {}",
        count,
        source.display(),
        stage_dir.display(),
        identifier
    );
    println!(
        "  {} copied, {} unchanged, {} manifest entries",
        summary.copied, summary.unchanged, summary.manifest_entries
    );
    Ok(())
}
