// src/commands/archive.rs

//! Pairtree archive serialization

use super::{copy_settings, read_stage};
use crate::cli::CopyArgs;
use anyhow::{Context, Result};
use ldrstage::{PairtreeArchiveWriter, PremisPolicy, StageConfig, StageWriter};
use std::path::{Path, PathBuf};

pub fn cmd_archive(
    stage_dir: &Path,
    archive_root: Option<PathBuf>,
    copy: &CopyArgs,
    config: &StageConfig,
) -> Result<()> {
    let archive_root = archive_root
        .or_else(|| config.archive.root.clone())
        .context("No archive root given and none configured in [archive] root")?;
    let stage = read_stage(stage_dir, PremisPolicy::Required)?;

    let summary = PairtreeArchiveWriter::new(&archive_root)
        .copy_settings(copy_settings(config, copy)?)
        .write(&stage)
        .with_context(|| format!("Failed to archive stage {}", stage.identifier()))?;

    println!(
        "Archived stage {} into {}",
        stage.identifier(),
        archive_root.display()
    );
    println!(
        "  {} copied, {} unchanged, {} bytestreams recorded",
        summary.copied, summary.unchanged, summary.manifest_entries
    );
    Ok(())
}
