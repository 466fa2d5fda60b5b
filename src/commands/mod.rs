// src/commands/mod.rs
//! Command handlers for the ldrstage CLI

mod archive;
mod copy;
mod ingest;
mod process;
mod validate;

pub use archive::cmd_archive;
pub use copy::cmd_copy;
pub use ingest::cmd_ingest;
pub use process::{cmd_convert, cmd_premis, cmd_prune, cmd_restrict, cmd_techmd};
pub use validate::cmd_validate;

use crate::cli::CopyArgs;
use anyhow::{Context, Result};
use ldrstage::{
    CopySettings, FileSystemStageReader, FileSystemStageWriter, PremisPolicy, Stage, StageConfig,
    StageWriter,
};
use std::path::{Path, PathBuf};

/// Config copier settings with command-line overrides applied
fn copy_settings(config: &StageConfig, args: &CopyArgs) -> Result<CopySettings> {
    let mut settings = config.copy.clone();
    if let Some(eq_detect) = &args.eq_detect {
        settings.eq_detect = eq_detect.parse()?;
    }
    if let Some(max_retries) = args.max_retries {
        settings.max_retries = max_retries;
    }
    Ok(settings)
}

/// The root a stage directory lives in
fn stage_root_of(stage_dir: &Path) -> Result<PathBuf> {
    stage_dir
        .parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("{} has no parent directory", stage_dir.display()))
}

fn read_stage(stage_dir: &Path, premis: PremisPolicy) -> Result<Stage> {
    let mut reader = FileSystemStageReader::new(stage_dir);
    if premis == PremisPolicy::Optional {
        reader = reader.allow_missing_premis();
    }
    reader
        .read()
        .with_context(|| format!("Failed to read stage {}", stage_dir.display()))
}

/// Persist a processed stage back where it was read from
fn write_stage_in_place(stage_dir: &Path, stage: &Stage, config: &StageConfig) -> Result<()> {
    let summary = FileSystemStageWriter::new(stage_root_of(stage_dir)?)
        .copy_settings(config.copy.clone())
        .write(stage)?;
    println!(
        "Wrote {}: {} copied, {} unchanged",
        stage_dir.display(),
        summary.copied,
        summary.unchanged
    );
    Ok(())
}
