// src/commands/process.rs

//! Processor commands
//!
//! Each reads the stage, runs one processor over it, and writes the stage
//! back to the same directory.

use super::{read_stage, write_stage_in_place};
use anyhow::{Context, Result};
use ldrstage::premis::{IDENTIFIER_TYPE, Identifier, Restriction};
use ldrstage::{
    Converter, PremisCreator, PremisPolicy, Processor, ProcessorReport, Pruner, RestrictionSetter,
    StageConfig, TechmdCreator,
};
use regex::Regex;
use std::path::Path;

fn run_processor(stage_dir: &Path, processor: &mut dyn Processor, config: &StageConfig) -> Result<ProcessorReport> {
    run_processor_with(stage_dir, processor, PremisPolicy::Required, config)
}

fn run_processor_with(
    stage_dir: &Path,
    processor: &mut dyn Processor,
    premis: PremisPolicy,
    config: &StageConfig,
) -> Result<ProcessorReport> {
    let mut stage = read_stage(stage_dir, premis)?;
    let report = processor
        .run(&mut stage)
        .with_context(|| format!("{} failed on {}", processor.name(), stage_dir.display()))?;
    write_stage_in_place(stage_dir, &stage, config)?;
    println!(
        "{}: {} processed, {} skipped, {} failed",
        report.processor, report.processed, report.skipped, report.failed
    );
    Ok(report)
}

pub fn cmd_premis(stage_dir: &Path, config: &StageConfig) -> Result<()> {
    let mut creator = PremisCreator::new(config.agent.name.clone());
    run_processor_with(stage_dir, &mut creator, PremisPolicy::Optional, config)?;
    Ok(())
}

pub fn cmd_restrict(
    stage_dir: &Path,
    code: &str,
    inactive: bool,
    reasons: Vec<String>,
    stipulations: Vec<String>,
    agent_ids: Vec<String>,
    config: &StageConfig,
) -> Result<()> {
    let restriction = Restriction {
        code: code.to_string(),
        active: !inactive,
        reasons,
        donor_stipulations: stipulations,
        linking_agent_ids: agent_ids
            .into_iter()
            .map(|id| Identifier::new(IDENTIFIER_TYPE, id))
            .collect(),
    };
    let mut setter = RestrictionSetter::new(restriction);
    run_processor(stage_dir, &mut setter, config)?;
    Ok(())
}

pub fn cmd_prune(stage_dir: &Path, pattern: &str, final_delete: bool, config: &StageConfig) -> Result<()> {
    let pattern = Regex::new(pattern).with_context(|| format!("Invalid pattern: {}", pattern))?;
    let mut pruner = Pruner::new(pattern, config.agent.name.clone()).final_delete(final_delete);
    run_processor(stage_dir, &mut pruner, config)?;

    for outcome in pruner.outcomes() {
        println!("  {}", outcome.message());
    }
    if !final_delete && !pruner.outcomes().is_empty() {
        println!("Dry run; pass --final to delete");
    }
    Ok(())
}

pub fn cmd_techmd(stage_dir: &Path, config: &StageConfig) -> Result<()> {
    let mut creator = TechmdCreator::new(config.fits()?.clone());
    run_processor(stage_dir, &mut creator, config)?;
    Ok(())
}

pub fn cmd_convert(stage_dir: &Path, converter: &str, config: &StageConfig) -> Result<()> {
    let template = config.converter(converter)?.clone();
    let mut converter = Converter::new(converter, template, config.agent.name.clone())?;
    run_processor(stage_dir, &mut converter, config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cmd_validate;
    use ldrstage::packager::package_directory;
    use ldrstage::{CopySettings, FileSystemStageReader, FileSystemStageWriter, Stage, StageWriter, Structure};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_premis_command_fills_in_missing_records() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("a.txt"), b"alpha").unwrap();
        let segment = package_directory(source.path(), "accession", 1, "test", &CopySettings::default()).unwrap();
        let mut stage = Stage::new("s1");
        stage.add_segment(segment);
        let root = TempDir::new().unwrap();
        FileSystemStageWriter::new(root.path()).write(&stage).unwrap();
        drop(stage);

        // Dropped into the stage by hand, no PREMIS sidecar
        let stage_dir = root.path().join("s1");
        fs::write(stage_dir.join("data/accession-1/late.txt"), b"arrived later").unwrap();
        assert!(FileSystemStageReader::new(&stage_dir).read().is_err());
        assert!(cmd_validate(&stage_dir).is_err());

        let config = StageConfig::default();
        cmd_premis(&stage_dir, &config).unwrap();

        assert!(stage_dir.join("admin/accession-1/PREMIS/late.txt.premis.xml").is_file());
        let stage = FileSystemStageReader::new(&stage_dir).read().unwrap();
        assert!(stage.validate());
        assert_eq!(stage.segments()[0].materialsuites().len(), 2);
        cmd_validate(&stage_dir).unwrap();
        assert_eq!(
            fs::read(stage_dir.join("data/accession-1/late.txt")).unwrap(),
            b"arrived later"
        );
    }
}
