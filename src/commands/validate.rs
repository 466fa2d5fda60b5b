// src/commands/validate.rs

//! Stage validation report

use super::read_stage;
use anyhow::{Result, bail};
use ldrstage::{PremisPolicy, Structure};
use std::path::Path;

pub fn cmd_validate(stage_dir: &Path) -> Result<()> {
    // Missing PREMIS is listed with the other problems rather than aborting the read
    let stage = read_stage(stage_dir, PremisPolicy::Optional)?;

    println!("Stage {}", stage.identifier());
    for segment in stage.segments() {
        let presforms: usize = segment
            .materialsuites()
            .iter()
            .map(|suite| suite.len() - 1)
            .sum();
        println!(
            "  {}: {} material suites, {} presforms",
            segment.identifier(),
            segment.materialsuites().len(),
            presforms
        );
    }
    println!(
        "  notes: {} accession records, {} admin notes, {} legal notes",
        stage.accessionrecords().len(),
        stage.adminnotes().len(),
        stage.legalnotes().len()
    );

    let problems = stage.problems();
    if !problems.is_empty() {
        for problem in &problems {
            println!("  problem: {}", problem);
        }
        bail!(ldrstage::Error::InvalidStructure(format!(
            "stage {}: {} problems",
            stage.identifier(),
            problems.len()
        )));
    }

    println!("Stage is valid");
    Ok(())
}
