// tests/processors.rs

//! Processors run against stages ingested from a directory and written to disk.

mod common;

use common::{files_under, suite_in};
use ldrstage::packager::package_directory;
use ldrstage::premis::{OUTCOME_SUCCESS, Restriction};
use ldrstage::{
    CopySettings, Error, FileItem, FileSystemStageReader, FileSystemStageWriter, MaterialSuite,
    PremisCreator, PremisRecord, Processor, Pruner, RestrictionSetter, Segment, Stage, StageWriter,
    Structure, SuiteNodeId,
};
use regex::Regex;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Ingest `files` into `<root>/s1` and return the stage directory
fn ingest(root: &Path, files: &[(&str, &str)]) -> std::path::PathBuf {
    let source = TempDir::new().unwrap();
    for (name, body) in files {
        let path = source.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }
    let segment = package_directory(source.path(), "accession", 1, "tester", &CopySettings::default()).unwrap();
    let mut stage = Stage::new("s1");
    stage.add_segment(segment);
    FileSystemStageWriter::new(root).write(&stage).unwrap();
    root.join("s1")
}

fn restriction(code: &str) -> Restriction {
    Restriction {
        code: code.to_string(),
        active: true,
        reasons: vec!["donor request".to_string()],
        ..Default::default()
    }
}

#[test]
fn test_ingested_files_carry_premis() {
    let root = TempDir::new().unwrap();
    let stage_dir = ingest(root.path(), &[("a.txt", "alpha"), ("sub/b.csv", "1,2")]);

    let stage = FileSystemStageReader::new(&stage_dir).read().unwrap();
    assert!(stage.validate());
    let suites = stage.segments()[0].materialsuites();
    assert_eq!(suites.len(), 2);

    let record = PremisRecord::from_item(suites[1].root().premis.as_deref().unwrap()).unwrap();
    let object = record.first_object().unwrap();
    assert_eq!(object.original_name.as_deref(), Some("sub/b.csv"));
    assert_eq!(record.events_of_type("ingestion").count(), 1);
    assert_eq!(
        record.events_of_type("ingestion").next().unwrap().outcome(),
        Some(OUTCOME_SUCCESS)
    );
}

#[test]
fn test_restriction_persists_after_rewrite() {
    let root = TempDir::new().unwrap();
    let stage_dir = ingest(root.path(), &[("a.txt", "alpha"), ("b.txt", "beta")]);

    let mut stage = FileSystemStageReader::new(&stage_dir).read().unwrap();
    let report = RestrictionSetter::new(restriction("R-30")).run(&mut stage).unwrap();
    assert_eq!(report.processed, 2);
    FileSystemStageWriter::new(root.path()).write(&stage).unwrap();
    drop(stage);

    let reread = FileSystemStageReader::new(&stage_dir).read().unwrap();
    for suite in reread.segments()[0].materialsuites() {
        let record = PremisRecord::from_item(suite.root().premis.as_deref().unwrap()).unwrap();
        let codes: Vec<_> = record.restrictions().map(|r| r.code.clone()).collect();
        assert_eq!(codes, vec!["R-30"]);
    }
}

#[test]
fn test_missing_premis_stops_restriction_before_writing() {
    let root = TempDir::new().unwrap();
    let stage_dir = ingest(root.path(), &[("a.txt", "alpha")]);
    let premis_path = stage_dir.join("admin/accession-1/PREMIS/a.txt.premis.xml");
    let before = fs::read(&premis_path).unwrap();
    let files_before = files_under(&stage_dir);

    let mut stage = FileSystemStageReader::new(&stage_dir).read().unwrap();
    let extra = TempDir::new().unwrap();
    fs::write(extra.path().join("loose.txt"), b"no provenance").unwrap();
    let mut segment = Segment::new("loose", 1).unwrap();
    segment.add_materialsuite(MaterialSuite::with_content(Box::new(FileItem::with_name(
        extra.path().join("loose.txt"),
        "loose.txt",
    ))));
    stage.add_segment(segment);

    let err = RestrictionSetter::new(restriction("R-1")).run(&mut stage).unwrap_err();
    assert!(matches!(err, Error::MissingPremis(ref name) if name == "loose.txt"));

    // Nothing on disk changed, and the suite that did have PREMIS was not touched
    assert_eq!(fs::read(&premis_path).unwrap(), before);
    assert_eq!(files_under(&stage_dir), files_before);
    let first = &stage.segments()[0].materialsuites()[0];
    assert!(first.scratch_dirs().is_empty());
    let record = PremisRecord::from_item(first.root().premis.as_deref().unwrap()).unwrap();
    assert_eq!(record.restrictions().count(), 0);
}

#[test]
fn test_premis_creator_fills_gaps_only() {
    let dir = TempDir::new().unwrap();
    let has_premis = suite_in(dir.path(), "kept.txt", "kept");
    fs::write(dir.path().join("bare.txt"), b"bare").unwrap();
    let bare = MaterialSuite::with_content(Box::new(FileItem::with_name(
        dir.path().join("bare.txt"),
        "bare.txt",
    )));

    let mut segment = Segment::new("seg", 1).unwrap();
    segment.add_materialsuite(has_premis);
    segment.add_materialsuite(bare);
    let mut stage = Stage::new("s1");
    stage.add_segment(segment);
    assert!(!stage.validate());

    let report = PremisCreator::new("tester").run(&mut stage).unwrap();
    assert_eq!(report.processed, 1);
    assert!(stage.validate());

    let suites = stage.segments()[0].materialsuites();
    assert_eq!(suites[0].identifier(), Some("kept"));
    let created = PremisRecord::from_item(suites[1].root().premis.as_deref().unwrap()).unwrap();
    assert_eq!(
        created.first_object().unwrap().original_name.as_deref(),
        Some("bare.txt")
    );
    assert_eq!(suites[1].identifier(), Some(created.object_identifier().unwrap()));

    let root = TempDir::new().unwrap();
    FileSystemStageWriter::new(root.path()).write(&stage).unwrap();
    assert!(root.path().join("s1/admin/seg-1/PREMIS/bare.txt.premis.xml").is_file());
}

#[test]
fn test_prune_dry_run_then_final() {
    let root = TempDir::new().unwrap();
    let stage_dir = ingest(root.path(), &[("keep.txt", "keep"), ("Thumbs.db", "junk")]);
    let pattern = Regex::new(r"(^|/)Thumbs\.db$").unwrap();

    let mut stage = FileSystemStageReader::new(&stage_dir).read().unwrap();
    let mut dry = Pruner::new(pattern.clone(), "tester");
    dry.run(&mut stage).unwrap();
    assert_eq!(dry.outcomes().len(), 1);
    assert!(!dry.outcomes()[0].removed());
    assert!(stage_dir.join("data/accession-1/Thumbs.db").is_file());

    let mut pruner = Pruner::new(pattern, "tester").final_delete(true);
    let report = pruner.run(&mut stage).unwrap();
    assert_eq!(report.processed, 1);
    assert!(pruner.outcomes()[0].removed());
    assert!(!stage_dir.join("data/accession-1/Thumbs.db").exists());
    FileSystemStageWriter::new(root.path()).write(&stage).unwrap();
    drop(stage);

    let reread = FileSystemStageReader::new(&stage_dir).read().unwrap();
    let suites = reread.segments()[0].materialsuites();
    assert_eq!(suites.len(), 2);
    let pruned = suites
        .iter()
        .find(|s| s.root().content.is_none())
        .unwrap();
    let record = PremisRecord::from_item(pruned.root().premis.as_deref().unwrap()).unwrap();
    assert_eq!(record.events_of_type("deletion").count(), 1);
    assert_eq!(
        record.first_object().unwrap().original_name.as_deref(),
        Some("Thumbs.db")
    );
    assert!(
        suites
            .iter()
            .any(|s| s.content_name(SuiteNodeId::ROOT).as_deref() == Some("keep.txt"))
    );
}

#[test]
fn test_premis_creator_over_stage_read_from_disk() {
    let root = TempDir::new().unwrap();
    let stage_dir = ingest(root.path(), &[("a.txt", "alpha")]);
    fs::write(stage_dir.join("data/accession-1/z.txt"), b"no sidecar").unwrap();

    let err = FileSystemStageReader::new(&stage_dir).read().unwrap_err();
    assert!(matches!(err, Error::MissingPremis(_)));

    let mut stage = FileSystemStageReader::new(&stage_dir)
        .allow_missing_premis()
        .read()
        .unwrap();
    assert!(!stage.validate());
    let report = PremisCreator::new("tester").run(&mut stage).unwrap();
    assert_eq!(report.processed, 1);
    FileSystemStageWriter::new(root.path()).write(&stage).unwrap();
    drop(stage);

    let reread = FileSystemStageReader::new(&stage_dir).read().unwrap();
    assert!(reread.validate());
    let created = &reread.segments()[0].materialsuites()[1];
    let record = PremisRecord::from_item(created.root().premis.as_deref().unwrap()).unwrap();
    assert_eq!(record.first_object().unwrap().original_name.as_deref(), Some("z.txt"));
}
