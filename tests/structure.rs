// tests/structure.rs

//! Stage, segment and material suite validation.

mod common;

use common::{sample_stage, suite_in, suite_with_presform};
use ldrstage::{Error, FileItem, MaterialSuite, Presform, Segment, Stage, Structure, SuiteNodeId};
use tempfile::TempDir;

#[test]
fn test_segment_label_with_dash_fails() {
    let err = Segment::new("a-b", 1).unwrap_err();
    assert!(matches!(err, Error::InvalidSegment(_)));
}

#[test]
fn test_sample_stage_validates() {
    let (_src, stage) = sample_stage("stage1");
    assert!(stage.validate(), "{:?}", stage.problems());
    assert_eq!(stage.suite_count(), 4);
    assert_eq!(stage.legalnotes().len(), 1);
}

#[test]
fn test_suite_without_premis_is_invalid() {
    let suite = MaterialSuite::with_content(Box::new(FileItem::new("/nowhere/a.txt")));
    assert!(!suite.validate());

    let mut segment = Segment::new("seg", 1).unwrap();
    segment.add_materialsuite(suite);
    let mut stage = Stage::new("stage1");
    stage.add_segment(segment);

    let problems = stage.problems();
    assert_eq!(problems.len(), 1);
    assert!(problems[0].starts_with("seg-1: "));
    assert!(problems[0].contains("premis"));
}

#[test]
fn test_presform_without_premis_invalidates_suite() {
    let dir = TempDir::new().unwrap();
    let mut suite = suite_in(dir.path(), "a.txt", "id1");
    suite.add_presform_node(SuiteNodeId::ROOT, ".pdf").unwrap();
    assert!(!suite.validate());
}

#[test]
fn test_presform_names_chain_from_original() {
    let dir = TempDir::new().unwrap();
    let mut suite = suite_with_presform(dir.path(), "foo.txt", "id1");
    let pdf = suite.get_presform(SuiteNodeId::ROOT, 0).unwrap();
    assert_eq!(suite.content_name(pdf).unwrap(), "foo.txt.presform.pdf");

    let png = suite.add_presform_node(pdf, ".png").unwrap();
    assert_eq!(suite.content_name(png).unwrap(), "foo.txt.presform.pdf.presform.png");

    let bare = suite.add_presform_node(SuiteNodeId::ROOT, "").unwrap();
    assert_eq!(suite.content_name(bare).unwrap(), "foo.txt.presform");
}

#[test]
fn test_presform_extension_rules() {
    let mut suite = MaterialSuite::new();
    for bad in ["pdf", ".tar.gz", "./x", ".", ".a/b"] {
        assert!(
            suite.add_presform_node(SuiteNodeId::ROOT, bad).is_err(),
            "{:?} should be rejected",
            bad
        );
    }
    assert!(suite.add_presform_node(SuiteNodeId::ROOT, ".pdf").is_ok());
}

#[test]
fn test_presform_chain_depth_is_bounded() {
    let mut suite = MaterialSuite::new();
    let mut parent = SuiteNodeId::ROOT;
    for _ in 0..ldrstage::structure::MAX_PRESFORM_DEPTH {
        parent = suite.add_presform_node(parent, ".x").unwrap();
    }
    let err = suite.add_presform_node(parent, ".x").unwrap_err();
    assert!(matches!(err, Error::PresformDepth(_)));
    assert_eq!(suite.walk().len(), ldrstage::structure::MAX_PRESFORM_DEPTH + 1);
}

#[test]
fn test_pop_presform_detaches_subtree() {
    let dir = TempDir::new().unwrap();
    let mut suite = suite_with_presform(dir.path(), "foo.txt", "id1");
    let pdf = suite.get_presform(SuiteNodeId::ROOT, 0).unwrap();
    suite.add_presform_node(pdf, ".png").unwrap();
    assert_eq!(suite.len(), 3);

    let popped = suite.pop_presform(SuiteNodeId::ROOT, 0).unwrap();
    assert_eq!(popped.extension, ".pdf");
    assert_eq!(popped.suite.len(), 2);
    assert_eq!(suite.len(), 1);
    assert!(suite.presforms(SuiteNodeId::ROOT).is_empty());

    suite
        .set_presforms(SuiteNodeId::ROOT, vec![popped, Presform::new(".txt", MaterialSuite::new())])
        .unwrap();
    let extensions: Vec<_> = suite
        .presforms(SuiteNodeId::ROOT)
        .iter()
        .map(|id| suite.node(*id).extension().unwrap().to_string())
        .collect();
    assert_eq!(extensions, vec![".pdf", ".txt"]);
}

#[test]
fn test_duplicate_segment_identifiers_invalid() {
    let mut stage = Stage::new("stage1");
    stage.add_segment(Segment::new("seg", 1).unwrap());
    stage.add_segment(Segment::new("seg", 2).unwrap());
    assert!(stage.validate());

    stage.add_segment(Segment::new("seg", 1).unwrap());
    assert!(!stage.validate());
}
