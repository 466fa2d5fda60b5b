// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use ldrstage::premis::{Identifier, PremisObject, PremisRecord};
use ldrstage::{FileItem, MaterialSuite, Presform, Segment, Stage, SuiteNodeId};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a minimal PREMIS record whose object carries `id`
pub fn write_premis(dir: &Path, id: &str) -> PathBuf {
    let path = dir.join(format!("{}.premis", id));
    PremisRecord::with_object(PremisObject {
        identifiers: vec![Identifier::new("uuid", id)],
        original_name: Some(id.to_string()),
        ..Default::default()
    })
    .write_to_path(&path)
    .unwrap();
    path
}

/// Suite named `name` with content and PREMIS, backed by files in `dir`
pub fn suite_in(dir: &Path, name: &str, id: &str) -> MaterialSuite {
    let content_path = dir.join(format!("{}.src", id));
    fs::write(&content_path, format!("content of {}", name)).unwrap();
    let premis_path = write_premis(dir, id);

    let mut suite = MaterialSuite::with_content(Box::new(FileItem::with_name(content_path, name)));
    suite.root_mut().premis = Some(Box::new(FileItem::new(premis_path)));
    suite.root_mut().set_identifier(id);
    suite
}

/// Suite with one `.pdf` presform below its original
pub fn suite_with_presform(dir: &Path, name: &str, id: &str) -> MaterialSuite {
    let mut suite = suite_in(dir, name, id);
    let presform = suite_in(dir, "ignored", &format!("{}p", id));
    suite
        .attach_presform(SuiteNodeId::ROOT, Presform::new(".pdf", presform))
        .unwrap();
    suite
}

/// Two segments of two suites each, every suite with one presform
///
/// Returns (TempDir, Stage) - keep the TempDir alive, the stage reads from it.
pub fn sample_stage(stage_id: &str) -> (TempDir, Stage) {
    let src = tempfile::tempdir().unwrap();
    let mut stage = Stage::new(stage_id);

    for (label, names) in [("accession", ["a.txt", "b.txt"]), ("born", ["docs/c.txt", "d.txt"])] {
        let mut segment = Segment::new(label, 1).unwrap();
        for (i, name) in names.iter().enumerate() {
            let id = format!("{}{}", label, i);
            segment.add_materialsuite(suite_with_presform(src.path(), name, &id));
        }
        stage.add_segment(segment);
    }

    let note = src.path().join("deed.txt");
    fs::write(&note, b"deed of gift").unwrap();
    stage.add_legalnote(Box::new(FileItem::with_name(note, "deed.txt")));

    (src, stage)
}

/// Names of every regular file under `dir`, relative and sorted
pub fn files_under(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    names.sort();
    names
}
