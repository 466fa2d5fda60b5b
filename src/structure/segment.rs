// src/structure/segment.rs

//! Segment: one labelled, numbered ingest batch

use super::{MaterialSuite, Structure, list_accessors};
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+$").unwrap());

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)-(\d+)$").unwrap());

/// An ordered group of material suites from one ingest batch
///
/// The label and run are checked when the segment is built, so an existing
/// `Segment` always has an identifier of the form `label-run`.
#[derive(Debug)]
pub struct Segment {
    label: String,
    run: u32,
    materialsuites: Vec<MaterialSuite>,
}

impl Segment {
    /// New empty segment
    ///
    /// Fails if the label is empty, contains `-`, or is not a single word,
    /// or if `run` is zero.
    pub fn new(label: impl Into<String>, run: u32) -> Result<Self> {
        let label = label.into();
        if label.contains('-') {
            return Err(Error::InvalidSegment(format!(
                "label {:?} must not contain '-'",
                label
            )));
        }
        if !LABEL_RE.is_match(&label) {
            return Err(Error::InvalidSegment(format!(
                "label {:?} must be a non-empty word",
                label
            )));
        }
        if run == 0 {
            return Err(Error::InvalidSegment(format!(
                "run for {} must be a positive integer",
                label
            )));
        }

        Ok(Self {
            label,
            run,
            materialsuites: Vec::new(),
        })
    }

    /// Rebuild an empty segment from an identifier such as `accession-2`
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        let caps = IDENTIFIER_RE.captures(identifier).ok_or_else(|| {
            Error::InvalidSegment(format!("{:?} is not of the form label-run", identifier))
        })?;
        let run = caps[2].parse::<u32>().map_err(|e| {
            Error::InvalidSegment(format!("run in {:?}: {}", identifier, e))
        })?;
        Self::new(&caps[1], run)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn run(&self) -> u32 {
        self.run
    }

    /// `label-run`
    pub fn identifier(&self) -> String {
        format!("{}-{}", self.label, self.run)
    }

    list_accessors!(
        materialsuites: MaterialSuite,
        set_materialsuites,
        add_materialsuite,
        get_materialsuite,
        get_materialsuite_mut,
        pop_materialsuite
    );

    pub fn materialsuites_mut(&mut self) -> &mut [MaterialSuite] {
        &mut self.materialsuites
    }
}

impl Structure for Segment {
    fn required_parts(&self) -> &'static [&'static str] {
        &["label", "run"]
    }

    fn missing_parts(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.label.is_empty() {
            missing.push("label".to_string());
        }
        if self.run == 0 {
            missing.push("run".to_string());
        }
        missing
    }

    fn problems(&self) -> Vec<String> {
        let identifier = self.identifier();
        let mut problems = self.missing_parts();
        if !IDENTIFIER_RE.is_match(&identifier) {
            problems.push(format!("segment identifier {:?} is malformed", identifier));
        }
        for suite in &self.materialsuites {
            problems.extend(
                suite
                    .problems()
                    .into_iter()
                    .map(|p| format!("{}: {}", identifier, p)),
            );
        }
        problems
    }
}
