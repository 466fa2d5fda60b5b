// src/structure/stage.rs

//! Stage: the top-level aggregate of an ingest

use super::{Segment, Structure, list_accessors};
use crate::item::Item;
use crate::path::check_component;
use std::collections::HashSet;

/// A staged ingest: segments plus free-form supporting documents
#[derive(Debug)]
pub struct Stage {
    identifier: String,
    segments: Vec<Segment>,
    accessionrecords: Vec<Box<dyn Item>>,
    adminnotes: Vec<Box<dyn Item>>,
    legalnotes: Vec<Box<dyn Item>>,
}

impl Stage {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            segments: Vec::new(),
            accessionrecords: Vec::new(),
            adminnotes: Vec::new(),
            legalnotes: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    list_accessors!(
        segments: Segment,
        set_segments,
        add_segment,
        get_segment,
        get_segment_mut,
        pop_segment
    );

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    list_accessors!(
        accessionrecords: Box<dyn Item>,
        set_accessionrecords,
        add_accessionrecord,
        get_accessionrecord,
        get_accessionrecord_mut,
        pop_accessionrecord
    );

    list_accessors!(
        adminnotes: Box<dyn Item>,
        set_adminnotes,
        add_adminnote,
        get_adminnote,
        get_adminnote_mut,
        pop_adminnote
    );

    list_accessors!(
        legalnotes: Box<dyn Item>,
        set_legalnotes,
        add_legalnote,
        get_legalnote,
        get_legalnote_mut,
        pop_legalnote
    );

    /// Segment by identifier
    pub fn find_segment(&self, identifier: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.identifier() == identifier)
    }

    /// Total number of material suites across all segments
    pub fn suite_count(&self) -> usize {
        self.segments.iter().map(|s| s.materialsuites().len()).sum()
    }
}

impl Structure for Stage {
    fn required_parts(&self) -> &'static [&'static str] {
        &["identifier"]
    }

    fn missing_parts(&self) -> Vec<String> {
        if self.identifier.is_empty() {
            vec!["identifier".to_string()]
        } else {
            Vec::new()
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = self.missing_parts();
        if !self.identifier.is_empty()
            && let Err(e) = check_component(&self.identifier)
        {
            problems.push(format!("stage identifier: {}", e));
        }

        let mut seen = HashSet::new();
        for segment in &self.segments {
            let identifier = segment.identifier();
            if !seen.insert(identifier.clone()) {
                problems.push(format!("duplicate segment {}", identifier));
            }
            problems.extend(segment.problems());
        }
        problems
    }
}
