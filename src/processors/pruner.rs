// src/processors/pruner.rs

//! Removing unwanted content from a stage

use super::{Processor, ProcessorReport, Scratch, node_label, replace_premis};
use crate::error::{Error, Result};
use crate::item::DeleteOutcome;
use crate::premis::{OUTCOME_SUCCESS, PremisAgent, PremisEvent, PremisRecord};
use crate::structure::MaterialSuite;
use regex::Regex;
use tracing::{info, warn};

/// Deletes content whose stage name matches a pattern
///
/// Dry run unless built with [`Pruner::final_delete`]. A real deletion clears
/// the node's content slot and records a `deletion` event in its PREMIS, so
/// the suite survives with provenance but without bytes. Matching nodes must
/// carry PREMIS; that is checked before anything is deleted.
pub struct Pruner {
    pattern: Regex,
    final_delete: bool,
    agent: String,
    outcomes: Vec<DeleteOutcome>,
}

impl Pruner {
    pub fn new(pattern: Regex, agent: impl Into<String>) -> Self {
        Self {
            pattern,
            final_delete: false,
            agent: agent.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn final_delete(mut self, final_delete: bool) -> Self {
        self.final_delete = final_delete;
        self
    }

    /// What happened to each matching item, in walk order
    pub fn outcomes(&self) -> &[DeleteOutcome] {
        &self.outcomes
    }

    fn matches(&self, suite: &MaterialSuite, id: crate::structure::SuiteNodeId) -> bool {
        suite.node(id).content.is_some() && self.pattern.is_match(&node_label(suite, id))
    }
}

impl Processor for Pruner {
    fn name(&self) -> &'static str {
        "prune"
    }

    fn precheck(&self, suite: &MaterialSuite) -> Result<()> {
        for id in suite.walk() {
            if self.matches(suite, id) && suite.node(id).premis.is_none() {
                return Err(Error::MissingPremis(node_label(suite, id)));
            }
        }
        Ok(())
    }

    fn process_suite(&mut self, suite: &mut MaterialSuite, report: &mut ProcessorReport) -> Result<()> {
        let mut scratch = Scratch::new();
        for id in suite.walk() {
            if !self.matches(suite, id) {
                report.skipped += 1;
                continue;
            }
            let name = node_label(suite, id);
            let Some(content) = suite.node(id).content.as_deref() else {
                continue;
            };

            let outcome = content.delete(self.final_delete);
            match &outcome {
                DeleteOutcome::WouldRemove(_) => info!("Dry run: {}", outcome.message()),
                DeleteOutcome::Removed(_) => {
                    let premis = suite
                        .node(id)
                        .premis
                        .as_deref()
                        .ok_or_else(|| Error::MissingPremis(name.clone()))?;
                    let mut record = PremisRecord::from_item(premis)?;
                    let agent = PremisAgent::software(self.agent.clone());
                    let mut event = PremisEvent::new("deletion", OUTCOME_SUCCESS)
                        .with_detail(format!("Pruned {} matching {}", name, self.pattern.as_str()));
                    event.link_agent(&agent.identifier, Some("executing program"));
                    record.add_event(event);
                    record.add_agent(agent);

                    suite.node_mut(id).content = None;
                    replace_premis(suite, id, &record, &mut scratch)?;
                    info!("{}", outcome.message());
                    report.processed += 1;
                }
                DeleteOutcome::Failed { .. } => {
                    warn!("{}", outcome.message());
                    report.failed += 1;
                }
            }
            self.outcomes.push(outcome);
        }
        scratch.hand_to(suite);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FileItem;
    use crate::premis::{Identifier, PremisObject};
    use crate::structure::{Segment, Stage};
    use std::fs;
    use tempfile::TempDir;

    fn stage_with(dir: &TempDir, names: &[&str]) -> Stage {
        let mut segment = Segment::new("seg", 1).unwrap();
        for (i, name) in names.iter().enumerate() {
            let content = dir.path().join(name);
            fs::write(&content, name.as_bytes()).unwrap();
            let premis = dir.path().join(format!("{}.premis.xml", i));
            let mut object = PremisObject {
                identifiers: vec![Identifier::new("uuid", format!("id{}", i))],
                ..Default::default()
            };
            object.original_name = Some(name.to_string());
            PremisRecord::with_object(object).write_to_path(&premis).unwrap();

            let mut suite = MaterialSuite::with_content(Box::new(FileItem::with_name(content, *name)));
            suite.root_mut().premis = Some(Box::new(FileItem::new(premis)));
            segment.add_materialsuite(suite);
        }
        let mut stage = Stage::new("s1");
        stage.add_segment(segment);
        stage
    }

    #[test]
    fn test_dry_run_removes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut stage = stage_with(&temp_dir, &["keep.txt", "Thumbs.db"]);

        let mut pruner = Pruner::new(Regex::new(r"(^|/)Thumbs\.db$").unwrap(), "test");
        let report = pruner.run(&mut stage).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(pruner.outcomes(), &[DeleteOutcome::WouldRemove("Thumbs.db".to_string())]);
        assert!(temp_dir.path().join("Thumbs.db").exists());
        assert!(stage.segments()[0].materialsuites()[1].root().content.is_some());
    }

    #[test]
    fn test_final_delete_records_event() {
        let temp_dir = TempDir::new().unwrap();
        let mut stage = stage_with(&temp_dir, &["keep.txt", "Thumbs.db"]);

        let mut pruner =
            Pruner::new(Regex::new(r"Thumbs\.db$").unwrap(), "test").final_delete(true);
        let report = pruner.run(&mut stage).unwrap();
        assert_eq!(report.processed, 1);
        assert!(!temp_dir.path().join("Thumbs.db").exists());
        assert!(temp_dir.path().join("keep.txt").exists());

        let suite = &stage.segments()[0].materialsuites()[1];
        assert!(suite.root().content.is_none());
        let record = PremisRecord::from_item(suite.root().premis.as_deref().unwrap()).unwrap();
        let deletion: Vec<_> = record.events_of_type("deletion").collect();
        assert_eq!(deletion.len(), 1);
        assert_eq!(deletion[0].outcome(), Some(OUTCOME_SUCCESS));
        assert_eq!(suite.identifier(), Some("id1"));
    }
}
