// src/processors/premis_creator.rs

//! Fresh PREMIS for nodes that arrived with content only

use super::{Processor, ProcessorReport, Scratch, node_label, replace_premis};
use crate::error::Result;
use crate::premis::{describe_item, new_object_record};
use crate::structure::MaterialSuite;
use tracing::debug;

/// Gives every node that has content but no PREMIS a new record
///
/// Nodes that already carry PREMIS are left alone, so running the creator
/// twice changes nothing the second time.
pub struct PremisCreator {
    originator: String,
}

impl PremisCreator {
    /// `originator` is recorded as the fixity originator
    pub fn new(originator: impl Into<String>) -> Self {
        Self {
            originator: originator.into(),
        }
    }
}

impl Processor for PremisCreator {
    fn name(&self) -> &'static str {
        "premis"
    }

    fn process_suite(&mut self, suite: &mut MaterialSuite, report: &mut ProcessorReport) -> Result<()> {
        let mut scratch = Scratch::new();
        for id in suite.walk() {
            let node = suite.node(id);
            let Some(content) = node.content.as_deref().filter(|_| node.premis.is_none()) else {
                report.skipped += 1;
                continue;
            };

            let name = node_label(suite, id);
            let description = describe_item(content, &name)?;
            let record = new_object_record(&description, &self.originator);
            replace_premis(suite, id, &record, &mut scratch)?;

            debug!("Created PREMIS {} for {}", description.identifier, name);
            report.processed += 1;
        }
        scratch.hand_to(suite);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FileItem;
    use crate::premis::PremisRecord;
    use crate::structure::{Segment, Stage, SuiteNodeId};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_creates_records_for_every_node() {
        let temp_dir = TempDir::new().unwrap();
        let original = temp_dir.path().join("foo.txt");
        let derived = temp_dir.path().join("foo.pdf");
        fs::write(&original, b"hello world").unwrap();
        fs::write(&derived, b"%PDF-1.4 derived").unwrap();

        let mut suite = MaterialSuite::with_content(Box::new(FileItem::with_name(&original, "foo.txt")));
        let pdf = suite.add_presform_node(SuiteNodeId::ROOT, ".pdf").unwrap();
        suite.node_mut(pdf).content = Some(Box::new(FileItem::new(&derived)));

        let mut segment = Segment::new("seg", 1).unwrap();
        segment.add_materialsuite(suite);
        let mut stage = Stage::new("s1");
        stage.add_segment(segment);

        let report = PremisCreator::new("test").run(&mut stage).unwrap();
        assert_eq!(report.processed, 2);

        let suite = &stage.segments()[0].materialsuites()[0];
        assert!(!suite.scratch_dirs().is_empty());
        let record = PremisRecord::from_item(suite.root().premis.as_deref().unwrap()).unwrap();
        let object = record.first_object().unwrap();
        assert_eq!(object.original_name.as_deref(), Some("foo.txt"));
        assert_eq!(object.characteristics[0].size, Some(11));
        assert_eq!(object.characteristics[0].fixity.len(), 2);
        assert_eq!(suite.identifier(), Some(record.object_identifier().unwrap()));

        let presform = PremisRecord::from_item(suite.node(pdf).premis.as_deref().unwrap()).unwrap();
        let formats = &presform.first_object().unwrap().characteristics[0].formats;
        assert!(formats.iter().any(|f| f.name == "application/pdf"));

        let again = PremisCreator::new("test").run(&mut stage).unwrap();
        assert_eq!(again.processed, 0);
        assert_eq!(again.skipped, 2);
    }
}
