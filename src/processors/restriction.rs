// src/processors/restriction.rs

//! Access restrictions on existing PREMIS

use super::{Processor, ProcessorReport, Scratch, replace_premis, require_premis};
use crate::error::Result;
use crate::premis::{PremisRecord, Restriction};
use crate::structure::MaterialSuite;
use tracing::debug;

/// Appends a restriction to the rights section of every node's PREMIS
///
/// Every node of every suite must already carry PREMIS. That is checked for
/// the whole stage before anything is written.
pub struct RestrictionSetter {
    restriction: Restriction,
}

impl RestrictionSetter {
    pub fn new(restriction: Restriction) -> Self {
        Self { restriction }
    }

    pub fn restriction(&self) -> &Restriction {
        &self.restriction
    }
}

impl Processor for RestrictionSetter {
    fn name(&self) -> &'static str {
        "restrict"
    }

    fn precheck(&self, suite: &MaterialSuite) -> Result<()> {
        require_premis(suite)
    }

    fn process_suite(&mut self, suite: &mut MaterialSuite, report: &mut ProcessorReport) -> Result<()> {
        let mut scratch = Scratch::new();
        for id in suite.walk() {
            let Some(premis) = suite.node(id).premis.as_deref() else {
                report.skipped += 1;
                continue;
            };
            let mut record = PremisRecord::from_item(premis)?;
            record.add_restriction(self.restriction.clone());
            replace_premis(suite, id, &record, &mut scratch)?;
            debug!(
                "Restriction {} set on {}",
                self.restriction.code,
                suite.node(id).describe()
            );
            report.processed += 1;
        }
        scratch.hand_to(suite);
        Ok(())
    }
}
