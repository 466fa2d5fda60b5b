// src/processors/techmd.rs

//! Technical metadata through FITS

use super::{
    Processor, ProcessorReport, Scratch, local_copy, node_label, replace_premis, require_premis,
};
use crate::error::Result;
use crate::item::FileItem;
use crate::premis::{OUTCOME_FAILURE, OUTCOME_SUCCESS, PremisAgent, PremisEvent, PremisRecord};
use crate::structure::MaterialSuite;
use crate::tool::{CommandOutcome, CommandTemplate};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

const EVENT_TYPE: &str = "metadata extraction";

/// Runs FITS (or a stand-in) over every node's content
///
/// The template sees `{input}` (a local copy of the content) and `{output}`
/// (where the XML should go). On success the output becomes the node's only
/// technical metadata record. A failure or timeout is recorded as a failed
/// event and the run moves on. Every node must carry PREMIS.
pub struct TechmdCreator {
    template: CommandTemplate,
    agent: String,
}

impl TechmdCreator {
    pub fn new(template: CommandTemplate) -> Self {
        let agent = Path::new(&template.program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| template.program.clone());
        Self { template, agent }
    }
}

impl Processor for TechmdCreator {
    fn name(&self) -> &'static str {
        "techmd"
    }

    fn precheck(&self, suite: &MaterialSuite) -> Result<()> {
        require_premis(suite)
    }

    fn process_suite(&mut self, suite: &mut MaterialSuite, report: &mut ProcessorReport) -> Result<()> {
        let mut scratch = Scratch::new();
        for id in suite.walk() {
            let name = node_label(suite, id);
            let node = suite.node(id);
            let (Some(content), Some(premis)) = (node.content.as_deref(), node.premis.as_deref())
            else {
                report.skipped += 1;
                continue;
            };

            let input = local_copy(content, &mut scratch)?;
            let output = scratch.path("fits.xml")?;
            let values = HashMap::from([
                ("input", input.to_string_lossy().into_owned()),
                ("output", output.to_string_lossy().into_owned()),
            ]);
            let produced = self
                .template
                .render_output(&values)
                .map(std::path::PathBuf::from)
                .unwrap_or(output);
            let outcome = self.template.render(&values).run()?;

            let mut record = PremisRecord::from_item(premis)?;
            let agent = PremisAgent::software(self.agent.clone());
            let succeeded = outcome.succeeded() && produced.is_file();
            let mut event = if succeeded {
                PremisEvent::new(EVENT_TYPE, OUTCOME_SUCCESS)
            } else {
                let note = match &outcome {
                    CommandOutcome::Completed { success: true, .. } => {
                        "completed without producing output".to_string()
                    }
                    other => other.summary(),
                };
                PremisEvent::new(EVENT_TYPE, OUTCOME_FAILURE).with_outcome_note(note)
            }
            .with_detail(format!("Technical metadata for {} by {}", name, self.agent));
            event.link_agent(&agent.identifier, Some("executing program"));
            record.add_event(event);
            record.add_agent(agent);

            if succeeded {
                suite.node_mut(id).technicalmetadata = vec![Box::new(FileItem::with_name(
                    produced,
                    format!("{}.fits.xml", name),
                ))];
                debug!("Technical metadata attached to {}", name);
                report.processed += 1;
            } else {
                warn!("{} on {}: {}", self.agent, name, outcome.summary());
                report.failed += 1;
            }
            replace_premis(suite, id, &record, &mut scratch)?;
        }
        scratch.hand_to(suite);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::premis::{Identifier, PremisObject};
    use crate::structure::{Segment, Stage};
    use std::fs;
    use tempfile::TempDir;

    fn stage(dir: &TempDir) -> Stage {
        let content = dir.path().join("a.txt");
        fs::write(&content, b"some text").unwrap();
        let premis = dir.path().join("a.premis.xml");
        PremisRecord::with_object(PremisObject {
            identifiers: vec![Identifier::new("uuid", "a1")],
            ..Default::default()
        })
        .write_to_path(&premis)
        .unwrap();
        let mut suite = MaterialSuite::with_content(Box::new(FileItem::with_name(content, "a.txt")));
        suite.root_mut().premis = Some(Box::new(FileItem::new(premis)));
        let mut segment = Segment::new("seg", 1).unwrap();
        segment.add_materialsuite(suite);
        let mut stage = Stage::new("s1");
        stage.add_segment(segment);
        stage
    }

    fn events(stage: &Stage) -> Vec<PremisEvent> {
        let suite = &stage.segments()[0].materialsuites()[0];
        PremisRecord::from_item(suite.root().premis.as_deref().unwrap())
            .unwrap()
            .events_of_type(EVENT_TYPE)
            .cloned()
            .collect()
    }

    #[test]
    fn test_success_attaches_techmd() {
        let temp_dir = TempDir::new().unwrap();
        let mut stage = stage(&temp_dir);
        let template = CommandTemplate::new(
            "sh",
            &["-c", "printf '<fits><filepath>%s</filepath></fits>' \"$0\" > \"$1\"", "{input}", "{output}"],
        );

        let report = TechmdCreator::new(template).run(&mut stage).unwrap();
        assert_eq!(report.processed, 1);

        let suite = &stage.segments()[0].materialsuites()[0];
        assert_eq!(suite.root().technicalmetadata.len(), 1);
        assert_eq!(suite.root().technicalmetadata[0].name(), "a.txt.fits.xml");
        let xml = suite.root().technicalmetadata[0].read_all().unwrap();
        assert!(String::from_utf8(xml).unwrap().contains("a.txt</filepath>"));
        assert_eq!(events(&stage)[0].outcome(), Some(OUTCOME_SUCCESS));
    }

    #[test]
    fn test_failure_is_recorded_not_raised() {
        let temp_dir = TempDir::new().unwrap();
        let mut stage = stage(&temp_dir);
        let template = CommandTemplate::new("sh", &["-c", "echo broken >&2; exit 2"]);

        let report = TechmdCreator::new(template).run(&mut stage).unwrap();
        assert_eq!(report.failed, 1);
        let events = events(&stage);
        assert_eq!(events[0].outcome(), Some(OUTCOME_FAILURE));
        assert_eq!(
            events[0].outcomes[0].detail_note.as_deref(),
            Some("failed with exit code 2: broken")
        );
        assert!(stage.segments()[0].materialsuites()[0].root().technicalmetadata.is_empty());
    }

    #[test]
    fn test_requires_premis() {
        let mut segment = Segment::new("seg", 1).unwrap();
        segment.add_materialsuite(MaterialSuite::with_content(Box::new(FileItem::new("/x/a.txt"))));
        let mut stage = Stage::new("s1");
        stage.add_segment(segment);

        let err = TechmdCreator::new(CommandTemplate::new("true", &[]))
            .run(&mut stage)
            .unwrap_err();
        assert!(matches!(err, Error::MissingPremis(_)));
    }
}
