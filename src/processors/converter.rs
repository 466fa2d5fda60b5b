// src/processors/converter.rs

//! Format conversion into new presforms

use super::{Processor, ProcessorReport, Scratch, local_copy, node_label, replace_premis};
use crate::error::{Error, Result};
use crate::item::FileItem;
use crate::premis::{
    IDENTIFIER_TYPE, Identifier, OUTCOME_FAILURE, OUTCOME_SUCCESS, PremisAgent, PremisEvent,
    PremisRecord, describe_item, new_object_record,
};
use crate::structure::{MaterialSuite, SuiteNodeId};
use crate::tool::{CommandOutcome, CommandTemplate};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const EVENT_TYPE: &str = "derivation";

/// Runs a configured conversion over every original and attaches the result
/// as a presform
///
/// Placeholders: `{input}`, `{output}`, `{outdir}` and `{stem}`. Originals
/// that already have a presform with the converter's extension are skipped.
/// A successful conversion adds a presform with its own fresh PREMIS and
/// records a `derivation` event on both sides; a failed one records a failed
/// event on the original and the run carries on.
pub struct Converter {
    name: String,
    template: CommandTemplate,
    extension: String,
    agent: String,
}

impl Converter {
    /// Fails unless the template names the presform extension it produces
    pub fn new(name: impl Into<String>, template: CommandTemplate, agent: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let extension = template.extension.clone().ok_or_else(|| {
            Error::Config(format!("converter {} has no presform extension", name))
        })?;
        Ok(Self {
            name,
            template,
            extension,
            agent: agent.into(),
        })
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn already_converted(&self, suite: &MaterialSuite) -> bool {
        suite
            .presforms(SuiteNodeId::ROOT)
            .iter()
            .any(|id| suite.node(*id).extension() == Some(self.extension.as_str()))
    }

    /// Run the tool; the produced file on success
    fn convert(&self, input: &Path, stem: &str, scratch: &mut Scratch) -> Result<(CommandOutcome, Option<PathBuf>)> {
        let outdir = scratch.path(&self.name)?;
        fs::create_dir_all(&outdir)?;
        let output = outdir.join(format!("{}{}", stem, self.extension));
        let values = HashMap::from([
            ("input", input.to_string_lossy().into_owned()),
            ("output", output.to_string_lossy().into_owned()),
            ("outdir", outdir.to_string_lossy().into_owned()),
            ("stem", stem.to_string()),
        ]);
        let produced = self
            .template
            .render_output(&values)
            .map(PathBuf::from)
            .unwrap_or(output);
        let outcome = self.template.render(&values).run()?;
        let produced = (outcome.succeeded() && produced.is_file()).then_some(produced);
        Ok((outcome, produced))
    }
}

impl Processor for Converter {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn precheck(&self, suite: &MaterialSuite) -> Result<()> {
        let root = suite.root();
        if root.content.is_some() && root.premis.is_none() {
            return Err(Error::MissingPremis(node_label(suite, SuiteNodeId::ROOT)));
        }
        Ok(())
    }

    fn process_suite(&mut self, suite: &mut MaterialSuite, report: &mut ProcessorReport) -> Result<()> {
        let root = SuiteNodeId::ROOT;
        let name = node_label(suite, root);
        let (Some(content), Some(premis)) = (
            suite.root().content.as_deref(),
            suite.root().premis.as_deref(),
        ) else {
            report.skipped += 1;
            return Ok(());
        };
        if self.already_converted(suite) {
            debug!("{} already has a {} presform", name, self.extension);
            report.skipped += 1;
            return Ok(());
        }

        let mut scratch = Scratch::new();
        let stem = Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "content".to_string());
        let input = local_copy(content, &mut scratch)?;
        let (outcome, produced) = self.convert(&input, &stem, &mut scratch)?;

        let mut original = PremisRecord::from_item(premis)?;
        let original_id = original.object_identifier()?.to_string();
        let agent = PremisAgent::software(self.agent.clone());

        match produced {
            Some(path) => {
                let presform_name = format!("{}.presform{}", name, self.extension);
                let item = FileItem::with_name(path, presform_name.clone());
                let description = describe_item(&item, &presform_name)?;

                let mut derived = new_object_record(&description, &self.agent);
                let mut event = PremisEvent::new(EVENT_TYPE, OUTCOME_SUCCESS)
                    .with_detail(format!("Derived from {} by {}", original_id, self.name));
                event.link_agent(&agent.identifier, Some("executing program"));
                event.link_object(&Identifier::new(IDENTIFIER_TYPE, original_id.clone()));
                derived.add_event(event);
                derived.add_agent(agent.clone());

                let mut event = PremisEvent::new(EVENT_TYPE, OUTCOME_SUCCESS)
                    .with_detail(format!("Converted to {} as {}", self.extension, description.identifier));
                event.link_agent(&agent.identifier, Some("executing program"));
                original.add_event(event);
                original.add_agent(agent);

                let id = suite.add_presform_node(root, self.extension.clone())?;
                suite.node_mut(id).content = Some(Box::new(item));
                replace_premis(suite, id, &derived, &mut scratch)?;
                info!("Converted {} to {}", name, presform_name);
                report.processed += 1;
            }
            None => {
                let note = match &outcome {
                    CommandOutcome::Completed { success: true, .. } => {
                        "completed without producing output".to_string()
                    }
                    other => other.summary(),
                };
                warn!("{} failed on {}: {}", self.name, name, note);
                let mut event = PremisEvent::new(EVENT_TYPE, OUTCOME_FAILURE)
                    .with_detail(format!("Conversion to {} by {}", self.extension, self.name))
                    .with_outcome_note(note);
                event.link_agent(&agent.identifier, Some("executing program"));
                original.add_event(event);
                original.add_agent(agent);
                report.failed += 1;
            }
        }

        replace_premis(suite, root, &original, &mut scratch)?;
        scratch.hand_to(suite);
        Ok(())
    }
}
