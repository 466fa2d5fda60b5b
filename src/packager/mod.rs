// src/packager/mod.rs

//! Packagers: the "read" half
//!
//! A [`MaterialSuitePackager`] pulls the parts of one material suite out of
//! some origin (an external file, an on-disk stage, an archive). Each hook
//! has a default that reports [`Error::HookUnsupported`], so an origin only
//! implements what it can actually provide. [`assemble`] composes the hooks
//! into a [`MaterialSuite`]:
//!
//! 1. PREMIS is required; nothing (or an unsupported hook) is
//!    [`Error::MissingPremis`]. Under [`PremisPolicy::Optional`] a node
//!    without PREMIS is kept with `premis` unset and no identifier
//! 2. the suite's identifier is the first object identifier in that record
//! 3. content, technical metadata and presforms are attached when the hooks
//!    provide them; unsupported hooks mean "nothing of this kind"
//! 4. presforms are assembled by their own packagers and grafted into the
//!    suite's arena

mod archive;
mod external;
mod filesystem;

pub use archive::{ArchiveReader, archived_stages};
pub use external::{DEFAULT_AGENT, ExternalFilePackager, package_directory};
pub use filesystem::FileSystemStageReader;

use crate::error::{Error, Result};
use crate::item::Item;
use crate::premis::PremisRecord;
use crate::structure::{MAX_PRESFORM_DEPTH, MaterialSuite, Presform, SuiteNodeId};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::debug;

/// A presform still to be assembled
pub struct PresformPackager {
    pub extension: String,
    pub packager: Box<dyn MaterialSuitePackager>,
}

/// Source of one material suite's parts
pub trait MaterialSuitePackager {
    /// Where the parts come from, for messages
    fn origin(&self) -> String;

    /// The PREMIS record item. Required by [`assemble`].
    fn get_premis(&mut self) -> Result<Option<Box<dyn Item>>> {
        Err(unsupported("get_premis", self.origin()))
    }

    fn get_content(&mut self) -> Result<Option<Box<dyn Item>>> {
        Err(unsupported("get_content", self.origin()))
    }

    fn get_techmd_list(&mut self) -> Result<Vec<Box<dyn Item>>> {
        Err(unsupported("get_techmd_list", self.origin()))
    }

    fn get_presform_list(&mut self) -> Result<Vec<PresformPackager>> {
        Err(unsupported("get_presform_list", self.origin()))
    }

    /// Scratch directories the assembled suite must keep alive
    fn take_scratch(&mut self) -> Vec<Arc<TempDir>> {
        Vec::new()
    }
}

fn unsupported(hook: &'static str, origin: String) -> Error {
    Error::HookUnsupported { hook, origin }
}

/// Treat an unsupported hook as "nothing to attach"
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::HookUnsupported { hook, origin }) => {
            debug!("{} not applicable for {}, skipping", hook, origin);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// What [`assemble_with`] does with a node that has no PREMIS record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PremisPolicy {
    /// Fail with [`Error::MissingPremis`]
    #[default]
    Required,
    /// Keep the node without PREMIS, for stages that still need records created
    Optional,
}

/// Build a material suite from a packager's hooks
pub fn assemble(packager: &mut dyn MaterialSuitePackager) -> Result<MaterialSuite> {
    assemble_with(packager, PremisPolicy::Required)
}

/// [`assemble`] with an explicit policy for missing PREMIS
pub fn assemble_with(packager: &mut dyn MaterialSuitePackager, policy: PremisPolicy) -> Result<MaterialSuite> {
    assemble_at(packager, 0, policy)
}

fn assemble_at(
    packager: &mut dyn MaterialSuitePackager,
    depth: usize,
    policy: PremisPolicy,
) -> Result<MaterialSuite> {
    if depth > MAX_PRESFORM_DEPTH {
        return Err(Error::PresformDepth(MAX_PRESFORM_DEPTH));
    }
    let origin = packager.origin();

    let premis = match (optional(packager.get_premis())?.flatten(), policy) {
        (Some(premis), _) => Some(premis),
        (None, PremisPolicy::Optional) => {
            debug!("{} has no PREMIS yet", origin);
            None
        }
        (None, PremisPolicy::Required) => return Err(Error::MissingPremis(origin)),
    };
    let identifier = match &premis {
        Some(premis) => Some(
            PremisRecord::from_item(premis.as_ref())?
                .object_identifier()?
                .to_string(),
        ),
        None => None,
    };

    let mut suite = MaterialSuite::new();
    {
        let root = suite.root_mut();
        root.premis = premis;
        if let Some(identifier) = identifier {
            root.set_identifier(identifier);
        }
        root.content = optional(packager.get_content())?.flatten();
        root.technicalmetadata = optional(packager.get_techmd_list())?.unwrap_or_default();
    }

    for presform in optional(packager.get_presform_list())?.unwrap_or_default() {
        let PresformPackager {
            extension,
            mut packager,
        } = presform;
        let derived = assemble_at(packager.as_mut(), depth + 1, policy)?;
        suite.attach_presform(SuiteNodeId::ROOT, Presform::new(extension, derived))?;
    }

    for dir in packager.take_scratch() {
        suite.hold_scratch(dir);
    }

    debug!(
        "Assembled {} from {} ({} nodes)",
        suite.identifier().unwrap_or_default(),
        origin,
        suite.len()
    );
    Ok(suite)
}
