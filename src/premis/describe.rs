// src/premis/describe.rs

//! Building fresh PREMIS records from content
//!
//! Shared by the external packager (which synthesizes a record for files
//! that arrive without provenance) and the PREMIS creator processor.

use super::{
    Fixity, Format, Identifier, ObjectCharacteristics, OUTCOME_SUCCESS, PremisAgent, PremisEvent,
    PremisObject, PremisRecord, Storage,
};
use crate::error::Result;
use crate::hash::{self, HashAlgorithm};
use crate::item::{Item, OpenMode};
use crate::mimetype;

/// Note recorded next to the extension-derived format
const NOTE_BY_EXTENSION: &str = "mimetype guessed from file extension";

/// Note recorded next to the magic-number-derived format
const NOTE_BY_MAGIC: &str = "mimetype detected from magic number";

/// Mint a new object/event/agent identifier
///
/// Simple (hyphenless) UUID v4, which keeps pairtree paths tidy.
pub fn mint_identifier() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Everything a fresh PREMIS object says about a piece of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescription {
    pub identifier: String,
    pub original_name: String,
    pub content_location: Option<String>,
    pub size: u64,
    pub md5: String,
    pub sha256: String,
    pub mimetype_by_extension: Option<String>,
    pub mimetype_by_magic: String,
}

impl ContentDescription {
    /// PREMIS object for this description
    pub fn to_object(&self, originator: &str) -> PremisObject {
        let fixity = [
            (HashAlgorithm::Md5, &self.md5),
            (HashAlgorithm::Sha256, &self.sha256),
        ]
        .into_iter()
        .map(|(algorithm, digest)| Fixity {
            algorithm: algorithm.premis_name().to_string(),
            digest: digest.clone(),
            originator: Some(originator.to_string()),
        })
        .collect();

        let mut formats = Vec::new();
        if let Some(mimetype) = &self.mimetype_by_extension {
            formats.push(Format {
                name: mimetype.clone(),
                note: Some(NOTE_BY_EXTENSION.to_string()),
            });
        }
        formats.push(Format {
            name: self.mimetype_by_magic.clone(),
            note: Some(NOTE_BY_MAGIC.to_string()),
        });

        PremisObject {
            identifiers: vec![Identifier::new(super::IDENTIFIER_TYPE, self.identifier.clone())],
            characteristics: vec![ObjectCharacteristics {
                composition_level: 0,
                fixity,
                size: Some(self.size),
                formats,
            }],
            original_name: Some(self.original_name.clone()),
            storage: self
                .content_location
                .iter()
                .map(|location| Storage {
                    location_type: super::LOCATION_TYPE_FILE.to_string(),
                    location_value: location.clone(),
                })
                .collect(),
            linking_event_identifiers: Vec::new(),
        }
    }
}

/// Describe an item's content under a freshly minted identifier
///
/// Streams the content once for both digests and the size.
pub fn describe_item(item: &dyn Item, original_name: &str) -> Result<ContentDescription> {
    let mut handle = item.open(OpenMode::Read)?;
    let mut counting = CountingReader {
        inner: &mut handle,
        count: 0,
    };
    let digests =
        hash::hash_reader_multi(&[HashAlgorithm::Md5, HashAlgorithm::Sha256], &mut counting)?;
    let size = counting.count;
    handle.close()?;

    let content_location = item
        .local_path()
        .map(|path| path.to_string_lossy().into_owned());

    Ok(ContentDescription {
        identifier: mint_identifier(),
        original_name: original_name.to_string(),
        content_location,
        size,
        md5: digests[0].value.clone(),
        sha256: digests[1].value.clone(),
        mimetype_by_extension: mimetype::guess_from_name(original_name),
        mimetype_by_magic: mimetype::sniff(item)?,
    })
}

struct CountingReader<'a, R> {
    inner: &'a mut R,
    count: u64,
}

impl<R: std::io::Read> std::io::Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Record holding only the object for a description
pub fn new_object_record(description: &ContentDescription, originator: &str) -> PremisRecord {
    PremisRecord::with_object(description.to_object(originator))
}

/// Record for newly ingested content
///
/// The object and the ingestion event link to each other, and the event
/// links to the agent that performed it.
pub fn ingest_record(description: &ContentDescription, agent_name: &str) -> PremisRecord {
    let mut record = new_object_record(description, agent_name);
    let agent = PremisAgent::software(agent_name);

    let mut event = PremisEvent::new("ingestion", OUTCOME_SUCCESS)
        .with_detail(format!("Ingested {} into staging", description.original_name));
    event.link_agent(&agent.identifier, Some("executing program"));

    record.add_event(event);
    record.add_agent(agent);
    record
}
