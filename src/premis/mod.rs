// src/premis/mod.rs

//! PREMIS provenance records
//!
//! A deliberately small in-memory model of the PREMIS v3 subset this crate
//! reads and writes: objects (identifiers, fixity, size, formats, original
//! name, storage location, linked events), events (type, timestamp, detail,
//! outcomes, linked agents and objects), agents, and a rights section holding
//! restriction extensions.
//!
//! Records are parsed from and serialized to XML with `quick-xml`
//! (see [`xml`]). The round trip is lossless for everything modelled here;
//! elements outside the model are skipped on read.

mod describe;
mod xml;

pub use describe::{
    ContentDescription, describe_item, ingest_record, mint_identifier, new_object_record,
};

use crate::error::{Error, Result};
use crate::item::Item;
use chrono::{SecondsFormat, Utc};
use std::path::Path;

/// Identifier type used for identifiers minted by this crate
pub const IDENTIFIER_TYPE: &str = "uuid";

/// Content location type for files on local disk
pub const LOCATION_TYPE_FILE: &str = "Unix File Path";

/// Outcome string for successful events
pub const OUTCOME_SUCCESS: &str = "SUCCESS";

/// Outcome string for failed events
pub const OUTCOME_FAILURE: &str = "FAILURE";

/// Typed identifier (`*IdentifierType` + `*IdentifierValue`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Identifier {
    pub id_type: String,
    pub value: String,
}

impl Identifier {
    pub fn new(id_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id_type: id_type.into(),
            value: value.into(),
        }
    }

    /// A freshly minted identifier of [`IDENTIFIER_TYPE`]
    pub fn mint() -> Self {
        Self::new(IDENTIFIER_TYPE, mint_identifier())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fixity {
    pub algorithm: String,
    pub digest: String,
    pub originator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub name: String,
    /// How the format was determined
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectCharacteristics {
    pub composition_level: u32,
    pub fixity: Vec<Fixity>,
    pub size: Option<u64>,
    pub formats: Vec<Format>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Storage {
    pub location_type: String,
    pub location_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PremisObject {
    pub identifiers: Vec<Identifier>,
    pub characteristics: Vec<ObjectCharacteristics>,
    pub original_name: Option<String>,
    pub storage: Vec<Storage>,
    pub linking_event_identifiers: Vec<Identifier>,
}

impl PremisObject {
    /// First object identifier, the one a MaterialSuite is named by
    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifiers.first()
    }

    /// Link an event to this object
    pub fn link_event(&mut self, event: &Identifier) {
        if !self.linking_event_identifiers.contains(event) {
            self.linking_event_identifiers.push(event.clone());
        }
    }

    /// Point the first storage entry at a new location, adding one if needed
    pub fn set_content_location(&mut self, location: impl Into<String>) {
        let location = location.into();
        match self.storage.first_mut() {
            Some(storage) => storage.location_value = location,
            None => self.storage.push(Storage {
                location_type: LOCATION_TYPE_FILE.to_string(),
                location_value: location,
            }),
        }
    }

    /// Content location of the first storage entry
    pub fn content_location(&self) -> Option<&str> {
        self.storage.first().map(|s| s.location_value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventOutcome {
    pub outcome: String,
    pub detail_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkingAgent {
    pub identifier: Identifier,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PremisEvent {
    pub identifier: Identifier,
    pub event_type: String,
    pub date_time: String,
    pub detail: Option<String>,
    pub outcomes: Vec<EventOutcome>,
    pub linking_agents: Vec<LinkingAgent>,
    pub linking_objects: Vec<Identifier>,
}

impl PremisEvent {
    /// New event stamped with the current time and a fresh identifier
    pub fn new(event_type: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            identifier: Identifier::mint(),
            event_type: event_type.into(),
            date_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            detail: None,
            outcomes: vec![EventOutcome {
                outcome: outcome.into(),
                detail_note: None,
            }],
            linking_agents: Vec::new(),
            linking_objects: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach a note to the first outcome
    pub fn with_outcome_note(mut self, note: impl Into<String>) -> Self {
        if let Some(outcome) = self.outcomes.first_mut() {
            outcome.detail_note = Some(note.into());
        }
        self
    }

    pub fn link_object(&mut self, object: &Identifier) {
        if !self.linking_objects.contains(object) {
            self.linking_objects.push(object.clone());
        }
    }

    pub fn link_agent(&mut self, agent: &Identifier, role: Option<&str>) {
        self.linking_agents.push(LinkingAgent {
            identifier: agent.clone(),
            role: role.map(str::to_string),
        });
    }

    /// Outcome string of the first outcome
    pub fn outcome(&self) -> Option<&str> {
        self.outcomes.first().map(|o| o.outcome.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PremisAgent {
    pub identifier: Identifier,
    pub name: String,
    pub agent_type: String,
}

impl PremisAgent {
    /// Software agent with a freshly minted identifier
    pub fn software(name: impl Into<String>) -> Self {
        Self {
            identifier: Identifier::mint(),
            name: name.into(),
            agent_type: "software".to_string(),
        }
    }
}

/// Access restriction carried as a rights extension
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Restriction {
    pub code: String,
    pub active: bool,
    pub reasons: Vec<String>,
    pub donor_stipulations: Vec<String>,
    pub linking_agent_ids: Vec<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PremisRights {
    pub restrictions: Vec<Restriction>,
}

/// A parsed PREMIS document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PremisRecord {
    pub objects: Vec<PremisObject>,
    pub events: Vec<PremisEvent>,
    pub agents: Vec<PremisAgent>,
    pub rights: Vec<PremisRights>,
}

impl PremisRecord {
    /// Record holding a single object
    pub fn with_object(object: PremisObject) -> Self {
        Self {
            objects: vec![object],
            ..Default::default()
        }
    }

    /// Parse a record from XML bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        xml::parse_record(bytes)
    }

    /// Parse a record from a file
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parse the record held by an item
    pub fn from_item(item: &dyn Item) -> Result<Self> {
        let bytes = item.read_all()?;
        Self::from_bytes(&bytes).map_err(|e| match e {
            Error::Premis(msg) => Error::Premis(format!("{}: {}", item.name(), msg)),
            other => other,
        })
    }

    /// Serialize to XML bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        xml::write_record(self)
    }

    /// Serialize to a file, replacing it
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// First object in the record
    pub fn first_object(&self) -> Option<&PremisObject> {
        self.objects.first()
    }

    pub fn first_object_mut(&mut self) -> Option<&mut PremisObject> {
        self.objects.first_mut()
    }

    /// `objects[0].objectIdentifier[0].value`
    pub fn object_identifier(&self) -> Result<&str> {
        self.first_object()
            .and_then(PremisObject::identifier)
            .map(|id| id.value.as_str())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::Premis("record has no object identifier".to_string()))
    }

    /// Append an event, linking it to the first object in both directions
    pub fn add_event(&mut self, mut event: PremisEvent) {
        if let Some(object) = self.objects.first_mut() {
            if let Some(id) = object.identifiers.first() {
                event.link_object(id);
            }
            object.link_event(&event.identifier);
        }
        self.events.push(event);
    }

    /// Add an agent unless one with the same identifier is present
    pub fn add_agent(&mut self, agent: PremisAgent) {
        if !self.agents.iter().any(|a| a.identifier == agent.identifier) {
            self.agents.push(agent);
        }
    }

    /// Events of a given type, in document order
    pub fn events_of_type<'a>(&'a self, event_type: &'a str) -> impl Iterator<Item = &'a PremisEvent> {
        self.events.iter().filter(move |e| e.event_type == event_type)
    }

    /// Insert a restriction into the rights section
    ///
    /// Creates the rights section if the record has none, otherwise appends
    /// to the first one.
    pub fn add_restriction(&mut self, restriction: Restriction) {
        match self.rights.first_mut() {
            Some(rights) => rights.restrictions.push(restriction),
            None => self.rights.push(PremisRights {
                restrictions: vec![restriction],
            }),
        }
    }

    /// All restrictions in document order
    pub fn restrictions(&self) -> impl Iterator<Item = &Restriction> {
        self.rights.iter().flat_map(|r| r.restrictions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PremisRecord {
        let mut object = PremisObject {
            identifiers: vec![Identifier::new(IDENTIFIER_TYPE, "abc123")],
            original_name: Some("docs/foo.txt".to_string()),
            ..Default::default()
        };
        object.set_content_location("/ingest/docs/foo.txt");
        PremisRecord::with_object(object)
    }

    #[test]
    fn test_object_identifier() {
        let record = sample_record();
        assert_eq!(record.object_identifier().unwrap(), "abc123");

        let empty = PremisRecord::default();
        assert!(matches!(empty.object_identifier(), Err(Error::Premis(_))));
    }

    #[test]
    fn test_add_event_links_both_ways() {
        let mut record = sample_record();
        let event = PremisEvent::new("ingestion", OUTCOME_SUCCESS);
        let event_id = event.identifier.clone();
        record.add_event(event);

        let object = record.first_object().unwrap();
        assert_eq!(object.linking_event_identifiers, vec![event_id]);
        assert_eq!(record.events[0].linking_objects[0].value, "abc123");
        assert_eq!(record.events_of_type("ingestion").count(), 1);
    }

    #[test]
    fn test_add_restriction_creates_then_appends() {
        let mut record = sample_record();
        assert_eq!(record.restrictions().count(), 0);

        record.add_restriction(Restriction {
            code: "R-X".to_string(),
            active: true,
            ..Default::default()
        });
        record.add_restriction(Restriction {
            code: "O".to_string(),
            ..Default::default()
        });

        assert_eq!(record.rights.len(), 1);
        let codes: Vec<_> = record.restrictions().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["R-X", "O"]);
    }

    #[test]
    fn test_set_content_location() {
        let mut object = PremisObject::default();
        assert!(object.content_location().is_none());
        object.set_content_location("/a");
        object.set_content_location("/b");
        assert_eq!(object.storage.len(), 1);
        assert_eq!(object.content_location(), Some("/b"));
    }
}
