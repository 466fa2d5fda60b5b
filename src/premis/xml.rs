// src/premis/xml.rs

//! PREMIS XML codec
//!
//! Reading builds a small element tree from `quick-xml` events (local names
//! only, so any namespace prefix is accepted) and maps it onto the model.
//! Writing goes the other way and always emits the `premis:` prefix.

use super::{
    EventOutcome, Fixity, Format, Identifier, LinkingAgent, ObjectCharacteristics, PremisAgent,
    PremisEvent, PremisObject, PremisRecord, PremisRights, Restriction, Storage,
};
use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const PREMIS_NS: &str = "http://www.loc.gov/premis/v3";
const PREMIS_VERSION: &str = "3.0";

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Element in the premis namespace
    fn premis(local: &str) -> Self {
        Self::new(format!("premis:{local}"))
    }

    fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    fn push_text(&mut self, local: &str, text: impl Into<String>) {
        self.push(Element::premis(local).with_text(text));
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.clone())
    }

    /// Child text with surrounding whitespace removed, for numbers and flags
    fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }
}

// =============================================================================
// Reading
// =============================================================================

fn parse_tree(bytes: &[u8]) -> Result<Element> {
    // Text is kept verbatim; only the indentation between child elements is dropped
    let mut reader = Reader::from_reader(bytes);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| Error::Premis("unbalanced closing tag".to_string()))?;
                if !element.children.is_empty() && element.text.trim().is_empty() {
                    element.text.clear();
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::Premis("document ended inside an element".to_string()));
    }
    root.ok_or_else(|| Error::Premis("empty document".to_string()))
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.local_name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        element.attributes.push((
            String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            attribute.unescape_value()?.into_owned(),
        ));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::Premis("multiple root elements".to_string())),
    }
    Ok(())
}

/// Parse `<premis>` XML into a record
pub(super) fn parse_record(bytes: &[u8]) -> Result<PremisRecord> {
    let root = parse_tree(bytes)?;
    if root.name != "premis" {
        return Err(Error::Premis(format!(
            "expected <premis> root element, found <{}>",
            root.name
        )));
    }

    let mut record = PremisRecord::default();
    for child in &root.children {
        match child.name.as_str() {
            "object" => record.objects.push(read_object(child)),
            "event" => record.events.push(read_event(child)),
            "agent" => record.agents.push(read_agent(child)),
            "rights" => record.rights.push(read_rights(child)),
            _ => {}
        }
    }
    Ok(record)
}

/// Read `<{prefix}Type>` / `<{prefix}Value>` children
fn read_identifier(element: &Element, prefix: &str) -> Identifier {
    Identifier {
        id_type: element.child_text(&format!("{prefix}Type")).unwrap_or_default(),
        value: element.child_text(&format!("{prefix}Value")).unwrap_or_default(),
    }
}

fn read_identifiers(element: &Element, name: &str) -> Vec<Identifier> {
    element
        .children_named(name)
        .map(|id| read_identifier(id, name))
        .collect()
}

fn read_object(element: &Element) -> PremisObject {
    PremisObject {
        identifiers: read_identifiers(element, "objectIdentifier"),
        characteristics: element
            .children_named("objectCharacteristics")
            .map(read_characteristics)
            .collect(),
        original_name: element.child_text("originalName"),
        storage: element
            .children_named("storage")
            .filter_map(|storage| storage.child("contentLocation"))
            .map(|location| Storage {
                location_type: location.child_text("contentLocationType").unwrap_or_default(),
                location_value: location.child_text("contentLocationValue").unwrap_or_default(),
            })
            .collect(),
        linking_event_identifiers: read_identifiers(element, "linkingEventIdentifier"),
    }
}

fn read_characteristics(element: &Element) -> ObjectCharacteristics {
    ObjectCharacteristics {
        composition_level: element
            .child_value("compositionLevel")
            .and_then(|level| level.parse().ok())
            .unwrap_or(0),
        fixity: element
            .children_named("fixity")
            .map(|fixity| Fixity {
                algorithm: fixity.child_text("messageDigestAlgorithm").unwrap_or_default(),
                digest: fixity.child_text("messageDigest").unwrap_or_default(),
                originator: fixity.child_text("messageDigestOriginator"),
            })
            .collect(),
        size: element.child_value("size").and_then(|size| size.parse().ok()),
        formats: element
            .children_named("format")
            .map(|format| Format {
                name: format
                    .child("formatDesignation")
                    .and_then(|d| d.child_text("formatName"))
                    .unwrap_or_default(),
                note: format.child_text("formatNote"),
            })
            .collect(),
    }
}

fn read_event(element: &Element) -> PremisEvent {
    PremisEvent {
        identifier: element
            .child("eventIdentifier")
            .map(|id| read_identifier(id, "eventIdentifier"))
            .unwrap_or_default(),
        event_type: element.child_text("eventType").unwrap_or_default(),
        date_time: element.child_text("eventDateTime").unwrap_or_default(),
        detail: element
            .child("eventDetailInformation")
            .and_then(|info| info.child_text("eventDetail")),
        outcomes: element
            .children_named("eventOutcomeInformation")
            .map(|info| EventOutcome {
                outcome: info.child_text("eventOutcome").unwrap_or_default(),
                detail_note: info
                    .child("eventOutcomeDetail")
                    .and_then(|detail| detail.child_text("eventOutcomeDetailNote")),
            })
            .collect(),
        linking_agents: element
            .children_named("linkingAgentIdentifier")
            .map(|agent| LinkingAgent {
                identifier: read_identifier(agent, "linkingAgentIdentifier"),
                role: agent.child_text("linkingAgentRole"),
            })
            .collect(),
        linking_objects: read_identifiers(element, "linkingObjectIdentifier"),
    }
}

fn read_agent(element: &Element) -> PremisAgent {
    PremisAgent {
        identifier: element
            .child("agentIdentifier")
            .map(|id| read_identifier(id, "agentIdentifier"))
            .unwrap_or_default(),
        name: element.child_text("agentName").unwrap_or_default(),
        agent_type: element.child_text("agentType").unwrap_or_default(),
    }
}

fn read_rights(element: &Element) -> PremisRights {
    let restrictions = element
        .children_named("rightsExtension")
        .flat_map(|extension| extension.children_named("restriction"))
        .map(|restriction| Restriction {
            code: restriction.child_text("restrictionCode").unwrap_or_default(),
            active: restriction
                .child_value("active")
                .is_some_and(|active| active.eq_ignore_ascii_case("true")),
            reasons: restriction
                .children_named("restrictionReason")
                .map(|r| r.text.clone())
                .collect(),
            donor_stipulations: restriction
                .children_named("donorStipulation")
                .map(|s| s.text.clone())
                .collect(),
            linking_agent_ids: read_identifiers(restriction, "linkingAgentIdentifier"),
        })
        .collect();
    PremisRights { restrictions }
}

// =============================================================================
// Writing
// =============================================================================

/// Serialize a record to indented XML
pub(super) fn write_record(record: &PremisRecord) -> Result<Vec<u8>> {
    let mut root = Element::premis("premis");
    root.attributes
        .push(("xmlns:premis".to_string(), PREMIS_NS.to_string()));
    root.attributes
        .push(("version".to_string(), PREMIS_VERSION.to_string()));

    for object in &record.objects {
        root.push(object_element(object));
    }
    for event in &record.events {
        root.push(event_element(event));
    }
    for agent in &record.agents {
        root.push(agent_element(agent));
    }
    for rights in &record.rights {
        root.push(rights_element(rights));
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, &root)?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !element.text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&element.text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// `<premis:{name}>` with `{name}Type` / `{name}Value` children
fn identifier_element(name: &str, identifier: &Identifier) -> Element {
    let mut element = Element::premis(name);
    element.push_text(&format!("{name}Type"), identifier.id_type.clone());
    element.push_text(&format!("{name}Value"), identifier.value.clone());
    element
}

fn object_element(object: &PremisObject) -> Element {
    let mut element = Element::premis("object");
    element
        .attributes
        .push(("xsi:type".to_string(), "premis:file".to_string()));
    element.attributes.push((
        "xmlns:xsi".to_string(),
        "http://www.w3.org/2001/XMLSchema-instance".to_string(),
    ));

    for identifier in &object.identifiers {
        element.push(identifier_element("objectIdentifier", identifier));
    }

    for characteristics in &object.characteristics {
        let mut chars = Element::premis("objectCharacteristics");
        chars.push_text("compositionLevel", characteristics.composition_level.to_string());
        for fixity in &characteristics.fixity {
            let mut fix = Element::premis("fixity");
            fix.push_text("messageDigestAlgorithm", fixity.algorithm.clone());
            fix.push_text("messageDigest", fixity.digest.clone());
            if let Some(originator) = &fixity.originator {
                fix.push_text("messageDigestOriginator", originator.clone());
            }
            chars.push(fix);
        }
        if let Some(size) = characteristics.size {
            chars.push_text("size", size.to_string());
        }
        for format in &characteristics.formats {
            let mut fmt = Element::premis("format");
            let mut designation = Element::premis("formatDesignation");
            designation.push_text("formatName", format.name.clone());
            fmt.push(designation);
            if let Some(note) = &format.note {
                fmt.push_text("formatNote", note.clone());
            }
            chars.push(fmt);
        }
        element.push(chars);
    }

    if let Some(name) = &object.original_name {
        element.push_text("originalName", name.clone());
    }

    for storage in &object.storage {
        let mut location = Element::premis("contentLocation");
        location.push_text("contentLocationType", storage.location_type.clone());
        location.push_text("contentLocationValue", storage.location_value.clone());
        let mut store = Element::premis("storage");
        store.push(location);
        element.push(store);
    }

    for event in &object.linking_event_identifiers {
        element.push(identifier_element("linkingEventIdentifier", event));
    }
    element
}

fn event_element(event: &PremisEvent) -> Element {
    let mut element = Element::premis("event");
    element.push(identifier_element("eventIdentifier", &event.identifier));
    element.push_text("eventType", event.event_type.clone());
    element.push_text("eventDateTime", event.date_time.clone());

    if let Some(detail) = &event.detail {
        let mut info = Element::premis("eventDetailInformation");
        info.push_text("eventDetail", detail.clone());
        element.push(info);
    }

    for outcome in &event.outcomes {
        let mut info = Element::premis("eventOutcomeInformation");
        info.push_text("eventOutcome", outcome.outcome.clone());
        if let Some(note) = &outcome.detail_note {
            let mut detail = Element::premis("eventOutcomeDetail");
            detail.push_text("eventOutcomeDetailNote", note.clone());
            info.push(detail);
        }
        element.push(info);
    }

    for agent in &event.linking_agents {
        let mut linking = identifier_element("linkingAgentIdentifier", &agent.identifier);
        if let Some(role) = &agent.role {
            linking.push_text("linkingAgentRole", role.clone());
        }
        element.push(linking);
    }

    for object in &event.linking_objects {
        element.push(identifier_element("linkingObjectIdentifier", object));
    }
    element
}

fn agent_element(agent: &PremisAgent) -> Element {
    let mut element = Element::premis("agent");
    element.push(identifier_element("agentIdentifier", &agent.identifier));
    element.push_text("agentName", agent.name.clone());
    element.push_text("agentType", agent.agent_type.clone());
    element
}

fn rights_element(rights: &PremisRights) -> Element {
    let mut element = Element::premis("rights");
    for restriction in &rights.restrictions {
        let mut node = Element::new("restriction");
        node.push(Element::new("restrictionCode").with_text(restriction.code.clone()));
        node.push(Element::new("active").with_text(restriction.active.to_string()));
        for reason in &restriction.reasons {
            node.push(Element::new("restrictionReason").with_text(reason.clone()));
        }
        for stipulation in &restriction.donor_stipulations {
            node.push(Element::new("donorStipulation").with_text(stipulation.clone()));
        }
        for agent in &restriction.linking_agent_ids {
            let mut linking = Element::new("linkingAgentIdentifier");
            linking.push(Element::new("linkingAgentIdentifierType").with_text(agent.id_type.clone()));
            linking.push(Element::new("linkingAgentIdentifierValue").with_text(agent.value.clone()));
            node.push(linking);
        }

        let mut extension = Element::premis("rightsExtension");
        extension.push(node);
        element.push(extension);
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::premis::{OUTCOME_SUCCESS, PremisEvent};

    fn full_record() -> PremisRecord {
        let object_id = Identifier::new("uuid", "0f3c2a");
        let mut object = PremisObject {
            identifiers: vec![object_id.clone()],
            characteristics: vec![ObjectCharacteristics {
                composition_level: 0,
                fixity: vec![Fixity {
                    algorithm: "MD5".to_string(),
                    digest: "5eb63bbbe01eeed093cb22bb8f5acdc3".to_string(),
                    originator: Some("ldrstage".to_string()),
                }],
                size: Some(11),
                formats: vec![Format {
                    name: "text/plain".to_string(),
                    note: Some("from extension".to_string()),
                }],
            }],
            original_name: Some("a & b <c>.txt".to_string()),
            storage: Vec::new(),
            linking_event_identifiers: Vec::new(),
        };
        object.set_content_location("/ingest/a.txt");

        let mut record = PremisRecord::with_object(object);
        let agent = PremisAgent::software("ldrstage");
        let mut event = PremisEvent::new("ingestion", OUTCOME_SUCCESS)
            .with_detail("ingested")
            .with_outcome_note("all good");
        event.link_agent(&agent.identifier, Some("executing program"));
        record.add_event(event);
        record.add_agent(agent);
        record.add_restriction(Restriction {
            code: "R-X".to_string(),
            active: true,
            reasons: vec!["privacy".to_string()],
            donor_stipulations: vec!["ask first".to_string()],
            linking_agent_ids: vec![Identifier::new("uuid", "agent-1")],
        });
        record
    }

    #[test]
    fn test_round_trip() {
        let record = full_record();
        let bytes = write_record(&record).unwrap();
        let parsed = parse_record(&bytes).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_output_is_prefixed() {
        let bytes = write_record(&full_record()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<premis:objectIdentifierValue>0f3c2a</premis:objectIdentifierValue>"));
        assert!(text.contains("a &amp; b &lt;c&gt;.txt"));
    }

    #[test]
    fn test_parse_unprefixed_and_unknown_elements() {
        let xml = br#"<?xml version="1.0"?>
            <premis xmlns="http://www.loc.gov/premis/v3">
              <object>
                <objectIdentifier>
                  <objectIdentifierType>DOI</objectIdentifierType>
                  <objectIdentifierValue>xyz</objectIdentifierValue>
                </objectIdentifier>
                <significantProperties><x>ignored</x></significantProperties>
                <originalName>foo.txt</originalName>
              </object>
            </premis>"#;
        let record = parse_record(xml).unwrap();
        assert_eq!(record.object_identifier().unwrap(), "xyz");
        assert_eq!(record.objects[0].original_name.as_deref(), Some("foo.txt"));
    }

    #[test]
    fn test_text_whitespace_survives_round_trip() {
        let mut record = full_record();
        record.objects[0].original_name = Some("  a.txt ".to_string());
        record.objects[0].characteristics[0].formats[0].note = Some("\tindented note".to_string());

        let parsed = parse_record(&write_record(&record).unwrap()).unwrap();
        assert_eq!(parsed.objects[0].original_name.as_deref(), Some("  a.txt "));
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_indented_numbers_and_flags_parse() {
        let xml = br#"<premis>
              <object>
                <objectIdentifier>
                  <objectIdentifierType>uuid</objectIdentifierType>
                  <objectIdentifierValue>abc</objectIdentifierValue>
                </objectIdentifier>
                <objectCharacteristics>
                  <compositionLevel> 1 </compositionLevel>
                  <size>
                    42
                  </size>
                </objectCharacteristics>
              </object>
            </premis>"#;
        let record = parse_record(xml).unwrap();
        let characteristics = &record.objects[0].characteristics[0];
        assert_eq!(characteristics.composition_level, 1);
        assert_eq!(characteristics.size, Some(42));
        assert_eq!(record.object_identifier().unwrap(), "abc");
    }

    #[test]
    fn test_parse_rejects_wrong_root() {
        assert!(matches!(parse_record(b"<fits/>"), Err(Error::Premis(_))));
        assert!(parse_record(b"").is_err());
        assert!(parse_record(b"<premis><object>").is_err());
    }
}
