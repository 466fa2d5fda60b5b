// src/serialize/fixup.rs

//! Post-copy rewriting of embedded locations
//!
//! Once PREMIS and FITS records land in the archive, the paths they carry
//! still name the ingest location. These helpers point them at the archived
//! copy. They run after the content itself has been written.

use crate::error::Result;
use crate::premis::PremisRecord;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::path::Path;

/// FITS elements naming the characterized file
const FITS_FILEPATH: &str = "filepath";
const FITS_FILENAME: &str = "filename";

/// Point the first object's content location at `location`
pub fn fixup_premis(path: &Path, location: &str) -> Result<()> {
    let mut record = PremisRecord::from_path(path)?;
    if let Some(object) = record.first_object_mut() {
        object.set_content_location(location);
    }
    record.write_to_path(path)
}

/// Point FITS `filepath`/`filename` elements at the archived content
pub fn fixup_fits(path: &Path, content_path: &Path) -> Result<()> {
    let filepath = content_path.to_string_lossy().into_owned();
    let filename = content_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = fs::read(path)?;
    let rewritten = rewrite_elements(
        &bytes,
        &[(FITS_FILEPATH, filepath.as_str()), (FITS_FILENAME, filename.as_str())],
    )?;
    fs::write(path, rewritten)?;
    Ok(())
}

/// Replace the text of every element whose local name is listed
///
/// Everything else passes through unchanged.
pub fn rewrite_elements(bytes: &[u8], replacements: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(bytes);
    let mut writer = Writer::new(Vec::with_capacity(bytes.len()));
    let mut buf = Vec::new();
    let mut replacing = false;

    let replacement_for = |local: &[u8]| {
        replacements
            .iter()
            .find(|(name, _)| name.as_bytes() == local)
            .map(|(_, value)| *value)
    };

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let value = replacement_for(start.local_name().as_ref());
                writer.write_event(Event::Start(start))?;
                if let Some(value) = value {
                    writer.write_event(Event::Text(BytesText::new(value)))?;
                    replacing = true;
                }
            }
            Event::Empty(start) => match replacement_for(start.local_name().as_ref()) {
                Some(value) => {
                    let end = start.to_end().into_owned();
                    writer.write_event(Event::Start(start))?;
                    writer.write_event(Event::Text(BytesText::new(value)))?;
                    writer.write_event(Event::End(end))?;
                }
                None => writer.write_event(Event::Empty(start))?,
            },
            Event::Text(_) | Event::CData(_) if replacing => {}
            Event::End(end) => {
                replacing = false;
                writer.write_event(Event::End(end))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}
