// src/packager/filesystem.rs

//! Reading a stage back off disk
//!
//! Material suites are reconstructed from the directory layout in
//! [`crate::layout`]. A data file named `<base>.presform` or
//! `<base>.presform.<ext>` whose `<base>` is itself present in the segment
//! is a presform of `<base>`, not a suite of its own. PREMIS sidecars whose
//! content was pruned still produce a suite (without content).

use super::{MaterialSuitePackager, PremisPolicy, PresformPackager, assemble_with};
use crate::error::{Error, Result};
use crate::item::{FileItem, Item};
use crate::layout::{NoteKind, PREMIS_SUFFIX, StageLayout, TECHMD_SUFFIX};
use crate::path::slash_name;
use crate::structure::{MAX_PRESFORM_DEPTH, Segment, Stage};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

static PRESFORM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\.presform(\.[^./]+)?$").unwrap());

/// Reads a stage written by [`FileSystemStageWriter`](crate::serialize::FileSystemStageWriter)
pub struct FileSystemStageReader {
    layout: StageLayout,
    premis: PremisPolicy,
}

impl FileSystemStageReader {
    /// Reader for `<stage_root>/<stage_id>`
    pub fn new(stage_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: StageLayout::at(stage_dir),
            premis: PremisPolicy::Required,
        }
    }

    /// Keep data files that have no PREMIS sidecar instead of failing
    pub fn allow_missing_premis(mut self) -> Self {
        self.premis = PremisPolicy::Optional;
        self
    }

    /// Reconstruct the stage
    ///
    /// The stage identifier is the name of the stage directory.
    pub fn read(&self) -> Result<Stage> {
        self.check_skeleton()?;
        let root = self.layout.root();
        let identifier = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidPath(root.display().to_string()))?;

        let mut stage = Stage::new(identifier);
        for segment_id in list_dirs(&self.layout.data_dir())? {
            let admin = self.layout.segment_admin_dir(&segment_id);
            if !admin.is_dir() {
                return Err(Error::Layout {
                    expected: admin.display().to_string(),
                    observed: "missing admin directory for segment".to_string(),
                });
            }
            stage.add_segment(self.read_segment(&segment_id)?);
        }
        for segment_id in list_dirs(&self.layout.admin_dir())? {
            let is_note_dir = NoteKind::ALL.iter().any(|k| k.dir_name() == segment_id);
            if !is_note_dir && stage.find_segment(&segment_id).is_none() {
                return Err(Error::Layout {
                    expected: self.layout.segment_data_dir(&segment_id).display().to_string(),
                    observed: "admin directory without a data directory".to_string(),
                });
            }
        }

        for kind in NoteKind::ALL {
            for item in list_items(&self.layout.note_dir(kind))? {
                match kind {
                    NoteKind::AccessionRecords => stage.add_accessionrecord(item),
                    NoteKind::AdminNotes => stage.add_adminnote(item),
                    NoteKind::LegalNotes => stage.add_legalnote(item),
                }
            }
        }

        info!(
            "Read stage {} ({} segments, {} material suites)",
            stage.identifier(),
            stage.segments().len(),
            stage.suite_count()
        );
        Ok(stage)
    }

    fn check_skeleton(&self) -> Result<()> {
        let expected = self.layout.skeleton(&[]);
        let missing: Vec<_> = expected.iter().filter(|dir| !dir.is_dir()).collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::Layout {
            expected: format!("{} skeleton directories", expected.len()),
            observed: format!(
                "{} missing: {}",
                missing.len(),
                missing
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
    }

    fn read_segment(&self, segment_id: &str) -> Result<Segment> {
        let mut segment = Segment::from_identifier(segment_id)?;
        let data_dir = self.layout.segment_data_dir(segment_id);

        let mut names: BTreeSet<String> = relative_files(&data_dir)?.into_iter().collect();
        let content_names = names.clone();
        for premis_name in relative_files(&self.layout.premis_dir(segment_id))? {
            if let Some(name) = premis_name.strip_suffix(PREMIS_SUFFIX) {
                names.insert(name.to_string());
            }
        }

        for entry in build_entries(&names)? {
            let mut packager = FileSystemSuitePackager {
                layout: self.layout.clone(),
                segment: segment_id.to_string(),
                has_content: content_names.contains(&entry.name),
                content_names: content_names.clone(),
                entry,
            };
            segment.add_materialsuite(assemble_with(&mut packager, self.premis)?);
        }
        debug!(
            "Read segment {} ({} material suites)",
            segment_id,
            segment.materialsuites().len()
        );
        Ok(segment)
    }
}

/// A content name with the presforms found beside it
#[derive(Debug, Clone, PartialEq, Eq)]
struct ContentEntry {
    name: String,
    presforms: Vec<(String, ContentEntry)>,
}

/// Group names into originals and their presform chains
fn build_entries(names: &BTreeSet<String>) -> Result<Vec<ContentEntry>> {
    let mut children: BTreeMap<&str, Vec<(&str, String)>> = BTreeMap::new();
    let mut originals = Vec::new();

    for name in names {
        match PRESFORM_RE.captures(name) {
            Some(caps) if names.contains(&caps[1]) => {
                let base = caps.get(1).map_or("", |m| m.as_str());
                let extension = caps.get(2).map_or("", |m| m.as_str()).to_string();
                children.entry(base).or_default().push((name.as_str(), extension));
            }
            Some(_) => {
                warn!("{} looks like a presform but its original is missing", name);
                originals.push(name.as_str());
            }
            None => originals.push(name.as_str()),
        }
    }

    originals
        .into_iter()
        .map(|name| entry_for(name, &children, 0))
        .collect()
}

fn entry_for(
    name: &str,
    children: &BTreeMap<&str, Vec<(&str, String)>>,
    depth: usize,
) -> Result<ContentEntry> {
    if depth > MAX_PRESFORM_DEPTH {
        return Err(Error::PresformDepth(MAX_PRESFORM_DEPTH));
    }
    let presforms = children
        .get(name)
        .into_iter()
        .flatten()
        .map(|(child, extension)| Ok((extension.clone(), entry_for(child, children, depth + 1)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(ContentEntry {
        name: name.to_string(),
        presforms,
    })
}

struct FileSystemSuitePackager {
    layout: StageLayout,
    segment: String,
    entry: ContentEntry,
    has_content: bool,
    content_names: BTreeSet<String>,
}

impl MaterialSuitePackager for FileSystemSuitePackager {
    fn origin(&self) -> String {
        format!("{}/{}", self.segment, self.entry.name)
    }

    fn get_premis(&mut self) -> Result<Option<Box<dyn Item>>> {
        let path = self.layout.premis_path(&self.segment, &self.entry.name)?;
        Ok(path.is_file().then(|| {
            Box::new(FileItem::with_name(
                path,
                format!("{}{}", self.entry.name, PREMIS_SUFFIX),
            )) as Box<dyn Item>
        }))
    }

    fn get_content(&mut self) -> Result<Option<Box<dyn Item>>> {
        if !self.has_content {
            return Ok(None);
        }
        let path = self.layout.content_path(&self.segment, &self.entry.name)?;
        Ok(Some(Box::new(FileItem::with_name(path, self.entry.name.clone()))))
    }

    fn get_techmd_list(&mut self) -> Result<Vec<Box<dyn Item>>> {
        let path = self.layout.techmd_path(&self.segment, &self.entry.name)?;
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let name = format!("{}{}", self.entry.name, TECHMD_SUFFIX);
        Ok(vec![Box::new(FileItem::with_name(path, name))])
    }

    fn get_presform_list(&mut self) -> Result<Vec<PresformPackager>> {
        Ok(self
            .entry
            .presforms
            .iter()
            .map(|(extension, entry)| PresformPackager {
                extension: extension.clone(),
                packager: Box::new(FileSystemSuitePackager {
                    layout: self.layout.clone(),
                    segment: self.segment.clone(),
                    has_content: self.content_names.contains(&entry.name),
                    content_names: self.content_names.clone(),
                    entry: entry.clone(),
                }),
            })
            .collect())
    }
}

/// Immediate subdirectory names, sorted
fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Every file under `dir` as a `/`-separated relative name, sorted
fn relative_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file()
            && let Ok(relative) = entry.path().strip_prefix(dir)
        {
            names.push(slash_name(relative));
        }
    }
    Ok(names)
}

fn list_items(dir: &Path) -> Result<Vec<Box<dyn Item>>> {
    relative_files(dir)?
        .into_iter()
        .map(|name| {
            let path = dir.join(&name);
            Ok(Box::new(FileItem::with_root(path, dir)?) as Box<dyn Item>)
        })
        .collect()
}
