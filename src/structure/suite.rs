// src/structure/suite.rs

//! MaterialSuite: one original plus its derived artifacts
//!
//! # Design
//!
//! A suite is an arena of [`SuiteNode`]s referenced by [`SuiteNodeId`].
//! Node 0 is always the original. Every other node is a presform (a
//! preservation derivative) carrying a file extension, with a parent link
//! and an ordered list of its own presforms. Presform chains are bounded by
//! [`MAX_PRESFORM_DEPTH`] and traversed iteratively, so arbitrarily long
//! conversion chains never recurse on the stack.
//!
//! The suite also owns the scratch directories its items live in. Packagers
//! and processors that copy content into a temporary directory hand the
//! directory to the suite, which keeps it alive until the suite is dropped.

use super::Structure;
use crate::error::{Error, Result};
use crate::item::Item;
use crate::premis::PremisRecord;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tempfile::TempDir;

/// Deepest allowed presform chain below an original
pub const MAX_PRESFORM_DEPTH: usize = 32;

/// Empty, or a single `.ext` component
static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\.[^./\\]+)?$").unwrap());

/// Index of a node inside a [`MaterialSuite`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuiteNodeId(usize);

impl SuiteNodeId {
    /// The original
    pub const ROOT: SuiteNodeId = SuiteNodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One original or presform inside a suite
#[derive(Debug, Default)]
pub struct SuiteNode {
    /// `None` for the original, the presform extension (`.pdf`, or empty) otherwise
    extension: Option<String>,
    identifier: Option<String>,
    pub content: Option<Box<dyn Item>>,
    pub premis: Option<Box<dyn Item>>,
    pub technicalmetadata: Vec<Box<dyn Item>>,
    parent: Option<SuiteNodeId>,
    presforms: Vec<SuiteNodeId>,
}

impl SuiteNode {
    #[inline]
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    #[inline]
    pub fn is_presform(&self) -> bool {
        self.extension.is_some()
    }

    /// Object identifier cached from the PREMIS record
    #[inline]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn set_identifier(&mut self, identifier: impl Into<String>) {
        self.identifier = Some(identifier.into());
    }

    #[inline]
    pub fn parent(&self) -> Option<SuiteNodeId> {
        self.parent
    }

    /// Direct presforms, in order
    #[inline]
    pub fn presforms(&self) -> &[SuiteNodeId] {
        &self.presforms
    }

    /// Parse the PREMIS item and return its first object identifier
    pub fn read_identifier(&self) -> Result<String> {
        let premis = self
            .premis
            .as_deref()
            .ok_or_else(|| Error::MissingPremis(self.describe()))?;
        let record = PremisRecord::from_item(premis)?;
        Ok(record.object_identifier()?.to_string())
    }

    /// Name used in messages: the content name, else the identifier
    pub fn describe(&self) -> String {
        self.content
            .as_ref()
            .map(|c| c.name().to_string())
            .or_else(|| self.identifier.clone())
            .unwrap_or_else(|| "<unnamed material suite>".to_string())
    }

    fn missing_parts(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.premis.is_none() {
            missing.push("premis".to_string());
        }
        missing
    }
}

/// A presform detached from any parent: its extension plus the suite rooted at it
#[derive(Debug)]
pub struct Presform {
    pub extension: String,
    pub suite: MaterialSuite,
}

impl Presform {
    pub fn new(extension: impl Into<String>, suite: MaterialSuite) -> Self {
        Self {
            extension: extension.into(),
            suite,
        }
    }
}

/// One original unit of content with its PREMIS, technical metadata and presforms
#[derive(Debug)]
pub struct MaterialSuite {
    nodes: Vec<SuiteNode>,
    scratch: Vec<Arc<TempDir>>,
}

impl Default for MaterialSuite {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialSuite {
    /// Suite holding an empty original
    pub fn new() -> Self {
        Self {
            nodes: vec![SuiteNode::default()],
            scratch: Vec::new(),
        }
    }

    /// Suite whose original holds `content`
    pub fn with_content(content: Box<dyn Item>) -> Self {
        let mut suite = Self::new();
        suite.root_mut().content = Some(content);
        suite
    }

    #[inline]
    pub fn root(&self) -> &SuiteNode {
        &self.nodes[0]
    }

    #[inline]
    pub fn root_mut(&mut self) -> &mut SuiteNode {
        &mut self.nodes[0]
    }

    /// Panics on an id from another suite, which is a caller bug
    #[inline]
    pub fn node(&self, id: SuiteNodeId) -> &SuiteNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn node_mut(&mut self, id: SuiteNodeId) -> &mut SuiteNode {
        &mut self.nodes[id.0]
    }

    /// Number of nodes, original included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a suite has at least its original
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Object identifier of the original
    pub fn identifier(&self) -> Option<&str> {
        self.root().identifier()
    }

    /// Number of presform hops from the original to `id`
    pub fn depth(&self, id: SuiteNodeId) -> usize {
        let mut depth = 0;
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.node(parent).parent;
        }
        depth
    }

    /// Every node, parents before children, presforms in order
    pub fn walk(&self) -> Vec<SuiteNodeId> {
        self.walk_from(SuiteNodeId::ROOT)
    }

    /// Pre-order traversal of the subtree rooted at `start`
    pub fn walk_from(&self, start: SuiteNodeId) -> Vec<SuiteNodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).presforms.iter().rev().copied());
        }
        order
    }

    /// Content name implied for a node
    ///
    /// The original's content name, with `.presform<extension>` appended for
    /// every hop down a presform chain. `None` when the original has no
    /// content.
    pub fn content_name(&self, id: SuiteNodeId) -> Option<String> {
        let node = self.node(id);
        match (&node.extension, node.parent) {
            (Some(extension), Some(parent)) => self
                .content_name(parent)
                .map(|base| format!("{}.presform{}", base, extension)),
            _ => node.content.as_ref().map(|c| c.name().to_string()),
        }
    }

    /// Add an empty presform under `parent`
    pub fn add_presform_node(
        &mut self,
        parent: SuiteNodeId,
        extension: impl Into<String>,
    ) -> Result<SuiteNodeId> {
        let extension = extension.into();
        check_extension(&extension)?;
        let depth = self.depth(parent) + 1;
        if depth > MAX_PRESFORM_DEPTH {
            return Err(Error::PresformDepth(MAX_PRESFORM_DEPTH));
        }

        let id = SuiteNodeId(self.nodes.len());
        self.nodes.push(SuiteNode {
            extension: Some(extension),
            parent: Some(parent),
            ..Default::default()
        });
        self.nodes[parent.0].presforms.push(id);
        Ok(id)
    }

    /// Graft a whole presform suite under `parent`
    ///
    /// The presform's nodes are appended to this arena and its scratch
    /// directories move over to this suite. Returns the id of the grafted
    /// presform's own node.
    pub fn attach_presform(&mut self, parent: SuiteNodeId, presform: Presform) -> Result<SuiteNodeId> {
        check_extension(&presform.extension)?;
        let Presform { extension, suite } = presform;

        let base_depth = self.depth(parent) + 1;
        let deepest = suite
            .walk()
            .into_iter()
            .map(|id| suite.depth(id))
            .max()
            .unwrap_or(0);
        if base_depth + deepest > MAX_PRESFORM_DEPTH {
            return Err(Error::PresformDepth(MAX_PRESFORM_DEPTH));
        }

        let offset = self.nodes.len();
        let MaterialSuite { nodes, scratch } = suite;
        for (index, mut node) in nodes.into_iter().enumerate() {
            if index == 0 {
                node.extension = Some(extension.clone());
                node.parent = Some(parent);
            } else {
                node.parent = node.parent.map(|p| SuiteNodeId(p.0 + offset));
            }
            for child in &mut node.presforms {
                child.0 += offset;
            }
            self.nodes.push(node);
        }

        let id = SuiteNodeId(offset);
        self.nodes[parent.0].presforms.push(id);
        self.scratch.extend(scratch);
        Ok(id)
    }

    /// Presforms directly under `parent`
    pub fn presforms(&self, parent: SuiteNodeId) -> &[SuiteNodeId] {
        self.node(parent).presforms()
    }

    /// The `index`th presform of `parent`
    pub fn get_presform(&self, parent: SuiteNodeId, index: usize) -> Option<SuiteNodeId> {
        self.node(parent).presforms.get(index).copied()
    }

    /// Detach the `index`th presform of `parent` as a standalone suite
    ///
    /// Node ids handed out before the call are invalidated.
    pub fn pop_presform(&mut self, parent: SuiteNodeId, index: usize) -> Option<Presform> {
        let top = self.get_presform(parent, index)?;
        self.nodes[parent.0].presforms.remove(index);

        let subtree = self.walk_from(top);
        let mut detached = vec![false; self.nodes.len()];
        for id in &subtree {
            detached[id.0] = true;
        }

        let mut slots: Vec<Option<SuiteNode>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();

        let mut extracted = Vec::with_capacity(subtree.len());
        let mut extracted_index = vec![usize::MAX; slots.len()];
        for id in &subtree {
            if let Some(node) = slots[id.0].take() {
                extracted_index[id.0] = extracted.len();
                extracted.push(node);
            }
        }

        let mut kept_index = vec![usize::MAX; slots.len()];
        let mut kept = Vec::with_capacity(slots.len() - subtree.len());
        for (index, slot) in slots.into_iter().enumerate() {
            if let Some(node) = slot {
                kept_index[index] = kept.len();
                kept.push(node);
            }
        }

        for node in &mut kept {
            node.parent = node.parent.map(|p| SuiteNodeId(kept_index[p.0]));
            for child in &mut node.presforms {
                *child = SuiteNodeId(kept_index[child.0]);
            }
        }
        for node in &mut extracted {
            node.parent = node
                .parent
                .filter(|p| detached[p.0])
                .map(|p| SuiteNodeId(extracted_index[p.0]));
            for child in &mut node.presforms {
                *child = SuiteNodeId(extracted_index[child.0]);
            }
        }
        self.nodes = kept;

        let extension = extracted[0].extension.take().unwrap_or_default();
        Some(Presform {
            extension,
            suite: MaterialSuite {
                nodes: extracted,
                scratch: self.scratch.clone(),
            },
        })
    }

    /// Replace the presforms of `parent`: pop every existing one, then attach each
    pub fn set_presforms(
        &mut self,
        parent: SuiteNodeId,
        presforms: impl IntoIterator<Item = Presform>,
    ) -> Result<()> {
        while self.pop_presform(parent, 0).is_some() {}
        for presform in presforms {
            self.attach_presform(parent, presform)?;
        }
        Ok(())
    }

    /// Keep a scratch directory alive for as long as this suite
    pub fn hold_scratch(&mut self, dir: Arc<TempDir>) {
        if !self.scratch.iter().any(|held| Arc::ptr_eq(held, &dir)) {
            self.scratch.push(dir);
        }
    }

    /// Scratch directories owned by this suite
    pub fn scratch_dirs(&self) -> &[Arc<TempDir>] {
        &self.scratch
    }

    /// Re-derive every node's identifier from its PREMIS record
    pub fn refresh_identifiers(&mut self) -> Result<()> {
        for node in &mut self.nodes {
            if node.premis.is_some() {
                let identifier = node.read_identifier()?;
                node.identifier = Some(identifier);
            }
        }
        Ok(())
    }
}

fn check_extension(extension: &str) -> Result<()> {
    if EXTENSION_RE.is_match(extension) {
        Ok(())
    } else {
        Err(Error::InvalidPath(format!(
            "presform extension {:?} must be empty or a single '.ext' component",
            extension
        )))
    }
}

impl Structure for MaterialSuite {
    fn required_parts(&self) -> &'static [&'static str] {
        &["premis"]
    }

    fn missing_parts(&self) -> Vec<String> {
        self.walk()
            .into_iter()
            .flat_map(|id| {
                let node = self.node(id);
                node.missing_parts()
                    .into_iter()
                    .map(move |part| format!("{} of {}", part, node.describe()))
            })
            .collect()
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = self.missing_parts();
        for id in self.walk() {
            let node = self.node(id);
            if let Some(extension) = node.extension()
                && let Err(e) = check_extension(extension)
            {
                problems.push(e.to_string());
            }
            if self.depth(id) > MAX_PRESFORM_DEPTH {
                problems.push(format!(
                    "{} is nested deeper than {} presforms",
                    node.describe(),
                    MAX_PRESFORM_DEPTH
                ));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FileItem;

    fn item(name: &str) -> Box<dyn Item> {
        Box::new(FileItem::with_name(format!("/nonexistent/{}", name), name))
    }

    fn suite_with_premis(name: &str) -> MaterialSuite {
        let mut suite = MaterialSuite::with_content(item(name));
        suite.root_mut().premis = Some(item(&format!("{}.premis.xml", name)));
        suite
    }

    #[test]
    fn test_requires_premis() {
        let mut suite = MaterialSuite::with_content(item("foo.txt"));
        assert!(!suite.validate());
        assert_eq!(suite.missing_parts(), vec!["premis of foo.txt".to_string()]);

        suite.root_mut().premis = Some(item("foo.txt.premis.xml"));
        assert!(suite.validate());
    }

    #[test]
    fn test_presform_content_names() {
        let mut suite = suite_with_premis("docs/foo.txt");
        let pdf = suite.add_presform_node(SuiteNodeId::ROOT, ".pdf").unwrap();
        let bare = suite.add_presform_node(SuiteNodeId::ROOT, "").unwrap();
        let chained = suite.add_presform_node(pdf, ".txt").unwrap();

        assert_eq!(suite.content_name(pdf).unwrap(), "docs/foo.txt.presform.pdf");
        assert_eq!(suite.content_name(bare).unwrap(), "docs/foo.txt.presform");
        assert_eq!(
            suite.content_name(chained).unwrap(),
            "docs/foo.txt.presform.pdf.presform.txt"
        );
        assert_eq!(suite.depth(chained), 2);
        assert_eq!(suite.walk(), vec![SuiteNodeId::ROOT, pdf, chained, bare]);
    }

    #[test]
    fn test_rejects_bad_extension() {
        let mut suite = suite_with_premis("foo.txt");
        assert!(suite.add_presform_node(SuiteNodeId::ROOT, "pdf").is_err());
        assert!(suite.add_presform_node(SuiteNodeId::ROOT, "./x").is_err());
        assert!(suite.add_presform_node(SuiteNodeId::ROOT, ".tar.gz").is_err());
    }

    #[test]
    fn test_depth_bound() {
        let mut suite = suite_with_premis("foo.txt");
        let mut parent = SuiteNodeId::ROOT;
        for _ in 0..MAX_PRESFORM_DEPTH {
            parent = suite.add_presform_node(parent, ".x").unwrap();
        }
        assert!(matches!(
            suite.add_presform_node(parent, ".x"),
            Err(Error::PresformDepth(_))
        ));
    }

    #[test]
    fn test_attach_and_pop_presform() {
        let mut suite = suite_with_premis("foo.txt");

        let mut derivative = suite_with_premis("foo.pdf");
        let nested = derivative.add_presform_node(SuiteNodeId::ROOT, ".png").unwrap();
        derivative.node_mut(nested).premis = Some(item("foo.png.premis.xml"));

        let attached = suite
            .attach_presform(SuiteNodeId::ROOT, Presform::new(".pdf", derivative))
            .unwrap();
        assert_eq!(suite.len(), 3);
        assert_eq!(suite.node(attached).extension(), Some(".pdf"));
        assert_eq!(suite.presforms(attached).len(), 1);
        assert!(suite.validate());

        let popped = suite.pop_presform(SuiteNodeId::ROOT, 0).unwrap();
        assert_eq!(popped.extension, ".pdf");
        assert_eq!(popped.suite.len(), 2);
        assert!(popped.suite.root().parent().is_none());
        assert_eq!(popped.suite.presforms(SuiteNodeId::ROOT).len(), 1);
        assert_eq!(suite.len(), 1);
        assert!(suite.presforms(SuiteNodeId::ROOT).is_empty());
    }

    #[test]
    fn test_set_presforms_replaces() {
        let mut suite = suite_with_premis("foo.txt");
        suite.add_presform_node(SuiteNodeId::ROOT, ".a").unwrap();
        suite.add_presform_node(SuiteNodeId::ROOT, ".b").unwrap();

        suite
            .set_presforms(
                SuiteNodeId::ROOT,
                vec![Presform::new(".pdf", suite_with_premis("x.pdf"))],
            )
            .unwrap();

        let presforms = suite.presforms(SuiteNodeId::ROOT);
        assert_eq!(presforms.len(), 1);
        assert_eq!(suite.node(presforms[0]).extension(), Some(".pdf"));
        assert_eq!(suite.len(), 2);
    }

    #[test]
    fn test_missing_premis_on_presform_invalidates() {
        let mut suite = suite_with_premis("foo.txt");
        suite.add_presform_node(SuiteNodeId::ROOT, ".pdf").unwrap();
        assert!(!suite.validate());
    }
}
