// src/lib.rs

//! ldrstage - digital-preservation staging
//!
//! Packages incoming files together with PREMIS provenance into material
//! suites, groups them into segments and stages, and serializes stages into
//! a plain on-disk stage layout or a pairtree archive. Every byte that moves
//! goes through a verified copy.
//!
//! # Architecture
//!
//! - Items: byte-addressable resources (local files, URLs) behind one trait
//! - Copier: clobber-aware copy with equality metrics and strict verification
//! - Structures: Stage > Segment > MaterialSuite, presforms as an arena tree
//! - Packagers read structures in; writers serialize them out
//! - Processors change a stage in memory (PREMIS, restrictions, pruning,
//!   technical metadata, conversion)

pub mod config;
pub mod copier;
mod error;
pub mod hash;
pub mod item;
pub mod layout;
pub mod mimetype;
pub mod packager;
pub mod pairtree;
pub mod path;
pub mod premis;
pub mod processors;
pub mod serialize;
pub mod structure;
pub mod tool;

pub use config::StageConfig;
pub use copier::{CopyReport, CopySettings, EqDetect, ItemCopier};
pub use error::{Error, Result};
pub use hash::{Hash, HashAlgorithm, Hasher};
pub use item::{DeleteOutcome, FileItem, Item, ItemHandle, OpenMode, UrlItem};
pub use packager::{
    ArchiveReader, ExternalFilePackager, FileSystemStageReader, MaterialSuitePackager, PremisPolicy,
    assemble, assemble_with,
};
pub use premis::PremisRecord;
pub use processors::{
    Converter, PremisCreator, Processor, ProcessorReport, Pruner, RestrictionSetter, TechmdCreator,
};
pub use serialize::{FileSystemStageWriter, PairtreeArchiveWriter, StageWriter, WriteSummary};
pub use structure::{MaterialSuite, Presform, Segment, Stage, Structure, SuiteNodeId};
