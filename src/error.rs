// src/error.rs

//! Crate-wide error type
//!
//! Errors fall into a handful of categories that callers and the CLI care
//! about:
//! - **integrity**: a copy or a write that cannot be verified, or a structure
//!   that must not be serialized
//! - **precondition**: an operation that needs a PREMIS record which is absent
//! - **layout**: an on-disk stage or archive that does not look like one
//! - everything else is plumbing (I/O, XML, JSON, configuration)

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("Item {name} cannot be opened in text mode '{mode}'; items are binary-only")]
    TextMode { name: String, mode: String },

    #[error("Item {0} is not open")]
    NotOpen(String),

    #[error("Item {0} is not open for writing")]
    NotWritable(String),

    #[error("Item {0} is read-only")]
    ReadOnly(String),

    #[error(
        "Copy of {src} to {dst} could not be verified ({eq_detect}) after {attempts} attempts"
    )]
    CopyIntegrity {
        src: String,
        dst: String,
        eq_detect: String,
        attempts: u32,
    },

    #[error("Refusing to serialize {0}: structure failed validation")]
    InvalidStructure(String),

    #[error("Expected at most 1 technical metadata record for {name}, found {count}")]
    TooManyTechmd { name: String, count: usize },

    #[error("Write of {0} was not verified identical to its source")]
    UnverifiedWrite(String),

    #[error("No PREMIS record available for {0}")]
    MissingPremis(String),

    #[error("{hook} is not applicable for {origin}")]
    HookUnsupported { hook: &'static str, origin: String },

    #[error("Invalid segment: {0}")]
    InvalidSegment(String),

    #[error("Invalid PREMIS record: {0}")]
    Premis(String),

    #[error("Layout error: expected {expected}, observed {observed}")]
    Layout { expected: String, observed: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Unknown equality metric: {0}")]
    UnknownEqDetect(String),

    #[error("Presform chain exceeds maximum depth of {0}")]
    PresformDepth(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External tool error: {0}")]
    Tool(String),
}

impl Error {
    /// Stable category name, printed next to the message by the CLI
    pub fn category(&self) -> &'static str {
        match self {
            Self::CopyIntegrity { .. }
            | Self::InvalidStructure(_)
            | Self::TooManyTechmd { .. }
            | Self::UnverifiedWrite(_) => "integrity",
            Self::MissingPremis(_) => "precondition",
            Self::HookUnsupported { .. } => "unsupported",
            Self::Layout { .. } => "layout",
            Self::TextMode { .. } | Self::NotOpen(_) | Self::NotWritable(_) | Self::ReadOnly(_) => {
                "item"
            }
            Self::InvalidSegment(_)
            | Self::InvalidPath(_)
            | Self::PathTraversal(_)
            | Self::UnknownEqDetect(_)
            | Self::PresformDepth(_) => "invalid",
            Self::Premis(_) | Self::Xml(_) | Self::Json(_) => "format",
            Self::Config(_) => "config",
            Self::Tool(_) => "tool",
            Self::Io(_) | Self::IoError(_) | Self::Walk(_) | Self::DownloadError(_) => "io",
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = Error::MissingPremis("foo.txt".to_string());
        assert_eq!(err.category(), "precondition");

        let err = Error::TooManyTechmd {
            name: "foo.txt".to_string(),
            count: 2,
        };
        assert_eq!(err.category(), "integrity");
        assert!(err.to_string().contains("found 2"));

        let err = Error::Layout {
            expected: "admin/ directory".to_string(),
            observed: "nothing".to_string(),
        };
        assert_eq!(err.category(), "layout");
    }
}
