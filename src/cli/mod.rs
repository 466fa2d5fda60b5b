// src/cli/mod.rs
//! CLI definitions for ldrstage
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! Stage building:
//! - `ingest` - Package a directory of files into a new segment of a stage
//! - `validate` - Read a stage back and report structural problems
//!
//! Processing (read the stage, change it, write it back in place):
//! - `premis` - Create PREMIS for content that has none
//! - `restrict` - Add an access restriction to every PREMIS record
//! - `prune` - Delete content matching a pattern
//! - `techmd` - Run FITS over every node
//! - `convert` - Run a configured converter to make presforms
//!
//! Output:
//! - `archive` - Serialize a stage into a pairtree archive
//! - `copy` - Verified copy of a single item

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ldrstage")]
#[command(author = "ldrstage Contributors")]
#[command(version)]
#[command(about = "Stage files with PREMIS provenance and archive them with verified copies", long_about = None)]
pub struct Cli {
    /// Configuration file (default: /etc/ldrstage/config.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Copier overrides shared by commands that write
#[derive(Args, Debug, Clone, Default)]
pub struct CopyArgs {
    /// Equality metric: bytes, name, size, md5, sha256, crc32, adler32
    #[arg(long)]
    pub eq_detect: Option<String>,

    /// Retries after the first attempt when verification fails
    #[arg(long)]
    pub max_retries: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package every file under a directory into a new segment and write the stage
    Ingest {
        /// Directory holding the files to stage
        source: PathBuf,

        /// Stage root directory (default: [stage] root from the config)
        #[arg(long)]
        stage_root: Option<PathBuf>,

        /// Stage identifier
        #[arg(long)]
        stage_id: String,

        /// Segment label (word characters only, no '-')
        #[arg(long)]
        label: String,

        /// Segment run number (default: one past the highest existing run)
        #[arg(long)]
        run: Option<u32>,

        #[command(flatten)]
        copy: CopyArgs,
    },

    /// Read a stage and report whether it validates
    Validate {
        /// Stage directory (<stage_root>/<stage_id>)
        stage: PathBuf,
    },

    /// Create PREMIS records for content that has none
    Premis {
        /// Stage directory
        stage: PathBuf,
    },

    /// Add an access restriction to every PREMIS record in a stage
    Restrict {
        /// Stage directory
        stage: PathBuf,

        /// Restriction code
        #[arg(long)]
        code: String,

        /// Record the restriction as inactive
        #[arg(long)]
        inactive: bool,

        /// Reason for the restriction (repeatable)
        #[arg(long = "reason")]
        reasons: Vec<String>,

        /// Donor stipulation (repeatable)
        #[arg(long = "stipulation")]
        stipulations: Vec<String>,

        /// Linking agent identifier (repeatable)
        #[arg(long = "agent-id")]
        agent_ids: Vec<String>,
    },

    /// Delete content whose stage name matches a pattern
    Prune {
        /// Stage directory
        stage: PathBuf,

        /// Regular expression matched against content names
        #[arg(long)]
        pattern: String,

        /// Actually delete (default is a dry run)
        #[arg(long = "final")]
        final_delete: bool,
    },

    /// Run FITS over every node and attach the technical metadata
    Techmd {
        /// Stage directory
        stage: PathBuf,
    },

    /// Run a configured converter and attach the results as presforms
    Convert {
        /// Stage directory
        stage: PathBuf,

        /// Converter name from [tools.converters]
        #[arg(long)]
        converter: String,
    },

    /// Serialize a stage into a pairtree archive
    Archive {
        /// Stage directory
        stage: PathBuf,

        /// Archive root (default: [archive] root from the config)
        #[arg(long)]
        archive_root: Option<PathBuf>,

        #[command(flatten)]
        copy: CopyArgs,
    },

    /// Copy one item onto another and verify the result
    Copy {
        /// Source file path or http(s) URL
        src: String,

        /// Destination file path
        dst: PathBuf,

        /// Overwrite the destination when it differs
        #[arg(long)]
        clobber: bool,

        #[command(flatten)]
        copy: CopyArgs,
    },
}
