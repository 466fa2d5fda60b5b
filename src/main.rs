// src/main.rs

use anyhow::Result;
use clap::Parser;
use ldrstage::StageConfig;
use std::process::ExitCode;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn run(cli: Cli) -> Result<()> {
    let config = StageConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest {
            source,
            stage_root,
            stage_id,
            label,
            run,
            copy,
        } => commands::cmd_ingest(&source, stage_root, &stage_id, &label, run, &copy, &config),

        Commands::Validate { stage } => commands::cmd_validate(&stage),

        Commands::Premis { stage } => commands::cmd_premis(&stage, &config),

        Commands::Restrict {
            stage,
            code,
            inactive,
            reasons,
            stipulations,
            agent_ids,
        } => commands::cmd_restrict(
            &stage,
            &code,
            inactive,
            reasons,
            stipulations,
            agent_ids,
            &config,
        ),

        Commands::Prune {
            stage,
            pattern,
            final_delete,
        } => commands::cmd_prune(&stage, &pattern, final_delete, &config),

        Commands::Techmd { stage } => commands::cmd_techmd(&stage, &config),

        Commands::Convert { stage, converter } => commands::cmd_convert(&stage, &converter, &config),

        Commands::Archive {
            stage,
            archive_root,
            copy,
        } => commands::cmd_archive(&stage, archive_root, &copy, &config),

        Commands::Copy {
            src,
            dst,
            clobber,
            copy,
        } => commands::cmd_copy(&src, &dst, clobber, &copy, &config),
    }
}

/// Category of the underlying library error, if there is one
fn category(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ldrstage::Error>())
        .map_or("error", ldrstage::Error::category)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error [{}]: {:#}", category(&err), err);
            ExitCode::FAILURE
        }
    }
}
