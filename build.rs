// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: stage directory
fn stage_arg() -> Arg {
    Arg::new("stage")
        .required(true)
        .value_name("STAGE_DIR")
        .help("Stage directory (<stage_root>/<stage_id>)")
}

/// Common arguments: copier overrides
fn copy_args() -> [Arg; 2] {
    [
        Arg::new("eq_detect")
            .long("eq-detect")
            .value_parser(["bytes", "name", "size", "md5", "sha256", "crc32", "adler32"])
            .help("Equality metric"),
        Arg::new("max_retries")
            .long("max-retries")
            .value_name("N")
            .help("Retries after the first attempt when verification fails"),
    ]
}

fn flag(name: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(long)
        .action(clap::ArgAction::SetTrue)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("ldrstage")
        .version(env!("CARGO_PKG_VERSION"))
        .author("ldrstage Contributors")
        .about("Stage files with PREMIS provenance and archive them with verified copies")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .help("Configuration file (default: /etc/ldrstage/config.toml if present)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("ingest")
                .about("Package every file under a directory into a new segment and write the stage")
                .arg(Arg::new("source").required(true).help("Directory holding the files to stage"))
                .arg(Arg::new("stage_root").long("stage-root").help("Stage root directory"))
                .arg(Arg::new("stage_id").long("stage-id").required(true).help("Stage identifier"))
                .arg(Arg::new("label").long("label").required(true).help("Segment label"))
                .arg(Arg::new("run").long("run").help("Segment run number"))
                .args(copy_args()),
        )
        .subcommand(
            Command::new("validate")
                .about("Read a stage and report whether it validates")
                .arg(stage_arg()),
        )
        .subcommand(
            Command::new("premis")
                .about("Create PREMIS records for content that has none")
                .arg(stage_arg()),
        )
        .subcommand(
            Command::new("restrict")
                .about("Add an access restriction to every PREMIS record in a stage")
                .arg(stage_arg())
                .arg(Arg::new("code").long("code").required(true).help("Restriction code"))
                .arg(flag("inactive", "inactive", "Record the restriction as inactive"))
                .arg(Arg::new("reason").long("reason").action(clap::ArgAction::Append).help("Reason (repeatable)"))
                .arg(Arg::new("stipulation").long("stipulation").action(clap::ArgAction::Append).help("Donor stipulation (repeatable)"))
                .arg(Arg::new("agent_id").long("agent-id").action(clap::ArgAction::Append).help("Linking agent identifier (repeatable)")),
        )
        .subcommand(
            Command::new("prune")
                .about("Delete content whose stage name matches a pattern")
                .arg(stage_arg())
                .arg(Arg::new("pattern").long("pattern").required(true).help("Regular expression"))
                .arg(flag("final", "final", "Actually delete (default is a dry run)")),
        )
        .subcommand(
            Command::new("techmd")
                .about("Run FITS over every node and attach the technical metadata")
                .arg(stage_arg()),
        )
        .subcommand(
            Command::new("convert")
                .about("Run a configured converter and attach the results as presforms")
                .arg(stage_arg())
                .arg(Arg::new("converter").long("converter").required(true).help("Converter name")),
        )
        .subcommand(
            Command::new("archive")
                .about("Serialize a stage into a pairtree archive")
                .arg(stage_arg())
                .arg(Arg::new("archive_root").long("archive-root").help("Archive root"))
                .args(copy_args()),
        )
        .subcommand(
            Command::new("copy")
                .about("Copy one item onto another and verify the result")
                .arg(Arg::new("src").required(true).help("Source file path or http(s) URL"))
                .arg(Arg::new("dst").required(true).help("Destination file path"))
                .arg(flag("clobber", "clobber", "Overwrite the destination when it differs"))
                .args(copy_args()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("ldrstage.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
