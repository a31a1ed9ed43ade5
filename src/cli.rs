//! CLI argument parsing for host provisioning.
//!
//! Parsing stays declarative; `main` turns these structs into runtime options.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "hostprep",
    version,
    about = "Apply an ordered provisioning plan to this host",
    after_help = "Commands:\n  init                      Write a stub plan\n  run                       Run the plan, continuing past failed steps\n  check --tool <T> --min-major <N>  Probe a tool version\n  subnet                    Resolve the local subnet for firewall rules\n  fetch-run --url <U>       Preview and confirm a remote script before running it\n\nExamples:\n  hostprep init\n  hostprep run --enable web --enable ssh\n  hostprep run --all --subnet 192.168.1.0/24 --non-interactive --json\n  hostprep check --tool node --min-major 20\n  hostprep fetch-run --url https://sh.rustup.rs",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Run(RunArgs),
    Check(CheckArgs),
    Subnet(SubnetArgs),
    FetchRun(FetchRunArgs),
}

impl Command {
    pub fn verbose(&self) -> bool {
        match self {
            Command::Run(args) => args.verbose,
            Command::Check(args) => args.verbose,
            Command::Subnet(args) => args.verbose,
            Command::FetchRun(args) => args.verbose,
            Command::Init(_) => false,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Write a stub provisioning plan")]
pub struct InitArgs {
    /// Plan file to write (defaults to $HOSTPREP_CONFIG or the user config dir)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Overwrite an existing plan
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Run every enabled step in order and summarize the outcome")]
pub struct RunArgs {
    /// Plan file (defaults to $HOSTPREP_CONFIG or the user config dir)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable a feature flag; repeatable
    #[arg(long = "enable", value_name = "FLAG")]
    pub enable: Vec<String>,

    /// Enable every flag the plan declares
    #[arg(long)]
    pub all: bool,

    /// Subnet for firewall steps, overriding the plan and detection
    #[arg(long, value_name = "CIDR")]
    pub subnet: Option<String>,

    /// Never prompt; confirmations are refused
    #[arg(long)]
    pub non_interactive: bool,

    /// Log commands instead of executing them; remote scripts are previewed only
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run ledger as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Debug-level logging
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Check whether a tool is installed at a minimum major version")]
pub struct CheckArgs {
    #[arg(long, value_name = "TOOL")]
    pub tool: String,

    #[arg(long, value_name = "N")]
    pub min_major: u64,

    /// Argument used to query the version; repeatable
    #[arg(long = "version-arg", value_name = "ARG")]
    pub version_args: Vec<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Resolve and print the subnet firewall rules would use")]
pub struct SubnetArgs {
    /// Explicit subnet literal (A.B.C.D/N)
    #[arg(long, value_name = "CIDR")]
    pub subnet: Option<String>,

    #[arg(long)]
    pub non_interactive: bool,

    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Download a script, preview it, and run it only after confirmation")]
pub struct FetchRunArgs {
    #[arg(long, value_name = "URL")]
    pub url: String,

    /// Lines of the script shown before asking (at least 1)
    #[arg(
        long,
        value_name = "N",
        default_value_t = hostprep::remote::DEFAULT_PREVIEW_LINES as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub preview_lines: u64,

    /// Confirmation question
    #[arg(long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Interpreter command line the script is passed to
    #[arg(long, value_name = "CMD", default_value = "sh")]
    pub interpreter: String,

    /// Fetch and preview only
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long)]
    pub verbose: bool,
}
