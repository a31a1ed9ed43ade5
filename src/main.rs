mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{CheckArgs, Command, FetchRunArgs, InitArgs, RootArgs, RunArgs, SubnetArgs};
use hostprep::config::{
    default_config, load_config, resolve_config_path, validate_config, write_config,
};
use hostprep::exec::{split_command, CommandRunner};
use hostprep::gate::{CapabilityGate, GateStatus, SystemProbe, VersionRequirement};
use hostprep::orchestrator::{render_summary, Orchestrator, TracingSink};
use hostprep::plan::{check_enabled_flags, PlanBuilder, RunOptions};
use hostprep::prompt::{ClosedPrompter, Prompter, TerminalPrompter};
use hostprep::remote::{fetch_preview_confirm_run, HttpFetcher, RemoteOutcome, RemoteScript};
use hostprep::subnet::{IpCommandInspector, Resolution, SubnetResolver};
use std::cell::RefCell;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "HOSTPREP_LOG";

fn main() -> Result<ExitCode> {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());

    match args.command {
        Command::Init(args) => cmd_init(args),
        Command::Run(args) => cmd_run(args),
        Command::Check(args) => cmd_check(args),
        Command::Subnet(args) => cmd_subnet(args),
        Command::FetchRun(args) => cmd_fetch_run(args),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(io::stderr)
        .init();
}

fn exit_status(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn cmd_init(args: InitArgs) -> Result<ExitCode> {
    let path = resolve_config_path(args.config.as_deref())?;
    if path.exists() && !args.force {
        return Err(anyhow!(
            "{} already exists; pass --force to overwrite",
            path.display()
        ));
    }
    write_config(&path, &default_config())?;
    println!("wrote plan to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let path = resolve_config_path(args.config.as_deref())?;
    let plan = load_config(&path)?;
    validate_config(&plan).with_context(|| format!("invalid plan {}", path.display()))?;

    let interactive = !args.non_interactive && TerminalPrompter::available();
    let options = RunOptions {
        enabled: args.enable.into_iter().collect(),
        all: args.all,
        subnet: args.subnet,
        interactive,
        dry_run: args.dry_run,
    };
    check_enabled_flags(&plan, &options)?;
    tracing::info!(
        plan = %path.display(),
        interactive,
        dry_run = options.dry_run,
        "starting run"
    );

    let terminal = RefCell::new(TerminalPrompter);
    let closed = RefCell::new(ClosedPrompter);
    // JSON output owns stdout, so previews move to stderr.
    let stdout = RefCell::new(io::stdout());
    let stderr = RefCell::new(io::stderr());

    let gate = CapabilityGate::new(SystemProbe);
    let resolver = SubnetResolver::new(IpCommandInspector::default());
    let fetcher = HttpFetcher::default();
    let builder = PlanBuilder {
        options: &options,
        gate: &gate,
        resolver: &resolver,
        fetcher: &fetcher,
        runner: CommandRunner::new(options.dry_run),
        prompter: if interactive { &terminal } else { &closed },
        preview_out: if args.json { &stderr } else { &stdout },
    };
    let steps = builder.build(&plan)?;
    let ledger = Orchestrator::new(TracingSink).run(steps);

    if args.json {
        let text = serde_json::to_string_pretty(&ledger).context("serialize run ledger")?;
        println!("{text}");
    } else {
        print!("{}", render_summary(&ledger));
    }
    if ledger.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_check(args: CheckArgs) -> Result<ExitCode> {
    let mut requirement = VersionRequirement::new(args.tool, args.min_major);
    if !args.version_args.is_empty() {
        requirement.version_args = args.version_args;
    }
    let gate = CapabilityGate::new(SystemProbe);
    let status = gate.check(&requirement);
    if let Some(failure) = status.probe_failure(&requirement.tool) {
        tracing::debug!("{failure}");
    }
    let found = match &status {
        GateStatus::Outdated { found } | GateStatus::Satisfied { found } => Some(found.to_string()),
        _ => None,
    };

    if args.json {
        let report = serde_json::json!({
            "tool": requirement.tool,
            "min_major": requirement.min_major,
            "satisfied": status.is_satisfied(),
            "found": found,
            "detail": status.describe(&requirement),
        });
        let text = serde_json::to_string_pretty(&report).context("serialize check report")?;
        println!("{text}");
    } else {
        println!("{}", status.describe(&requirement));
    }
    if status.is_satisfied() {
        return Ok(ExitCode::SUCCESS);
    }
    Ok(ExitCode::FAILURE)
}

fn cmd_subnet(args: SubnetArgs) -> Result<ExitCode> {
    let interactive = !args.non_interactive && TerminalPrompter::available();
    let mut terminal = TerminalPrompter;
    let mut closed = ClosedPrompter;
    let prompter: &mut dyn Prompter = if interactive {
        &mut terminal
    } else {
        &mut closed
    };
    let resolver = SubnetResolver::new(IpCommandInspector::default());
    match resolver.resolve(args.subnet.as_deref(), interactive, prompter)? {
        Resolution::Accepted(spec) => {
            println!("{spec}");
            Ok(ExitCode::SUCCESS)
        }
        Resolution::Declined => {
            eprintln!("subnet declined");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn cmd_fetch_run(args: FetchRunArgs) -> Result<ExitCode> {
    let mut script = RemoteScript::new(args.url);
    script.preview_lines = usize::try_from(args.preview_lines).unwrap_or(usize::MAX);
    if let Some(prompt) = args.prompt {
        script.prompt = prompt;
    }
    script.interpreter = split_command(&args.interpreter).context("parse --interpreter")?;
    script.dry_run = args.dry_run;

    let interactive = TerminalPrompter::available();
    let mut terminal = TerminalPrompter;
    let mut closed = ClosedPrompter;
    let prompter: &mut dyn Prompter = if interactive {
        &mut terminal
    } else {
        &mut closed
    };
    let fetcher = HttpFetcher::default();
    let mut stdout = io::stdout();
    match fetch_preview_confirm_run(&fetcher, prompter, &mut stdout, &script)? {
        RemoteOutcome::Executed { exit_code } => Ok(exit_status(exit_code)),
        RemoteOutcome::Previewed => Ok(ExitCode::SUCCESS),
        RemoteOutcome::Declined => {
            eprintln!("declined; script discarded");
            Ok(ExitCode::FAILURE)
        }
        RemoteOutcome::FetchFailed { detail } => {
            eprintln!("download failed: {detail}");
            Ok(ExitCode::FAILURE)
        }
    }
}
