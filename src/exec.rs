//! Subprocess execution for command-backed steps.
use crate::error::{ProvisionError, UNAVAILABLE_EXIT_CODE};
use anyhow::{anyhow, Context, Result};
use std::io::ErrorKind;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus};

/// Split a configured command line into argv using shell quoting rules.
pub fn split_command(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command).with_context(|| format!("parse command: {command}"))?;
    if argv.is_empty() {
        return Err(anyhow!("command is empty"));
    }
    Ok(argv)
}

/// Exit code of a finished process; signal deaths map to `128 + signal`.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner {
    dry_run: bool,
}

impl CommandRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run `argv` with inherited stdio; a non-zero exit becomes `ProvisionError::Execution`.
    pub fn run(&self, argv: &[String]) -> Result<()> {
        let command_line = shell_words::join(argv);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("command is empty"))?;
        if self.dry_run {
            tracing::info!(command = %command_line, "dry run: not executing");
            return Ok(());
        }

        tracing::debug!(command = %command_line, "executing");
        let status = match Command::new(program).args(args).status() {
            Ok(status) => status,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ProvisionError::Execution {
                    command: command_line,
                    code: UNAVAILABLE_EXIT_CODE,
                }
                .into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("spawn {command_line}"));
            }
        };
        if status.success() {
            return Ok(());
        }
        Err(ProvisionError::Execution {
            command: command_line,
            code: exit_code_of(status),
        }
        .into())
    }
}
