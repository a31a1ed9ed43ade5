//! Download, preview, confirm, execute: the gate in front of remote scripts.
//!
//! The downloaded file lives in a uniquely named temp file that is removed on
//! every path out of `fetch_preview_confirm_run`, including signals.
mod cleanup;

pub use cleanup::SignalCleanup;
#[cfg(test)]
pub(crate) use cleanup::TEST_LOCK;

use crate::exec::exit_code_of;
use crate::prompt::{ConfirmationGate, Prompter};
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

pub const DEFAULT_PREVIEW_LINES: usize = 20;
const TEMP_PREFIX: &str = "hostprep-remote-";

pub trait Fetcher {
    /// Stream the body of `url` into `sink`, returning the byte count.
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// HTTPS fetcher backed by a ureq agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .https_only(true)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let response = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("GET {url}"))?;
        let mut reader = response.into_body().into_reader();
        let bytes = io::copy(&mut reader, sink).with_context(|| format!("read body of {url}"))?;
        Ok(bytes)
    }
}

#[derive(Debug, Clone)]
pub struct RemoteScript {
    pub url: String,
    pub preview_lines: usize,
    pub prompt: String,
    /// Program (and leading args) the downloaded file is handed to.
    pub interpreter: Vec<String>,
    /// Directory for the temp file; the system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
    /// Fetch and preview, but never ask or execute.
    pub dry_run: bool,
}

impl RemoteScript {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            prompt: format!("Execute the script downloaded from {url}?"),
            url,
            preview_lines: DEFAULT_PREVIEW_LINES,
            interpreter: vec!["sh".to_string()],
            scratch_dir: None,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Executed { exit_code: i32 },
    Declined,
    FetchFailed { detail: String },
    /// Dry run: fetched and previewed only.
    Previewed,
}

/// Download `script.url`, show its head, and run it only on an explicit yes.
pub fn fetch_preview_confirm_run(
    fetcher: &dyn Fetcher,
    prompter: &mut dyn Prompter,
    preview_out: &mut dyn Write,
    script: &RemoteScript,
) -> Result<RemoteOutcome> {
    let (program, leading_args) = script
        .interpreter
        .split_first()
        .ok_or_else(|| anyhow!("remote script interpreter is empty"))?;
    let scratch_dir = script
        .scratch_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(&scratch_dir)
        .with_context(|| format!("create temp file in {}", scratch_dir.display()))?;
    let _signal_cleanup = SignalCleanup::register(temp.path());

    tracing::info!(url = %script.url, "downloading remote script");
    let fetched = fetcher
        .fetch(&script.url, temp.as_file_mut())
        .and_then(|bytes| {
            temp.as_file_mut().flush().context("flush download")?;
            Ok(bytes)
        });
    let bytes = match fetched {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(url = %script.url, "download failed: {err:#}");
            temp.close().context("remove partial download")?;
            return Ok(RemoteOutcome::FetchFailed {
                detail: format!("{err:#}"),
            });
        }
    };
    tracing::debug!(url = %script.url, bytes, "download complete");

    write_preview(preview_out, &script.url, temp.path(), script.preview_lines)?;

    if script.dry_run {
        temp.close().context("remove downloaded script")?;
        return Ok(RemoteOutcome::Previewed);
    }

    let gate = ConfirmationGate::ask(prompter, &script.prompt, false)?;
    if !gate.granted {
        tracing::info!(url = %script.url, "remote script declined");
        temp.close().context("remove downloaded script")?;
        return Ok(RemoteOutcome::Declined);
    }

    let status = Command::new(program)
        .args(leading_args)
        .arg(temp.path())
        .status()
        .with_context(|| format!("run {program} on script from {}", script.url))?;
    let exit_code = exit_code_of(status);
    tracing::info!(url = %script.url, exit_code, "remote script finished");
    temp.close().context("remove downloaded script")?;
    Ok(RemoteOutcome::Executed { exit_code })
}

fn write_preview(out: &mut dyn Write, url: &str, path: &Path, lines: usize) -> Result<()> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    writeln!(out, "==> {url} (first {lines} lines)")?;
    let mut shown = 0usize;
    let mut line = Vec::new();
    while shown < lines {
        line.clear();
        if reader.read_until(b'\n', &mut line).context("read download")? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        writeln!(out, "    {}", text.trim_end_matches(['\r', '\n']))?;
        shown += 1;
    }
    let at_end = reader.fill_buf().context("read download")?.is_empty();
    if at_end {
        writeln!(out, "==> end of script")?;
    } else {
        writeln!(out, "==> ... (truncated after {shown} lines)")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
