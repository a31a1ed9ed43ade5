//! External probes the capability gate consults.
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub trait Probe {
    /// Resolve a tool name to an executable, `None` when absent.
    fn locate(&self, tool: &str) -> Option<PathBuf>;

    /// Run the tool's version query and return its text, `None` on failure.
    fn version_output(&self, program: &Path, args: &[String]) -> Option<String>;
}

/// Probe backed by `PATH` lookup and a real subprocess.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl Probe for SystemProbe {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }

    fn version_output(&self, program: &Path, args: &[String]) -> Option<String> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            tracing::debug!(
                program = %program.display(),
                status = %output.status,
                "version query exited unsuccessfully"
            );
            return None;
        }
        // Some tools (ssh -V, older java) report on stderr.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stdout.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            stdout.into_owned()
        };
        let line = text.lines().find(|line| !line.trim().is_empty())?;
        Some(line.trim().to_string())
    }
}
