//! Shared helpers for driving the hostprep binary in integration tests.
#![allow(dead_code)]

use serde_json::Value;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Scratch directory holding a plan file and whatever the steps write.
pub struct Workspace {
    pub dir: TempDir,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create workspace"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn plan_path(&self) -> PathBuf {
        self.path("plan.json")
    }

    pub fn write_plan(&self, steps: Value) -> PathBuf {
        let plan = serde_json::json!({ "schema_version": 1, "steps": steps });
        let path = self.plan_path();
        fs::write(&path, serde_json::to_vec_pretty(&plan).expect("serialize plan"))
            .expect("write plan");
        path
    }

    /// Shell command appending `text` to the file `name` in this workspace.
    pub fn append(&self, name: &str, text: &str) -> String {
        format!("sh -c 'echo {text} >> {}'", self.path(name).display())
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).unwrap_or_default()
    }

    /// Install an executable `name` that prints `version_line` and exits 0.
    pub fn fake_tool(&self, name: &str, version_line: &str) {
        let bin = self.path("bin");
        fs::create_dir_all(&bin).expect("create bin dir");
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\necho '{version_line}'\n")).expect("write tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod tool");
    }

    /// PATH with this workspace's `bin` directory searched first.
    pub fn search_path(&self) -> String {
        let inherited = std::env::var("PATH").unwrap_or_default();
        format!("{}:{inherited}", self.path("bin").display())
    }
}

/// Command for the built binary with a closed stdin and quiet logging.
pub fn hostprep(workdir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_hostprep"));
    command
        .current_dir(workdir)
        .env_remove("HOSTPREP_CONFIG")
        .env("HOSTPREP_LOG", "warn")
        .stdin(Stdio::null());
    command
}

pub fn run(command: &mut Command) -> Output {
    command.output().expect("spawn hostprep")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
