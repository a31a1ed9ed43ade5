//! Provisioning plan configuration.
//!
//! The plan is a JSON document with a schema version and an ordered list of
//! steps. Loading and validation are separate so `init` can write a stub that
//! round-trips through the same checks `run` applies.
use crate::exec::split_command;
use crate::gate::{ConsumerThreshold, VersionRequirement};
use crate::remote::DEFAULT_PREVIEW_LINES;
use crate::subnet::SubnetSpec;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub const PLAN_SCHEMA_VERSION: u32 = 1;
/// Environment variable naming the plan file when `--config` is absent.
pub const CONFIG_ENV: &str = "HOSTPREP_CONFIG";
const CONFIG_DIR_NAME: &str = "hostprep";
const CONFIG_FILE_NAME: &str = "plan.json";
const DEFAULT_FIREWALL_TEMPLATE: &str = "ufw allow from {subnet} to any port {port} proto tcp";

fn default_preview_lines() -> usize {
    DEFAULT_PREVIEW_LINES
}

fn default_interpreter() -> String {
    "sh".to_string()
}

fn default_firewall_template() -> String {
    DEFAULT_FIREWALL_TEMPLATE.to_string()
}

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    pub schema_version: u32,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// One configured step; `kind` selects the body the plan builder attaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum StepConfig {
    Command {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flag: Option<String>,
        command: String,
        /// Skip the step when this requirement already holds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unless: Option<VersionRequirement>,
        /// Block the step while this requirement does not hold.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        requires: Option<VersionRequirement>,
    },
    EnsureTool {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flag: Option<String>,
        tool: String,
        #[serde(default = "default_version_args")]
        version_args: Vec<String>,
        install: String,
        consumers: Vec<ConsumerThreshold>,
    },
    Firewall {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flag: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subnet: Option<String>,
        port: u16,
        #[serde(default = "default_firewall_template")]
        command: String,
    },
    RemoteScript {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flag: Option<String>,
        url: String,
        #[serde(default = "default_preview_lines")]
        preview_lines: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        #[serde(default = "default_interpreter")]
        interpreter: String,
    },
}

impl StepConfig {
    pub fn name(&self) -> &str {
        match self {
            StepConfig::Command { name, .. }
            | StepConfig::EnsureTool { name, .. }
            | StepConfig::Firewall { name, .. }
            | StepConfig::RemoteScript { name, .. } => name,
        }
    }

    pub fn flag(&self) -> Option<&str> {
        match self {
            StepConfig::Command { flag, .. }
            | StepConfig::EnsureTool { flag, .. }
            | StepConfig::Firewall { flag, .. }
            | StepConfig::RemoteScript { flag, .. } => flag.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StepConfig::Command { .. } => "command",
            StepConfig::EnsureTool { .. } => "ensure_tool",
            StepConfig::Firewall { .. } => "firewall",
            StepConfig::RemoteScript { .. } => "remote_script",
        }
    }
}

/// Plan written by `hostprep init`.
pub fn default_config() -> PlanConfig {
    let node = |min_major| VersionRequirement::new("node", min_major);
    PlanConfig {
        schema_version: PLAN_SCHEMA_VERSION,
        steps: vec![
            StepConfig::Command {
                name: "refresh-package-index".to_string(),
                flag: None,
                command: "apt-get update".to_string(),
                unless: None,
                requires: None,
            },
            StepConfig::Command {
                name: "harden-sshd".to_string(),
                flag: Some("ssh".to_string()),
                command: "sh -c 'echo PasswordAuthentication no > /etc/ssh/sshd_config.d/50-hostprep.conf && systemctl reload ssh'".to_string(),
                unless: None,
                requires: None,
            },
            StepConfig::EnsureTool {
                name: "install-node".to_string(),
                flag: None,
                tool: "node".to_string(),
                version_args: default_version_args(),
                install: "apt-get install -y nodejs".to_string(),
                consumers: vec![
                    ConsumerThreshold {
                        flag: Some("web".to_string()),
                        min_major: 18,
                    },
                    ConsumerThreshold {
                        flag: Some("tooling".to_string()),
                        min_major: 20,
                    },
                ],
            },
            StepConfig::Command {
                name: "install-web-deps".to_string(),
                flag: Some("web".to_string()),
                command: "npm ci".to_string(),
                unless: None,
                requires: Some(node(18)),
            },
            StepConfig::Command {
                name: "install-tooling".to_string(),
                flag: Some("tooling".to_string()),
                command: "npm install --global pnpm".to_string(),
                unless: None,
                requires: Some(node(20)),
            },
            StepConfig::Firewall {
                name: "allow-ssh-from-lan".to_string(),
                flag: Some("ssh".to_string()),
                subnet: None,
                port: 22,
                command: default_firewall_template(),
            },
            StepConfig::RemoteScript {
                name: "install-rustup".to_string(),
                flag: Some("rust".to_string()),
                url: "https://sh.rustup.rs".to_string(),
                preview_lines: DEFAULT_PREVIEW_LINES,
                prompt: None,
                interpreter: default_interpreter(),
            },
        ],
    }
}

/// Render the default plan as pretty JSON.
pub fn config_stub() -> Result<String> {
    serde_json::to_string_pretty(&default_config()).context("serialize plan stub")
}

/// Pick the plan path: explicit flag, then `HOSTPREP_CONFIG`, then the user config dir.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    choose_config_path(explicit, std::env::var_os(CONFIG_ENV), dirs::config_dir())
}

fn choose_config_path(
    explicit: Option<&Path>,
    from_env: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(value) = from_env.filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(value));
    }
    let dir = config_dir.ok_or_else(|| {
        anyhow!("no config directory available; pass --config or set {CONFIG_ENV}")
    })?;
    Ok(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn load_config(path: &Path) -> Result<PlanConfig> {
    let bytes = fs::read(path).with_context(|| format!("read plan {}", path.display()))?;
    let config: PlanConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse plan JSON {}", path.display()))?;
    Ok(config)
}

/// Persist a plan as pretty JSON, creating parent directories.
pub fn write_config(path: &Path, config: &PlanConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config dir {}", parent.display()))?;
    }
    let mut text = serde_json::to_string_pretty(config).context("serialize plan")?;
    text.push('\n');
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn validate_config(config: &PlanConfig) -> Result<()> {
    if config.schema_version != PLAN_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported plan schema_version {} (expected {PLAN_SCHEMA_VERSION})",
            config.schema_version
        ));
    }
    let mut seen = BTreeSet::new();
    for step in &config.steps {
        let name = step.name();
        if name.trim().is_empty() {
            return Err(anyhow!("{} step has an empty name", step.kind()));
        }
        if !seen.insert(name) {
            return Err(anyhow!("duplicate step name {name:?}"));
        }
        if step.flag().is_some_and(|flag| flag.trim().is_empty()) {
            return Err(anyhow!("step {name:?}: flag must be non-empty when set"));
        }
        validate_step(step).with_context(|| format!("step {name:?}"))?;
    }
    Ok(())
}

fn validate_step(step: &StepConfig) -> Result<()> {
    match step {
        StepConfig::Command {
            command,
            unless,
            requires,
            ..
        } => {
            split_command(command)?;
            for requirement in unless.iter().chain(requires) {
                validate_requirement(requirement)?;
            }
        }
        StepConfig::EnsureTool {
            tool,
            install,
            consumers,
            ..
        } => {
            if tool.trim().is_empty() {
                return Err(anyhow!("tool must be non-empty"));
            }
            split_command(install).context("install")?;
            if consumers.is_empty() {
                return Err(anyhow!("ensure_tool needs at least one consumer"));
            }
        }
        StepConfig::Firewall {
            subnet,
            port,
            command,
            ..
        } => {
            if let Some(literal) = subnet {
                SubnetSpec::parse(literal)?;
            }
            if *port == 0 {
                return Err(anyhow!("port must be between 1 and 65535"));
            }
            if !command.contains("{subnet}") {
                return Err(anyhow!("firewall command must contain {{subnet}}"));
            }
            split_command(command)?;
        }
        StepConfig::RemoteScript {
            url,
            preview_lines,
            interpreter,
            ..
        } => {
            if !url.starts_with("https://") {
                return Err(anyhow!("remote script url must use https:// (got {url:?})"));
            }
            if *preview_lines == 0 {
                return Err(anyhow!("preview_lines must be at least 1"));
            }
            split_command(interpreter).context("interpreter")?;
        }
    }
    Ok(())
}

fn validate_requirement(requirement: &VersionRequirement) -> Result<()> {
    if requirement.tool.trim().is_empty() {
        return Err(anyhow!("requirement tool must be non-empty"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
