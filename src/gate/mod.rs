//! Capability gating: decide whether a dependency is already satisfied.
//!
//! The gate is a pure predicate over observable system state. A missing tool
//! or unreadable version is "not satisfied", never an error, so a remediation
//! path always stays available.
mod probe;
mod version;

pub use probe::{Probe, SystemProbe};
pub use version::Version;

use crate::error::ProvisionError;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

/// A tool that must be present at or above a major version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionRequirement {
    pub tool: String,
    pub min_major: u64,
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
}

impl VersionRequirement {
    pub fn new(tool: impl Into<String>, min_major: u64) -> Self {
        Self {
            tool: tool.into(),
            min_major,
            version_args: default_version_args(),
        }
    }

    pub fn with_min_major(&self, min_major: u64) -> Self {
        Self {
            min_major,
            ..self.clone()
        }
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} >= {}", self.tool, self.min_major)
    }
}

/// What a probe observed for one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    Missing,
    Unparsable { raw: Option<String> },
    Outdated { found: Version },
    Satisfied { found: Version },
}

impl GateStatus {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, GateStatus::Satisfied { .. })
    }

    /// Probe-level failure behind a "not satisfied" verdict, if any.
    pub fn probe_failure(&self, tool: &str) -> Option<ProvisionError> {
        let detail = match self {
            GateStatus::Missing => "not found on PATH".to_string(),
            GateStatus::Unparsable { raw: Some(raw) } => format!("unrecognized version {raw:?}"),
            GateStatus::Unparsable { raw: None } => "version query failed".to_string(),
            GateStatus::Outdated { .. } | GateStatus::Satisfied { .. } => return None,
        };
        Some(ProvisionError::TransientProbeFailure {
            tool: tool.to_string(),
            detail,
        })
    }

    pub fn describe(&self, requirement: &VersionRequirement) -> String {
        match self {
            GateStatus::Missing => format!("{} is not installed", requirement.tool),
            GateStatus::Unparsable { .. } => {
                format!("{} version could not be determined", requirement.tool)
            }
            GateStatus::Outdated { found } => {
                format!("{} {found} is older than {requirement}", requirement.tool)
            }
            GateStatus::Satisfied { found } => {
                format!("{} {found} already satisfies {requirement}", requirement.tool)
            }
        }
    }
}

/// Whether a gated step should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Execute,
    Skip { reason: String },
    Block { reason: String },
}

pub struct CapabilityGate<P: Probe> {
    probe: P,
}

impl Default for CapabilityGate<SystemProbe> {
    fn default() -> Self {
        Self::new(SystemProbe)
    }
}

impl<P: Probe> CapabilityGate<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    pub fn check(&self, requirement: &VersionRequirement) -> GateStatus {
        let Some(program) = self.probe.locate(&requirement.tool) else {
            tracing::debug!(tool = %requirement.tool, "tool not found");
            return GateStatus::Missing;
        };
        let Some(raw) = self
            .probe
            .version_output(&program, &requirement.version_args)
        else {
            return GateStatus::Unparsable { raw: None };
        };
        let Some(found) = Version::parse(&raw) else {
            tracing::debug!(tool = %requirement.tool, %raw, "unparsable version output");
            return GateStatus::Unparsable { raw: Some(raw) };
        };
        tracing::debug!(
            tool = %requirement.tool,
            found = %found,
            required = requirement.min_major,
            "version probed"
        );
        if found.major >= requirement.min_major {
            GateStatus::Satisfied { found }
        } else {
            GateStatus::Outdated { found }
        }
    }

    pub fn satisfied(&self, requirement: &VersionRequirement) -> bool {
        self.check(requirement).is_satisfied()
    }

    /// Remediation steps (installs) are skipped once the requirement holds.
    pub fn decide_remediation(&self, requirement: &VersionRequirement) -> GateDecision {
        let status = self.check(requirement);
        if status.is_satisfied() {
            GateDecision::Skip {
                reason: status.describe(requirement),
            }
        } else {
            GateDecision::Execute
        }
    }

    /// Dependent steps are blocked while their requirement does not hold.
    pub fn decide_consumer(&self, requirement: &VersionRequirement) -> GateDecision {
        let status = self.check(requirement);
        if status.is_satisfied() {
            GateDecision::Execute
        } else {
            GateDecision::Block {
                reason: status.describe(requirement),
            }
        }
    }
}

/// Minimum major version a downstream consumer needs from a shared tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerThreshold {
    /// Feature flag that requests this consumer; `None` means always requested.
    #[serde(default)]
    pub flag: Option<String>,
    pub min_major: u64,
}

/// Fold the thresholds of every requested consumer into one requirement.
///
/// The highest floor wins so a single remediation covers every consumer.
/// Returns `None` when no consumer is requested.
pub fn effective_requirement<F>(
    base: &VersionRequirement,
    thresholds: &[ConsumerThreshold],
    requested: F,
) -> Option<VersionRequirement>
where
    F: Fn(&str) -> bool,
{
    thresholds
        .iter()
        .filter(|threshold| match threshold.flag.as_deref() {
            Some(flag) => requested(flag),
            None => true,
        })
        .map(|threshold| threshold.min_major)
        .max()
        .map(|min_major| base.with_min_major(min_major))
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
