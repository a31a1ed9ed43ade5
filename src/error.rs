//! Error taxonomy for provisioning operations.
//!
//! Step bodies return `anyhow::Result`; these variants are the typed causes the
//! orchestrator and CLI inspect when deciding exit codes and summaries.
use crate::subnet::SubnetError;
use thiserror::Error;

/// Exit code recorded when a step body returns an error without a status.
pub const GENERIC_FAILURE_EXIT_CODE: i32 = 1;
/// Exit code recorded when a step body panics.
pub const PANIC_EXIT_CODE: i32 = 101;
/// Exit code recorded when a program cannot be spawned or a dependency is unmet.
pub const UNAVAILABLE_EXIT_CODE: i32 = 127;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A tool probe found nothing usable; callers treat this as "not satisfied".
    #[error("probe for {tool} failed: {detail}")]
    TransientProbeFailure { tool: String, detail: String },

    #[error(transparent)]
    Validation(#[from] SubnetError),

    #[error("{operation} declined by operator")]
    UserDeclined { operation: String },

    #[error("{command} exited with status {code}")]
    Execution { command: String, code: i32 },

    #[error("download of {url} failed: {detail}")]
    Fetch { url: String, detail: String },

    #[error("subnet detection failed and no interactive input is available")]
    DetectionFailed,

    #[error("{requirement} is not satisfied")]
    Blocked { requirement: String },
}

impl ProvisionError {
    /// Exit code the ledger records when this error ends a step.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::Execution { code, .. } => *code,
            ProvisionError::Blocked { .. } => UNAVAILABLE_EXIT_CODE,
            _ => GENERIC_FAILURE_EXIT_CODE,
        }
    }
}

/// Map an arbitrary step error to the exit code recorded in the ledger.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ProvisionError>())
        .map(ProvisionError::exit_code)
        .unwrap_or(GENERIC_FAILURE_EXIT_CODE)
}
