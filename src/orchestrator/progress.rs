//! Progress notifications emitted while a run is underway.
//!
//! Sinks are write-only observers; nothing they do feeds back into the run.
use super::StepOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StepStarted {
        index: usize,
        total: usize,
        name: String,
    },
    StepFinished {
        index: usize,
        total: usize,
        name: String,
        outcome: StepOutcome,
        elapsed_ms: u128,
    },
}

pub trait ProgressSink {
    fn on_event(&mut self, event: &ProgressEvent);
}

/// Default sink: forwards progress into the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_event(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::StepStarted { index, total, name } => {
                tracing::info!(step = %name, position = index + 1, total, "step started");
            }
            ProgressEvent::StepFinished {
                name,
                outcome,
                elapsed_ms,
                ..
            } => match outcome {
                StepOutcome::Success => {
                    tracing::info!(step = %name, elapsed_ms, "step succeeded");
                }
                StepOutcome::Failed { exit_code } => {
                    tracing::warn!(step = %name, elapsed_ms, exit_code, "step failed");
                }
                StepOutcome::Skipped { reason } => {
                    tracing::info!(step = %name, elapsed_ms, %reason, "step skipped");
                }
            },
        }
    }
}

/// Collecting sink, mostly for tests and JSON transcripts.
impl ProgressSink for Vec<ProgressEvent> {
    fn on_event(&mut self, event: &ProgressEvent) {
        self.push(event.clone());
    }
}
