//! Sequential step runner with continue-on-error semantics.
//!
//! Every step is attempted in order. A failing or panicking step is recorded
//! in the ledger and the run moves on; `run` itself never fails.
mod ledger;
mod progress;
mod summary;

pub use ledger::{FailureEntry, RunLedger, SkipEntry, StepOutcome, StepResult};
pub use progress::{ProgressEvent, ProgressSink, TracingSink};
pub use summary::render_summary;

use crate::error::{exit_code_for, PANIC_EXIT_CODE};
use anyhow::Result;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

pub type StepAction<'a> = Box<dyn FnOnce() -> Result<StepOutcome> + 'a>;

/// One named unit of provisioning work.
pub struct Step<'a> {
    name: String,
    action: StepAction<'a>,
}

impl<'a> Step<'a> {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Result<StepOutcome> + 'a,
    {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Step<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

pub struct Orchestrator<S: ProgressSink> {
    sink: S,
}

impl Default for Orchestrator<TracingSink> {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

impl<S: ProgressSink> Orchestrator<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run every step in order and return the ledger of outcomes.
    pub fn run(&mut self, steps: Vec<Step<'_>>) -> RunLedger {
        let mut ledger = RunLedger::new();
        let total = steps.len();
        for (index, Step { name, action }) in steps.into_iter().enumerate() {
            self.sink.on_event(&ProgressEvent::StepStarted {
                index,
                total,
                name: name.clone(),
            });
            let start = Instant::now();
            let outcome = invoke(&name, action);
            let elapsed_ms = start.elapsed().as_millis();
            ledger.record(&name, outcome.clone());
            self.sink.on_event(&ProgressEvent::StepFinished {
                index,
                total,
                name,
                outcome,
                elapsed_ms,
            });
        }
        ledger
    }
}

fn invoke(name: &str, action: StepAction<'_>) -> StepOutcome {
    match panic::catch_unwind(AssertUnwindSafe(action)) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            let exit_code = exit_code_for(&err);
            tracing::error!(step = %name, exit_code, "{err:#}");
            StepOutcome::Failed { exit_code }
        }
        Err(_) => {
            tracing::error!(step = %name, "step panicked");
            StepOutcome::Failed {
                exit_code: PANIC_EXIT_CODE,
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
