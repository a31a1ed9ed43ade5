//! Subnet resolution as a state machine plus a prompter-driven loop.
//!
//! `ResolveMachine` holds all precedence and validation rules and never
//! touches a terminal; `SubnetResolver` feeds it answers from a `Prompter`.
use super::detect::{detect_subnet, IpCommandInspector, NetworkInspector};
use super::{SubnetError, SubnetSpec, SUBNET_PATTERN};
use crate::error::ProvisionError;
use crate::prompt::Prompter;
use anyhow::Result;

/// Question the machine is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Accept the auto-detected range, or decline to type one in.
    ConfirmDetected(SubnetSpec),
    /// Manual literal entry; `retry` carries the previous attempt's error.
    EnterManual { retry: Option<SubnetError> },
    /// Explicit go-ahead for a range at or below the broad prefix threshold.
    ConfirmBroad(SubnetSpec),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Yes,
    No,
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveState {
    NeedsInput(Prompt),
    Accepted(SubnetSpec),
    Declined,
}

/// Final answer of a resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accepted(SubnetSpec),
    Declined,
}

#[derive(Debug, Clone)]
pub struct ResolveMachine {
    interactive: bool,
    state: ResolveState,
}

impl ResolveMachine {
    /// Begin resolution. `detect` is only called when no explicit value is given.
    ///
    /// Fails on an invalid explicit literal, and on failed detection when no
    /// interactive input is available.
    pub fn start<F>(
        explicit: Option<&str>,
        interactive: bool,
        detect: F,
    ) -> Result<Self, ProvisionError>
    where
        F: FnOnce() -> Option<SubnetSpec>,
    {
        let state = match explicit {
            Some(literal) => {
                let spec = SubnetSpec::parse(literal)?;
                Self::accept_or_confirm(spec, interactive)
            }
            None => match detect() {
                Some(spec) if interactive => {
                    ResolveState::NeedsInput(Prompt::ConfirmDetected(spec))
                }
                Some(spec) => Self::accept_or_confirm(spec, interactive),
                None if interactive => {
                    ResolveState::NeedsInput(Prompt::EnterManual { retry: None })
                }
                None => return Err(ProvisionError::DetectionFailed),
            },
        };
        Ok(Self { interactive, state })
    }

    pub fn state(&self) -> &ResolveState {
        &self.state
    }

    /// Advance with the operator's answer to the pending prompt.
    pub fn feed(&mut self, input: Input) -> &ResolveState {
        let ResolveState::NeedsInput(prompt) = &self.state else {
            return &self.state;
        };
        self.state = match (prompt, input) {
            (Prompt::ConfirmDetected(spec), Input::Yes) => {
                Self::accept_or_confirm(*spec, self.interactive)
            }
            (Prompt::ConfirmDetected(_), _) => {
                ResolveState::NeedsInput(Prompt::EnterManual { retry: None })
            }
            (Prompt::EnterManual { .. }, input) => {
                let literal = match input {
                    Input::Text(text) => text,
                    Input::Yes | Input::No => String::new(),
                };
                match SubnetSpec::parse(&literal) {
                    Ok(spec) => Self::accept_or_confirm(spec, self.interactive),
                    Err(err) => ResolveState::NeedsInput(Prompt::EnterManual { retry: Some(err) }),
                }
            }
            (Prompt::ConfirmBroad(spec), Input::Yes) => ResolveState::Accepted(*spec),
            (Prompt::ConfirmBroad(_), _) => ResolveState::Declined,
        };
        &self.state
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self.state {
            ResolveState::Accepted(spec) => Some(Resolution::Accepted(spec)),
            ResolveState::Declined => Some(Resolution::Declined),
            ResolveState::NeedsInput(_) => None,
        }
    }

    fn accept_or_confirm(spec: SubnetSpec, interactive: bool) -> ResolveState {
        if !spec.is_broad() {
            return ResolveState::Accepted(spec);
        }
        if interactive {
            ResolveState::NeedsInput(Prompt::ConfirmBroad(spec))
        } else {
            tracing::warn!(
                subnet = %spec,
                "broad subnet needs confirmation; refusing in non-interactive mode"
            );
            ResolveState::Declined
        }
    }
}

pub struct SubnetResolver<N: NetworkInspector> {
    inspector: N,
}

impl Default for SubnetResolver<IpCommandInspector> {
    fn default() -> Self {
        Self::new(IpCommandInspector::default())
    }
}

impl<N: NetworkInspector> SubnetResolver<N> {
    pub fn new(inspector: N) -> Self {
        Self { inspector }
    }

    /// Resolve the subnet, asking `prompter` whenever the machine needs input.
    pub fn resolve(
        &self,
        explicit: Option<&str>,
        interactive: bool,
        prompter: &mut dyn Prompter,
    ) -> Result<Resolution> {
        let mut machine =
            ResolveMachine::start(explicit, interactive, || detect_subnet(&self.inspector))?;
        loop {
            match machine.state().clone() {
                ResolveState::Accepted(spec) => {
                    tracing::info!(subnet = %spec, "subnet resolved");
                    return Ok(Resolution::Accepted(spec));
                }
                ResolveState::Declined => return Ok(Resolution::Declined),
                ResolveState::NeedsInput(prompt) => {
                    let input = ask(prompter, &prompt)?;
                    machine.feed(input);
                }
            }
        }
    }
}

fn ask(prompter: &mut dyn Prompter, prompt: &Prompt) -> Result<Input> {
    let yes_no = |granted: bool| if granted { Input::Yes } else { Input::No };
    match prompt {
        Prompt::ConfirmDetected(spec) => {
            let question = format!("Detected local subnet {spec}. Use it?");
            Ok(yes_no(prompter.confirm(&question, true)?))
        }
        Prompt::EnterManual { retry } => {
            if let Some(err) = retry {
                prompter.notify(&err.to_string());
            }
            let text = prompter.read_line(&format!("Enter subnet ({SUBNET_PATTERN}):"))?;
            Ok(Input::Text(text))
        }
        Prompt::ConfirmBroad(spec) => {
            prompter.notify(&format!(
                "WARNING: {spec} covers {} addresses, far more than a typical private network.",
                spec.address_count()
            ));
            let question = format!("Really allow the whole {spec} range?");
            Ok(yes_no(prompter.confirm(&question, false)?))
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
