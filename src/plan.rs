//! Turn a validated plan into orchestrator steps.
//!
//! Flag gating happens here: a step whose flag is not enabled never becomes a
//! `Step` and so never reaches the ledger. Gate and resolver decisions happen
//! inside the step bodies so they observe the system as earlier steps left it.
use crate::config::{PlanConfig, StepConfig};
use crate::error::ProvisionError;
use crate::exec::{split_command, CommandRunner};
use crate::gate::{
    effective_requirement, CapabilityGate, ConsumerThreshold, GateDecision, Probe,
    VersionRequirement,
};
use crate::orchestrator::{Step, StepOutcome};
use crate::prompt::Prompter;
use crate::remote::{fetch_preview_confirm_run, Fetcher, RemoteOutcome, RemoteScript};
use crate::subnet::{NetworkInspector, Resolution, SubnetResolver};
use anyhow::{anyhow, Context, Result};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io::Write;

/// Caller-supplied switches for one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub enabled: BTreeSet<String>,
    /// Treat every flag as enabled.
    pub all: bool,
    /// Overrides any subnet configured on firewall steps.
    pub subnet: Option<String>,
    pub interactive: bool,
    pub dry_run: bool,
}

impl RunOptions {
    pub fn flag_enabled(&self, flag: &str) -> bool {
        self.all || self.enabled.contains(flag)
    }

    fn step_enabled(&self, step: &StepConfig) -> bool {
        match step.flag() {
            Some(flag) => self.flag_enabled(flag),
            None => true,
        }
    }
}

/// Everything step bodies need from the outside world.
pub struct PlanBuilder<'a, P: Probe, N: NetworkInspector> {
    pub options: &'a RunOptions,
    pub gate: &'a CapabilityGate<P>,
    pub resolver: &'a SubnetResolver<N>,
    pub fetcher: &'a dyn Fetcher,
    pub runner: CommandRunner,
    pub prompter: &'a RefCell<dyn Prompter + 'a>,
    /// Destination for remote script previews.
    pub preview_out: &'a RefCell<dyn Write + 'a>,
}

impl<'a, P: Probe + 'a, N: NetworkInspector + 'a> PlanBuilder<'a, P, N> {
    /// Build the ordered step list, leaving out steps whose flag is disabled.
    pub fn build(&self, plan: &'a PlanConfig) -> Result<Vec<Step<'a>>> {
        let mut steps = Vec::new();
        for config in &plan.steps {
            if !self.options.step_enabled(config) {
                tracing::debug!(
                    step = config.name(),
                    flag = config.flag().unwrap_or_default(),
                    "flag not enabled; step gated out"
                );
                continue;
            }
            let step = match config {
                StepConfig::Command {
                    name,
                    command,
                    unless,
                    requires,
                    ..
                } => self.command_step(name, command, unless.as_ref(), requires.as_ref())?,
                StepConfig::EnsureTool {
                    name,
                    tool,
                    version_args,
                    install,
                    consumers,
                    ..
                } => {
                    let base = VersionRequirement {
                        tool: tool.clone(),
                        min_major: 0,
                        version_args: version_args.clone(),
                    };
                    let Some(step) = self.ensure_tool_step(name, base, install, consumers)? else {
                        tracing::debug!(
                            step = %name,
                            %tool,
                            "no consumer requested; step gated out"
                        );
                        continue;
                    };
                    step
                }
                StepConfig::Firewall {
                    name,
                    subnet,
                    port,
                    command,
                    ..
                } => self.firewall_step(name, subnet.as_deref(), *port, command),
                StepConfig::RemoteScript {
                    name,
                    url,
                    preview_lines,
                    prompt,
                    interpreter,
                    ..
                } => {
                    let mut script = RemoteScript::new(url.as_str());
                    script.preview_lines = *preview_lines;
                    if let Some(prompt) = prompt {
                        script.prompt = prompt.clone();
                    }
                    script.interpreter = split_command(interpreter)
                        .with_context(|| format!("interpreter for step {name:?}"))?;
                    script.dry_run = self.options.dry_run;
                    self.remote_step(name, script)
                }
            };
            steps.push(step);
        }
        tracing::info!(
            planned = steps.len(),
            configured = plan.steps.len(),
            "provisioning plan built"
        );
        Ok(steps)
    }

    fn command_step(
        &self,
        name: &str,
        command: &str,
        unless: Option<&VersionRequirement>,
        requires: Option<&VersionRequirement>,
    ) -> Result<Step<'a>> {
        let argv = split_command(command).with_context(|| format!("command for step {name:?}"))?;
        let gate = self.gate;
        let runner = self.runner;
        let unless = unless.cloned();
        let requires = requires.cloned();
        Ok(Step::new(name, move || {
            if let Some(requirement) = &unless {
                if let GateDecision::Skip { reason } = gate.decide_remediation(requirement) {
                    return Ok(StepOutcome::skipped(reason));
                }
            }
            if let Some(requirement) = &requires {
                if let GateDecision::Block { reason } = gate.decide_consumer(requirement) {
                    return Err(anyhow::Error::new(ProvisionError::Blocked {
                        requirement: requirement.to_string(),
                    })
                    .context(reason));
                }
            }
            runner.run(&argv)?;
            Ok(StepOutcome::Success)
        }))
    }

    /// `None` when no consumer of the tool is requested.
    fn ensure_tool_step(
        &self,
        name: &str,
        base: VersionRequirement,
        install: &str,
        consumers: &[ConsumerThreshold],
    ) -> Result<Option<Step<'a>>> {
        let options = self.options;
        let Some(requirement) =
            effective_requirement(&base, consumers, |flag| options.flag_enabled(flag))
        else {
            return Ok(None);
        };
        let requested: Vec<VersionRequirement> = consumers
            .iter()
            .filter(|consumer| match consumer.flag.as_deref() {
                Some(flag) => options.flag_enabled(flag),
                None => true,
            })
            .map(|consumer| base.with_min_major(consumer.min_major))
            .collect();
        let argv = split_command(install).with_context(|| format!("install for step {name:?}"))?;
        let gate = self.gate;
        let runner = self.runner;
        let step_name = name.to_string();
        Ok(Some(Step::new(name, move || {
            if let GateDecision::Skip { reason } = gate.decide_remediation(&requirement) {
                return Ok(StepOutcome::skipped(reason));
            }
            tracing::info!(step = %step_name, required = %requirement, "remediating");
            runner.run(&argv)?;
            if runner.dry_run() {
                return Ok(StepOutcome::Success);
            }
            for consumer in &requested {
                let status = gate.check(consumer);
                if status.is_satisfied() {
                    tracing::info!(step = %step_name, "{}", status.describe(consumer));
                } else {
                    tracing::warn!(
                        step = %step_name,
                        "after remediation: {}",
                        status.describe(consumer)
                    );
                }
            }
            Ok(StepOutcome::Success)
        })))
    }

    fn firewall_step(
        &self,
        name: &str,
        configured_subnet: Option<&str>,
        port: u16,
        template: &str,
    ) -> Step<'a> {
        let explicit = self
            .options
            .subnet
            .clone()
            .or_else(|| configured_subnet.map(str::to_string));
        let interactive = self.options.interactive;
        let resolver = self.resolver;
        let prompter = self.prompter;
        let runner = self.runner;
        let template = template.to_string();
        let step_name = name.to_string();
        Step::new(name, move || {
            let resolution = {
                let mut prompter = prompter.borrow_mut();
                resolver.resolve(explicit.as_deref(), interactive, &mut *prompter)?
            };
            let subnet = match resolution {
                Resolution::Accepted(subnet) => subnet,
                Resolution::Declined => {
                    return Err(ProvisionError::UserDeclined {
                        operation: format!("firewall rule {step_name}"),
                    }
                    .into());
                }
            };
            let command = render_firewall_command(&template, &subnet.to_string(), port);
            let argv = split_command(&command)?;
            runner.run(&argv)?;
            Ok(StepOutcome::Success)
        })
    }

    fn remote_step(&self, name: &str, script: RemoteScript) -> Step<'a> {
        let fetcher = self.fetcher;
        let prompter = self.prompter;
        let preview_out = self.preview_out;
        Step::new(name, move || {
            let outcome = {
                let mut prompter = prompter.borrow_mut();
                let mut out = preview_out.borrow_mut();
                fetch_preview_confirm_run(fetcher, &mut *prompter, &mut *out, &script)?
            };
            match outcome {
                RemoteOutcome::Executed { exit_code: 0 } => Ok(StepOutcome::Success),
                RemoteOutcome::Executed { exit_code } => Ok(StepOutcome::Failed { exit_code }),
                RemoteOutcome::Previewed => {
                    Ok(StepOutcome::skipped("dry run: script previewed only"))
                }
                RemoteOutcome::Declined => Err(ProvisionError::UserDeclined {
                    operation: format!("remote script {}", script.url),
                }
                .into()),
                RemoteOutcome::FetchFailed { detail } => Err(ProvisionError::Fetch {
                    url: script.url.clone(),
                    detail,
                }
                .into()),
            }
        })
    }
}

/// Substitute `{subnet}` and `{port}` in a firewall command template.
pub fn render_firewall_command(template: &str, subnet: &str, port: u16) -> String {
    template
        .replace("{subnet}", subnet)
        .replace("{port}", &port.to_string())
}

/// Reject a plan whose steps reference flags that no step or consumer declares.
pub fn check_enabled_flags(plan: &PlanConfig, options: &RunOptions) -> Result<()> {
    let mut known = BTreeSet::new();
    for step in &plan.steps {
        if let Some(flag) = step.flag() {
            known.insert(flag);
        }
        if let StepConfig::EnsureTool { consumers, .. } = step {
            known.extend(consumers.iter().filter_map(|consumer| consumer.flag.as_deref()));
        }
    }
    let unknown: Vec<&str> = options
        .enabled
        .iter()
        .map(String::as_str)
        .filter(|flag| !known.contains(flag))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    Err(anyhow!(
        "unknown flag(s): {} (plan declares: {})",
        unknown.join(", "),
        known.into_iter().collect::<Vec<_>>().join(", ")
    ))
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
