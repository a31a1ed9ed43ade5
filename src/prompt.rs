//! Operator interaction behind a trait so decision logic stays testable.
//!
//! Terminal I/O lives in `TerminalPrompter`; non-interactive runs use
//! `ClosedPrompter`, which fails closed instead of blocking on input.
use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

pub trait Prompter {
    /// Ask a yes/no question. Empty input selects `default`.
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;

    /// Read one line of free text.
    fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// Show a message that needs no answer.
    fn notify(&mut self, message: &str);
}

/// Interpret a yes/no answer; anything but an explicit "y"/"yes" is negative.
pub fn is_affirmative(answer: &str, default: bool) -> bool {
    let answer = answer.trim();
    if answer.is_empty() {
        return default;
    }
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

/// One transient yes/no decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationGate {
    pub prompt: String,
    pub default: bool,
    pub granted: bool,
}

impl ConfirmationGate {
    pub fn ask(prompter: &mut dyn Prompter, prompt: &str, default: bool) -> Result<Self> {
        let granted = prompter.confirm(prompt, default)?;
        Ok(Self {
            prompt: prompt.to_string(),
            default,
            granted,
        })
    }
}

/// Reads answers from stdin and writes prompts to stderr.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    /// True when both ends of the conversation are attached to a terminal.
    pub fn available() -> bool {
        io::stdin().is_terminal() && io::stderr().is_terminal()
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{prompt}").context("write prompt")?;
        stderr.flush().context("flush prompt")?;
        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read operator input")?;
        if read == 0 {
            return Err(anyhow!("operator input closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = self.ask(&format!("{question} {hint} "))?;
        Ok(is_affirmative(&answer, default))
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.ask(&format!("{prompt} "))
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// Prompter for non-interactive runs: every confirmation is refused.
#[derive(Debug, Default)]
pub struct ClosedPrompter;

impl Prompter for ClosedPrompter {
    fn confirm(&mut self, question: &str, _default: bool) -> Result<bool> {
        tracing::warn!(%question, "confirmation refused in non-interactive mode");
        Ok(false)
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        Err(anyhow!("input required in non-interactive mode: {prompt}"))
    }

    fn notify(&mut self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Replays canned answers and records everything it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
    pub notices: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, prompt: &str) -> Result<String> {
        self.asked.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer for {prompt:?}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let answer = self.next(question)?;
        Ok(is_affirmative(&answer, default))
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
