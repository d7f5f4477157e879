//! Test double for `CommandRunner`
//!
//! Responses are keyed by the rendered command line. A scripted key also
//! matches longer command lines that start with it as whole words, so
//! `"gpg --import"` covers
//! every import regardless of the temporary file name. Unscripted commands
//! succeed with empty output.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ExecError;
use crate::ports::{CommandRunner, Invocation};

#[derive(Debug, Clone)]
enum Outcome {
    Output(Vec<u8>),
    Exit { code: i32, stderr: String },
    TimedOut,
}

#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outcomes: BTreeMap<String, Outcome>,
    invocations: RefCell<Vec<Invocation>>,
    interactive: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, stdout: impl Into<Vec<u8>>) -> Self {
        self.outcomes
            .insert(command.to_string(), Outcome::Output(stdout.into()));
        self
    }

    pub fn fail(mut self, command: &str, code: i32, stderr: &str) -> Self {
        self.outcomes.insert(
            command.to_string(),
            Outcome::Exit {
                code,
                stderr: stderr.to_string(),
            },
        );
        self
    }

    pub fn time_out(mut self, command: &str) -> Self {
        self.outcomes.insert(command.to_string(), Outcome::TimedOut);
        self
    }

    /// Command lines passed to `run`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.invocations.borrow().iter().map(ToString::to_string).collect()
    }

    /// Command lines passed to `run_interactive`, in order.
    pub fn interactive_calls(&self) -> Vec<String> {
        self.interactive.borrow().iter().map(ToString::to_string).collect()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    fn outcome_for(&self, command_line: &str) -> Option<Outcome> {
        if let Some(outcome) = self.outcomes.get(command_line) {
            return Some(outcome.clone());
        }
        self.outcomes
            .iter()
            .filter(|(key, _)| {
                command_line
                    .strip_prefix(key.as_str())
                    .is_some_and(|rest| rest.starts_with(' '))
            })
            .max_by_key(|(key, _)| key.len())
            .map(|(_, outcome)| outcome.clone())
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ExecError> {
        self.invocations.borrow_mut().push(invocation.clone());
        let command = invocation.to_string();
        match self.outcome_for(&command) {
            None => Ok(Vec::new()),
            Some(Outcome::Output(stdout)) => Ok(stdout),
            Some(Outcome::Exit { code, stderr }) => Err(ExecError::NonZeroExit {
                command,
                code,
                stderr,
            }),
            Some(Outcome::TimedOut) => Err(ExecError::TimedOut {
                command,
                after: invocation.deadline().unwrap_or(Duration::from_secs(3)),
            }),
        }
    }

    fn run_interactive(&self, invocation: &Invocation) -> Result<(), ExecError> {
        self.interactive.borrow_mut().push(invocation.clone());
        let command = invocation.to_string();
        match self.outcome_for(&command) {
            Some(Outcome::Exit { code, stderr }) => Err(ExecError::NonZeroExit {
                command,
                code,
                stderr,
            }),
            _ => Ok(()),
        }
    }
}
