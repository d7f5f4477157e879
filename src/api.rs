//! Wiring of the real adapters for the command line.

use crate::adapters::{GpgKeyDirectory, ProcessRunner, SystemTools, Terminal};
use crate::config::Config;
use crate::use_cases::Workflow;

pub use crate::model::*;

/// The workflow type the binary runs.
pub type SystemWorkflow<'a> =
    Workflow<'a, GpgKeyDirectory<ProcessRunner>, SystemTools<ProcessRunner>, Terminal>;

/// gpg, ykman/git and the terminal, configured from `config`.
pub struct Services {
    directory: GpgKeyDirectory<ProcessRunner>,
    tools: SystemTools<ProcessRunner>,
    terminal: Terminal,
}

impl Services {
    pub fn new(config: &Config) -> Self {
        Self::with_terminal(config, Terminal::new(config.no_color))
    }

    pub fn with_terminal(config: &Config, terminal: Terminal) -> Self {
        Self {
            directory: GpgKeyDirectory::new(ProcessRunner::new())
                .with_probe_timeout(config.detection_timeout),
            tools: SystemTools::new(ProcessRunner::new()),
            terminal,
        }
    }

    pub fn workflow<'a>(&'a mut self, config: &'a Config) -> SystemWorkflow<'a> {
        Workflow::new(config, &self.directory, &self.tools, &mut self.terminal)
    }
}
