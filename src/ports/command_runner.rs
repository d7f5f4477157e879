use std::fmt;
use std::time::Duration;

use crate::error::ExecError;

/// One external program call.
///
/// Rendered with `Display` as the plain command line (`gpg --card-status`),
/// which is also what logs and test doubles key on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    stdin: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Bytes written to the child's standard input before waiting.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Kill the child if it has not exited after `limit`.
    /// Ignored for interactive sessions.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn input(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs external programs.
pub trait CommandRunner {
    /// Run to completion and return captured standard output.
    ///
    /// A non-zero exit is an error carrying the exit code and the captured
    /// standard error.
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ExecError>;

    /// Run with the standard streams inherited from this process so the
    /// operator can answer the program's own prompts. Never time-bounded.
    fn run_interactive(&self, invocation: &Invocation) -> Result<(), ExecError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ExecError> {
        (**self).run(invocation)
    }

    fn run_interactive(&self, invocation: &Invocation) -> Result<(), ExecError> {
        (**self).run_interactive(invocation)
    }
}
