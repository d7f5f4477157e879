//! `CommandRunner` backed by `std::process`

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ExecError;
use crate::ports::{CommandRunner, Invocation};

/// Exit status gpg uses when an interactive `save` had nothing to save.
const GPG_NOTHING_SAVED: i32 = 2;
const GPG_PROGRAM: &str = "gpg";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_TTY: &str = "/dev/tty";

/// Runs programs as child processes of this one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ExecError> {
        let command_line = invocation.to_string();
        debug!(command = %command_line, "running");

        let mut child = Command::new(invocation.program())
            .args(invocation.arguments())
            .stdin(if invocation.input().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Launch {
                program: invocation.program().to_string(),
                source,
            })?;

        let io_error = |source: io::Error| ExecError::Io {
            command: command_line.clone(),
            source,
        };

        // Drain both pipes on helper threads so a chatty child never blocks
        // on a full pipe while we wait for it.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        if let (Some(input), Some(mut pipe)) = (invocation.input(), child.stdin.take()) {
            match pipe.write_all(input) {
                Ok(()) => {}
                // The child stopped reading; its exit status tells the rest.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                    debug!(command = %command_line, "child closed stdin early");
                }
                Err(err) => {
                    reap(&mut child);
                    // Killing the child closes the pipes, so the readers finish.
                    let _ = collect(stdout);
                    let _ = collect(stderr);
                    return Err(io_error(err));
                }
            }
            // Dropping the pipe closes it so the child sees end of input.
        }

        let status = match invocation.deadline() {
            Some(limit) => wait_with_deadline(&mut child, limit).map_err(io_error)?,
            None => Some(child.wait().map_err(io_error)?),
        };
        let Some(status) = status else {
            warn!(command = %command_line, "killed after deadline");
            return Err(ExecError::TimedOut {
                command: command_line,
                after: invocation.deadline().unwrap_or_default(),
            });
        };

        let stdout = collect(stdout).map_err(io_error)?;
        let stderr = collect(stderr).map_err(io_error)?;
        classify_exit(&command_line, status, stdout, &stderr)
    }

    fn run_interactive(&self, invocation: &Invocation) -> Result<(), ExecError> {
        let command_line = invocation.to_string();
        let tty = terminal_device(
            fs::read_link("/dev/fd/0").ok(),
            env::var("GPG_TTY").ok(),
        );
        debug!(command = %command_line, gpg_tty = %tty, "running interactively");

        let status = Command::new(invocation.program())
            .args(invocation.arguments())
            .env("GPG_TTY", &tty)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| ExecError::Launch {
                program: invocation.program().to_string(),
                source,
            })?;

        classify_interactive_exit(invocation, status.code())
    }
}

/// Wait for the child, killing it once `limit` has passed.
/// Returns `None` when it had to be killed.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> io::Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= limit {
            // The child may exit between the check and the kill.
            reap(child);
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child and wait for it so it does not linger as a zombie.
fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!("kill failed: {err}");
    }
    if let Err(err) = child.wait() {
        debug!("wait after kill failed: {err}");
    }
}

fn drain<R>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("output reader thread panicked"))?,
        None => Ok(Vec::new()),
    }
}

fn classify_exit(
    command_line: &str,
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: &[u8],
) -> Result<Vec<u8>, ExecError> {
    if status.success() {
        return Ok(stdout);
    }
    let stderr = String::from_utf8_lossy(stderr).into_owned();
    match status.code() {
        Some(code) => Err(ExecError::NonZeroExit {
            command: command_line.to_string(),
            code,
            stderr,
        }),
        None => Err(ExecError::Signalled {
            command: command_line.to_string(),
            stderr,
        }),
    }
}

/// Decide whether an interactive session ended successfully.
///
/// gpg exits with status 2 when `save` finds nothing changed; that one
/// case is success. The same status from any other program is a failure.
pub(crate) fn classify_interactive_exit(
    invocation: &Invocation,
    code: Option<i32>,
) -> Result<(), ExecError> {
    let command = invocation.to_string();
    match code {
        Some(0) => Ok(()),
        Some(GPG_NOTHING_SAVED) if is_gpg(invocation.program()) => {
            debug!(command = %command, "gpg reported nothing to save");
            Ok(())
        }
        Some(code) => Err(ExecError::NonZeroExit {
            command,
            code,
            stderr: String::new(),
        }),
        None => Err(ExecError::Signalled {
            command,
            stderr: String::new(),
        }),
    }
}

fn is_gpg(program: &str) -> bool {
    Path::new(program)
        .file_name()
        .is_some_and(|name| name == GPG_PROGRAM)
}

/// Terminal device to advertise through `GPG_TTY` so pinentry can find
/// the terminal even when our stdin is not one.
fn terminal_device(stdin_target: Option<PathBuf>, inherited: Option<String>) -> String {
    if let Some(target) = stdin_target {
        if target.starts_with("/dev/") {
            return target.to_string_lossy().into_owned();
        }
    }
    match inherited {
        Some(tty) if !tty.is_empty() => tty,
        _ => DEFAULT_TTY.to_string(),
    }
}
