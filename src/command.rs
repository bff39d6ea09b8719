//! External process invocation.
//!
//! Both collaborators (the sensor reader and the device controller) are
//! black-box commands. [`CommandRunner`] is the seam the rest of the crate
//! talks to, so tests can substitute a mock for the real processes.

use std::{io, process::Stdio, time::Duration};

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

/// Captured result of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Human-readable exit status, e.g. `exit status: 1`.
    pub status: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Successful output carrying the given stdout.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".into(),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Failed output with the given exit code.
    pub fn failed(code: i32) -> Self {
        Self {
            success: false,
            status: format!("exit status: {code}"),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }
}

/// Runs an external program to completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` and waits for it to exit.
    ///
    /// Returns an [`io::Error`] only when the process cannot be spawned or
    /// awaited (or, with a timeout configured, when it overran with kind
    /// [`io::ErrorKind::TimedOut`]). A non-zero exit is reported through
    /// [`CommandOutput::success`].
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    timeout: Option<Duration>,
}

impl SystemCommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        debug!("Running: {}", display_command(program, args));

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);
        let child = command.output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "command timed out"))??,
            None => child.await?,
        };

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Formats a command line for log and error messages.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
