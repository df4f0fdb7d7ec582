//! Process runner that reports every outcome as data
//!
//! kubectl and helm fail for ordinary reasons (expired credentials, an unreachable
//! API server, the binary missing from PATH). None of those become errors here;
//! callers branch on [`CommandOutput`].

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// A program plus its arguments. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
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

    /// True if any argument equals `needle` exactly
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of one command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process could not be spawned or was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// The process was killed after exceeding its timeout. `stdout` is empty.
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn completed(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Default::default()
        }
    }

    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self {
            stderr: reason.into(),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Short description of why the command did not succeed
    pub fn failure_summary(&self) -> String {
        if self.timed_out {
            return "timed out".to_string();
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external commands with a timeout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, command: &CommandSpec, timeout: Duration) -> CommandOutput;
}

/// [`CommandRunner`] backed by real child processes.
///
/// Children are spawned with `kill_on_drop`, so a timeout or a cancelled caller
/// kills the process instead of leaking it.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn execute(&self, command: &CommandSpec, timeout: Duration) -> CommandOutput {
        debug!(command = %command, timeout_ms = timeout.as_millis() as u64, "Running command");

        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn {}: {}", command.program, e);
                return CommandOutput::spawn_failed(format!(
                    "failed to spawn {}: {}",
                    command.program, e
                ));
            }
        };

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => CommandOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                timed_out: false,
            },
            Ok(Err(e)) => {
                warn!("Failed to collect output of {}: {}", command.program, e);
                CommandOutput::spawn_failed(format!("failed to wait for {}: {}", command.program, e))
            }
            Err(_) => {
                warn!(command = %command, "Command timed out after {:?}", timeout);
                CommandOutput::timed_out()
            }
        }
    }
}
