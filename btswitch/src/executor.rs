/*!
 * Command Execution
 * Runs backend commands on this machine or on a remote host over ssh
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Error, ExecutionFailure, FailureKind, Result};
use crate::models::Host;

/// Connection-establishment timeout handed to ssh, in seconds.
pub const SSH_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Tokens made only of these characters need no quoting.
static SAFE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_@%+=:,./-]+$").expect("Invalid regex pattern"));

/// Quotes one token for a POSIX shell.
///
/// ```
/// use btswitch::executor::shell_quote;
///
/// assert_eq!(shell_quote("AA:BB:CC"), "AA:BB:CC");
/// assert_eq!(shell_quote("two words"), "'two words'");
/// assert_eq!(shell_quote("it's"), "'it'\"'\"'s'");
/// ```
pub fn shell_quote(token: &str) -> String {
    if token.is_empty() {
        return "''".to_string();
    }
    if SAFE_TOKEN_RE.is_match(token) {
        return token.to_string();
    }
    format!("'{}'", token.replace('\'', "'\"'\"'"))
}

/// Joins tokens into a single shell command line.
pub fn shell_join(tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|t| shell_quote(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs an opaque command line somewhere and returns its stdout.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Stdout with trailing whitespace removed, or an [`ExecutionFailure`]
    /// on non-zero exit or timeout.
    async fn run(&self, command: &[&str], timeout: Duration) -> Result<String>;
}

/// Runs commands directly on this machine.
#[derive(Debug, Default, Clone)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn run(&self, command: &[&str], timeout: Duration) -> Result<String> {
        run_captured(command, timeout, "Timed out").await
    }
}

/// Runs commands on a remote host through a non-interactive ssh login.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    program: String,
    destination: String,
}

impl SshExecutor {
    pub fn new(host: &Host) -> Self {
        Self {
            program: "ssh".to_string(),
            destination: host.destination(),
        }
    }

    /// Use another ssh client binary instead of `ssh` from `PATH`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The full ssh invocation for `command`. The inner command travels as one
    /// shell-quoted argument.
    pub fn wrap(&self, command: &[&str]) -> Vec<String> {
        vec![
            self.program.clone(),
            "-o".to_string(),
            format!("ConnectTimeout={SSH_CONNECT_TIMEOUT_SECS}"),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            self.destination.clone(),
            "--".to_string(),
            shell_join(command),
        ]
    }
}

#[async_trait]
impl Executor for SshExecutor {
    async fn run(&self, command: &[&str], timeout: Duration) -> Result<String> {
        let wrapped = self.wrap(command);
        let tokens: Vec<&str> = wrapped.iter().map(String::as_str).collect();
        run_captured(&tokens, timeout, "SSH timed out").await
    }
}

async fn run_captured(command: &[&str], timeout: Duration, timeout_label: &str) -> Result<String> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| Error::config("Refusing to run an empty command"))?;
    let line = shell_join(command);

    tracing::debug!(command = %line, timeout_secs = timeout.as_secs_f64(), "Executing command");

    let child = Command::new(program)
        .args(args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| Error::Spawn {
            command: line.clone(),
            source,
        })?;

    // Dropping the future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            tracing::warn!(command = %line, "Command timed out");
            return Err(ExecutionFailure::new(
                command,
                FailureKind::Timeout,
                format!("{} after {}s", timeout_label, timeout.as_secs_f64()),
            )
            .into());
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();

    if output.status.success() {
        tracing::trace!(command = %line, "Command succeeded");
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    // bluetoothctl reports some failures on stdout only
    let diagnostic = if stderr.is_empty() { stdout } else { stderr };
    let code = output.status.code();

    tracing::warn!(
        command = %line,
        exit_code = ?code,
        stderr = %diagnostic,
        "Command failed"
    );

    Err(ExecutionFailure::new(command, FailureKind::NonZeroExit { code }, diagnostic).into())
}
