/*!
 * Error types for bt-switch
 */

use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::executor::shell_join;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Unsupported transport/backend, or an alias that does not resolve.
    #[error("{0}")]
    Configuration(String),

    /// A command ran but exited non-zero or timed out.
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),

    /// The command could not be started at all (missing binary, etc).
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}

/// How a command failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    NonZeroExit { code: Option<i32> },
}

/// A command that exited non-zero or timed out, with its captured diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionFailure {
    pub command: Vec<String>,
    pub kind: FailureKind,
    pub diagnostic: String,
}

impl ExecutionFailure {
    pub fn new(command: &[&str], kind: FailureKind, diagnostic: impl Into<String>) -> Self {
        Self {
            command: command.iter().map(|s| s.to_string()).collect(),
            kind,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, FailureKind::Timeout)
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.command.iter().map(String::as_str).collect();
        write!(
            f,
            "Command failed: {}\nError: {}",
            shell_join(&tokens),
            self.diagnostic
        )
    }
}

impl std::error::Error for ExecutionFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_failure_display() {
        let failure = ExecutionFailure::new(
            &["bluetoothctl", "connect", "AA:BB"],
            FailureKind::NonZeroExit { code: Some(1) },
            "Failed to connect: org.bluez.Error.Failed",
        );
        assert_eq!(
            failure.to_string(),
            "Command failed: bluetoothctl connect AA:BB\nError: Failed to connect: org.bluez.Error.Failed"
        );
        assert!(!failure.is_timeout());
    }

    #[test]
    fn test_execution_failure_converts_into_error() {
        let failure = ExecutionFailure::new(&["sleep", "9"], FailureKind::Timeout, "Timed out after 1s");
        let err: Error = failure.clone().into();
        match err {
            Error::Execution(inner) => assert_eq!(inner, failure),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
