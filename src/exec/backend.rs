// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The orchestrator talks to a `CommandRunner` instead of spawning processes
//! itself. Production code uses [`ShellCommandRunner`](super::ShellCommandRunner);
//! tests provide a runner that replays scripted outputs and records which
//! actions were issued.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::errors::Result;

/// Boxed future returned by [`CommandRunner::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>>;

/// What an external command left behind.
///
/// A non-zero `exit_code` is a normal value here, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            elapsed,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Trait abstracting how a named external operation is executed.
///
/// Implementations must:
/// - return `Ok` for any command that ran, whatever its exit code
/// - return `BenchError::Execution` only when the command could not be
///   launched (or `BenchError::CommandTimeout` when it was killed for
///   exceeding a configured limit)
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, action: &'a str, command: &'a str) -> RunFuture<'a>;
}
