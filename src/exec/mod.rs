// src/exec/mod.rs

//! Process execution layer.
//!
//! Every orchestrator primitive ends up as one external command. This module
//! runs those commands with `tokio::process::Command` and hands back the exit
//! code, captured stdout and wall-clock time.
//!
//! - [`backend`] provides the `CommandRunner` trait and `CommandOutput`, so
//!   tests can swap in a scripted runner that never spawns a process.
//! - [`shell`] holds `ShellCommandRunner`, the production implementation.

pub mod backend;
pub mod shell;

pub use backend::{CommandOutput, CommandRunner, RunFuture};
pub use shell::ShellCommandRunner;
