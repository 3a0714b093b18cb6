// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Parse problems have no variant here: the status/list parsers degrade to
//! empty results instead of failing.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    /// The external command could not be launched at all.
    #[error("could not launch '{action}': {source}")]
    Execution {
        action: String,
        #[source]
        source: std::io::Error,
    },

    /// The external command ran longer than the per-command timeout and was killed.
    #[error("'{action}' did not finish within {timeout:?}")]
    CommandTimeout { action: String, timeout: Duration },

    /// The external command ran but exited non-zero.
    #[error("'{action}' failed with exit code {exit_code}")]
    OperationFailed { action: String, exit_code: i32 },

    /// A poll loop exhausted its attempt budget.
    #[error("timed out waiting for {target} after {attempts} attempts")]
    ConvergenceTimeout { target: String, attempts: u32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BenchError {
    /// Short machine-friendly label, used in repetition summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::Execution { .. } => "execution",
            BenchError::CommandTimeout { .. } => "command_timeout",
            BenchError::OperationFailed { .. } => "operation_failed",
            BenchError::ConvergenceTimeout { .. } => "convergence_timeout",
            BenchError::ConfigError(_) => "config",
            BenchError::IoError(_) => "io",
            BenchError::TomlError(_) => "toml",
            BenchError::Csv(_) => "csv",
            BenchError::Other(_) => "other",
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BenchError>;
