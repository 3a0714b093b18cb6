// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Scenario;

/// Command-line arguments for `nfvbench`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "nfvbench",
    version,
    about = "Benchmark NFV orchestrator lifecycle operations on emulated multi-PoP topologies.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Nfvbench.toml` in the current working directory. When the
    /// default file does not exist, built-in defaults are used.
    #[arg(long, value_name = "PATH", default_value = "Nfvbench.toml")]
    pub config: String,

    /// Override `[experiment].scenario`.
    #[arg(long, value_name = "NAME")]
    pub scenario: Option<Scenario>,

    /// Override `[experiment].repetitions`.
    #[arg(long, value_name = "N")]
    pub repetitions: Option<u32>,

    /// Override `[experiment].max_services`.
    #[arg(long, value_name = "N")]
    pub max_services: Option<u32>,

    /// Override `[experiment].result_path`.
    #[arg(long, value_name = "PATH")]
    pub result_path: Option<String>,

    /// Replace the topology allow-list (repeatable).
    #[arg(long = "topology", value_name = "FILE")]
    pub topologies: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `NFVBENCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, list the topologies, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
