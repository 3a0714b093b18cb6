// src/config/mod.rs

//! Configuration loading and validation for nfvbench.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and apply environment overrides (`loader.rs`).
//! - Validate bounds and parse duration strings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{apply_env_overrides, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, EmulatorSection, ExperimentSection, GatekeeperSection, OrchestratorSection,
    PollSection, RawConfigFile, ServiceSection, Timing,
};
pub use validate::{parse_duration, validate_config};
