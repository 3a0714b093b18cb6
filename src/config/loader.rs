// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable overriding `[orchestrator].vim_host`.
pub const VIM_HOST_ENV: &str = "VIMEMU_HOSTNAME";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Like [`load_from_path`], but a missing file at the *default* location
/// yields the built-in defaults instead of an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    if !path.exists() && path == default_config_path() {
        info!(path = %path.display(), "no config file found; using built-in defaults");
        return Ok(RawConfigFile::default());
    }
    load_from_path(path)
}

/// Apply environment overrides to a raw config.
pub fn apply_env_overrides(raw: &mut RawConfigFile) {
    if let Ok(host) = std::env::var(VIM_HOST_ENV) {
        let host = host.trim();
        if !host.is_empty() {
            debug!(host, "using {VIM_HOST_ENV} for vim_host");
            raw.orchestrator.vim_host = host.to_string();
        }
    }
}

/// Load a configuration file from path, apply environment overrides and
/// validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let mut raw_config = load_from_path(&path)?;
    apply_env_overrides(&mut raw_config);
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Nfvbench.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Nfvbench.toml")
}
