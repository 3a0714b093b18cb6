// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile, Timing};
use crate::errors::{BenchError, Result};
use crate::poll::RetryPolicy;
use crate::types::Scenario;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BenchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let timing = resolve_timing(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, timing))
    }
}

/// Validate a raw config without consuming it.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)?;
    resolve_timing(cfg).map(|_| ())
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_orchestrator(cfg)?;
    validate_poll(cfg)?;
    validate_experiment(cfg)?;
    validate_service(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> BenchError {
    BenchError::ConfigError(msg.into())
}

fn validate_orchestrator(cfg: &RawConfigFile) -> Result<()> {
    if cfg.orchestrator.tool.trim().is_empty() {
        return Err(config_error("[orchestrator].tool must not be empty"));
    }
    let prefix = &cfg.orchestrator.account_prefix;
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(config_error(format!(
            "[orchestrator].account_prefix must be non-empty and alphabetic (got '{prefix}')"
        )));
    }
    Ok(())
}

fn validate_poll(cfg: &RawConfigFile) -> Result<()> {
    if cfg.poll.max_attempts == 0 {
        return Err(config_error("[poll].max_attempts must be >= 1 (got 0)"));
    }
    if cfg.poll.backoff_factor == 0 {
        return Err(config_error("[poll].backoff_factor must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_experiment(cfg: &RawConfigFile) -> Result<()> {
    let exp = &cfg.experiment;
    if exp.repetitions == 0 {
        return Err(config_error("[experiment].repetitions must be >= 1 (got 0)"));
    }
    if exp.detach_retries == 0 {
        return Err(config_error("[experiment].detach_retries must be >= 1 (got 0)"));
    }
    if exp.topologies.is_empty() {
        return Err(config_error(
            "[experiment].topologies must name at least one topology file",
        ));
    }
    if exp.result_path.trim().is_empty() {
        return Err(config_error("[experiment].result_path must not be empty"));
    }
    Ok(())
}

fn validate_service(cfg: &RawConfigFile) -> Result<()> {
    let svc = &cfg.service;
    if svc.nsd_name.trim().is_empty() {
        return Err(config_error("[service].nsd_name must not be empty"));
    }
    if cfg.experiment.scenario != Scenario::Service {
        return Ok(());
    }
    if svc.vnfd_names.is_empty() {
        return Err(config_error(
            "[service].vnfd_names must list at least one VNF descriptor for the service scenario",
        ));
    }
    if svc.instance_prefix.trim().is_empty() {
        return Err(config_error("[service].instance_prefix must not be empty"));
    }
    Ok(())
}

fn resolve_timing(cfg: &RawConfigFile) -> Result<Timing> {
    let field = |name: &str, value: &str| {
        parse_duration(value).map_err(|e| config_error(format!("{name}: {e}")))
    };

    let interval = field("[poll].interval", &cfg.poll.interval)?;
    let max_interval = field("[poll].max_interval", &cfg.poll.max_interval)?;
    let settle = field("[experiment].settle", &cfg.experiment.settle)?;
    let service_hold = field("[experiment].service_hold", &cfg.experiment.service_hold)?;
    let command_timeout = match cfg.orchestrator.command_timeout.as_deref() {
        Some(s) => Some(field("[orchestrator].command_timeout", s)?),
        None => None,
    };

    Ok(Timing {
        poll: RetryPolicy::from_parts(
            cfg.poll.max_attempts,
            interval,
            cfg.poll.backoff,
            cfg.poll.backoff_factor,
            max_interval,
        ),
        settle,
        service_hold,
        command_timeout,
    })
}

/// Parse `"500ms"`, `"5s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{}' is too large", s))
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => secs(60),
        "h" => secs(60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
