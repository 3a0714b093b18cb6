// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which experiment a sweep runs for every topology × repetition.
///
/// - `Setup`: attach every emulated PoP as an infrastructure account, show
///   them, then detach them again (setup/teardown timing only).
/// - `Service`: full service lifecycle (onboard, attach, instantiate K
///   services with random placement, terminate, detach, offboard).
/// - `Clean`: best-effort removal of everything left on the orchestrator.
/// - `Gatekeeper`: onboard + instantiate through the REST gatekeeper variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Setup,
    Service,
    Clean,
    Gatekeeper,
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario::Setup
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scenario::Setup => "setup",
            Scenario::Service => "service",
            Scenario::Clean => "clean",
            Scenario::Gatekeeper => "gatekeeper",
        };
        f.write_str(s)
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "setup" => Ok(Scenario::Setup),
            "service" => Ok(Scenario::Service),
            "clean" => Ok(Scenario::Clean),
            "gatekeeper" => Ok(Scenario::Gatekeeper),
            other => Err(format!(
                "invalid scenario: {other} (expected \"setup\", \"service\", \"clean\" or \"gatekeeper\")"
            )),
        }
    }
}

/// How the poll interval evolves between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Fixed interval between attempts.
    None,
    /// Interval multiplied by `backoff_factor` after every attempt, capped
    /// at `max_interval`.
    Exponential,
}

impl Default for BackoffKind {
    fn default() -> Self {
        BackoffKind::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_parses_case_insensitively() {
        assert_eq!("Service".parse::<Scenario>(), Ok(Scenario::Service));
        assert_eq!(" clean ".parse::<Scenario>(), Ok(Scenario::Clean));
        assert!("zoo".parse::<Scenario>().is_err());
    }

    #[test]
    fn scenario_display_round_trips_through_from_str() {
        for s in [Scenario::Setup, Scenario::Service, Scenario::Clean, Scenario::Gatekeeper] {
            assert_eq!(s.to_string().parse::<Scenario>(), Ok(s));
        }
    }
}
