// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::poll::RetryPolicy;
use crate::types::{BackoffKind, Scenario};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [orchestrator]
/// tool = "osm"
/// vim_host = "10.0.0.5"
///
/// [poll]
/// interval = "500ms"
/// max_attempts = 60
///
/// [experiment]
/// scenario = "service"
/// repetitions = 3
/// topologies = ["Abilene.graphml"]
/// ```
///
/// Every section is optional and has defaults matching the stock
/// ping-pong service experiment.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub orchestrator: OrchestratorSection,

    #[serde(default)]
    pub poll: PollSection,

    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub emulator: EmulatorSection,

    #[serde(default)]
    pub experiment: ExperimentSection,

    #[serde(default)]
    pub gatekeeper: GatekeeperSection,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so every duration
/// string has been parsed and every bound checked.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub orchestrator: OrchestratorSection,
    pub service: ServiceSection,
    pub emulator: EmulatorSection,
    pub experiment: ExperimentSection,
    pub gatekeeper: GatekeeperSection,
    pub timing: Timing,
}

/// Parsed durations and the poll policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub poll: RetryPolicy,
    pub settle: Duration,
    pub service_hold: Duration,
    pub command_timeout: Option<Duration>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, timing: Timing) -> Self {
        Self {
            orchestrator: raw.orchestrator,
            service: raw.service,
            emulator: raw.emulator,
            experiment: raw.experiment,
            gatekeeper: raw.gatekeeper,
            timing,
        }
    }
}

/// `[orchestrator]` section: how to reach the orchestrator CLI and how to
/// register emulated PoPs as infrastructure accounts.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Host the emulated PoP endpoints listen on. `VIMEMU_HOSTNAME`
    /// overrides it when set.
    #[serde(default = "default_vim_host")]
    pub vim_host: String,

    #[serde(default = "default_vim_user")]
    pub vim_user: String,

    #[serde(default = "default_vim_password")]
    pub vim_password: String,

    #[serde(default = "default_vim_tenant")]
    pub vim_tenant: String,

    #[serde(default = "default_account_type")]
    pub account_type: String,

    /// Accounts are named `<prefix><port>`, e.g. `pop6001`.
    #[serde(default = "default_account_prefix")]
    pub account_prefix: String,

    /// Optional per-command limit, e.g. `"120s"`.
    #[serde(default)]
    pub command_timeout: Option<String>,
}

fn default_tool() -> String {
    "osm".to_string()
}

fn default_vim_host() -> String {
    "127.0.0.1".to_string()
}

fn default_vim_user() -> String {
    "username".to_string()
}

fn default_vim_password() -> String {
    "password".to_string()
}

fn default_vim_tenant() -> String {
    "tenantName".to_string()
}

fn default_account_type() -> String {
    "openstack".to_string()
}

fn default_account_prefix() -> String {
    "pop".to_string()
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            vim_host: default_vim_host(),
            vim_user: default_vim_user(),
            vim_password: default_vim_password(),
            vim_tenant: default_vim_tenant(),
            account_type: default_account_type(),
            account_prefix: default_account_prefix(),
            command_timeout: None,
        }
    }
}

/// `[poll]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PollSection {
    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub backoff: BackoffKind,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,

    #[serde(default = "default_max_interval")]
    pub max_interval: String,
}

fn default_interval() -> String {
    "500ms".to_string()
}

fn default_max_attempts() -> u32 {
    60
}

fn default_backoff_factor() -> u32 {
    2
}

fn default_max_interval() -> String {
    "5s".to_string()
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_attempts: default_max_attempts(),
            backoff: BackoffKind::default(),
            backoff_factor: default_backoff_factor(),
            max_interval: default_max_interval(),
        }
    }
}

/// `[service]` section: the descriptor packages to onboard and the names
/// they register under.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_nsd_name")]
    pub nsd_name: String,

    #[serde(default = "default_nsd_package")]
    pub nsd_package: String,

    /// Onboarded in order, before the NSD.
    #[serde(default = "default_vnfd_packages")]
    pub vnfd_packages: Vec<String>,

    /// Deleted in order, after the NSD.
    #[serde(default = "default_vnfd_names")]
    pub vnfd_names: Vec<String>,

    #[serde(default = "default_instance_prefix")]
    pub instance_prefix: String,
}

fn default_nsd_name() -> String {
    "pingpong".to_string()
}

fn default_nsd_package() -> String {
    "examples/services/pingpong_nsd.tar.gz".to_string()
}

fn default_vnfd_packages() -> Vec<String> {
    vec![
        "examples/vnfs/pong.tar.gz".to_string(),
        "examples/vnfs/ping.tar.gz".to_string(),
    ]
}

fn default_vnfd_names() -> Vec<String> {
    vec!["ping".to_string(), "pong".to_string()]
}

fn default_instance_prefix() -> String {
    "PiPoInst".to_string()
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            nsd_name: default_nsd_name(),
            nsd_package: default_nsd_package(),
            vnfd_packages: default_vnfd_packages(),
            vnfd_names: default_vnfd_names(),
            instance_prefix: default_instance_prefix(),
        }
    }
}

/// `[emulator]` section.
///
/// `start_cmd` may use `{topology}`, `{base_port}` and `{pops}` placeholders.
/// When no commands are configured the emulator is assumed to be managed
/// outside this tool and only the endpoint range is used.
#[derive(Debug, Clone, Deserialize)]
pub struct EmulatorSection {
    #[serde(default)]
    pub start_cmd: Option<String>,

    #[serde(default)]
    pub stop_cmd: Option<String>,

    #[serde(default)]
    pub cleanup_cmd: Option<String>,

    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Upper bound on PoPs per topology; 0 means unlimited.
    #[serde(default)]
    pub max_pops: usize,
}

fn default_base_port() -> u16 {
    6001
}

impl Default for EmulatorSection {
    fn default() -> Self {
        Self {
            start_cmd: None,
            stop_cmd: None,
            cleanup_cmd: None,
            base_port: default_base_port(),
            max_pops: 0,
        }
    }
}

/// `[experiment]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentSection {
    #[serde(default)]
    pub scenario: Scenario,

    #[serde(default = "default_repetitions")]
    pub repetitions: u32,

    #[serde(default = "default_zoo_path")]
    pub zoo_path: String,

    /// Allow-list of topology file names inside `zoo_path`.
    #[serde(default = "default_topologies")]
    pub topologies: Vec<String>,

    /// Service instances started per repetition.
    #[serde(default = "default_max_services")]
    pub max_services: u32,

    /// How many times `detach-all` is repeated at the end of a repetition.
    #[serde(default = "default_detach_retries")]
    pub detach_retries: u32,

    /// Pause between phases.
    #[serde(default = "default_settle")]
    pub settle: String,

    /// How long services stay up before teardown.
    #[serde(default = "default_service_hold")]
    pub service_hold: String,

    #[serde(default = "default_isolate_repetitions")]
    pub isolate_repetitions: bool,

    /// Seed for random placement; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_result_path")]
    pub result_path: String,
}

fn default_repetitions() -> u32 {
    1
}

fn default_zoo_path() -> String {
    "examples/topology_zoo".to_string()
}

fn default_topologies() -> Vec<String> {
    vec!["Arpanet196912.graphml".to_string()]
}

fn default_max_services() -> u32 {
    1
}

fn default_detach_retries() -> u32 {
    3
}

fn default_settle() -> String {
    "5s".to_string()
}

fn default_service_hold() -> String {
    "60s".to_string()
}

fn default_isolate_repetitions() -> bool {
    true
}

fn default_result_path() -> String {
    "result.csv".to_string()
}

impl Default for ExperimentSection {
    fn default() -> Self {
        Self {
            scenario: Scenario::default(),
            repetitions: default_repetitions(),
            zoo_path: default_zoo_path(),
            topologies: default_topologies(),
            max_services: default_max_services(),
            detach_retries: default_detach_retries(),
            settle: default_settle(),
            service_hold: default_service_hold(),
            isolate_repetitions: default_isolate_repetitions(),
            seed: None,
            result_path: default_result_path(),
        }
    }
}

/// `[gatekeeper]` section for the REST orchestrator variant.
#[derive(Debug, Clone, Deserialize)]
pub struct GatekeeperSection {
    #[serde(default = "default_gatekeeper_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_gatekeeper_package")]
    pub package: String,
}

fn default_gatekeeper_endpoint() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_gatekeeper_package() -> String {
    "examples/sonata_pkgs/service.son".to_string()
}

impl Default for GatekeeperSection {
    fn default() -> Self {
        Self {
            endpoint: default_gatekeeper_endpoint(),
            package: default_gatekeeper_package(),
        }
    }
}
