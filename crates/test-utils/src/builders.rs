#![allow(dead_code)]

use std::path::PathBuf;

use nfvbench::config::{ConfigFile, RawConfigFile};
use nfvbench::topology::TopologySpec;
use nfvbench::types::Scenario;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults with every pause shortened so a whole
/// sweep runs in milliseconds.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.poll.interval = "1ms".to_string();
        config.poll.max_attempts = 5;
        config.experiment.settle = "0ms".to_string();
        config.experiment.service_hold = "0ms".to_string();
        config.experiment.seed = Some(7);
        Self { config }
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.config.experiment.scenario = scenario;
        self
    }

    pub fn repetitions(mut self, n: u32) -> Self {
        self.config.experiment.repetitions = n;
        self
    }

    pub fn max_services(mut self, n: u32) -> Self {
        self.config.experiment.max_services = n;
        self
    }

    pub fn detach_retries(mut self, n: u32) -> Self {
        self.config.experiment.detach_retries = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.poll.max_attempts = n;
        self
    }

    pub fn isolate_repetitions(mut self, isolate: bool) -> Self {
        self.config.experiment.isolate_repetitions = isolate;
        self
    }

    pub fn raw(&self) -> &RawConfigFile {
        &self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A topology with `pops` PoPs that never touches the filesystem.
pub fn topology(name: &str, pops: usize) -> TopologySpec {
    TopologySpec {
        name: name.to_string(),
        path: PathBuf::from(format!("zoo/{name}")),
        pops,
    }
}
