use std::sync::{Arc, Mutex};

use nfvbench::emulator::{EnvFuture, Environment, EnvironmentFactory};
use nfvbench::errors::BenchError;
use nfvbench::topology::TopologySpec;

/// Shared log of environment lifecycle events, e.g. `start:Abilene.graphml`.
pub type EnvEvents = Arc<Mutex<Vec<String>>>;

/// An environment that:
/// - exposes `base_port..base_port + pops` as access endpoints
/// - records start/stop events
/// - optionally refuses to start.
pub struct FakeEnvironment {
    name: String,
    endpoints: Vec<u32>,
    fail_start: bool,
    events: EnvEvents,
}

impl Environment for FakeEnvironment {
    fn start(&mut self) -> EnvFuture<'_> {
        Box::pin(async move {
            self.events.lock().unwrap().push(format!("start:{}", self.name));
            if self.fail_start {
                return Err(BenchError::OperationFailed {
                    action: "emulator-start".to_string(),
                    exit_code: 1,
                });
            }
            Ok(())
        })
    }

    fn stop(&mut self) -> EnvFuture<'_> {
        Box::pin(async move {
            self.events.lock().unwrap().push(format!("stop:{}", self.name));
            Ok(())
        })
    }

    fn list_access_endpoints(&self) -> Vec<u32> {
        self.endpoints.clone()
    }
}

#[derive(Debug, Clone)]
pub struct FakeEnvironmentFactory {
    base_port: u32,
    fail_start_for: Option<String>,
    events: EnvEvents,
}

impl FakeEnvironmentFactory {
    pub fn new(base_port: u32) -> Self {
        Self {
            base_port,
            fail_start_for: None,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Environments for this topology fail to start.
    pub fn failing_start_for(mut self, topology: &str) -> Self {
        self.fail_start_for = Some(topology.to_string());
        self
    }

    pub fn events(&self) -> EnvEvents {
        Arc::clone(&self.events)
    }
}

impl EnvironmentFactory for FakeEnvironmentFactory {
    type Env = FakeEnvironment;

    fn create(&self, topology: &TopologySpec) -> FakeEnvironment {
        FakeEnvironment {
            name: topology.name.clone(),
            endpoints: (0..topology.pops as u32).map(|i| self.base_port + i).collect(),
            fail_start: self.fail_start_for.as_deref() == Some(topology.name.as_str()),
            events: Arc::clone(&self.events),
        }
    }
}
