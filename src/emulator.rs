// src/emulator.rs

//! Emulated multi-site environment, as seen by the driver.
//!
//! The emulator itself is an external system. The driver only needs to start
//! it for a topology, learn the access endpoints (one per PoP) and stop it
//! again. [`CommandEnvironment`] does that with configured shell commands;
//! tests provide their own [`Environment`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::EmulatorSection;
use crate::errors::{BenchError, Result};
use crate::exec::CommandRunner;
use crate::topology::TopologySpec;

pub type EnvFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub const EMULATOR_START: &str = "emulator-start";
pub const EMULATOR_STOP: &str = "emulator-stop";
pub const EMULATOR_CLEANUP: &str = "emulator-cleanup";

/// Handle on one running emulated environment.
pub trait Environment: Send {
    fn start(&mut self) -> EnvFuture<'_>;

    /// Best-effort: implementations log problems rather than fail, except
    /// when a command cannot be launched at all.
    fn stop(&mut self) -> EnvFuture<'_>;

    /// Ports of the per-PoP access endpoints (one infrastructure account each).
    fn list_access_endpoints(&self) -> Vec<u32>;
}

/// Creates a fresh environment for every repetition.
pub trait EnvironmentFactory: Send + Sync {
    type Env: Environment + 'static;

    fn create(&self, topology: &TopologySpec) -> Self::Env;
}

/// Environment driven by `[emulator]` shell commands.
#[derive(Debug)]
pub struct CommandEnvironment<R: CommandRunner> {
    runner: Arc<R>,
    cfg: EmulatorSection,
    topology: TopologySpec,
    running: bool,
}

impl<R: CommandRunner> CommandEnvironment<R> {
    pub fn new(runner: Arc<R>, cfg: EmulatorSection, topology: TopologySpec) -> Self {
        Self {
            runner,
            cfg,
            topology,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pops(&self) -> usize {
        match self.cfg.max_pops {
            0 => self.topology.pops,
            cap => self.topology.pops.min(cap),
        }
    }

    /// Fill `{topology}`, `{base_port}` and `{pops}` in a command template.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{topology}", &self.topology.path.display().to_string())
            .replace("{base_port}", &self.cfg.base_port.to_string())
            .replace("{pops}", &self.pops().to_string())
    }

    async fn start_inner(&mut self) -> Result<()> {
        if let Some(template) = self.cfg.start_cmd.as_deref() {
            let cmd = self.render(template);
            let out = self.runner.run(EMULATOR_START, &cmd).await?;
            if !out.success() {
                return Err(BenchError::OperationFailed {
                    action: EMULATOR_START.to_string(),
                    exit_code: out.exit_code,
                });
            }
        }
        self.running = true;
        info!(
            topology = %self.topology.name,
            pops = self.pops(),
            base_port = self.cfg.base_port,
            "emulated environment started"
        );
        Ok(())
    }

    async fn stop_inner(&mut self) -> Result<()> {
        let steps = [
            (EMULATOR_STOP, self.cfg.stop_cmd.clone()),
            (EMULATOR_CLEANUP, self.cfg.cleanup_cmd.clone()),
        ];
        for (action, template) in steps {
            let Some(template) = template else { continue };
            let cmd = self.render(&template);
            let out = self.runner.run(action, &cmd).await?;
            if !out.success() {
                warn!(action, exit_code = out.exit_code, "emulator teardown step failed");
            }
        }
        self.running = false;
        info!(topology = %self.topology.name, "emulated environment stopped");
        Ok(())
    }
}

impl<R: CommandRunner> Environment for CommandEnvironment<R> {
    fn start(&mut self) -> EnvFuture<'_> {
        Box::pin(self.start_inner())
    }

    fn stop(&mut self) -> EnvFuture<'_> {
        Box::pin(self.stop_inner())
    }

    fn list_access_endpoints(&self) -> Vec<u32> {
        let base = u32::from(self.cfg.base_port);
        (0..self.pops()).map(|i| base + i as u32).collect()
    }
}

pub struct CommandEnvironmentFactory<R: CommandRunner> {
    runner: Arc<R>,
    cfg: EmulatorSection,
}

impl<R: CommandRunner> CommandEnvironmentFactory<R> {
    pub fn new(runner: Arc<R>, cfg: EmulatorSection) -> Self {
        Self { runner, cfg }
    }
}

impl<R: CommandRunner + 'static> EnvironmentFactory for CommandEnvironmentFactory<R> {
    type Env = CommandEnvironment<R>;

    fn create(&self, topology: &TopologySpec) -> Self::Env {
        CommandEnvironment::new(Arc::clone(&self.runner), self.cfg.clone(), topology.clone())
    }
}
