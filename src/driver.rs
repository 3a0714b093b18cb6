// src/driver.rs

//! Experiment driver: topologies × repetitions × scenario.
//!
//! For every topology the driver runs `repetitions` independent repetitions.
//! Each repetition gets a fresh [`ExperimentSession`] and a fresh emulated
//! environment, runs the configured scenario against the orchestrator and
//! always stops the environment again. A failing repetition is logged with
//! its identity and the sweep moves on; the records it produced before the
//! failure are kept.
//!
//! Repetitions run strictly one after another. With `isolate_repetitions`
//! each one runs inside its own tokio task so that a panic is contained to
//! that repetition.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{ConfigFile, GatekeeperSection, ServiceSection};
use crate::emulator::{Environment, EnvironmentFactory};
use crate::errors::{BenchError, Result};
use crate::exec::CommandRunner;
use crate::orchestrator::{GatekeeperClient, LifecycleOrchestrator};
use crate::recorder::{FieldValue, ResultTable, TimedResult};
use crate::session::ExperimentSession;
use crate::topology::TopologySpec;
use crate::types::Scenario;

pub const TIMER_EMULATOR_BOOT: &str = "time_emulator_boot";
pub const TIMER_VIM_ATTACH: &str = "time_total_vim_attach";
pub const TIMER_ON_BOARD: &str = "time_total_on_board";
pub const TIMER_SERVICE_START: &str = "time_service_start";
pub const TIMER_SERVICE_ONBOARD: &str = "time_service_onboard";
pub const TIMER_SERVICE_INSTANTIATE: &str = "time_service_instantiate";
pub const FIELD_TIME_TOTAL: &str = "time_total";

/// Leading columns of the repetition summary table.
pub const SUMMARY_COLUMNS: [&str; 6] = [
    "topology",
    "repetition",
    "config_id",
    "run_id",
    "outcome",
    "error",
];

/// What the driver needs from the validated configuration.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub scenario: Scenario,
    pub repetitions: u32,
    pub max_services: u32,
    pub detach_retries: u32,
    pub settle: Duration,
    pub service_hold: Duration,
    pub isolate_repetitions: bool,
    pub seed: Option<u64>,
    pub service: ServiceSection,
    pub gatekeeper: GatekeeperSection,
}

impl DriverSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            scenario: cfg.experiment.scenario,
            repetitions: cfg.experiment.repetitions,
            max_services: cfg.experiment.max_services,
            detach_retries: cfg.experiment.detach_retries,
            settle: cfg.timing.settle,
            service_hold: cfg.timing.service_hold,
            isolate_repetitions: cfg.experiment.isolate_repetitions,
            seed: cfg.experiment.seed,
            service: cfg.service.clone(),
            gatekeeper: cfg.gatekeeper.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepetitionOutcome {
    Completed,
    Failed { kind: &'static str, message: String },
    Panicked(String),
}

impl RepetitionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RepetitionOutcome::Completed)
    }

    fn label(&self) -> &'static str {
        match self {
            RepetitionOutcome::Completed => "completed",
            RepetitionOutcome::Failed { .. } => "failed",
            RepetitionOutcome::Panicked(_) => "panicked",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepetitionReport {
    pub topology: String,
    pub repetition: u32,
    pub config_id: u32,
    /// `None` when the repetition panicked before handing back its session.
    pub run_id: Option<Uuid>,
    pub outcome: RepetitionOutcome,
    summary: BTreeMap<String, FieldValue>,
}

impl RepetitionReport {
    pub fn summary_row(&self) -> BTreeMap<String, FieldValue> {
        let mut row = self.summary.clone();
        row.insert("topology".into(), self.topology.as_str().into());
        row.insert("repetition".into(), self.repetition.into());
        row.insert("config_id".into(), self.config_id.into());
        if let Some(run_id) = self.run_id {
            row.insert("run_id".into(), run_id.to_string().into());
        }
        row.insert("outcome".into(), self.outcome.label().into());
        let error = match &self.outcome {
            RepetitionOutcome::Completed => String::new(),
            RepetitionOutcome::Failed { kind, message } => format!("{kind}: {message}"),
            RepetitionOutcome::Panicked(msg) => msg.clone(),
        };
        row.insert("error".into(), error.into());
        row
    }
}

/// Everything a sweep produced.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub repetitions: Vec<RepetitionReport>,
    pub records: Vec<TimedResult>,
    /// Set when the sweep stopped before running every repetition.
    pub interrupted: bool,
}

impl SweepReport {
    pub fn completed(&self) -> usize {
        self.repetitions.iter().filter(|r| r.outcome.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.repetitions.len() - self.completed()
    }

    /// One row per recorded action.
    pub fn action_table(&self) -> ResultTable {
        ResultTable::from_timed_results(&self.records)
    }

    /// One row per repetition.
    pub fn summary_table(&self) -> ResultTable {
        let rows: Vec<_> = self.repetitions.iter().map(RepetitionReport::summary_row).collect();
        ResultTable::from_maps(&rows, &SUMMARY_COLUMNS)
    }

    fn absorb(&mut self, session: ExperimentSession, outcome: RepetitionOutcome) {
        self.repetitions.push(RepetitionReport {
            topology: session.topology().to_string(),
            repetition: session.repetition(),
            config_id: session.config_id(),
            run_id: Some(session.run_id()),
            outcome,
            summary: session.summary_row(),
        });
        self.records.extend(session.into_recorder().into_records());
    }
}

pub struct ExperimentDriver<R: CommandRunner, F: EnvironmentFactory> {
    orchestrator: LifecycleOrchestrator<R>,
    gatekeeper: Arc<GatekeeperClient<R>>,
    factory: Arc<F>,
    settings: Arc<DriverSettings>,
}

impl<R: CommandRunner, F: EnvironmentFactory> Clone for ExperimentDriver<R, F> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            gatekeeper: Arc::clone(&self.gatekeeper),
            factory: Arc::clone(&self.factory),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<R, F> ExperimentDriver<R, F>
where
    R: CommandRunner + 'static,
    F: EnvironmentFactory + 'static,
{
    pub fn new(
        orchestrator: LifecycleOrchestrator<R>,
        gatekeeper: GatekeeperClient<R>,
        factory: F,
        settings: DriverSettings,
    ) -> Self {
        Self {
            orchestrator,
            gatekeeper: Arc::new(gatekeeper),
            factory: Arc::new(factory),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Run every repetition of every topology. Never fails: repetition
    /// failures end up in the report.
    pub async fn run_sweep(&self, topologies: &[TopologySpec]) -> SweepReport {
        let (_stop_tx, stop) = watch::channel(false);
        self.run_sweep_until(topologies, stop).await
    }

    /// Like `run_sweep`, but checks `stop` before each repetition. Once it
    /// reads `true` no further repetition starts and the report is marked
    /// interrupted; the repetition in flight is allowed to finish.
    pub async fn run_sweep_until(
        &self,
        topologies: &[TopologySpec],
        stop: watch::Receiver<bool>,
    ) -> SweepReport {
        let mut report = SweepReport::default();

        'sweep: for (index, topology) in topologies.iter().enumerate() {
            let config_id = index as u32;
            for repetition in 0..self.settings.repetitions {
                if *stop.borrow() {
                    warn!(
                        topology = %topology.name,
                        repetition,
                        "stop requested; skipping remaining repetitions"
                    );
                    report.interrupted = true;
                    break 'sweep;
                }
                info!(
                    topology = %topology.name,
                    repetition,
                    config_id,
                    scenario = %self.settings.scenario,
                    "running experiment"
                );

                if self.settings.isolate_repetitions {
                    self.run_isolated(topology, repetition, config_id, &mut report).await;
                } else {
                    let (session, result) = self.run_repetition(topology, repetition, config_id).await;
                    report.absorb(session, Self::outcome(topology, repetition, config_id, result));
                }
            }
        }

        info!(
            completed = report.completed(),
            failed = report.failed(),
            records = report.records.len(),
            interrupted = report.interrupted,
            "sweep finished"
        );
        report
    }

    async fn run_isolated(
        &self,
        topology: &TopologySpec,
        repetition: u32,
        config_id: u32,
        report: &mut SweepReport,
    ) {
        let driver = self.clone();
        let owned = topology.clone();
        let handle =
            tokio::spawn(async move { driver.run_repetition(&owned, repetition, config_id).await });

        match handle.await {
            Ok((session, result)) => {
                report.absorb(session, Self::outcome(topology, repetition, config_id, result));
            }
            Err(join_err) => {
                error!(
                    topology = %topology.name,
                    repetition,
                    config_id,
                    error = %join_err,
                    "repetition aborted"
                );
                report.repetitions.push(RepetitionReport {
                    topology: topology.name.clone(),
                    repetition,
                    config_id,
                    run_id: None,
                    outcome: RepetitionOutcome::Panicked(join_err.to_string()),
                    summary: BTreeMap::new(),
                });
            }
        }
    }

    fn outcome(
        topology: &TopologySpec,
        repetition: u32,
        config_id: u32,
        result: Result<()>,
    ) -> RepetitionOutcome {
        match result {
            Ok(()) => RepetitionOutcome::Completed,
            Err(err) => {
                error!(
                    topology = %topology.name,
                    repetition,
                    config_id,
                    kind = err.kind(),
                    error = %err,
                    "repetition failed"
                );
                RepetitionOutcome::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        }
    }

    /// One repetition: boot the environment, run the scenario, clean up.
    /// The session comes back whatever happened.
    pub async fn run_repetition(
        &self,
        topology: &TopologySpec,
        repetition: u32,
        config_id: u32,
    ) -> (ExperimentSession, Result<()>) {
        let mut session = ExperimentSession::new(topology.name.as_str(), repetition, config_id);
        session.set_field("scenario", self.settings.scenario.to_string());
        session.set_field("pops", topology.pops);

        let mut env = self.factory.create(topology);
        session.timer_start(TIMER_EMULATOR_BOOT);
        let result = match env.start().await {
            Ok(()) => {
                session.timer_stop(TIMER_EMULATOR_BOOT);
                let endpoints = env.list_access_endpoints();
                session.set_field("access_endpoints", endpoints.len());
                self.run_scenario(&mut session, &endpoints).await
            }
            Err(err) => Err(err),
        };

        if result.is_err() {
            self.cleanup_after_failure(&session).await;
        }
        if let Err(err) = env.stop().await {
            warn!(topology = %topology.name, repetition, error = %err, "stopping environment failed");
        }
        (session, result)
    }

    async fn run_scenario(&self, session: &mut ExperimentSession, endpoints: &[u32]) -> Result<()> {
        match self.settings.scenario {
            Scenario::Setup => self.run_setup(session, endpoints).await,
            Scenario::Service => self.run_service(session, endpoints).await,
            Scenario::Clean => self.run_clean(session).await,
            Scenario::Gatekeeper => self.run_gatekeeper(session).await,
        }
    }

    /// Attach every PoP, confirm, then detach everything again.
    async fn run_setup(&self, session: &mut ExperimentSession, endpoints: &[u32]) -> Result<()> {
        self.settle().await;
        self.attach_endpoints(session, endpoints).await?;
        self.orchestrator.show_accounts(session, endpoints).await?;
        self.settle().await;
        self.detach_with_retries(session, false).await
    }

    /// Full service lifecycle on freshly attached PoPs.
    async fn run_service(&self, session: &mut ExperimentSession, endpoints: &[u32]) -> Result<()> {
        let service = &self.settings.service;

        self.settle().await;
        match self.orchestrator.detach_all(session, false).await? {
            Some(stale) if !stale.is_empty() => info!(accounts = ?stale, "removed stale accounts"),
            Some(_) => {}
            None => warn!("could not list accounts; stale accounts may remain"),
        }
        self.settle().await;

        self.attach_endpoints(session, endpoints).await?;
        self.orchestrator.show_accounts(session, endpoints).await?;

        session.timer_start(TIMER_ON_BOARD);
        self.orchestrator.onboard_service(session, service).await?;
        session.timer_stop(TIMER_ON_BOARD);
        self.settle().await;

        let mut candidates = self.orchestrator.list_accounts(session).await;
        if candidates.is_empty() {
            candidates = session.attached_accounts().to_vec();
        }
        if candidates.is_empty() {
            return Err(BenchError::Other(anyhow!(
                "no infrastructure account available for placement"
            )));
        }

        let mut rng = self.placement_rng(session);
        session.timer_start(TIMER_SERVICE_START);
        for i in 0..self.settings.max_services {
            let instance = format!("{}{}", service.instance_prefix, i);
            let port = *candidates.choose(&mut rng).ok_or_else(|| {
                BenchError::Other(anyhow!("no infrastructure account available for placement"))
            })?;
            self.orchestrator
                .instantiate(session, &service.nsd_name, &instance, port)
                .await?;
        }
        session.timer_stop(TIMER_SERVICE_START);

        info!(
            instances = session.running_service_count(),
            hold_s = self.settings.service_hold.as_secs_f64(),
            "services up; holding"
        );
        sleep_for(self.settings.service_hold).await;

        for instance in session.running_instances().to_vec() {
            self.orchestrator.terminate(session, &instance, false).await?;
            self.settle().await;
        }

        self.detach_with_retries(session, false).await?;
        self.settle().await;
        self.orchestrator.offboard_service(session, service, false).await
    }

    /// Remove whatever the orchestrator still knows about, ours or not.
    async fn run_clean(&self, session: &mut ExperimentSession) -> Result<()> {
        let terminated = self.orchestrator.terminate_all(session, true).await?;
        info!(count = terminated.len(), "instances removed");
        self.orchestrator
            .offboard_service(session, &self.settings.service, true)
            .await?;
        self.detach_with_retries(session, true).await
    }

    /// Onboard and instantiate one package through the REST gatekeeper.
    async fn run_gatekeeper(&self, session: &mut ExperimentSession) -> Result<()> {
        let gk = &self.settings.gatekeeper;

        session.timer_start(TIMER_SERVICE_ONBOARD);
        self.gatekeeper.onboard(session, &gk.package).await?;
        let onboard = session.timer_stop(TIMER_SERVICE_ONBOARD).unwrap_or_default();

        session.timer_start(TIMER_SERVICE_INSTANTIATE);
        self.gatekeeper.instantiate(session).await?;
        let instantiate = session.timer_stop(TIMER_SERVICE_INSTANTIATE).unwrap_or_default();

        let boot = match session.fields().get(TIMER_EMULATOR_BOOT) {
            Some(FieldValue::Float(secs)) => *secs,
            _ => 0.0,
        };
        let total = boot + onboard.as_secs_f64() + instantiate.as_secs_f64();
        session.set_field(FIELD_TIME_TOTAL, total);
        info!(total_s = total, "gatekeeper service deployed");

        self.settle().await;
        Ok(())
    }

    async fn attach_endpoints(&self, session: &mut ExperimentSession, endpoints: &[u32]) -> Result<()> {
        session.timer_start(TIMER_VIM_ATTACH);
        for &port in endpoints {
            self.orchestrator.attach_account(session, port).await?;
        }
        session.timer_stop(TIMER_VIM_ATTACH);
        info!(count = endpoints.len(), "accounts attached");
        Ok(())
    }

    /// Repeat `detach_all` until a listing succeeds and comes back empty, or
    /// the retry budget is spent. A failed listing counts as an attempt.
    async fn detach_with_retries(&self, session: &mut ExperimentSession, force: bool) -> Result<()> {
        let retries = self.settings.detach_retries.max(1);
        for attempt in 1..=retries {
            match self.orchestrator.detach_all(session, force).await? {
                Some(listed) if listed.is_empty() => break,
                Some(_) => {}
                None => warn!(attempt, retries, "account listing failed during detach"),
            }
            if attempt < retries {
                self.settle().await;
            }
        }
        if session.attached_infra_count() > 0 {
            warn!(
                accounts = ?session.attached_accounts(),
                "accounts still attached after detach retries"
            );
        }
        Ok(())
    }

    /// Best-effort removal of everything the failed repetition still owns.
    /// Runs against a scratch scope so none of it reaches the result table.
    async fn cleanup_after_failure(&self, session: &ExperimentSession) {
        if self.settings.scenario == Scenario::Gatekeeper {
            return;
        }
        let mut scratch = session.cleanup_scope();

        for instance in scratch.running_instances().to_vec() {
            if let Err(err) = self.orchestrator.terminate(&mut scratch, &instance, true).await {
                warn!(instance = %instance, error = %err, "cleanup: terminate failed");
            }
        }
        for port in scratch.attached_accounts().to_vec() {
            if let Err(err) = self.orchestrator.detach_account(&mut scratch, port, true).await {
                warn!(port, error = %err, "cleanup: detach failed");
            }
        }
        if scratch.running_service_count() > 0 || scratch.attached_infra_count() > 0 {
            warn!(
                instances = ?scratch.running_instances(),
                accounts = ?scratch.attached_accounts(),
                "cleanup left entities behind"
            );
        }
    }

    fn placement_rng(&self, session: &ExperimentSession) -> StdRng {
        match self.settings.seed {
            Some(seed) => {
                let salt = (u64::from(session.config_id()) << 32) | u64::from(session.repetition());
                StdRng::seed_from_u64(seed ^ salt)
            }
            None => StdRng::from_entropy(),
        }
    }

    async fn settle(&self) {
        sleep_for(self.settings.settle).await;
    }
}

async fn sleep_for(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: RepetitionOutcome) -> RepetitionReport {
        RepetitionReport {
            topology: "Abilene.graphml".into(),
            repetition: 1,
            config_id: 0,
            run_id: None,
            outcome,
            summary: BTreeMap::new(),
        }
    }

    #[test]
    fn summary_row_carries_outcome_and_error() {
        let row = report(RepetitionOutcome::Failed {
            kind: "operation_failed",
            message: "ns-create exited with 1".into(),
        })
        .summary_row();
        assert_eq!(row["outcome"], FieldValue::from("failed"));
        assert_eq!(
            row["error"],
            FieldValue::from("operation_failed: ns-create exited with 1")
        );
        assert!(!row.contains_key("run_id"));
    }

    #[test]
    fn summary_table_leads_with_identity_columns() {
        let sweep = SweepReport {
            repetitions: vec![report(RepetitionOutcome::Completed)],
            ..SweepReport::default()
        };
        let table = sweep.summary_table();
        assert_eq!(
            &table.columns[..3],
            &["topology".to_string(), "repetition".to_string(), "config_id".to_string()]
        );
        assert_eq!(sweep.completed(), 1);
        assert_eq!(sweep.failed(), 0);
    }
}
