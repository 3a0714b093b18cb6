// src/lib.rs

pub mod cli;
pub mod config;
pub mod driver;
pub mod emulator;
pub mod errors;
pub mod exec;
pub mod export;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod poll;
pub mod recorder;
pub mod session;
pub mod status;
pub mod topology;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, RawConfigFile, apply_env_overrides, load_or_default};
use crate::driver::{DriverSettings, ExperimentDriver};
use crate::emulator::CommandEnvironmentFactory;
use crate::exec::ShellCommandRunner;
use crate::fs::RealFileSystem;
use crate::orchestrator::{GatekeeperClient, LifecycleOrchestrator, OsmCommands};
use crate::topology::{TopologySpec, discover_topologies};
use crate::types::Scenario;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, environment, CLI overrides)
/// - topology discovery
/// - orchestrator / emulator collaborators over the shell runner
/// - the sweep and the CSV export
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut raw = load_or_default(&config_path)?;
    apply_env_overrides(&mut raw);
    apply_cli_overrides(&mut raw, &args);
    let cfg = ConfigFile::try_from(raw)?;

    let fs = RealFileSystem;
    let topologies = discover_topologies(
        &fs,
        Path::new(&cfg.experiment.zoo_path),
        &cfg.experiment.topologies,
    )?;

    if args.dry_run {
        print_dry_run(&cfg, &topologies);
        return Ok(());
    }

    if topologies.is_empty() {
        bail!(
            "none of the configured topologies were found below {}",
            cfg.experiment.zoo_path
        );
    }

    let driver = build_driver(&cfg);

    let (stop_tx, stop) = tokio::sync::watch::channel(false);
    let interrupt = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Ctrl+C received; finishing the current repetition");
                let _ = stop_tx.send(true);
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
        }
    });
    let report = driver.run_sweep_until(&topologies, stop).await;
    interrupt.abort();

    let paths = export::export_report(&fs, Path::new(&cfg.experiment.result_path), &report)?;
    info!(
        summary = %paths.summary.display(),
        actions = %paths.actions.display(),
        completed = report.completed(),
        failed = report.failed(),
        "experiment finished"
    );
    if report.failed() > 0 {
        warn!(failed = report.failed(), "some repetitions failed; see the error column");
    }
    if report.interrupted {
        bail!("interrupted; partial results written");
    }
    Ok(())
}

/// Production wiring: every collaborator shares one shell runner.
pub fn build_driver(
    cfg: &ConfigFile,
) -> ExperimentDriver<ShellCommandRunner, CommandEnvironmentFactory<ShellCommandRunner>> {
    let runner = Arc::new(ShellCommandRunner::new(cfg.timing.command_timeout));
    let orchestrator = LifecycleOrchestrator::new(
        Arc::clone(&runner),
        OsmCommands::from_config(&cfg.orchestrator),
        cfg.timing.poll,
    );
    let gatekeeper = GatekeeperClient::new(Arc::clone(&runner), cfg.gatekeeper.endpoint.clone());
    let factory = CommandEnvironmentFactory::new(runner, cfg.emulator.clone());
    ExperimentDriver::new(orchestrator, gatekeeper, factory, DriverSettings::from_config(cfg))
}

/// CLI flags win over the file and the environment.
pub fn apply_cli_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(scenario) = args.scenario {
        raw.experiment.scenario = scenario;
    }
    if let Some(n) = args.repetitions {
        raw.experiment.repetitions = n;
    }
    if let Some(n) = args.max_services {
        raw.experiment.max_services = n;
    }
    if let Some(ref path) = args.result_path {
        raw.experiment.result_path = path.clone();
    }
    if !args.topologies.is_empty() {
        raw.experiment.topologies = args.topologies.clone();
    }
}

fn print_dry_run(cfg: &ConfigFile, topologies: &[TopologySpec]) {
    let exp = &cfg.experiment;
    println!("nfvbench dry-run");
    println!("  scenario = {}", exp.scenario);
    println!("  repetitions = {}", exp.repetitions);
    println!("  orchestrator = {} @ {}", cfg.orchestrator.tool, cfg.orchestrator.vim_host);
    println!(
        "  poll = {} attempts, worst case {:?}",
        cfg.timing.poll.max_attempts,
        cfg.timing.poll.worst_case_wait()
    );
    println!("  settle = {:?}", cfg.timing.settle);
    if exp.scenario == Scenario::Service {
        println!("  max_services = {}", exp.max_services);
        println!("  service_hold = {:?}", cfg.timing.service_hold);
        println!("  nsd = {}", cfg.service.nsd_name);
    }
    if exp.scenario == Scenario::Gatekeeper {
        println!("  gatekeeper = {}", cfg.gatekeeper.endpoint);
    }
    println!("  result_path = {}", exp.result_path);
    println!();

    println!("topologies ({}):", topologies.len());
    for (config_id, topo) in topologies.iter().enumerate() {
        println!("  - [{config_id}] {} ({} PoPs)", topo.name, topo.pops);
        println!("      path: {}", topo.path.display());
    }

    debug!("dry-run complete (no execution)");
}
