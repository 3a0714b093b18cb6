#![allow(dead_code)]

use std::sync::Arc;

use nfvbench::config::ConfigFile;
use nfvbench::orchestrator::{LifecycleOrchestrator, OsmCommands};
use nfvbench_test_utils::scripted_runner::ScriptedRunner;

pub use nfvbench_test_utils::init_tracing;

/// `ns-show` report of an instance that is up.
pub const NS_READY: &str = "\
| operational-status | running    |
| config-status      | configured |
";

/// `ns-show` report of an instance that is still coming up.
pub const NS_PENDING: &str = "\
| operational-status | init    |
| config-status      | init    |
";

pub fn orchestrator(
    runner: &Arc<ScriptedRunner>,
    cfg: &ConfigFile,
) -> LifecycleOrchestrator<ScriptedRunner> {
    LifecycleOrchestrator::new(
        Arc::clone(runner),
        OsmCommands::from_config(&cfg.orchestrator),
        cfg.timing.poll,
    )
}

/// `vim-list` output naming the given ports with the default prefix.
pub fn vim_list(ports: &[u32]) -> String {
    let mut out = String::from("+------+------+\n| name | uuid |\n+------+------+\n");
    for p in ports {
        out.push_str(&format!("| pop{p} | {p}-uuid |\n"));
    }
    out
}

/// `ns-list` output naming the given instances.
pub fn ns_list(names: &[&str]) -> String {
    let mut out = String::from(
        "+------------------+------+\n| ns instance name | id   |\n+------------------+------+\n",
    );
    for n in names {
        out.push_str(&format!("| {n} | x |\n"));
    }
    out
}
