// tests/export_csv.rs

mod common;
use crate::common::vim_list;

use std::sync::Arc;

use nfvbench::driver::{DriverSettings, ExperimentDriver};
use nfvbench::export::export_report;
use nfvbench::fs::RealFileSystem;
use nfvbench::orchestrator::{GatekeeperClient, action};
use nfvbench_test_utils::builders::{ConfigFileBuilder, topology};
use nfvbench_test_utils::fake_env::FakeEnvironmentFactory;
use nfvbench_test_utils::scripted_runner::ScriptedRunner;

#[tokio::test]
async fn sweep_results_land_in_two_csv_files() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .push(action::VIM_SHOW, 0, "")
        .set_default(action::VIM_SHOW, 1, "")
        .push(action::VIM_LIST, 0, &vim_list(&[6001]));

    let driver = ExperimentDriver::new(
        common::orchestrator(&runner, &cfg),
        GatekeeperClient::new(Arc::clone(&runner), cfg.gatekeeper.endpoint.clone()),
        FakeEnvironmentFactory::new(6001),
        DriverSettings::from_config(&cfg),
    );
    let report = driver.run_sweep(&[topology("Abilene.graphml", 1)]).await;

    let dir = tempfile::tempdir().unwrap();
    let result_path = dir.path().join("out").join("result.csv");
    let paths = export_report(&RealFileSystem, &result_path, &report).unwrap();

    assert_eq!(paths.actions, dir.path().join("out").join("actions_result.csv"));

    let mut summary = csv::Reader::from_path(&paths.summary).unwrap();
    let headers = summary.headers().unwrap().clone();
    assert_eq!(&headers[0], "topology");
    let rows: Vec<_> = summary.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    let outcome = headers.iter().position(|h| h == "outcome").unwrap();
    assert_eq!(&rows[0][outcome], "completed");

    let mut actions = csv::Reader::from_path(&paths.actions).unwrap();
    let headers = actions.headers().unwrap().clone();
    assert_eq!(&headers[0], "action");
    let names: Vec<String> = actions
        .records()
        .map(|r| r.unwrap()[0].to_string())
        .collect();
    assert_eq!(names, vec!["vim-create", "vim-show", "vim-list", "vim-delete", "vim-list"]);
}
