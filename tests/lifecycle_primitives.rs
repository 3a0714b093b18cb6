// tests/lifecycle_primitives.rs

mod common;
use crate::common::{NS_PENDING, NS_READY, init_tracing, ns_list, orchestrator, vim_list};

use std::sync::Arc;

use nfvbench::errors::BenchError;
use nfvbench::orchestrator::action;
use nfvbench::session::ExperimentSession;
use nfvbench_test_utils::builders::ConfigFileBuilder;
use nfvbench_test_utils::scripted_runner::ScriptedRunner;

fn session() -> ExperimentSession {
    ExperimentSession::new("Abilene.graphml", 0, 0)
}

#[tokio::test]
async fn attach_instantiate_terminate_detach_records_one_result_per_primitive() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .push(action::NS_SHOW, 0, NS_PENDING)
        .push(action::NS_SHOW, 0, NS_PENDING)
        .push(action::NS_SHOW, 0, NS_READY)
        .set_default(action::NS_SHOW, 1, "")
        .set_default(action::VIM_SHOW, 1, "");
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();

    orch.attach_account(&mut s, 6001).await.unwrap();
    orch.attach_account(&mut s, 6002).await.unwrap();
    let attempts = orch.instantiate(&mut s, "pingpong", "PiPoInst0", 6001).await.unwrap();
    assert_eq!(attempts, 3);
    orch.terminate(&mut s, "PiPoInst0", false).await.unwrap();
    assert!(orch.detach_account(&mut s, 6001, false).await.unwrap());
    assert!(orch.detach_account(&mut s, 6002, false).await.unwrap());

    assert_eq!(
        s.recorder().actions(),
        vec!["vim-create", "vim-create", "ns-create", "ns-delete", "vim-delete", "vim-delete"]
    );

    // Counters are sampled before each primitive mutates them.
    let records = s.recorder().records();
    assert_eq!(records[2].running_service_count, 0);
    assert_eq!(records[2].attached_infra_count, 2);
    assert_eq!(records[3].running_service_count, 1);
    assert_eq!(records[4].attached_infra_count, 2);
    assert_eq!(records[5].attached_infra_count, 1);

    // Three readiness checks plus one gone check; none of them recorded.
    assert_eq!(runner.count(action::NS_SHOW), 4);
    assert_eq!(s.running_service_count(), 0);
    assert_eq!(s.attached_infra_count(), 0);
}

#[tokio::test]
async fn failed_instantiate_aborts_without_polling() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner.push(action::NS_CREATE, 1, "");
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();

    orch.attach_account(&mut s, 6001).await.unwrap();
    let err = orch
        .instantiate(&mut s, "pingpong", "PiPoInst0", 6001)
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::OperationFailed { action: ref a, exit_code: 1 } if a == "ns-create"));
    assert_eq!(runner.count(action::NS_SHOW), 0);
    assert_eq!(s.recorder().actions(), vec!["vim-create", "ns-create"]);
    assert!(s.running_instances().is_empty());
}

#[tokio::test]
async fn readiness_timeout_is_fatal_but_instance_stays_tracked() {
    let cfg = ConfigFileBuilder::new().max_attempts(4).build();
    let runner = Arc::new(ScriptedRunner::new());
    runner.set_default(action::NS_SHOW, 0, NS_PENDING);
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();

    let err = orch
        .instantiate(&mut s, "pingpong", "PiPoInst0", 6001)
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::ConvergenceTimeout { attempts: 4, .. }));
    assert_eq!(runner.count(action::NS_SHOW), 4);
    assert_eq!(s.running_instances(), &["PiPoInst0".to_string()]);
    assert_eq!(s.recorder().actions(), vec!["ns-create"]);
}

#[tokio::test]
async fn readiness_check_error_still_tracks_created_instance() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .push(action::NS_SHOW, 0, NS_PENDING)
        .push_launch_error(action::NS_SHOW);
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();

    let err = orch
        .instantiate(&mut s, "pingpong", "PiPoInst0", 6001)
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::Execution { .. }));
    assert_eq!(runner.count(action::NS_SHOW), 2);
    assert_eq!(s.running_instances(), &["PiPoInst0".to_string()]);
    assert_eq!(s.recorder().actions(), vec!["ns-create"]);
}

#[tokio::test]
async fn launch_failure_is_recorded_before_it_propagates() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner.push_launch_error(action::VIM_CREATE);
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();

    let err = orch.attach_account(&mut s, 6001).await.unwrap_err();
    assert!(matches!(err, BenchError::Execution { .. }));
    assert_eq!(s.recorder().actions(), vec!["vim-create"]);
    assert_eq!(s.attached_infra_count(), 0);
}

#[tokio::test]
async fn failed_detach_is_tolerated_and_account_stays_attached() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner.push(action::VIM_DELETE, 1, "");
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();

    orch.attach_account(&mut s, 6001).await.unwrap();
    let detached = orch.detach_account(&mut s, 6001, false).await.unwrap();

    assert!(!detached);
    assert_eq!(s.attached_accounts(), &[6001]);
    assert_eq!(runner.count(action::VIM_SHOW), 0);
}

#[tokio::test]
async fn detach_all_twice_is_idempotent() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .push(action::VIM_LIST, 0, &vim_list(&[6001, 6002]))
        .set_default(action::VIM_LIST, 0, &vim_list(&[]))
        .set_default(action::VIM_SHOW, 1, "");
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();
    orch.attach_account(&mut s, 6001).await.unwrap();
    orch.attach_account(&mut s, 6002).await.unwrap();

    let first = orch.detach_all(&mut s, false).await.unwrap();
    let second = orch.detach_all(&mut s, false).await.unwrap();

    assert_eq!(first, Some(vec![6001, 6002]));
    assert_eq!(second, Some(vec![]));
    assert_eq!(runner.count(action::VIM_DELETE), 2);
    assert_eq!(s.attached_infra_count(), 0);
}

#[tokio::test]
async fn detach_all_forgets_accounts_the_orchestrator_no_longer_lists() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();
    orch.attach_account(&mut s, 6001).await.unwrap();

    let listed = orch.detach_all(&mut s, false).await.unwrap();

    assert_eq!(listed, Some(vec![]));
    assert_eq!(s.attached_infra_count(), 0);
    assert_eq!(runner.count(action::VIM_DELETE), 0);
}

#[tokio::test]
async fn detach_all_keeps_session_accounts_when_listing_fails() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner.push(action::VIM_LIST, 1, "").push_launch_error(action::VIM_LIST);
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();
    orch.attach_account(&mut s, 6001).await.unwrap();
    orch.attach_account(&mut s, 6002).await.unwrap();

    assert_eq!(orch.detach_all(&mut s, false).await.unwrap(), None);
    assert_eq!(orch.detach_all(&mut s, true).await.unwrap(), None);

    assert_eq!(s.attached_accounts(), &[6001, 6002]);
    assert_eq!(runner.count(action::VIM_DELETE), 0);
    assert_eq!(
        s.recorder().actions(),
        vec!["vim-create", "vim-create", "vim-list", "vim-list"]
    );
}

#[tokio::test]
async fn listing_failure_yields_empty_list() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner.push(action::VIM_LIST, 2, "boom").push_launch_error(action::NS_LIST);
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();

    assert!(orch.list_accounts(&mut s).await.is_empty());
    assert!(orch.list_instances(&mut s).await.is_empty());
    assert_eq!(s.recorder().actions(), vec!["vim-list", "ns-list"]);
}

#[tokio::test]
async fn unforced_terminate_failure_is_fatal_forced_is_not() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .push(action::NS_SHOW, 0, NS_READY)
        .push(action::NS_DELETE, 1, "")
        .push(action::NS_DELETE, 1, "")
        .set_default(action::NS_SHOW, 1, "");
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();
    orch.instantiate(&mut s, "pingpong", "i0", 6001).await.unwrap();

    let err = orch.terminate(&mut s, "i0", false).await.unwrap_err();
    assert_eq!(err.kind(), "operation_failed");
    assert_eq!(s.running_service_count(), 1);

    orch.terminate(&mut s, "i0", true).await.unwrap();
    assert_eq!(s.running_service_count(), 0);
}

#[tokio::test]
async fn terminate_all_removes_every_listed_instance() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .push(action::NS_LIST, 0, &ns_list(&["PiPoInst0", "PiPoInst1"]))
        .set_default(action::NS_SHOW, 1, "");
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();

    let removed = orch.terminate_all(&mut s, true).await.unwrap();

    assert_eq!(removed, vec!["PiPoInst0", "PiPoInst1"]);
    let deletes: Vec<_> = runner
        .calls()
        .into_iter()
        .filter(|c| c.action == action::NS_DELETE)
        .map(|c| c.command)
        .collect();
    assert_eq!(deletes.len(), 2);
    assert!(deletes[0].contains("PiPoInst0"));
    assert!(deletes.iter().all(|c| c.contains("--force")));
}

#[tokio::test]
async fn onboard_and_offboard_follow_descriptor_order() {
    let cfg = ConfigFileBuilder::new().build();
    let runner = Arc::new(ScriptedRunner::new());
    let orch = orchestrator(&runner, &cfg);
    let mut s = session();

    orch.onboard_service(&mut s, &cfg.service).await.unwrap();
    orch.offboard_service(&mut s, &cfg.service, false).await.unwrap();

    assert_eq!(
        s.recorder().actions(),
        vec!["vnfd-create", "vnfd-create", "nsd-create", "nsd-delete", "vnfd-delete", "vnfd-delete"]
    );
}
