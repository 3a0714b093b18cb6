// src/session.rs

//! Per-repetition experiment state.
//!
//! An `ExperimentSession` is handed by `&mut` to every orchestrator call. It
//! owns the repetition's identity, the accounts and instances it created,
//! scenario fields (timers and topology stats) and its own `ResultRecorder`.
//! Nothing here is global, so two sessions never share counters or logs.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::recorder::{FieldValue, RecordContext, ResultRecorder, TimedResult};

#[derive(Debug)]
pub struct ExperimentSession {
    run_id: Uuid,
    config_id: u32,
    topology: String,
    repetition: u32,
    attached: Vec<u32>,
    instances: Vec<String>,
    fields: BTreeMap<String, FieldValue>,
    timers: HashMap<String, Instant>,
    recorder: ResultRecorder,
}

impl ExperimentSession {
    pub fn new(topology: impl Into<String>, repetition: u32, config_id: u32) -> Self {
        let topology = topology.into();
        let mut fields = BTreeMap::new();
        fields.insert("topology".to_string(), FieldValue::from(topology.as_str()));
        fields.insert("repetition".to_string(), FieldValue::from(repetition));

        Self {
            run_id: Uuid::new_v4(),
            config_id,
            topology,
            repetition,
            attached: Vec::new(),
            instances: Vec::new(),
            fields,
            timers: HashMap::new(),
            recorder: ResultRecorder::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config_id(&self) -> u32 {
        self.config_id
    }

    pub fn topology(&self) -> &str {
        &self.topology
    }

    pub fn repetition(&self) -> u32 {
        self.repetition
    }

    /// Accounts attached by this session, in attach order.
    pub fn attached_accounts(&self) -> &[u32] {
        &self.attached
    }

    /// Live instances created by this session, in creation order.
    pub fn running_instances(&self) -> &[String] {
        &self.instances
    }

    pub fn running_service_count(&self) -> usize {
        self.instances.len()
    }

    pub fn attached_infra_count(&self) -> usize {
        self.attached.len()
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Append one result stamped with the current counters and fields.
    pub fn record(&mut self, action: &str, elapsed: Duration) -> &TimedResult {
        let ctx = RecordContext {
            run_id: self.run_id,
            config_id: self.config_id,
            running_service_count: self.instances.len(),
            attached_infra_count: self.attached.len(),
            fields: &self.fields,
        };
        self.recorder.record(action, elapsed, ctx)
    }

    pub fn recorder(&self) -> &ResultRecorder {
        &self.recorder
    }

    pub fn into_recorder(self) -> ResultRecorder {
        self.recorder
    }

    /// A copy of this session's identity and owned entities with an empty
    /// log. Best-effort cleanup after a failure runs against it so that its
    /// actions stay out of the result table.
    pub fn cleanup_scope(&self) -> ExperimentSession {
        ExperimentSession {
            run_id: self.run_id,
            config_id: self.config_id,
            topology: self.topology.clone(),
            repetition: self.repetition,
            attached: self.attached.clone(),
            instances: self.instances.clone(),
            fields: self.fields.clone(),
            timers: HashMap::new(),
            recorder: ResultRecorder::new(),
        }
    }

    pub fn timer_start(&mut self, name: &str) {
        debug!(timer = name, "timer start");
        self.timers.insert(name.to_string(), Instant::now());
    }

    /// Stop a named timer and store its elapsed seconds as a scenario field.
    pub fn timer_stop(&mut self, name: &str) -> Option<Duration> {
        let Some(started) = self.timers.remove(name) else {
            warn!(timer = name, "timer stopped without being started");
            return None;
        };
        let elapsed = started.elapsed();
        debug!(timer = name, elapsed_s = elapsed.as_secs_f64(), "timer stop");
        self.fields
            .insert(name.to_string(), FieldValue::from(elapsed.as_secs_f64()));
        Some(elapsed)
    }

    pub(crate) fn mark_attached(&mut self, account: u32) {
        if !self.attached.contains(&account) {
            self.attached.push(account);
        }
    }

    pub(crate) fn mark_detached(&mut self, account: u32) {
        self.attached.retain(|a| *a != account);
    }

    pub(crate) fn mark_instantiated(&mut self, instance: &str) {
        if !self.instances.iter().any(|i| i == instance) {
            self.instances.push(instance.to_string());
        }
    }

    pub(crate) fn mark_terminated(&mut self, instance: &str) {
        self.instances.retain(|i| i != instance);
    }

    /// One summary row for the repetition table.
    pub fn summary_row(&self) -> BTreeMap<String, FieldValue> {
        let mut row = self.fields.clone();
        row.insert("run_id".into(), self.run_id.to_string().into());
        row.insert("config_id".into(), self.config_id.into());
        row.insert("actions_recorded".into(), self.recorder.len().into());
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_marks() {
        let mut s = ExperimentSession::new("Abilene", 0, 1);
        s.mark_attached(6001);
        s.mark_attached(6002);
        s.mark_attached(6001);
        assert_eq!(s.attached_accounts(), &[6001, 6002]);

        s.mark_instantiated("i0");
        assert_eq!(s.running_service_count(), 1);
        s.mark_terminated("i0");
        s.mark_detached(6001);
        assert_eq!(s.running_service_count(), 0);
        assert_eq!(s.attached_accounts(), &[6002]);
    }

    #[test]
    fn timers_become_fields_of_later_records() {
        let mut s = ExperimentSession::new("Abilene", 2, 1);
        s.record("vim-list", Duration::ZERO);
        s.timer_start("time_total_vim_attach");
        let elapsed = s.timer_stop("time_total_vim_attach");
        assert!(elapsed.is_some());
        s.record("vim-show", Duration::ZERO);

        let records = s.recorder().records();
        assert!(!records[0].fields.contains_key("time_total_vim_attach"));
        assert!(records[1].fields.contains_key("time_total_vim_attach"));
        assert_eq!(records[1].fields["repetition"], FieldValue::Int(2));
    }

    #[test]
    fn stopping_unknown_timer_is_harmless() {
        let mut s = ExperimentSession::new("t", 0, 0);
        assert!(s.timer_stop("nope").is_none());
        assert!(!s.fields().contains_key("nope"));
    }

    #[test]
    fn cleanup_scope_starts_with_empty_log() {
        let mut s = ExperimentSession::new("t", 0, 0);
        s.mark_attached(6001);
        s.record("vim-create", Duration::ZERO);
        let scratch = s.cleanup_scope();
        assert!(scratch.recorder().is_empty());
        assert_eq!(scratch.attached_accounts(), &[6001]);
        assert_eq!(scratch.run_id(), s.run_id());
    }

    #[test]
    fn sessions_do_not_share_state() {
        let mut a = ExperimentSession::new("t", 0, 0);
        let b = ExperimentSession::new("t", 1, 0);
        a.record("vim-create", Duration::ZERO);
        assert_eq!(a.recorder().len(), 1);
        assert!(b.recorder().is_empty());
        assert_ne!(a.run_id(), b.run_id());
    }
}
