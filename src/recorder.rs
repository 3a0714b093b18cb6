// src/recorder.rs

//! Timed result log and its tabular view.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Fixed leading columns of the action table, in export order.
pub const TIMED_RESULT_COLUMNS: [&str; 7] = [
    "action",
    "duration_seconds",
    "run_id",
    "config_id",
    "running_service_count",
    "attached_infra_count",
    "recorded_at",
];

/// A scenario-level value attached to a record (timer, topology stat, label).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// One timed orchestrator primitive. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedResult {
    pub action: String,
    pub duration_seconds: f64,
    pub run_id: Uuid,
    pub config_id: u32,
    pub running_service_count: usize,
    pub attached_infra_count: usize,
    pub recorded_at: DateTime<Utc>,
    /// Scenario fields (timers, topology, repetition, ...) at recording time.
    pub fields: BTreeMap<String, FieldValue>,
}

impl TimedResult {
    pub fn row(&self) -> BTreeMap<String, FieldValue> {
        let mut row = self.fields.clone();
        row.insert("action".into(), self.action.clone().into());
        row.insert("duration_seconds".into(), self.duration_seconds.into());
        row.insert("run_id".into(), self.run_id.to_string().into());
        row.insert("config_id".into(), self.config_id.into());
        row.insert("running_service_count".into(), self.running_service_count.into());
        row.insert("attached_infra_count".into(), self.attached_infra_count.into());
        row.insert("recorded_at".into(), self.recorded_at.to_rfc3339().into());
        row
    }
}

/// Counters and identity stamped onto every record.
#[derive(Debug, Clone)]
pub struct RecordContext<'a> {
    pub run_id: Uuid,
    pub config_id: u32,
    pub running_service_count: usize,
    pub attached_infra_count: usize,
    pub fields: &'a BTreeMap<String, FieldValue>,
}

/// Append-only, chronologically ordered log of timed results.
#[derive(Debug, Clone, Default)]
pub struct ResultRecorder {
    records: Vec<TimedResult>,
}

impl ResultRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: &str, elapsed: Duration, ctx: RecordContext<'_>) -> &TimedResult {
        self.records.push(TimedResult {
            action: action.to_string(),
            duration_seconds: elapsed.as_secs_f64(),
            run_id: ctx.run_id,
            config_id: ctx.config_id,
            running_service_count: ctx.running_service_count,
            attached_infra_count: ctx.attached_infra_count,
            recorded_at: Utc::now(),
            fields: ctx.fields.clone(),
        });
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[TimedResult] {
        &self.records
    }

    pub fn actions(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.action.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<TimedResult> {
        self.records
    }

    pub fn table(&self) -> ResultTable {
        ResultTable::from_timed_results(&self.records)
    }
}

/// Row-oriented table: one row per result, columns = union of fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn from_timed_results(records: &[TimedResult]) -> Self {
        let rows: Vec<_> = records.iter().map(TimedResult::row).collect();
        Self::from_maps(&rows, &TIMED_RESULT_COLUMNS)
    }

    /// Build a table from heterogeneous rows.
    ///
    /// `leading` columns come first in the given order (when present in at
    /// least one row, or always for an empty input); all other keys follow in
    /// sorted order. Missing cells are empty strings.
    pub fn from_maps(rows: &[BTreeMap<String, FieldValue>], leading: &[&str]) -> Self {
        let all_keys: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.keys().map(String::as_str))
            .collect();

        let mut columns: Vec<String> = leading
            .iter()
            .filter(|c| rows.is_empty() || all_keys.contains(**c))
            .map(|c| c.to_string())
            .collect();
        columns.extend(
            all_keys
                .iter()
                .filter(|k| !leading.contains(*k))
                .map(|k| k.to_string()),
        );

        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).map(|v| v.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
