// src/export.rs

//! CSV export of sweep results.
//!
//! Two files are written: the per-repetition summary at the configured
//! `result_path`, and the per-action log next to it as
//! `actions_<file name>`.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::driver::SweepReport;
use crate::errors::{BenchError, Result};
use crate::fs::FileSystem;
use crate::recorder::ResultTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub summary: PathBuf,
    pub actions: PathBuf,
}

impl ExportPaths {
    pub fn for_result_path(result_path: &Path) -> Result<Self> {
        let file_name = result_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                BenchError::ConfigError(format!(
                    "result_path '{}' has no file name",
                    result_path.display()
                ))
            })?;
        let actions = result_path.with_file_name(format!("actions_{file_name}"));
        Ok(Self {
            summary: result_path.to_path_buf(),
            actions,
        })
    }
}

/// Serialize a table as CSV with a header row.
pub fn table_to_csv(table: &ResultTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| BenchError::IoError(e.into_error()))
}

pub fn write_table(fs: &dyn FileSystem, path: &Path, table: &ResultTable) -> Result<()> {
    let bytes = table_to_csv(table)?;
    fs.write(path, &bytes)?;
    info!(path = %path.display(), rows = table.rows.len(), "results written");
    Ok(())
}

/// Write both tables of a sweep.
pub fn export_report(
    fs: &dyn FileSystem,
    result_path: &Path,
    report: &SweepReport,
) -> Result<ExportPaths> {
    let paths = ExportPaths::for_result_path(result_path)?;
    write_table(fs, &paths.summary, &report.summary_table())?;
    write_table(fs, &paths.actions, &report.action_table())?;
    Ok(paths)
}
