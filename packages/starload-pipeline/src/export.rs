//! Flat-file export sink
//!
//! Files are named from the reporting period and always start with a header row.
//! Fields are quoted per RFC 4180.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use starload_storage::infrastructure::csv::format_record;
use starload_storage::{ColumnValue, ReportRecord, TableRow};
use tracing::info;

use crate::error::{PipelineError, Result};

const REPORT_COLUMNS: [&str; 6] = [
    "report_date",
    "group_key",
    "total_amount",
    "total_quantity",
    "average_unit_value",
    "member_count",
];

pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `report_<period>.csv`; an existing file for the period is replaced
    pub fn export_report(&self, period: NaiveDate, report: &[ReportRecord]) -> Result<PathBuf> {
        let rows: Vec<Vec<ColumnValue>> = report
            .iter()
            .map(|r| {
                vec![
                    period.into(),
                    r.group_key.as_str().into(),
                    r.total_amount.into(),
                    r.total_quantity.into(),
                    r.average_unit_value.into(),
                    r.member_count.into(),
                ]
            })
            .collect();
        self.write(&format!("report_{}.csv", period), &REPORT_COLUMNS, &rows)
    }

    /// Write `<table>_<period>.csv` with the table's columns as header
    pub fn export_rows<T: TableRow>(&self, period: NaiveDate, rows: &[T]) -> Result<PathBuf> {
        let values: Vec<Vec<ColumnValue>> = rows.iter().map(TableRow::values).collect();
        self.write(
            &format!("{}_{}.csv", T::TABLE.name, period),
            &T::TABLE.column_names(),
            &values,
        )
    }

    fn write(&self, file_name: &str, header: &[&str], rows: &[Vec<ColumnValue>]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            PipelineError::export(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let mut content = format_record(header.iter().copied());
        content.push('\n');
        for row in rows {
            content.push_str(&format_record(row.iter().map(cell)));
            content.push('\n');
        }

        let path = self.dir.join(file_name);
        std::fs::write(&path, content)
            .map_err(|e| PipelineError::export(format!("cannot write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), rows = rows.len(), "Exported CSV");
        Ok(path)
    }
}

/// Reals keep a decimal point (`25.0`), NULL is an empty field
fn cell(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Null => String::new(),
        ColumnValue::Real(v) => format!("{:?}", v),
        other => other.to_string(),
    }
}
