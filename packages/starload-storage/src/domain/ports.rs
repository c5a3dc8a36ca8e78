//! Port traits implemented by the storage adapters

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::sales::RawRecordSet;
use super::schema::{ColumnValue, StarSchema, TableDef};
use crate::error::{Result, StorageError};

/// Source of raw sales records, selected by exact period equality
#[async_trait]
pub trait SalesSource: Send + Sync {
    /// Rows whose `date` equals `period`; no match is an empty set, not an error
    async fn fetch_by_date(&self, period: NaiveDate) -> Result<RawRecordSet>;

    /// Human-readable location, for log lines
    fn describe(&self) -> String;
}

/// Conflict behaviour of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// `ON CONFLICT (key) DO NOTHING`
    InsertIfAbsent,
    /// `ON CONFLICT (key) DO UPDATE SET <measures> = excluded.<measures>`
    Upsert,
}

/// Transaction boundary of a multi-batch write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// One transaction per batch; a failure keeps the batches committed before it
    #[default]
    PerBatch,
    /// One transaction for every batch of the write
    SingleTransaction,
}

impl CommitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitMode::PerBatch => "per_batch",
            CommitMode::SingleTransaction => "single_transaction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub mode: WriteMode,
    pub commit: CommitMode,
    /// Count a row-level constraint failure as rejected instead of aborting the batch
    pub tolerate_row_errors: bool,
}

impl WriteOptions {
    pub fn insert_if_absent(commit: CommitMode) -> Self {
        Self {
            mode: WriteMode::InsertIfAbsent,
            commit,
            tolerate_row_errors: false,
        }
    }

    pub fn upsert(commit: CommitMode) -> Self {
        Self {
            mode: WriteMode::Upsert,
            commit,
            tolerate_row_errors: false,
        }
    }

    pub fn tolerating_row_errors(mut self) -> Self {
        self.tolerate_row_errors = true;
        self
    }
}

/// Row counts of a completed (or partially completed) write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// Rows inserted or updated
    pub written: usize,
    /// Rows ignored by an insert-if-absent key conflict
    pub skipped: usize,
    /// Rows refused by a constraint while row errors were tolerated
    pub rejected: usize,
    /// Batches committed
    pub batches: usize,
}

impl WriteOutcome {
    pub fn merge(&mut self, other: &WriteOutcome) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.rejected += other.rejected;
        self.batches += other.batches;
    }
}

/// A write that stopped at a failing batch
///
/// `committed` holds what is durably stored: the batches before `batch_index` under
/// per-batch commit, nothing under a single transaction.
#[derive(Debug, Error)]
#[error("batch {batch_index} failed: {error}")]
pub struct BatchFailure {
    pub batch_index: usize,
    pub committed: WriteOutcome,
    #[source]
    pub error: StorageError,
}

impl From<StorageError> for BatchFailure {
    fn from(error: StorageError) -> Self {
        Self {
            batch_index: 0,
            committed: WriteOutcome::default(),
            error,
        }
    }
}

/// Analytical store holding the star schema
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// `CREATE TABLE IF NOT EXISTS`
    async fn ensure_table(&self, table: &'static TableDef) -> Result<()>;

    /// Write rows (values in column order), one batch per inner vector
    async fn write_batches(
        &self,
        table: &'static TableDef,
        batches: Vec<Vec<Vec<ColumnValue>>>,
        options: WriteOptions,
    ) -> std::result::Result<WriteOutcome, BatchFailure>;

    /// `DELETE FROM table`; returns the deleted row count
    async fn delete_all(&self, table: &'static TableDef) -> Result<usize>;

    /// `DROP TABLE IF EXISTS`
    async fn drop_table(&self, table: &'static TableDef) -> Result<()>;

    async fn count_rows(&self, table: &'static TableDef) -> Result<usize>;

    /// Rows in key order, optionally restricted to `column = value`
    async fn fetch_rows(
        &self,
        table: &'static TableDef,
        filter: Option<(&str, ColumnValue)>,
    ) -> Result<Vec<Vec<ColumnValue>>>;

    /// Values of one column, in key order
    async fn select_column(&self, table: &'static TableDef, column: &str) -> Result<Vec<ColumnValue>>;

    /// Drop every table of `schema` in drop order
    async fn reset(&self, schema: &StarSchema) -> Result<()> {
        for table in schema.drop_order() {
            self.drop_table(table).await?;
        }
        Ok(())
    }
}
