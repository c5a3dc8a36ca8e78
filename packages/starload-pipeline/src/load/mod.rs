//! Warehouse loaders
//!
//! Dimensions are written insert-if-absent, bridges insert-if-absent, facts upserted.
//! Every loader creates its table when absent and writes in batches of
//! `LoadSettings::batch_size` rows under the configured commit mode.

mod batch;
mod dimension;
mod relation;

pub use batch::into_batches;
pub use dimension::DimensionLoader;
pub use relation::{BridgeLoader, FactLoader};

use serde::{Deserialize, Serialize};
use starload_storage::{BatchFailure, CommitMode, TableRow, Warehouse, WriteOptions};
use tracing::{error, info};

use crate::config::LoadConfig;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSettings {
    pub batch_size: usize,
    pub commit: CommitMode,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self::from(&LoadConfig::default())
    }
}

impl From<&LoadConfig> for LoadSettings {
    fn from(config: &LoadConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            commit: config.commit_mode,
        }
    }
}

/// Row counts of one table load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub table: String,
    /// Rows inserted or, for upserts, inserted or updated
    pub inserted: usize,
    /// Key conflicts ignored by insert-if-absent
    pub skipped: usize,
    /// Rows refused by a tolerated constraint failure
    pub rejected: usize,
    pub batches: usize,
    /// Rows removed by a full reload before loading
    pub deleted: usize,
}

impl LoadStats {
    pub fn empty(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }
}

/// Batch `rows` into `T::TABLE` and translate a failed batch into a load error
pub(crate) async fn write_rows<T: TableRow>(
    warehouse: &dyn Warehouse,
    rows: &[T],
    options: WriteOptions,
    batch_size: usize,
) -> Result<LoadStats> {
    let table = T::TABLE;
    let values = rows.iter().map(T::values).collect();
    let batches = into_batches(values, batch_size);

    match warehouse.write_batches(table, batches, options).await {
        Ok(outcome) => {
            info!(
                table = table.name,
                inserted = outcome.written,
                skipped = outcome.skipped,
                rejected = outcome.rejected,
                batches = outcome.batches,
                "Loaded table"
            );
            Ok(LoadStats {
                table: table.name.to_string(),
                inserted: outcome.written,
                skipped: outcome.skipped,
                rejected: outcome.rejected,
                batches: outcome.batches,
                deleted: 0,
            })
        }
        Err(failure) => Err(load_error(table.name, failure)),
    }
}

fn load_error(table: &str, failure: BatchFailure) -> PipelineError {
    error!(
        table,
        batch = failure.batch_index,
        committed_batches = failure.committed.batches,
        error = %failure.error,
        "Batch load failed"
    );
    if failure.error.is_connectivity() {
        return PipelineError::Connectivity(failure.error);
    }
    PipelineError::Load {
        table: table.to_string(),
        batch_index: failure.batch_index,
        committed: failure.committed,
        source: failure.error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starload_storage::{StorageError, WriteOutcome};

    #[test]
    fn test_settings_from_config() {
        let config = LoadConfig {
            batch_size: 50,
            commit_mode: CommitMode::SingleTransaction,
            ..LoadConfig::default()
        };
        let settings = LoadSettings::from(&config);
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.commit, CommitMode::SingleTransaction);
        assert_eq!(LoadSettings::default().batch_size, 1000);
    }

    #[test]
    fn test_load_error_mapping() {
        let failure = BatchFailure {
            batch_index: 2,
            committed: WriteOutcome {
                written: 2000,
                batches: 2,
                ..WriteOutcome::default()
            },
            error: StorageError::constraint("FOREIGN KEY constraint failed"),
        };
        match load_error("fact_daily_sales", failure) {
            PipelineError::Load {
                table,
                batch_index,
                committed,
                ..
            } => {
                assert_eq!(table, "fact_daily_sales");
                assert_eq!(batch_index, 2);
                assert_eq!(committed.batches, 2);
            }
            other => panic!("unexpected {other:?}"),
        }

        let failure = BatchFailure::from(StorageError::connectivity("locked"));
        assert!(matches!(
            load_error("dim_date", failure),
            PipelineError::Connectivity(_)
        ));
    }
}
