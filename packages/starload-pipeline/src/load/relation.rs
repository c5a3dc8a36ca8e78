use std::sync::Arc;

use starload_storage::{TableRow, Warehouse, WriteOptions};

use super::{write_rows, LoadSettings, LoadStats};
use crate::error::Result;

/// Many-to-many relations, insert-if-absent on the composite key
///
/// Referenced dimension rows must already be loaded; the orchestrator orders the
/// stages so they are, and the store's foreign keys reject anything else.
pub struct BridgeLoader {
    warehouse: Arc<dyn Warehouse>,
    settings: LoadSettings,
    tolerate_orphans: bool,
}

impl BridgeLoader {
    pub fn new(warehouse: Arc<dyn Warehouse>, settings: LoadSettings) -> Self {
        Self {
            warehouse,
            settings,
            tolerate_orphans: false,
        }
    }

    /// Count links to unknown dimension keys as rejected rows instead of failing
    pub fn tolerating_orphans(mut self) -> Self {
        self.tolerate_orphans = true;
        self
    }

    pub async fn load<T: TableRow>(&self, rows: &[T]) -> Result<LoadStats> {
        self.warehouse.ensure_table(T::TABLE).await?;
        let mut options = WriteOptions::insert_if_absent(self.settings.commit);
        if self.tolerate_orphans {
            options = options.tolerating_row_errors();
        }
        write_rows(self.warehouse.as_ref(), rows, options, self.settings.batch_size).await
    }
}

/// Snapshot measurements, upserted on the fact key
///
/// Reloading a period overwrites every measure column of the rows it touches.
pub struct FactLoader {
    warehouse: Arc<dyn Warehouse>,
    settings: LoadSettings,
}

impl FactLoader {
    pub fn new(warehouse: Arc<dyn Warehouse>, settings: LoadSettings) -> Self {
        Self {
            warehouse,
            settings,
        }
    }

    pub async fn load<T: TableRow>(&self, rows: &[T]) -> Result<LoadStats> {
        self.warehouse.ensure_table(T::TABLE).await?;
        write_rows(
            self.warehouse.as_ref(),
            rows,
            WriteOptions::upsert(self.settings.commit),
            self.settings.batch_size,
        )
        .await
    }
}
