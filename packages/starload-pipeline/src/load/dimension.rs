use std::sync::Arc;

use starload_storage::{StarSchema, TableRow, Warehouse, WriteOptions};
use tracing::{debug, info};

use super::{write_rows, LoadSettings, LoadStats};
use crate::error::Result;

/// Materializes reference rows, insert-if-absent on the natural key
///
/// Attribute changes of an existing key are not applied; a full reload is the only way
/// to replace dimension rows.
pub struct DimensionLoader {
    warehouse: Arc<dyn Warehouse>,
    schema: StarSchema,
    settings: LoadSettings,
}

impl DimensionLoader {
    pub fn new(warehouse: Arc<dyn Warehouse>, schema: StarSchema, settings: LoadSettings) -> Self {
        Self {
            warehouse,
            schema,
            settings,
        }
    }

    pub fn schema(&self) -> &StarSchema {
        &self.schema
    }

    /// Create the table when absent and insert rows whose key is not yet stored
    pub async fn load<T: TableRow>(&self, rows: &[T]) -> Result<LoadStats> {
        self.warehouse.ensure_table(T::TABLE).await?;
        write_rows(
            self.warehouse.as_ref(),
            rows,
            WriteOptions::insert_if_absent(self.settings.commit),
            self.settings.batch_size,
        )
        .await
    }

    /// Empty every table referencing `T::TABLE` (drop order), then the dimension itself,
    /// then load `rows`
    pub async fn reload<T: TableRow>(&self, rows: &[T]) -> Result<LoadStats> {
        let table = T::TABLE;
        let dependents = self.schema.dependents_of(table.name);

        // Dependents reference other dimensions too; create the whole schema first
        for existing in self.schema.creation_order() {
            self.warehouse.ensure_table(existing).await?;
        }
        for dependent in &dependents {
            let deleted = self.warehouse.delete_all(dependent).await?;
            debug!(table = dependent.name, deleted, "Cleared dependent table");
        }

        let deleted = self.warehouse.delete_all(table).await?;
        info!(
            table = table.name,
            deleted,
            dependents = dependents.len(),
            "Cleared dimension for full reload"
        );

        let mut stats = self.load(rows).await?;
        stats.deleted = deleted;
        Ok(stats)
    }
}
