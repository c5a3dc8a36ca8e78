use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, warn};

use super::connector::ConnectionFactory;
use crate::domain::{
    BatchFailure, ColumnType, ColumnValue, CommitMode, TableDef, Warehouse, WriteMode,
    WriteOptions, WriteOutcome,
};
use crate::error::{Result, StorageError};

/// Star-schema warehouse stored in SQLite
pub struct SqliteWarehouse {
    factory: Arc<dyn ConnectionFactory>,
}

impl SqliteWarehouse {
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self { factory }
    }

    pub fn describe(&self) -> String {
        self.factory.describe()
    }
}

fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer | ColumnType::Boolean => "INTEGER",
        ColumnType::Real => "REAL",
        ColumnType::Text | ColumnType::Date => "TEXT",
    }
}

pub(crate) fn create_table_sql(table: &TableDef) -> String {
    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            if c.nullable {
                format!("{} {}", c.name, sql_type(c.ty))
            } else {
                format!("{} {} NOT NULL", c.name, sql_type(c.ty))
            }
        })
        .collect();

    parts.push(format!("PRIMARY KEY ({})", table.key.join(", ")));
    for fk in table.foreign_keys {
        parts.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            fk.columns.join(", "),
            fk.table,
            fk.references.join(", ")
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        table.name,
        parts.join(",\n    ")
    )
}

pub(crate) fn insert_sql(table: &TableDef, mode: WriteMode) -> String {
    let columns = table.column_names();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let measures = table.measure_columns();

    let on_conflict = match mode {
        WriteMode::Upsert if !measures.is_empty() => format!(
            "DO UPDATE SET {}",
            measures
                .iter()
                .map(|m| format!("{m} = excluded.{m}"))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        _ => "DO NOTHING".to_string(),
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
        table.name,
        columns.join(", "),
        placeholders.join(", "),
        table.key.join(", "),
        on_conflict
    )
}

/// Execute one batch on an open transaction
fn write_rows(
    conn: &Connection,
    table: &TableDef,
    sql: &str,
    rows: &[Vec<ColumnValue>],
    options: WriteOptions,
) -> Result<WriteOutcome> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut outcome = WriteOutcome::default();

    for row in rows {
        if row.len() != table.columns.len() {
            return Err(StorageError::schema(format!(
                "Row for {} has {} values, expected {}",
                table.name,
                row.len(),
                table.columns.len()
            )));
        }
        match stmt.execute(params_from_iter(row.iter())) {
            Ok(0) => outcome.skipped += 1,
            Ok(_) => outcome.written += 1,
            Err(err) => {
                let err = StorageError::from(err);
                if options.tolerate_row_errors && err.is_constraint() {
                    warn!(table = table.name, error = %err, "Row rejected");
                    outcome.rejected += 1;
                } else {
                    return Err(err);
                }
            }
        }
    }
    Ok(outcome)
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    async fn ensure_table(&self, table: &'static TableDef) -> Result<()> {
        table.check()?;
        let conn = self.factory.connect()?;
        conn.execute_batch(&create_table_sql(table))?;
        debug!(table = table.name, kind = %table.kind, "Ensured table");
        Ok(())
    }

    async fn write_batches(
        &self,
        table: &'static TableDef,
        batches: Vec<Vec<Vec<ColumnValue>>>,
        options: WriteOptions,
    ) -> std::result::Result<WriteOutcome, BatchFailure> {
        let conn = self.factory.connect()?;
        let sql = insert_sql(table, options.mode);
        let mut committed = WriteOutcome::default();

        match options.commit {
            CommitMode::PerBatch => {
                for (batch_index, batch) in batches.iter().enumerate() {
                    let result = conn
                        .unchecked_transaction()
                        .map_err(StorageError::from)
                        .and_then(|tx| {
                            let outcome = write_rows(&tx, table, &sql, batch, options)?;
                            tx.commit()?;
                            Ok(outcome)
                        });
                    match result {
                        Ok(mut outcome) => {
                            outcome.batches = 1;
                            committed.merge(&outcome);
                            debug!(
                                table = table.name,
                                batch = batch_index,
                                rows = batch.len(),
                                "Committed batch"
                            );
                        }
                        Err(error) => {
                            return Err(BatchFailure {
                                batch_index,
                                committed,
                                error,
                            })
                        }
                    }
                }
            }
            CommitMode::SingleTransaction => {
                let tx = conn.unchecked_transaction().map_err(StorageError::from)?;
                let mut pending = WriteOutcome::default();
                for (batch_index, batch) in batches.iter().enumerate() {
                    match write_rows(&tx, table, &sql, batch, options) {
                        Ok(mut outcome) => {
                            outcome.batches = 1;
                            pending.merge(&outcome);
                        }
                        // Dropping `tx` rolls back every batch
                        Err(error) => {
                            return Err(BatchFailure {
                                batch_index,
                                committed,
                                error,
                            })
                        }
                    }
                }
                tx.commit().map_err(|err| BatchFailure {
                    batch_index: batches.len().saturating_sub(1),
                    committed,
                    error: err.into(),
                })?;
                committed = pending;
                debug!(table = table.name, batches = batches.len(), "Committed transaction");
            }
        }

        Ok(committed)
    }

    async fn delete_all(&self, table: &'static TableDef) -> Result<usize> {
        let conn = self.factory.connect()?;
        let deleted = conn.execute(&format!("DELETE FROM {}", table.name), [])?;
        debug!(table = table.name, deleted, "Deleted all rows");
        Ok(deleted)
    }

    async fn drop_table(&self, table: &'static TableDef) -> Result<()> {
        let conn = self.factory.connect()?;
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", table.name))?;
        debug!(table = table.name, "Dropped table");
        Ok(())
    }

    async fn count_rows(&self, table: &'static TableDef) -> Result<usize> {
        let conn = self.factory.connect()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.name), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    async fn fetch_rows(
        &self,
        table: &'static TableDef,
        filter: Option<(&str, ColumnValue)>,
    ) -> Result<Vec<Vec<ColumnValue>>> {
        let mut sql = format!(
            "SELECT {} FROM {}",
            table.column_names().join(", "),
            table.name
        );
        let mut bound = Vec::new();
        if let Some((column, value)) = filter {
            let column = known_column(table, column)?;
            sql.push_str(&format!(" WHERE {} = ?1", column));
            bound.push(value);
        }
        sql.push_str(&format!(" ORDER BY {}", table.key.join(", ")));

        let conn = self.factory.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let width = table.columns.len();
        let rows = stmt
            .query_map(params_from_iter(bound.iter()), |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(ColumnValue::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn select_column(&self, table: &'static TableDef, column: &str) -> Result<Vec<ColumnValue>> {
        let column = known_column(table, column)?;
        let conn = self.factory.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY {}",
            column,
            table.name,
            table.key.join(", ")
        ))?;
        let values = stmt
            .query_map([], |row| row.get_ref(0).map(ColumnValue::from))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }
}

fn known_column(table: &TableDef, column: &str) -> Result<&'static str> {
    table
        .columns
        .iter()
        .map(|c| c.name)
        .find(|name| *name == column)
        .ok_or_else(|| {
            StorageError::schema(format!("Table {} has no column {}", table.name, column))
        })
}
