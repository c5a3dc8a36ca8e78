use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::params;
use tracing::debug;

use super::check_identifier;
use super::connector::ConnectionFactory;
use crate::domain::{RawRecord, RawRecordSet, SalesSource};
use crate::error::{Result, StorageError};

/// Sales table in an operational SQLite database
pub struct SqliteSalesSource {
    factory: Arc<dyn ConnectionFactory>,
    table: String,
}

impl SqliteSalesSource {
    pub fn new(factory: Arc<dyn ConnectionFactory>, table: impl Into<String>) -> Self {
        Self {
            factory,
            table: table.into(),
        }
    }
}

#[async_trait]
impl SalesSource for SqliteSalesSource {
    async fn fetch_by_date(&self, period: NaiveDate) -> Result<RawRecordSet> {
        let table = check_identifier(&self.table)?;
        let conn = self.factory.connect()?;

        let columns: Vec<String> = conn
            .prepare(&format!("PRAGMA table_info({})", table))?
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<_>>()?;
        if columns.is_empty() {
            return Err(StorageError::database(format!(
                "Source table {} does not exist in {}",
                table,
                self.factory.describe()
            )));
        }

        let set = RawRecordSet::new(columns, Vec::new());
        if !set.missing_columns().is_empty() {
            return Ok(set);
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT date, category, product, quantity, price FROM {} WHERE date = ?1 ORDER BY rowid",
            table
        ))?;
        let records = stmt
            .query_map(params![period], |row| {
                Ok(RawRecord {
                    date: row.get(0)?,
                    category: row.get(1)?,
                    product: row.get(2)?,
                    quantity: row.get(3)?,
                    unit_price: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(
            source = %self.describe(),
            period = %period,
            rows = records.len(),
            "Fetched sales rows"
        );
        Ok(RawRecordSet::new(set.columns, records))
    }

    fn describe(&self) -> String {
        format!("{}#{}", self.factory.describe(), self.table)
    }
}
