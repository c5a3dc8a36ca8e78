//! SQLite adapters
//!
//! Every operation acquires its own [`ScopedConnection`] from the injected
//! [`ConnectionFactory`]; the connection is closed when the scope ends.

mod connector;
mod source;
mod warehouse;

pub use connector::{ConnectionFactory, ScopedConnection, SqliteConnector};
pub use source::SqliteSalesSource;
pub use warehouse::SqliteWarehouse;

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};

use crate::domain::ColumnValue;

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ColumnValue::Null => ToSqlOutput::Owned(Value::Null),
            ColumnValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            ColumnValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            ColumnValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            ColumnValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
        })
    }
}

impl From<ValueRef<'_>> for ColumnValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => ColumnValue::Null,
            ValueRef::Integer(v) => ColumnValue::Integer(v),
            ValueRef::Real(v) => ColumnValue::Real(v),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                ColumnValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

/// Table and column names are interpolated into SQL, so only plain identifiers pass
pub(crate) fn check_identifier(name: &str) -> crate::Result<&str> {
    let valid = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(crate::StorageError::new(
            crate::ErrorKind::Config,
            format!("Invalid SQL identifier: {:?}", name),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_identifier() {
        assert!(check_identifier("sales").is_ok());
        assert!(check_identifier("_daily_2025").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("1sales").is_err());
        assert!(check_identifier("sales; DROP TABLE x").is_err());
    }

    #[test]
    fn test_column_value_sql_round_trip() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let values = [
            ColumnValue::Null,
            ColumnValue::Integer(3),
            ColumnValue::Real(7.5),
            ColumnValue::from("A"),
        ];
        for value in values {
            let back: ColumnValue = conn
                .query_row("SELECT ?1", [&value], |row| Ok(row.get_ref(0)?.into()))
                .unwrap();
            assert_eq!(back, value);
        }

        let flag: ColumnValue = conn
            .query_row("SELECT ?1", [&ColumnValue::Bool(true)], |row| {
                Ok(row.get_ref(0)?.into())
            })
            .unwrap();
        assert_eq!(flag, ColumnValue::Integer(1));
    }
}
