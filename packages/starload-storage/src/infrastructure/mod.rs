//! Infrastructure layer - Storage adapters
//!
//! - `csv`: delimited-file sales source and field quoting helpers
//! - `sqlite`: connection factory, sales source and warehouse

pub mod csv;

#[cfg(feature = "sqlite")]
pub mod sqlite;
