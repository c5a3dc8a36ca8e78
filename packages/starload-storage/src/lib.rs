//! starload-storage - typed records and stores for the star-schema warehouse
//!
//! ## Core Principles
//!
//! 1. **Typed rows**: every entity is a struct with named fields; table layouts are
//!    described once by a static [`TableDef`] and rows bind their values in column order.
//! 2. **Load order is data**: tables declare what they reference, and [`StarSchema`]
//!    derives creation order (dimensions → bridges → facts) and the reverse drop order.
//! 3. **Scoped connections**: adapters acquire a connection per operation through an
//!    injected factory and release it on every exit path.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use starload_storage::{SqliteConnector, SqliteWarehouse, StarSchema, Warehouse};
//!
//! let warehouse = SqliteWarehouse::new(Arc::new(SqliteConnector::file("dw.sqlite")));
//! let schema = StarSchema::sales()?;
//! for table in schema.creation_order() {
//!     warehouse.ensure_table(table).await?;
//! }
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    BatchFailure, CalendarDate, CatalogDocument, Category, ColumnDef, ColumnType, ColumnValue,
    CommitMode, DailySalesFact, ForeignKey, Genre, Movie, MovieGenre, Product, ProductCategory,
    RawRecord, RawRecordSet, ReportRecord, SalesSource, StarSchema, TableDef, TableKind,
    TableRow, User, ViewLog, Warehouse, WriteMode, WriteOptions, WriteOutcome, REQUIRED_COLUMNS,
};

pub use infrastructure::csv::CsvSalesSource;

#[cfg(feature = "sqlite")]
pub use infrastructure::sqlite::{
    ConnectionFactory, ScopedConnection, SqliteConnector, SqliteSalesSource, SqliteWarehouse,
};
