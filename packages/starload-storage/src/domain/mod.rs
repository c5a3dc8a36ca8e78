//! Domain layer: typed rows, table definitions and storage ports
//!
//! # Domain Models
//!
//! - Sales: `RawRecord`, `ReportRecord`, `CalendarDate`, `Category`, `Product`,
//!   `ProductCategory`, `DailySalesFact`
//! - Catalog: `Movie`, `Genre`, `User`, `MovieGenre`, `ViewLog`
//!
//! # Port Traits
//!
//! - `SalesSource`: raw record extraction by period
//! - `Warehouse`: table creation, batched writes, reset

pub mod catalog;
pub mod ports;
pub mod sales;
pub mod schema;

pub use catalog::{
    CatalogDocument, Genre, Movie, MovieGenre, User, ViewLog, DIM_GENRE, DIM_MOVIE, DIM_USER,
    FACT_VIEWLOG, MOVIE_GENRE,
};
pub use ports::{
    BatchFailure, CommitMode, SalesSource, Warehouse, WriteMode, WriteOptions, WriteOutcome,
};
pub use sales::{
    CalendarDate, Category, DailySalesFact, Product, ProductCategory, RawRecord, RawRecordSet,
    ReportRecord, DIM_CATEGORY, DIM_DATE, DIM_PRODUCT, FACT_DAILY_SALES, PRODUCT_CATEGORY,
    REQUIRED_COLUMNS,
};
pub use schema::{
    ColumnDef, ColumnType, ColumnValue, ForeignKey, StarSchema, TableDef, TableKind, TableRow,
};

use crate::error::Result;

impl StarSchema {
    /// Daily sales report warehouse
    pub fn sales() -> Result<Self> {
        Self::new(
            "sales",
            vec![
                &DIM_DATE,
                &DIM_CATEGORY,
                &DIM_PRODUCT,
                &PRODUCT_CATEGORY,
                &FACT_DAILY_SALES,
            ],
        )
    }

    /// Movie catalog warehouse
    pub fn catalog() -> Result<Self> {
        Self::new(
            "catalog",
            vec![
                &DIM_MOVIE,
                &DIM_GENRE,
                &DIM_DATE,
                &DIM_USER,
                &MOVIE_GENRE,
                &FACT_VIEWLOG,
            ],
        )
    }

    /// Every table of both schemas; `dim_date` is shared
    pub fn warehouse() -> Result<Self> {
        Self::new(
            "warehouse",
            vec![
                &DIM_DATE,
                &DIM_CATEGORY,
                &DIM_PRODUCT,
                &PRODUCT_CATEGORY,
                &FACT_DAILY_SALES,
                &DIM_MOVIE,
                &DIM_GENRE,
                &DIM_USER,
                &MOVIE_GENRE,
                &FACT_VIEWLOG,
            ],
        )
    }
}
