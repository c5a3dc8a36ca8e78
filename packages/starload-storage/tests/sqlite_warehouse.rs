//! SQLite warehouse integration tests
//!
//! Idempotent inserts, upserts, referential integrity and commit boundaries against a
//! throwaway database file.

use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use starload_storage::domain::{DIM_CATEGORY, DIM_DATE, DIM_PRODUCT, FACT_DAILY_SALES, PRODUCT_CATEGORY};
use starload_storage::{
    CalendarDate, Category, ColumnValue, CommitMode, DailySalesFact, ErrorKind, Product,
    ProductCategory, ReportRecord, SqliteConnector, SqliteWarehouse, StarSchema, TableRow, Warehouse,
    WriteOptions,
};
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn warehouse() -> (TempDir, SqliteWarehouse) {
    let dir = tempfile::tempdir().unwrap();
    let warehouse = SqliteWarehouse::new(Arc::new(SqliteConnector::file(
        dir.path().join("dw.sqlite"),
    )));
    let schema = StarSchema::sales().unwrap();
    for table in schema.creation_order() {
        warehouse.ensure_table(table).await.unwrap();
    }
    (dir, warehouse)
}

fn rows<T: TableRow>(items: &[T]) -> Vec<Vec<ColumnValue>> {
    items.iter().map(TableRow::values).collect()
}

fn fact(period: NaiveDate, key: &str, total: f64) -> DailySalesFact {
    DailySalesFact::for_category(
        period,
        &ReportRecord {
            group_key: key.to_string(),
            total_amount: total,
            total_quantity: 3,
            average_unit_value: 7.5,
            member_count: 2,
        },
    )
}

/// Calendar row for `period` plus categories A, B and C
async fn seed_dimensions(warehouse: &SqliteWarehouse, period: NaiveDate) {
    let options = WriteOptions::insert_if_absent(CommitMode::PerBatch);
    warehouse
        .write_batches(&DIM_DATE, vec![rows(&[CalendarDate::from_date(period)])], options)
        .await
        .unwrap();
    let categories: Vec<Category> = ["A", "B", "C"]
        .iter()
        .map(|name| Category {
            name: name.to_string(),
        })
        .collect();
    warehouse
        .write_batches(&DIM_CATEGORY, vec![rows(&categories)], options)
        .await
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// Insert-if-absent
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_dimension_insert_is_idempotent() {
    let (_dir, warehouse) = warehouse().await;
    let categories = vec![
        Category { name: "A".into() },
        Category { name: "B".into() },
    ];
    let options = WriteOptions::insert_if_absent(CommitMode::PerBatch);

    let first = warehouse
        .write_batches(&DIM_CATEGORY, vec![rows(&categories)], options)
        .await
        .unwrap();
    assert_eq!(first.written, 2);
    assert_eq!(first.skipped, 0);

    let second = warehouse
        .write_batches(&DIM_CATEGORY, vec![rows(&categories)], options)
        .await
        .unwrap();
    assert_eq!(second.written, 0);
    assert_eq!(second.skipped, 2);

    assert_eq!(warehouse.count_rows(&DIM_CATEGORY).await.unwrap(), 2);
}

#[tokio::test]
async fn test_bridge_insert_is_idempotent() {
    let (_dir, warehouse) = warehouse().await;
    let options = WriteOptions::insert_if_absent(CommitMode::PerBatch);
    warehouse
        .write_batches(&DIM_CATEGORY, vec![rows(&[Category { name: "A".into() }])], options)
        .await
        .unwrap();
    warehouse
        .write_batches(&DIM_PRODUCT, vec![rows(&[Product { name: "pen".into() }])], options)
        .await
        .unwrap();

    let link = ProductCategory {
        product: "pen".into(),
        category: "A".into(),
    };
    for _ in 0..2 {
        warehouse
            .write_batches(&PRODUCT_CATEGORY, vec![rows(&[link.clone()])], options)
            .await
            .unwrap();
    }
    assert_eq!(warehouse.count_rows(&PRODUCT_CATEGORY).await.unwrap(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Upsert
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_fact_upsert_keeps_latest_values() {
    let (_dir, warehouse) = warehouse().await;
    let period = date(2025, 11, 11);
    seed_dimensions(&warehouse, period).await;

    let options = WriteOptions::upsert(CommitMode::PerBatch);
    warehouse
        .write_batches(&FACT_DAILY_SALES, vec![rows(&[fact(period, "A", 25.0)])], options)
        .await
        .unwrap();
    let revised = warehouse
        .write_batches(&FACT_DAILY_SALES, vec![rows(&[fact(period, "A", 30.0)])], options)
        .await
        .unwrap();
    assert_eq!(revised.written, 1);

    let stored = warehouse.fetch_rows(&FACT_DAILY_SALES, None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0][0], ColumnValue::Text("2025-11-11".into()));
    assert_eq!(stored[0][2], ColumnValue::Text("A".into()));
    assert_eq!(stored[0][4], ColumnValue::Real(30.0));
}

// ═══════════════════════════════════════════════════════════════════════════
// Referential integrity and commit boundaries
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_fact_without_dimension_fails() {
    let (_dir, warehouse) = warehouse().await;

    let failure = warehouse
        .write_batches(
            &FACT_DAILY_SALES,
            vec![rows(&[fact(date(2025, 11, 11), "A", 25.0)])],
            WriteOptions::upsert(CommitMode::PerBatch),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.error.kind, ErrorKind::Constraint);
    assert_eq!(failure.batch_index, 0);
    assert_eq!(warehouse.count_rows(&FACT_DAILY_SALES).await.unwrap(), 0);
}

#[tokio::test]
async fn test_fact_with_unknown_group_key_fails() {
    let (_dir, warehouse) = warehouse().await;
    let period = date(2025, 11, 11);
    seed_dimensions(&warehouse, period).await;

    let by_category = warehouse
        .write_batches(
            &FACT_DAILY_SALES,
            vec![rows(&[fact(period, "ghost", 25.0)])],
            WriteOptions::upsert(CommitMode::PerBatch),
        )
        .await
        .unwrap_err();
    assert_eq!(by_category.error.kind, ErrorKind::Constraint);

    // dim_product is empty
    let by_product = DailySalesFact::for_product(
        period,
        &ReportRecord {
            group_key: "A".into(),
            total_amount: 25.0,
            total_quantity: 3,
            average_unit_value: 7.5,
            member_count: 2,
        },
    );
    let failure = warehouse
        .write_batches(
            &FACT_DAILY_SALES,
            vec![rows(&[by_product])],
            WriteOptions::upsert(CommitMode::PerBatch),
        )
        .await
        .unwrap_err();
    assert_eq!(failure.error.kind, ErrorKind::Constraint);
    assert_eq!(warehouse.count_rows(&FACT_DAILY_SALES).await.unwrap(), 0);
}

#[tokio::test]
async fn test_per_batch_failure_keeps_earlier_batches() {
    let (_dir, warehouse) = warehouse().await;
    let known = date(2025, 11, 11);
    seed_dimensions(&warehouse, known).await;

    let batches = vec![
        rows(&[fact(known, "A", 1.0), fact(known, "B", 2.0)]),
        rows(&[fact(date(2030, 1, 1), "C", 3.0)]),
    ];
    let failure = warehouse
        .write_batches(&FACT_DAILY_SALES, batches, WriteOptions::upsert(CommitMode::PerBatch))
        .await
        .unwrap_err();

    assert_eq!(failure.batch_index, 1);
    assert_eq!(failure.committed.written, 2);
    assert_eq!(failure.committed.batches, 1);
    assert_eq!(warehouse.count_rows(&FACT_DAILY_SALES).await.unwrap(), 2);
}

#[tokio::test]
async fn test_single_transaction_failure_rolls_back_everything() {
    let (_dir, warehouse) = warehouse().await;
    let known = date(2025, 11, 11);
    seed_dimensions(&warehouse, known).await;

    let batches = vec![
        rows(&[fact(known, "A", 1.0)]),
        rows(&[fact(date(2030, 1, 1), "C", 3.0)]),
    ];
    let failure = warehouse
        .write_batches(
            &FACT_DAILY_SALES,
            batches,
            WriteOptions::upsert(CommitMode::SingleTransaction),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.batch_index, 1);
    assert_eq!(failure.committed.written, 0);
    assert_eq!(warehouse.count_rows(&FACT_DAILY_SALES).await.unwrap(), 0);
}

#[tokio::test]
async fn test_tolerated_row_errors_are_counted() {
    let (_dir, warehouse) = warehouse().await;
    warehouse
        .write_batches(
            &DIM_CATEGORY,
            vec![rows(&[Category { name: "A".into() }])],
            WriteOptions::insert_if_absent(CommitMode::PerBatch),
        )
        .await
        .unwrap();

    // "ghost" has no dim_product row
    let outcome = warehouse
        .write_batches(
            &PRODUCT_CATEGORY,
            vec![rows(&[ProductCategory {
                product: "ghost".into(),
                category: "A".into(),
            }])],
            WriteOptions::insert_if_absent(CommitMode::PerBatch).tolerating_row_errors(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.rejected, 1);
    assert_eq!(outcome.written, 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Reset
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_delete_in_drop_order_and_reset() {
    let (_dir, warehouse) = warehouse().await;
    let period = date(2025, 11, 11);
    seed_dimensions(&warehouse, period).await;
    warehouse
        .write_batches(
            &FACT_DAILY_SALES,
            vec![rows(&[fact(period, "A", 25.0)])],
            WriteOptions::upsert(CommitMode::PerBatch),
        )
        .await
        .unwrap();

    // The fact still references the date
    let err = warehouse.delete_all(&DIM_DATE).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Constraint);

    let schema = StarSchema::sales().unwrap();
    for table in schema.dependents_of("dim_date") {
        warehouse.delete_all(table).await.unwrap();
    }
    assert_eq!(warehouse.delete_all(&DIM_DATE).await.unwrap(), 1);

    warehouse.reset(&schema).await.unwrap();
    assert!(warehouse.count_rows(&DIM_DATE).await.is_err());
}

#[tokio::test]
async fn test_select_column_filters_unknown_columns() {
    let (_dir, warehouse) = warehouse().await;
    warehouse
        .write_batches(
            &DIM_PRODUCT,
            vec![rows(&[Product { name: "pen".into() }, Product { name: "cup".into() }])],
            WriteOptions::insert_if_absent(CommitMode::PerBatch),
        )
        .await
        .unwrap();

    let names = warehouse.select_column(&DIM_PRODUCT, "product").await.unwrap();
    assert_eq!(names, vec![ColumnValue::from("cup"), ColumnValue::from("pen")]);

    let err = warehouse.select_column(&DIM_PRODUCT, "price").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Schema);
}
