//! Sales records and the sales star schema
//!
//! Tables (creation order): `dim_date`, `dim_category`, `dim_product`,
//! `product_category` (bridge), `fact_daily_sales` (snapshot fact).

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::schema::{ColumnDef, ColumnType, ColumnValue, ForeignKey, TableDef, TableKind, TableRow};

/// Columns a raw sales recordset must expose
pub const REQUIRED_COLUMNS: [&str; 5] = ["date", "category", "product", "quantity", "price"];

/// One observed sale line, as read from the source store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub category: String,
    pub product: String,
    pub quantity: i64,
    /// Source column `price`
    pub unit_price: f64,
}

impl RawRecord {
    pub fn new(
        date: NaiveDate,
        category: impl Into<String>,
        product: impl Into<String>,
        quantity: i64,
        unit_price: f64,
    ) -> Self {
        Self {
            date,
            category: category.into(),
            product: product.into(),
            quantity,
            unit_price,
        }
    }

    /// `quantity × unit_price`
    pub fn line_amount(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Rows plus the column set the source actually exposed
///
/// Rows are only decoded when every required column is present; a recordset with an
/// incomplete schema therefore carries its columns and no rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecordSet {
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawRecordSet {
    pub fn new(columns: Vec<String>, records: Vec<RawRecord>) -> Self {
        Self { columns, records }
    }

    /// Recordset with the full required schema
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        Self {
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records,
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn missing_columns(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !self.has_column(c))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Aggregate of the raw records sharing one group key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub group_key: String,
    pub total_amount: f64,
    pub total_quantity: i64,
    pub average_unit_value: f64,
    pub member_count: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// Table definitions
// ═══════════════════════════════════════════════════════════════════════════

pub const DIM_DATE: TableDef = TableDef {
    name: "dim_date",
    kind: TableKind::Dimension,
    columns: &[
        ColumnDef::required("date_id", ColumnType::Date),
        ColumnDef::required("year", ColumnType::Integer),
        ColumnDef::required("month", ColumnType::Integer),
        ColumnDef::required("day", ColumnType::Integer),
        ColumnDef::required("quarter", ColumnType::Integer),
        ColumnDef::required("day_of_week", ColumnType::Integer),
        ColumnDef::required("day_name", ColumnType::Text),
        ColumnDef::required("is_weekend", ColumnType::Boolean),
    ],
    key: &["date_id"],
    foreign_keys: &[],
};

pub const DIM_CATEGORY: TableDef = TableDef {
    name: "dim_category",
    kind: TableKind::Dimension,
    columns: &[ColumnDef::required("category", ColumnType::Text)],
    key: &["category"],
    foreign_keys: &[],
};

pub const DIM_PRODUCT: TableDef = TableDef {
    name: "dim_product",
    kind: TableKind::Dimension,
    columns: &[ColumnDef::required("product", ColumnType::Text)],
    key: &["product"],
    foreign_keys: &[],
};

pub const PRODUCT_CATEGORY: TableDef = TableDef {
    name: "product_category",
    kind: TableKind::Bridge,
    columns: &[
        ColumnDef::required("product", ColumnType::Text),
        ColumnDef::required("category", ColumnType::Text),
    ],
    key: &["product", "category"],
    foreign_keys: &[
        ForeignKey {
            columns: &["product"],
            table: "dim_product",
            references: &["product"],
        },
        ForeignKey {
            columns: &["category"],
            table: "dim_category",
            references: &["category"],
        },
    ],
};

pub const FACT_DAILY_SALES: TableDef = TableDef {
    name: "fact_daily_sales",
    kind: TableKind::Fact,
    columns: &[
        ColumnDef::required("report_date", ColumnType::Date),
        ColumnDef::required("group_key", ColumnType::Text),
        ColumnDef::optional("category", ColumnType::Text),
        ColumnDef::optional("product", ColumnType::Text),
        ColumnDef::required("total_amount", ColumnType::Real),
        ColumnDef::required("total_quantity", ColumnType::Integer),
        ColumnDef::required("average_unit_value", ColumnType::Real),
        ColumnDef::required("member_count", ColumnType::Integer),
    ],
    key: &["report_date", "group_key"],
    foreign_keys: &[
        ForeignKey {
            columns: &["report_date"],
            table: "dim_date",
            references: &["date_id"],
        },
        ForeignKey {
            columns: &["category"],
            table: "dim_category",
            references: &["category"],
        },
        ForeignKey {
            columns: &["product"],
            table: "dim_product",
            references: &["product"],
        },
    ],
};

// ═══════════════════════════════════════════════════════════════════════════
// Rows
// ═══════════════════════════════════════════════════════════════════════════

/// Calendar dimension row, generated purely from a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDate {
    pub date_id: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub quarter: u32,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    pub day_name: String,
    pub is_weekend: bool,
}

impl CalendarDate {
    pub fn from_date(date: NaiveDate) -> Self {
        let weekday = date.weekday();
        let day_of_week = weekday.num_days_from_monday();
        Self {
            date_id: date,
            year: date.year(),
            month: date.month(),
            day: date.day(),
            quarter: (date.month() - 1) / 3 + 1,
            day_of_week,
            day_name: day_name(weekday).to_string(),
            is_weekend: day_of_week >= 5,
        }
    }

    /// Every date in `start..=end`; empty when `start > end`
    pub fn range(start: NaiveDate, end: NaiveDate) -> Vec<Self> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(Self::from_date)
            .collect()
    }
}

fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

impl TableRow for CalendarDate {
    const TABLE: &'static TableDef = &DIM_DATE;

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            self.date_id.into(),
            i64::from(self.year).into(),
            self.month.into(),
            self.day.into(),
            self.quarter.into(),
            self.day_of_week.into(),
            self.day_name.as_str().into(),
            self.is_weekend.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
}

impl TableRow for Category {
    const TABLE: &'static TableDef = &DIM_CATEGORY;

    fn values(&self) -> Vec<ColumnValue> {
        vec![self.name.as_str().into()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
}

impl TableRow for Product {
    const TABLE: &'static TableDef = &DIM_PRODUCT;

    fn values(&self) -> Vec<ColumnValue> {
        vec![self.name.as_str().into()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductCategory {
    pub product: String,
    pub category: String,
}

impl TableRow for ProductCategory {
    const TABLE: &'static TableDef = &PRODUCT_CATEGORY;

    fn values(&self) -> Vec<ColumnValue> {
        vec![self.product.as_str().into(), self.category.as_str().into()]
    }
}

/// One report record pinned to its reporting period
///
/// Exactly one of `category` / `product` carries the group key, so the store checks it
/// against the matching dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySalesFact {
    pub report_date: NaiveDate,
    pub group_key: String,
    pub category: Option<String>,
    pub product: Option<String>,
    pub total_amount: f64,
    pub total_quantity: i64,
    pub average_unit_value: f64,
    pub member_count: usize,
}

impl DailySalesFact {
    /// Fact for a report grouped by category
    pub fn for_category(report_date: NaiveDate, record: &ReportRecord) -> Self {
        Self {
            category: Some(record.group_key.clone()),
            ..Self::ungrouped(report_date, record)
        }
    }

    /// Fact for a report grouped by product
    pub fn for_product(report_date: NaiveDate, record: &ReportRecord) -> Self {
        Self {
            product: Some(record.group_key.clone()),
            ..Self::ungrouped(report_date, record)
        }
    }

    fn ungrouped(report_date: NaiveDate, record: &ReportRecord) -> Self {
        Self {
            report_date,
            group_key: record.group_key.clone(),
            category: None,
            product: None,
            total_amount: record.total_amount,
            total_quantity: record.total_quantity,
            average_unit_value: record.average_unit_value,
            member_count: record.member_count,
        }
    }
}

impl TableRow for DailySalesFact {
    const TABLE: &'static TableDef = &FACT_DAILY_SALES;

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            self.report_date.into(),
            self.group_key.as_str().into(),
            self.category.clone().into(),
            self.product.clone().into(),
            self.total_amount.into(),
            self.total_quantity.into(),
            self.average_unit_value.into(),
            self.member_count.into(),
        ]
    }
}
