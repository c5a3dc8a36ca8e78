//! Aggregation of raw records into report records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use starload_storage::{DailySalesFact, RawRecord, RawRecordSet, ReportRecord};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::validate::ValidationReport;

/// Business key the report is grouped by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Category,
    Product,
}

impl GroupBy {
    pub fn key<'a>(&self, record: &'a RawRecord) -> &'a str {
        match self {
            GroupBy::Category => &record.category,
            GroupBy::Product => &record.product,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::Category => "category",
            GroupBy::Product => "product",
        }
    }

    /// Fact row whose group key references the dimension this grouping uses
    pub fn fact(&self, period: NaiveDate, record: &ReportRecord) -> DailySalesFact {
        match self {
            GroupBy::Category => DailySalesFact::for_category(period, record),
            GroupBy::Product => DailySalesFact::for_product(period, record),
        }
    }
}

#[derive(Default)]
struct Accumulator {
    total_amount: f64,
    total_quantity: i64,
    unit_value_sum: f64,
    members: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    group_by: GroupBy,
}

impl Aggregator {
    pub fn new(group_by: GroupBy) -> Self {
        Self { group_by }
    }

    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    /// One report record per distinct group key, ordered by key
    ///
    /// A failed validation is refused rather than aggregated; an empty but valid set
    /// yields an empty report.
    pub fn aggregate(
        &self,
        set: &RawRecordSet,
        validation: &ValidationReport,
    ) -> Result<Vec<ReportRecord>> {
        if !validation.verdict {
            return Err(PipelineError::Validation {
                missing: validation.missing_columns.clone(),
            });
        }

        let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
        for record in &set.records {
            let acc = groups.entry(self.group_by.key(record)).or_default();
            acc.total_amount += record.line_amount();
            acc.total_quantity += record.quantity;
            acc.unit_value_sum += record.unit_price;
            acc.members += 1;
        }

        let report: Vec<ReportRecord> = groups
            .into_iter()
            .map(|(key, acc)| ReportRecord {
                group_key: key.to_string(),
                total_amount: acc.total_amount,
                total_quantity: acc.total_quantity,
                average_unit_value: acc.unit_value_sum / acc.members as f64,
                member_count: acc.members,
            })
            .collect();

        info!(
            group_by = self.group_by.as_str(),
            rows = set.len(),
            groups = report.len(),
            "Aggregated report"
        );
        Ok(report)
    }
}
