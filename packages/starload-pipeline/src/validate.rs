//! Schema and value-domain checks on a raw recordset
//!
//! A missing required column is a hard failure. Negative quantities or unit values are
//! data-quality warnings only: the rows stay in the set and the run continues.

use serde::{Deserialize, Serialize};
use starload_storage::RawRecordSet;
use tracing::{error, info, warn};

/// Out-of-domain values found in an otherwise valid recordset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataQualityWarning {
    NegativeQuantity { rows: usize },
    NegativeUnitValue { rows: usize },
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataQualityWarning::NegativeQuantity { rows } => {
                write!(f, "{} row(s) with negative quantity", rows)
            }
            DataQualityWarning::NegativeUnitValue { rows } => {
                write!(f, "{} row(s) with negative price", rows)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// `false` only when required columns are missing
    pub verdict: bool,
    pub missing_columns: Vec<String>,
    pub warnings: Vec<DataQualityWarning>,
    pub rows_checked: usize,
    /// Share of rows without any warning, in percent
    pub quality_score: f64,
}

impl ValidationReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, set: &RawRecordSet) -> ValidationReport {
        let missing: Vec<String> = set
            .missing_columns()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            error!(missing = ?missing, "Required columns missing");
            return ValidationReport {
                verdict: false,
                missing_columns: missing,
                warnings: Vec::new(),
                rows_checked: set.len(),
                quality_score: 0.0,
            };
        }

        let negative_quantity = set.records.iter().filter(|r| r.quantity < 0).count();
        let negative_price = set.records.iter().filter(|r| r.unit_price < 0.0).count();
        let flagged = set
            .records
            .iter()
            .filter(|r| r.quantity < 0 || r.unit_price < 0.0)
            .count();

        let mut warnings = Vec::new();
        if negative_quantity > 0 {
            warnings.push(DataQualityWarning::NegativeQuantity {
                rows: negative_quantity,
            });
        }
        if negative_price > 0 {
            warnings.push(DataQualityWarning::NegativeUnitValue {
                rows: negative_price,
            });
        }
        for warning in &warnings {
            warn!(%warning, "Data quality warning");
        }

        let quality_score = if set.is_empty() {
            100.0
        } else {
            (1.0 - flagged as f64 / set.len() as f64) * 100.0
        };

        info!(rows = set.len(), quality_score, "Validation passed");
        ValidationReport {
            verdict: true,
            missing_columns: Vec::new(),
            warnings,
            rows_checked: set.len(),
            quality_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use starload_storage::RawRecord;

    fn record(quantity: i64, price: f64) -> RawRecord {
        RawRecord::new(
            NaiveDate::from_ymd_opt(2025, 11, 11).unwrap(),
            "A",
            "pen",
            quantity,
            price,
        )
    }

    #[test]
    fn test_clean_set_passes() {
        let report = Validator::new().validate(&RawRecordSet::from_records(vec![
            record(2, 10.0),
            record(1, 5.0),
        ]));
        assert!(report.verdict);
        assert!(!report.has_warnings());
        assert_eq!(report.quality_score, 100.0);
    }

    #[test]
    fn test_missing_column_fails_even_without_rows() {
        let set = RawRecordSet::new(vec!["date".into(), "category".into()], vec![]);
        let report = Validator::new().validate(&set);
        assert!(!report.verdict);
        assert_eq!(report.missing_columns, vec!["product", "quantity", "price"]);
    }

    #[test]
    fn test_negative_values_warn_but_pass() {
        let report = Validator::new().validate(&RawRecordSet::from_records(vec![
            record(-1, 10.0),
            record(2, -5.0),
            record(-3, -1.0),
            record(4, 2.0),
        ]));
        assert!(report.verdict);
        assert_eq!(
            report.warnings,
            vec![
                DataQualityWarning::NegativeQuantity { rows: 2 },
                DataQualityWarning::NegativeUnitValue { rows: 2 },
            ]
        );
        assert_eq!(report.rows_checked, 4);
        assert_eq!(report.quality_score, 25.0);
    }

    #[test]
    fn test_empty_set_with_full_schema_passes() {
        let report = Validator::new().validate(&RawRecordSet::from_records(vec![]));
        assert!(report.verdict);
        assert_eq!(report.quality_score, 100.0);
    }
}
