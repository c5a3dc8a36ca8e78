//! Property-based tests for the aggregator
//!
//! Invariants that hold for every recordset with the full schema:
//! - Conservation: each row contributes to exactly one group
//! - Totals: total_amount is the sum of quantity × price over the group's rows
//! - Validation: a missing required column fails regardless of row count

use std::collections::BTreeMap;

use chrono::NaiveDate;
use proptest::prelude::*;
use starload_pipeline::{Aggregator, GroupBy, Validator};
use starload_storage::{RawRecord, RawRecordSet, REQUIRED_COLUMNS};

fn record_strategy() -> impl Strategy<Value = RawRecord> {
    (
        prop::sample::select(vec!["A", "B", "C", "D"]),
        prop::sample::select(vec!["pen", "ink", "cup"]),
        -5i64..50,
        // Half-unit prices keep f64 sums exact
        -20i64..200,
    )
        .prop_map(|(category, product, quantity, half_units)| {
            RawRecord::new(
                NaiveDate::from_ymd_opt(2025, 11, 11).unwrap(),
                category,
                product,
                quantity,
                half_units as f64 * 0.5,
            )
        })
}

fn group_by_strategy() -> impl Strategy<Value = GroupBy> {
    prop_oneof![Just(GroupBy::Category), Just(GroupBy::Product)]
}

proptest! {
    #[test]
    fn prop_totals_match_rows(
        records in prop::collection::vec(record_strategy(), 0..60),
        group_by in group_by_strategy(),
    ) {
        let set = RawRecordSet::from_records(records.clone());
        let validation = Validator::new().validate(&set);
        prop_assert!(validation.verdict);

        let report = Aggregator::new(group_by).aggregate(&set, &validation).unwrap();

        let mut expected: BTreeMap<&str, (f64, i64, usize)> = BTreeMap::new();
        for r in &records {
            let entry = expected.entry(group_by.key(r)).or_default();
            entry.0 += r.line_amount();
            entry.1 += r.quantity;
            entry.2 += 1;
        }

        prop_assert_eq!(report.len(), expected.len());
        for record in &report {
            let (amount, quantity, members) = expected[record.group_key.as_str()];
            prop_assert_eq!(record.total_amount, amount);
            prop_assert_eq!(record.total_quantity, quantity);
            prop_assert_eq!(record.member_count, members);
        }

        let members: usize = report.iter().map(|r| r.member_count).sum();
        prop_assert_eq!(members, records.len());
    }

    #[test]
    fn prop_missing_column_always_fails(
        records in prop::collection::vec(record_strategy(), 0..10),
        dropped in 0usize..REQUIRED_COLUMNS.len(),
    ) {
        let columns: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != dropped)
            .map(|(_, c)| c.to_string())
            .collect();
        let set = RawRecordSet::new(columns, records);

        let validation = Validator::new().validate(&set);
        prop_assert!(!validation.verdict);
        prop_assert_eq!(validation.missing_columns, vec![REQUIRED_COLUMNS[dropped].to_string()]);
    }
}
