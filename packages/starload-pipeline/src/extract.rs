use std::sync::Arc;

use chrono::NaiveDate;
use starload_storage::{RawRecordSet, SalesSource};
use tracing::{error, info};

use crate::error::{PipelineError, Result};

/// Outcome of an extraction; "no data" is a result, not an error
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Rows(RawRecordSet),
    /// Nothing matched the period; carries the source schema for validation
    NoData(RawRecordSet),
}

impl Extraction {
    pub fn records(&self) -> &RawRecordSet {
        match self {
            Extraction::Rows(set) | Extraction::NoData(set) => set,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Extraction::NoData(_))
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// Reads one period of raw records from the source collaborator
pub struct Extractor {
    source: Arc<dyn SalesSource>,
}

impl Extractor {
    pub fn new(source: Arc<dyn SalesSource>) -> Self {
        Self { source }
    }

    /// A connectivity failure is logged and returned as-is; there is no retry here
    pub async fn extract(&self, period: NaiveDate) -> Result<Extraction> {
        let set = match self.source.fetch_by_date(period).await {
            Ok(set) => set,
            Err(err) if err.is_connectivity() => {
                error!(
                    source = %self.source.describe(),
                    error = %err,
                    "Source unreachable"
                );
                return Err(PipelineError::Connectivity(err));
            }
            Err(err) => return Err(err.into()),
        };

        if set.is_empty() {
            info!(period = %period, "No data for period");
            Ok(Extraction::NoData(set))
        } else {
            info!(period = %period, rows = set.len(), "Extracted rows");
            Ok(Extraction::Rows(set))
        }
    }
}
