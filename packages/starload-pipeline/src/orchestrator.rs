//! Sales pipeline orchestrator
//!
//! Runs Extract → Validate → Transform → Load (dimensions, bridge, fact) → Export for one
//! reporting period, strictly in sequence. The first failure aborts the remaining stages;
//! it is logged once here with the stage it happened in and returned unchanged.
//! Re-running a period is safe: dimensions and bridges are insert-if-absent and the fact
//! table is upserted.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use starload_storage::{
    CalendarDate, Category, DailySalesFact, Product, ProductCategory, RawRecordSet,
    ReportRecord, SalesSource, SqliteConnector, SqliteSalesSource, SqliteWarehouse, StarSchema,
    Warehouse,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::StarloadConfig;
use crate::error::{PipelineError, Result};
use crate::export::CsvExporter;
use crate::extract::Extractor;
use crate::load::{BridgeLoader, DimensionLoader, FactLoader, LoadSettings, LoadStats};
use crate::logging::{banner, error_banner};
use crate::state::{PipelineState, RunStateMachine};
use crate::transform::Aggregator;
use crate::validate::{ValidationReport, Validator};

/// What one successful run did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub period: NaiveDate,
    pub state: PipelineState,
    /// Raw rows extracted for the period
    pub extracted: usize,
    pub validation: Option<ValidationReport>,
    pub report: Vec<ReportRecord>,
    /// `dim_date`, `dim_category`, `dim_product`, in load order
    pub dimensions: Vec<LoadStats>,
    pub bridge: Option<LoadStats>,
    pub fact: Option<LoadStats>,
    pub export_path: Option<PathBuf>,
    pub duration_ms: u64,
}

impl RunSummary {
    fn new(run_id: Uuid, period: NaiveDate) -> Self {
        Self {
            run_id,
            period,
            state: PipelineState::Idle,
            extracted: 0,
            validation: None,
            report: Vec::new(),
            dimensions: Vec::new(),
            bridge: None,
            fact: None,
            export_path: None,
            duration_ms: 0,
        }
    }

    /// Nothing was extracted, so nothing was written
    pub fn is_no_data(&self) -> bool {
        self.state == PipelineState::Done && self.extracted == 0
    }
}

pub struct SalesPipeline {
    extractor: Extractor,
    validator: Validator,
    aggregator: Aggregator,
    dimensions: DimensionLoader,
    bridges: BridgeLoader,
    facts: FactLoader,
    exporter: Option<CsvExporter>,
}

impl SalesPipeline {
    pub fn new(
        config: &StarloadConfig,
        source: Arc<dyn SalesSource>,
        warehouse: Arc<dyn Warehouse>,
    ) -> Result<Self> {
        let settings = LoadSettings::from(&config.load);
        let exporter = config
            .export
            .enabled
            .then(|| CsvExporter::new(&config.export.reports_dir));

        Ok(Self {
            extractor: Extractor::new(source),
            validator: Validator::new(),
            aggregator: Aggregator::new(config.load.group_by),
            dimensions: DimensionLoader::new(warehouse.clone(), StarSchema::sales()?, settings),
            bridges: BridgeLoader::new(warehouse.clone(), settings),
            facts: FactLoader::new(warehouse, settings),
            exporter,
        })
    }

    /// SQLite source (must already exist) and warehouse (created when absent)
    pub fn from_config(config: &StarloadConfig) -> Result<Self> {
        let source = SqliteSalesSource::new(
            Arc::new(SqliteConnector::file(&config.source.path).must_exist(true)),
            config.source.table.clone(),
        );
        let warehouse = SqliteWarehouse::new(Arc::new(SqliteConnector::file(
            &config.warehouse.path,
        )));
        Self::new(config, Arc::new(source), Arc::new(warehouse))
    }

    /// Run every stage for `period`
    ///
    /// A period without source rows completes with an empty report and writes nothing.
    pub async fn run(&self, period: NaiveDate) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sales_run", %run_id, %period);
        self.run_inner(run_id, period).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, period: NaiveDate) -> Result<RunSummary> {
        banner(&format!("Daily report pipeline start: {}", period));
        info!(plan = %self.dimensions.schema().load_plan(), "Load plan");

        let started = Instant::now();
        let mut machine = RunStateMachine::new();
        let mut summary = RunSummary::new(run_id, period);

        match self.execute(period, &mut machine, &mut summary).await {
            Ok(()) => {
                summary.state = machine.into_state();
                summary.duration_ms = started.elapsed().as_millis() as u64;
                banner(&format!(
                    "Daily report pipeline complete: {} ({} ms)",
                    period, summary.duration_ms
                ));
                Ok(summary)
            }
            Err(err) => {
                let stage = machine.state().state_name();
                error_banner(&format!(
                    "Pipeline failed during {} [{}]: {}",
                    stage,
                    err.category(),
                    err
                ));
                if let Err(transition) = machine.fail(&err) {
                    warn!(error = %transition, "Could not record failure state");
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        period: NaiveDate,
        machine: &mut RunStateMachine,
        summary: &mut RunSummary,
    ) -> Result<()> {
        machine.advance()?;
        let extraction = self.extractor.extract(period).await?;
        summary.extracted = extraction.len();

        machine.advance()?;
        let validation = self.validator.validate(extraction.records());
        summary.validation = Some(validation.clone());
        if !validation.verdict {
            return Err(PipelineError::Validation {
                missing: validation.missing_columns,
            });
        }

        machine.advance()?;
        let report = self.aggregator.aggregate(extraction.records(), &validation)?;
        summary.report = report.clone();
        if extraction.is_no_data() {
            info!(period = %period, "No data for period; skipping load and export");
            return machine.complete();
        }

        machine.advance()?;
        self.load(period, extraction.records(), &report, summary)
            .await?;

        if let Some(exporter) = &self.exporter {
            summary.export_path = Some(exporter.export_report(period, &report)?);
        }

        machine.complete()
    }

    /// Dimensions, then the bridge, then the fact rows that reference them
    async fn load(
        &self,
        period: NaiveDate,
        set: &RawRecordSet,
        report: &[ReportRecord],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let dates = vec![CalendarDate::from_date(period)];
        let categories: Vec<Category> = set
            .records
            .iter()
            .map(|r| r.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|name| Category { name })
            .collect();
        let products: Vec<Product> = set
            .records
            .iter()
            .map(|r| r.product.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|name| Product { name })
            .collect();
        let links: Vec<ProductCategory> = set
            .records
            .iter()
            .map(|r| ProductCategory {
                product: r.product.clone(),
                category: r.category.clone(),
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        summary.dimensions.push(self.dimensions.load(&dates).await?);
        summary.dimensions.push(self.dimensions.load(&categories).await?);
        summary.dimensions.push(self.dimensions.load(&products).await?);

        summary.bridge = Some(self.bridges.load(&links).await?);

        let group_by = self.aggregator.group_by();
        let facts: Vec<DailySalesFact> = report.iter().map(|r| group_by.fact(period, r)).collect();
        summary.fact = Some(self.facts.load(&facts).await?);
        Ok(())
    }
}
