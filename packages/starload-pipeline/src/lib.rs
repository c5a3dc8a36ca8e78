/*
 * Starload Pipeline - daily sales report and warehouse load
 *
 * Moves raw sales records from the operational store into a star-schema warehouse.
 *
 * Stages:
 * - Extract (period selection, "no data" is not an error)
 * - Validate (required columns, data-quality warnings)
 * - Transform (group by category or product)
 * - Load (dimensions → bridge → fact, batched commits)
 * - Export (report_<period>.csv)
 *
 * Re-running a period never duplicates rows: dimensions and bridges are
 * insert-if-absent, facts are upserted.
 */

// Public modules
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod load;
pub mod logging;
pub mod orchestrator;
pub mod state;
pub mod transform;
pub mod validate;

// Re-exports
pub use catalog::{CatalogPipeline, CatalogSummary};
pub use config::{ConfigError, StarloadConfig};
pub use error::{ErrorCategory, PipelineError, Result};
pub use export::CsvExporter;
pub use extract::{Extraction, Extractor};
pub use load::{BridgeLoader, DimensionLoader, FactLoader, LoadSettings, LoadStats};
pub use orchestrator::{RunSummary, SalesPipeline};
pub use state::{PipelineState, RunStateMachine};
pub use transform::{Aggregator, GroupBy};
pub use validate::{DataQualityWarning, ValidationReport, Validator};
