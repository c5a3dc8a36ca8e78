//! starload CLI: daily sales report run, catalog load and warehouse reset

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use starload_pipeline::catalog::{read_document, CatalogPipeline};
use starload_pipeline::{logging, SalesPipeline, StarloadConfig};
use starload_storage::{SqliteConnector, SqliteWarehouse, StarSchema, Warehouse};
use tracing::info;

/// Star-schema ETL for the daily sales report
#[derive(Parser, Debug)]
#[command(name = "starload", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the daily report pipeline for one period
    Run {
        /// Reporting period (YYYY-MM-DD); defaults to ten days ago
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Load the movie catalog star schema from a JSON document
    Catalog {
        /// Catalog JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Empty dependent tables and dimensions before loading
        #[arg(long)]
        full_reload: bool,
    },
    /// Drop every warehouse table
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = StarloadConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let _guard = logging::init(&config.log)?;

    match cli.command {
        Commands::Run { date } => {
            let period = date.unwrap_or_else(|| Local::now().date_naive() - Duration::days(10));
            let pipeline = SalesPipeline::from_config(&config)?;
            let summary = pipeline.run(period).await?;
            info!(
                run_id = %summary.run_id,
                groups = summary.report.len(),
                export = ?summary.export_path,
                "Run finished"
            );
        }
        Commands::Catalog { file, full_reload } => {
            let document = read_document(&file)
                .with_context(|| format!("reading catalog {}", file.display()))?;
            let pipeline = CatalogPipeline::from_config(&config)?;
            let summary = pipeline.run(&document, full_reload).await?;
            info!(
                run_id = %summary.run_id,
                view_logs = summary.fact.inserted,
                "Catalog finished"
            );
        }
        Commands::Reset => {
            let warehouse = SqliteWarehouse::new(Arc::new(SqliteConnector::file(
                &config.warehouse.path,
            )));
            let schema = StarSchema::warehouse()?;
            warehouse.reset(&schema).await?;
            info!(tables = schema.creation_order().len(), "Dropped warehouse tables");
        }
    }

    Ok(())
}
