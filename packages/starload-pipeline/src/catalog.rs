//! Movie catalog load
//!
//! Loads `dim_movie` and `dim_genre` from a catalog document, generates `dim_date` for
//! the configured calendar and sample `dim_user` rows, links movies to genres in
//! `movie_genre`, then generates `fact_viewlog` rows from the keys actually stored in
//! the warehouse.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use starload_storage::domain::{DIM_DATE, DIM_MOVIE, DIM_USER};
use starload_storage::{
    CalendarDate, CatalogDocument, MovieGenre, SqliteConnector, SqliteWarehouse, StarSchema,
    TableRow, User, ViewLog, Warehouse,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{CatalogConfig, StarloadConfig};
use crate::error::Result;
use crate::export::CsvExporter;
use crate::load::{BridgeLoader, DimensionLoader, FactLoader, LoadSettings, LoadStats};
use crate::logging::{banner, error_banner};

pub const AGE_GROUPS: [&str; 6] = ["10대", "20대", "30대", "40대", "50대", "60대 이상"];

pub const REGIONS: [&str; 17] = [
    "서울", "부산", "대구", "인천", "광주", "대전", "울산", "세종", "경기", "강원", "충북", "충남",
    "전북", "전남", "경북", "경남", "제주",
];

const SURNAMES: [&str; 12] = [
    "김", "이", "박", "최", "정", "강", "조", "윤", "장", "임", "한", "오",
];

const GIVEN_NAMES: [&str; 16] = [
    "민준", "서연", "도윤", "하은", "지호", "수아", "예준", "지우", "시우", "서윤", "주원", "하린",
    "건우", "지민", "현우", "유진",
];

/// Read a catalog JSON document
pub fn read_document(path: &Path) -> Result<CatalogDocument> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// `count` users with ids `1..=count`
pub fn generate_users<R: Rng>(count: usize, rng: &mut R) -> Vec<User> {
    let mut users = Vec::with_capacity(count);
    for id in 1..=count {
        let surname = SURNAMES.choose(rng).copied().unwrap_or("김");
        let given = GIVEN_NAMES.choose(rng).copied().unwrap_or("민준");
        let age_group = AGE_GROUPS.choose(rng).copied().unwrap_or(AGE_GROUPS[0]);
        let region = REGIONS.choose(rng).copied().unwrap_or(REGIONS[0]);
        users.push(User {
            user_id: id as i64,
            username: format!("{}{}", surname, given),
            age_group: age_group.to_string(),
            region: region.to_string(),
        });
    }
    users
}

/// Random views over existing keys; empty when any key set is empty
///
/// Ratings are uniform in 1.0..=10.0 with one decimal. View counts are 1 (80%),
/// 2 (15%) or 3 (5%).
pub fn generate_view_logs<R: Rng>(
    movie_ids: &[i64],
    user_ids: &[i64],
    dates: &[NaiveDate],
    count: usize,
    rng: &mut R,
) -> Vec<ViewLog> {
    let mut logs = Vec::with_capacity(count);
    for _ in 0..count {
        let (Some(&movie_id), Some(&user_id), Some(&view_date)) = (
            movie_ids.choose(rng),
            user_ids.choose(rng),
            dates.choose(rng),
        ) else {
            return Vec::new();
        };

        let rating = (rng.gen_range(1.0..=10.0_f64) * 10.0).round() / 10.0;
        let roll: f64 = rng.gen();
        let view_count = if roll < 0.80 {
            1
        } else if roll < 0.95 {
            2
        } else {
            3
        };

        logs.push(ViewLog {
            movie_id,
            user_id,
            view_date,
            rating,
            view_count,
        });
    }
    logs
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub run_id: Uuid,
    pub full_reload: bool,
    /// `dim_movie`, `dim_genre`, `dim_date`, `dim_user`
    pub dimensions: Vec<LoadStats>,
    pub bridge: LoadStats,
    pub fact: LoadStats,
    pub export_path: Option<PathBuf>,
    pub duration_ms: u64,
}

pub struct CatalogPipeline {
    warehouse: Arc<dyn Warehouse>,
    settings: CatalogConfig,
    dimensions: DimensionLoader,
    bridges: BridgeLoader,
    facts: FactLoader,
    exporter: Option<CsvExporter>,
}

impl CatalogPipeline {
    pub fn new(config: &StarloadConfig, warehouse: Arc<dyn Warehouse>) -> Result<Self> {
        let load = LoadSettings::from(&config.load);
        let exporter = config
            .export
            .enabled
            .then(|| CsvExporter::new(&config.export.reports_dir));

        Ok(Self {
            dimensions: DimensionLoader::new(warehouse.clone(), StarSchema::catalog()?, load),
            // Genre ids unknown to dim_genre are skipped, not fatal
            bridges: BridgeLoader::new(warehouse.clone(), load).tolerating_orphans(),
            facts: FactLoader::new(warehouse.clone(), load),
            warehouse,
            settings: config.catalog.clone(),
            exporter,
        })
    }

    pub fn from_config(config: &StarloadConfig) -> Result<Self> {
        let warehouse = SqliteWarehouse::new(Arc::new(SqliteConnector::file(
            &config.warehouse.path,
        )));
        Self::new(config, Arc::new(warehouse))
    }

    pub async fn run(&self, document: &CatalogDocument, full_reload: bool) -> Result<CatalogSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("catalog_run", %run_id, full_reload);
        async {
            banner(&format!(
                "Catalog load start: {} movies, {} genres",
                document.movies.len(),
                document.genres.len()
            ));
            let started = Instant::now();
            match self.execute(run_id, document, full_reload).await {
                Ok(mut summary) => {
                    summary.duration_ms = started.elapsed().as_millis() as u64;
                    banner(&format!("Catalog load complete ({} ms)", summary.duration_ms));
                    Ok(summary)
                }
                Err(err) => {
                    error_banner(&format!("Catalog load failed [{}]: {}", err.category(), err));
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn load_dimension<T: TableRow>(&self, rows: &[T], full_reload: bool) -> Result<LoadStats> {
        if full_reload {
            self.dimensions.reload(rows).await
        } else {
            self.dimensions.load(rows).await
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        document: &CatalogDocument,
        full_reload: bool,
    ) -> Result<CatalogSummary> {
        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let dates = CalendarDate::range(self.settings.start, self.settings.end);
        let users = generate_users(self.settings.users, &mut rng);

        let dimensions = vec![
            self.load_dimension(&document.movies, full_reload).await?,
            self.load_dimension(&document.genres, full_reload).await?,
            self.load_dimension(&dates, full_reload).await?,
            self.load_dimension(&users, full_reload).await?,
        ];

        let links: Vec<MovieGenre> = document
            .movies
            .iter()
            .flat_map(|m| m.genre_links())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let bridge = self.bridges.load(&links).await?;
        if bridge.rejected > 0 {
            warn!(rejected = bridge.rejected, "Movie genre links to unknown genres skipped");
        }

        // Keys come from the warehouse so earlier loads are included too
        let movie_ids: Vec<i64> = self
            .warehouse
            .select_column(&DIM_MOVIE, "movie_id")
            .await?
            .iter()
            .filter_map(|v| v.as_i64())
            .collect();
        let user_ids: Vec<i64> = self
            .warehouse
            .select_column(&DIM_USER, "user_id")
            .await?
            .iter()
            .filter_map(|v| v.as_i64())
            .collect();
        let date_ids: Vec<NaiveDate> = self
            .warehouse
            .select_column(&DIM_DATE, "date_id")
            .await?
            .iter()
            .filter_map(|v| v.as_date())
            .collect();

        let logs = generate_view_logs(
            &movie_ids,
            &user_ids,
            &date_ids,
            self.settings.view_logs,
            &mut rng,
        );
        if logs.is_empty() && self.settings.view_logs > 0 {
            warn!(
                movies = movie_ids.len(),
                users = user_ids.len(),
                dates = date_ids.len(),
                "No view logs generated"
            );
        }
        let fact = self.facts.load(&logs).await?;

        // Named after the last calendar day so re-runs replace the same file
        let export_path = match &self.exporter {
            Some(exporter) => Some(exporter.export_rows(self.settings.end, &logs)?),
            None => None,
        };

        info!(
            movies = document.movies.len(),
            links = links.len(),
            view_logs = logs.len(),
            "Catalog loaded"
        );
        Ok(CatalogSummary {
            run_id,
            full_reload,
            dimensions,
            bridge,
            fact,
            export_path,
            duration_ms: 0,
        })
    }
}
