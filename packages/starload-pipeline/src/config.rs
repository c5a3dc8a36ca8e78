//! Run configuration
//!
//! Loaded from YAML, then overridden by `STARLOAD_*` environment variables, then
//! validated. Every section is optional; an empty file yields the defaults.
//!
//! ```yaml
//! source:
//!   path: ./data/sales.sqlite
//!   table: sales
//! warehouse:
//!   path: ./data/warehouse.sqlite
//! load:
//!   batch_size: 1000
//!   commit_mode: per_batch
//!   group_by: category
//! export:
//!   reports_dir: ./reports/
//! log:
//!   file: ./logs/daily_report.log
//!   level: info
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use starload_storage::CommitMode;
use thiserror::Error;

use crate::transform::GroupBy;

pub const MAX_BATCH_SIZE: usize = 100_000;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Range validation error
    #[error("Invalid range for field '{field}': {value} not in {min}..={max}. {hint}")]
    Range {
        field: String,
        value: String,
        min: String,
        max: String,
        hint: String,
    },

    /// Environment override that does not parse
    #[error("Invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: String, value: String },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Custom(String),
}

impl ConfigError {
    pub fn range_with_hint(
        field: impl Into<String>,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
        hint: impl Into<String>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
            hint: hint.into(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Operational SQLite database; must already exist
    pub path: PathBuf,
    pub table: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/sales.sqlite"),
            table: "sales".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WarehouseConfig {
    pub path: PathBuf,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/warehouse.sqlite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    pub batch_size: usize,
    pub commit_mode: CommitMode,
    pub group_by: GroupBy,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            commit_mode: CommitMode::PerBatch,
            group_by: GroupBy::Category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub reports_dir: PathBuf,
    pub enabled: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("./reports/"),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Append-only audit log; `None` logs to stderr only
    pub file: Option<PathBuf>,
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("./logs/daily_report.log")),
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// First calendar day of `dim_date`
    pub start: NaiveDate,
    /// Last calendar day of `dim_date` (inclusive)
    pub end: NaiveDate,
    pub users: usize,
    pub view_logs: usize,
    /// Fixed RNG seed for reproducible sample data
    pub seed: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or(NaiveDate::MIN),
            users: 20,
            view_logs: 150,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StarloadConfig {
    pub source: SourceConfig,
    pub warehouse: WarehouseConfig,
    pub load: LoadConfig,
    pub export: ExportConfig,
    pub log: LogConfig,
    pub catalog: CatalogConfig,
}

impl StarloadConfig {
    /// Read, apply process environment overrides, validate
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        let env: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("STARLOAD_"))
            .collect();
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply `STARLOAD_*` overrides from the given variable map
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> ConfigResult<()> {
        if let Some(v) = env.get("STARLOAD_SOURCE_DB") {
            self.source.path = PathBuf::from(v);
        }
        if let Some(v) = env.get("STARLOAD_WAREHOUSE_DB") {
            self.warehouse.path = PathBuf::from(v);
        }
        if let Some(v) = env.get("STARLOAD_REPORTS_DIR") {
            self.export.reports_dir = PathBuf::from(v);
        }
        if let Some(v) = env.get("STARLOAD_LOG_LEVEL") {
            self.log.level = v.clone();
        }
        if let Some(v) = env.get("STARLOAD_BATCH_SIZE") {
            self.load.batch_size = v.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "STARLOAD_BATCH_SIZE".to_string(),
                value: v.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.load.batch_size) {
            return Err(ConfigError::range_with_hint(
                "load.batch_size",
                self.load.batch_size,
                1,
                MAX_BATCH_SIZE,
                "Around 1000 rows per transaction is typical",
            ));
        }
        if self.source.table.trim().is_empty() {
            return Err(ConfigError::Custom("source.table must not be empty".into()));
        }
        if self.catalog.start > self.catalog.end {
            return Err(ConfigError::Custom(format!(
                "catalog.start {} is after catalog.end {}",
                self.catalog.start, self.catalog.end
            )));
        }
        if self.catalog.users == 0 {
            return Err(ConfigError::range_with_hint(
                "catalog.users",
                0,
                1,
                usize::MAX,
                "View logs need at least one user",
            ));
        }
        Ok(())
    }
}
