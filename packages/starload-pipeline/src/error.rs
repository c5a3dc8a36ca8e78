use starload_storage::{StorageError, WriteOutcome};
use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source or target store unreachable
    #[error("Connectivity error: {0}")]
    Connectivity(#[source] StorageError),

    /// Required schema fields are absent; nothing was written
    #[error("Validation failed: missing required columns [{}]", missing.join(", "))]
    Validation { missing: Vec<String> },

    /// A batch commit failed; `committed` batches stay persisted under per-batch commit
    #[error("Load failed on {table} at batch {batch_index}: {source}")]
    Load {
        table: String,
        batch_index: usize,
        committed: WriteOutcome,
        #[source]
        source: StorageError,
    },

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        if err.is_connectivity() {
            Self::Connectivity(err)
        } else {
            Self::Storage(err)
        }
    }
}

impl PipelineError {
    pub fn export<E: std::fmt::Display>(e: E) -> Self {
        Self::Export(e.to_string())
    }

    /// Classification for the invoking scheduler; nothing is retried in-process
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Connectivity(_) => ErrorCategory::Transient,
            PipelineError::Io(_) | PipelineError::Export(_) => ErrorCategory::Infrastructure,
            PipelineError::Storage(err) | PipelineError::Load { source: err, .. }
                if err.kind == starload_storage::ErrorKind::IO =>
            {
                ErrorCategory::Infrastructure
            }
            _ => ErrorCategory::Permanent,
        }
    }
}

/// Error category for retry decisions made outside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Transient error - safe to re-invoke (e.g., store unreachable)
    Transient,
    /// Permanent error - re-running will fail the same way (e.g., missing column)
    Permanent,
    /// Infrastructure error - alert ops (e.g., disk full)
    Infrastructure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_conversion() {
        let err: PipelineError = StorageError::connectivity("unreachable").into();
        assert!(matches!(err, PipelineError::Connectivity(_)));
        assert_eq!(err.category(), ErrorCategory::Transient);

        let err: PipelineError = StorageError::database("syntax error").into();
        assert!(matches!(err, PipelineError::Storage(_)));
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }

    #[test]
    fn test_validation_error_display() {
        let err = PipelineError::Validation {
            missing: vec!["price".into(), "quantity".into()],
        };
        assert_eq!(
            err.to_string(),
            "Validation failed: missing required columns [price, quantity]"
        );
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }

    #[test]
    fn test_load_error_category() {
        let err = PipelineError::Load {
            table: "fact_daily_sales".into(),
            batch_index: 3,
            committed: WriteOutcome::default(),
            source: StorageError::constraint("FOREIGN KEY constraint failed"),
        };
        assert_eq!(err.category(), ErrorCategory::Permanent);
        assert!(err.to_string().contains("batch 3"));

        let err = PipelineError::Storage(StorageError::io("disk full"));
        assert_eq!(err.category(), ErrorCategory::Infrastructure);
    }
}
