//! Tracing setup: human-readable stderr plus an append-only audit file

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LogConfig;
use crate::error::Result;

const BANNER: &str = "==================================================";

/// Flushes the file writer when dropped; keep it alive for the whole process
pub struct LogGuard {
    _file: Option<WorkerGuard>,
    installed: bool,
}

impl LogGuard {
    /// False when another subscriber was already global; the file layer is then absent
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. A second call leaves the first
/// subscriber in place and reports it through [`LogGuard::is_installed`].
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter(&config.level));

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            std::fs::create_dir_all(&dir)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "starload.log".into());

            let appender = tracing_appender::rolling::never(&dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = if config.json {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(filter(&config.level))
                    .boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(filter(&config.level))
                    .boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let has_file = file_layer.is_some();
    match tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => Ok(LogGuard {
            _file: guard,
            installed: true,
        }),
        // Already initialised (tests, embedding applications)
        Err(err) => {
            tracing::warn!(
                file_layer = has_file,
                "Log subscriber not installed, keeping the existing one: {}",
                err
            );
            Ok(LogGuard {
                _file: None,
                installed: false,
            })
        }
    }
}

pub fn banner(message: &str) {
    tracing::info!("{}", BANNER);
    tracing::info!("{}", message);
    tracing::info!("{}", BANNER);
}

pub fn error_banner(message: &str) {
    tracing::error!("{}", BANNER);
    tracing::error!("{}", message);
    tracing::error!("{}", BANNER);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            file: Some(dir.path().join("logs").join("daily_report.log")),
            level: "debug".to_string(),
            json: true,
        };

        let _guard = init(&config).unwrap();
        assert!(dir.path().join("logs").is_dir());
        banner("init test");
    }

    #[test]
    fn test_second_init_reports_existing_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            file: Some(dir.path().join("audit.log")),
            ..LogConfig::default()
        };

        let _first = init(&config).unwrap();
        let second = init(&config).unwrap();
        assert!(!second.is_installed());
    }

    #[test]
    fn test_init_without_file() {
        let config = LogConfig {
            file: None,
            ..LogConfig::default()
        };
        assert!(init(&config).is_ok());
    }
}
