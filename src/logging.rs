//! Logging setup
//!
//! The terminal belongs to the UI, so everything goes to a daily-rolling file
//! under `<config dir>/logs`. `RUST_LOG` takes precedence over the default
//! filter.

use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "pgnav=info";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files are written
    pub log_dir: PathBuf,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Include file/line information
    pub include_location: bool,
}

impl LoggingConfig {
    /// Logs under `config_dir/logs`. `level` (e.g. from `--log-level`)
    /// becomes the crate-level filter.
    pub fn new(config_dir: &Path, level: Option<&str>) -> Self {
        Self {
            log_dir: config_dir.join("logs"),
            default_filter: level
                .map(|l| format!("pgnav={}", l))
                .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            include_location: cfg!(debug_assertions),
        }
    }
}

/// Install the global subscriber. The returned guard flushes the
/// non-blocking writer on drop and must be held for the whole session.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| AppError::Logging(e.to_string()))?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "pgnav.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_ansi(false)
        .with_writer(non_blocking);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    tracing::info!(log_dir = %config.log_dir.display(), "logging initialized");
    Ok(guard)
}
