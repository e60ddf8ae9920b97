//! File-based tracing setup. The terminal belongs to the dashboard, so nothing
//! is written to stdout/stderr by the subscriber.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_DIR: &str = "logs";
/// Library and `risk-dashboard` binary targets.
pub const DEFAULT_FILTER: &str = "perps_risk_dashboard=info,risk_dashboard=info";
const LOG_FILE_PREFIX: &str = "risk-dashboard.log";

/// `LOG_DIR`, or `logs` in the working directory.
pub fn log_dir() -> PathBuf {
    env::var("LOG_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
}

/// `RUST_LOG` when it parses, the crate default otherwise.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the file subscriber. Buffered lines are flushed when the returned
/// guard is dropped, so the caller keeps it alive until exit.
pub fn init_logging() -> Result<(WorkerGuard, PathBuf)> {
    let dir = log_dir();
    let guard = init_logging_in(&dir, env_filter())?;
    Ok((guard, dir))
}

pub fn init_logging_in(dir: &Path, filter: EnvFilter) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::Layer::new()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tracing::info;

    #[test]
    fn test_default_filter_covers_binary_target() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        let targets: Vec<_> = DEFAULT_FILTER.split(',').collect();
        assert!(targets.contains(&"perps_risk_dashboard=info"));
        assert!(targets.contains(&"risk_dashboard=info"));
    }

    #[test]
    fn test_dropping_guard_flushes_file() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = env::temp_dir().join(format!("risk-dashboard-logs-{}-{}", std::process::id(), nanos));

        let guard = init_logging_in(&dir, EnvFilter::new(DEFAULT_FILTER)).unwrap();
        info!("flush check line");
        drop(guard);

        let contents: String = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|entry| fs::read_to_string(entry.unwrap().path()).ok())
            .collect();
        assert!(contents.contains("flush check line"));

        fs::remove_dir_all(&dir).ok();
    }
}
