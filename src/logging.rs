//! Process-wide tracing setup

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LOG_ENV_VAR;

const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "artifact-sync.log";

/// Build the filter from an explicit level, then the environment, then the default
fn build_filter(level: Option<&str>) -> EnvFilter {
    level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_env(LOG_ENV_VAR).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install stderr logging plus a daily-rolling file under `log_dir`
///
/// The returned guard flushes the file writer on drop and must be held for the
/// life of the process. File logging is skipped if `log_dir` cannot be created.
pub fn init(level: Option<&str>, log_dir: &Path) -> Option<WorkerGuard> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let dir_error = std::fs::create_dir_all(log_dir).err();
    let (file_layer, guard) = match dir_error {
        None => {
            let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        Some(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(e) = dir_error {
        tracing::warn!("File logging disabled, cannot create {:?}: {}", log_dir, e);
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_filter_prefers_explicit_level() {
        let filter = build_filter(Some("debug"));

        assert_eq!(filter.to_string(), "debug");
    }
}
