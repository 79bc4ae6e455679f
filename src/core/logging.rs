use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

/// Daily files are named `relay.log.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "relay.log";

/// Used when `RUST_LOG` is unset or invalid. `tower_http=debug` keeps the
/// per-request trace lines.
const DEFAULT_FILTER: &str = "info,tower_http=debug";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs stdout and rolling-file output. Safe to call more than once;
/// only the first call takes effect.
pub fn init(paths: &AppPaths) {
    let log_dir = &paths.log_dir;
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Cannot create log directory {}: {}", log_dir.display(), e);
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);

    match tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => {
            let _ = LOG_GUARD.set(guard);
            tracing::debug!("Writing logs to {}", log_dir.join(LOG_FILE_PREFIX).display());
        }
        Err(e) => eprintln!("Logging already initialized, keeping existing subscriber: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn init_twice_writes_to_the_relay_log() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().join("data"));
        init(&paths);
        init(&paths);
        tracing::info!("logging initialized twice");

        let names: Vec<String> = std::fs::read_dir(&paths.log_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(
            names.iter().any(|n| n.starts_with(LOG_FILE_PREFIX)),
            "log files: {:?}",
            names
        );
    }
}
