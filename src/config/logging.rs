//! Tracing subscriber setup.

use super::LoggingConfig;
use crate::error::{Result, VisPipeError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured filter. With a log file configured,
/// records also go to that file through a non-blocking writer; keep the
/// returned guard alive until shutdown or buffered records are lost.
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| VisPipeError::Config(format!("Invalid log filter: {}", e)))?;
    let stdout = tracing_subscriber::fmt::layer().with_ansi(config.ansi);

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                VisPipeError::Config(format!("Log file path has no file name: {:?}", path))
            })?;
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file_layer)
        .try_init()
        .map_err(|e| VisPipeError::Config(format!("Logging already initialized: {}", e)))?;

    tracing::info!("Logging initialized ({})", config.filter);
    Ok(guard)
}
