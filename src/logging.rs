//! Tracing subscriber setup.

use std::sync::OnceLock;

use relay_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Keeps the non-blocking file writer flushing for the process lifetime.
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the console layer and, when a log directory is configured, a
/// daily-rolling file layer. `RUST_LOG` overrides the configured level.
pub(crate) fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer: Option<Box<dyn Layer<Registry> + Send + Sync>> = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(config.file_prefix.as_str())
                .filename_suffix("log")
                .max_log_files(config.max_files)
                .build(dir)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let _ = GUARD.set(guard);

            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            Some(if config.json {
                layer.json().boxed()
            } else {
                layer.boxed()
            })
        }
        None => None,
    };

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    tracing_subscriber::registry()
        .with(file_layer)
        .with(env_filter)
        // Console layer (human-readable text format with colors)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .try_init()?;

    Ok(())
}
