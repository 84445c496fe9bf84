//! Process-wide tracing setup: console output plus a rotating log file.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// The console layer honours `RUST_LOG` and falls back to the configured
/// console level; the file layer always uses the file level. The returned
/// guard flushes the file writer and must live until the process exits.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    let appender = file_appender(config)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.console_level)?,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(level_filter(&config.file_level)?),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Daily-rotated log file appender keeping `max_files` files
fn file_appender(config: &LoggingConfig) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("Failed to create log directory {}", config.directory))?;

    Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .max_log_files(config.max_files.max(1))
        .build(&config.directory)
        .context("Failed to create rolling log file")
}

fn level_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("Invalid log level {level:?}"))
}
