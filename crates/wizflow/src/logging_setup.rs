//! Logging bootstrap
//!
//! The bridge engine runs as a supervised child and gets restarted after a
//! crash, so the file sink opens in append mode: the tail of the previous
//! run stays readable next to the restart that followed it.

use std::fs::OpenOptions;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use wizflow_core::LogConfig;

/// Keeps the file sink's writer thread alive for the life of the process.
/// Dropping it flushes whatever the worker still buffers.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber according to `config`.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let (file_layer, guard) = match file_writer(config)? {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(level_filter(config));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = config.console_output.then(|| {
        fmt::layer()
            // Log lines go to stderr; stdout is reserved for command output
            // like the discovery table.
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(level_filter(config))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LogGuard { _file: guard })
}

/// Level filter from the config; a `RUST_LOG` setting overrides it.
fn level_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy()
}

/// Open the append-mode log file behind a non-blocking writer, or `None`
/// when file output is disabled.
fn file_writer(config: &LogConfig) -> Result<Option<(NonBlocking, WorkerGuard)>> {
    if !config.file_output {
        return Ok(None);
    }

    config
        .ensure_log_directory()
        .with_context(|| format!("creating log directory {:?}", config.log_dir))?;

    let path = config.current_log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {:?}", path))?;

    Ok(Some(tracing_appender::non_blocking(file)))
}
