//! Logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is left to the
//! embedding application. [`init_tracing`] is the one the `ctc-decode` binary uses.

use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the console layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Configuration for the tracing subscriber.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter, used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Console output format.
    pub format: LogFormat,
    /// Whether to include thread ids, useful when the batch runs on a worker pool.
    pub thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Compact,
            thread_ids: true,
        }
    }
}

/// Install a global subscriber. Logs go to stderr so stdout stays clean for results.
pub fn init_tracing(config: TracingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(config.thread_ids)
                    .compact(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(config.thread_ids)
                    .json(),
            )
            .try_init()?,
    }

    info!(level = %config.log_level, format = ?config.format, "Tracing initialized");
    Ok(())
}
