//! Process-wide logging setup.
//!
//! `tracing` events and spans go through a `tracing-subscriber` registry;
//! records from the `log` macros are bridged in by `tracing-log`.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to bridge log records: {0}")]
    LogBridge(#[from] log::SetLoggerError),

    #[error("Failed to install subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Picks the filter directive: `RUST_LOG` when set and non-empty, the
/// configured level otherwise.
fn filter_directive(configured: &str, env_override: Option<String>) -> String {
    env_override
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| configured.to_string())
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let directive = filter_directive(&config.level, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{}': {}; falling back to info", directive, e);
        EnvFilter::new("info")
    })
}

/// Installs the global subscriber. Call once, early in `main`.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    tracing_log::LogTracer::init()?;

    let filter = build_filter(config);
    match config.format {
        LogFormat::Text => {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().with_target(true));
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_current_span(true));
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(())
}
