//! Process-wide log setup.
//!
//! Everything logs through `tracing`; `log` records from dependencies and
//! from the filesystem modules are bridged into the same subscriber.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

pub type InitResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Fails if a subscriber or
/// logger is already installed.
pub fn init_logging(level: &str, json: bool) -> InitResult {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    if json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true));
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).compact());
        tracing::subscriber::set_global_default(subscriber)?;
    }

    tracing_log::LogTracer::init()?;
    Ok(())
}

pub fn init_from_config(config: &LoggingConfig) -> InitResult {
    init_logging(&config.level, config.json)
}
