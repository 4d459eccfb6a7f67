use anyhow::{anyhow, Result};
use tiller_core::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `RUST_LOG`, when set, takes
/// precedence over the configured level. Fails if a subscriber is already
/// installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.trim().to_ascii_lowercase()))
        .map_err(|error| anyhow!("invalid log filter: {error}"))?;

    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);
    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|error| anyhow!("could not install log subscriber: {error}"))
}
