//! Logging setup

use tracing_subscriber::EnvFilter;

use tether_core::{TetherError, TetherResult};

use crate::LogConfig;

/// Install the global `tracing` subscriber
///
/// Does nothing if a subscriber is already installed, so it is safe to call
/// from every runtime start.
pub fn init_logging(config: &LogConfig) -> TetherResult<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|error| TetherError::Config(format!("log filter: {error}")))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
