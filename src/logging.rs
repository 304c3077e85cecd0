//! Structured logging using the tracing crate.
//!
//! Writes to stderr. Level is controlled by RUST_LOG, falling back to the
//! level given on the command line.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber.
///
/// # Errors
/// - If a global subscriber is already installed
pub fn init_logging(default_level: &str) -> Result<(), anyhow::Error> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Logging already initialized: {}", e))?;

    tracing::debug!("Logging initialized at {}", default_level);
    Ok(())
}
