//! Logging setup.

use tracing_subscriber::EnvFilter;

use crate::error::{GenError, Result};

/// Installs a `tracing` subscriber writing to stderr, filtered by `RUST_LOG`
/// and defaulting to `info`.
///
/// # Errors
///
/// Returns [`GenError::Logging`] when a global subscriber is already set.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| GenError::Logging(err.to_string()))
}
