//! Error types for `ctbmodules-gen`.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised by the generator binary.
#[derive(Debug, Error)]
pub enum GenError {
    /// Configuration loading or file generation failed.
    #[error(transparent)]
    Confgen(#[from] Arc<ctb_confgen::ConfgenError>),
    /// Command-line arguments could not be parsed.
    #[error("failed to parse command-line arguments: {0}")]
    Cli(#[from] clap::Error),
    /// The logging subscriber could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Result alias used by the binary.
pub type Result<T, E = GenError> = std::result::Result<T, E>;
