//! The error enum shared by every stage of generation.

use std::sync::Arc;

use camino::Utf8PathBuf;
use figment::Error as FigmentError;
use thiserror::Error;

/// Errors that can occur while loading configuration or generating output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfgenError {
    /// A configuration file is missing or cannot be parsed.
    #[error("Configuration file error in '{path}': {source}")]
    File {
        /// File being loaded.
        path: Utf8PathBuf,
        /// Underlying parser or I/O error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Environment variables could not be collected.
    #[error("Failed to gather configuration: {0}")]
    Gathering(#[source] Box<FigmentError>),

    /// The layered configuration does not deserialise into the schema.
    #[error("Failed to merge configuration layers: {0}")]
    Merge(#[source] serde_json::Error),

    /// A configuration value is out of range.
    #[error("Validation failed for '{key}': {message}")]
    Validation {
        /// Dotted path of the offending key, e.g. `boot.base_command_port`.
        key: String,
        /// What is wrong with the value.
        message: String,
    },

    /// The module graph of an application is inconsistent.
    #[error("Invalid module graph for application '{app}': {message}")]
    Graph {
        /// Application whose graph failed to build.
        app: String,
        /// Description of the inconsistency.
        message: String,
    },

    /// The output directory exists already; generation never overwrites.
    #[error("Directory {path} already exists")]
    OutputExists {
        /// Requested output directory.
        path: Utf8PathBuf,
    },

    /// Filesystem failure while reading inputs or writing generated files.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed when the failure occurred.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failure encoding generated data as JSON.
    #[error("Failed to encode {what} as JSON: {source}")]
    Encode {
        /// Description of the payload being encoded.
        what: String,
        /// Underlying encoder error.
        #[source]
        source: serde_json::Error,
    },

    /// Several independent failures, in the order they were found.
    #[error("multiple configuration errors:\n{}", numbered(.0))]
    Aggregate(Vec<Arc<ConfgenError>>),
}

fn numbered(errors: &[Arc<ConfgenError>]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(index, err)| format!("{}: {err}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
