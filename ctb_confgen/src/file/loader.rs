//! Loading entrypoints for configuration files.

use std::error::Error;
use std::io;
use std::sync::Arc;

use camino::Utf8Path;
use figment::Figment;
use serde_json::Value;

use super::parser::Syntax;
use crate::{ConfgenError, ConfgenResult};

/// Wraps `err` as a [`ConfgenError::File`] for `path`.
pub(super) fn file_error(
    path: &Utf8Path,
    err: impl Into<Box<dyn Error + Send + Sync>>,
) -> Arc<ConfgenError> {
    Arc::new(ConfgenError::File {
        path: path.to_path_buf(),
        source: err.into(),
    })
}

/// Load a configuration file, selecting the parser from its extension.
///
/// # Errors
///
/// Returns a [`ConfgenError::File`] when the path is not a regular file,
/// cannot be read, or fails to parse.
pub fn load_config_file(path: &Utf8Path) -> ConfgenResult<Figment> {
    if !path.is_file() {
        return Err(file_error(
            path,
            io::Error::new(io::ErrorKind::NotFound, "not a readable regular file"),
        ));
    }
    let data = std::fs::read_to_string(path).map_err(|e| file_error(path, e))?;
    tracing::debug!(path = %path, bytes = data.len(), "read configuration file");
    Syntax::of(path).parse(path, &data)
}

/// Load a configuration file as a JSON value, ready to be layered.
///
/// # Errors
///
/// See [`load_config_file`]; also fails when the document cannot be
/// represented as JSON.
pub fn load_config_value(path: &Utf8Path) -> ConfgenResult<Value> {
    load_config_file(path)?
        .extract::<Value>()
        .map_err(|e| file_error(path, e))
}
