//! Precedence layering of generator configuration.
//!
//! Every source is reduced to a JSON value tagged with where it came from.
//! Values are overlaid lowest precedence first and the result is deserialised
//! into the typed configuration, so sources can be assembled in tests without
//! touching the filesystem.
//!
//! ```rust
//! use ctb_confgen::GenConfig;
//! use ctb_confgen::layers::{LayerSource, LayerStack};
//! use serde_json::json;
//!
//! let mut stack = LayerStack::default();
//! stack.push(LayerSource::Defaults, serde_json::to_value(GenConfig::default()).expect("defaults"));
//! stack.push(LayerSource::CommandLine, json!({"ctb_hsi": {"host_ctb_hsi": "np04-srv-012"}}));
//!
//! let config: GenConfig = stack.resolve().expect("layers merge");
//! assert_eq!(config.ctb_hsi.host_ctb_hsi, "np04-srv-012");
//! ```

use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{ConfgenError, ConfgenResult};

/// Where a layer's values came from, lowest precedence first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSource {
    /// Schema defaults.
    Defaults,
    /// A configuration file.
    File(Utf8PathBuf),
    /// Prefixed environment variables.
    Environment,
    /// Command-line flags.
    CommandLine,
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => f.write_str("defaults"),
            Self::File(path) => write!(f, "file {path}"),
            Self::Environment => f.write_str("environment"),
            Self::CommandLine => f.write_str("command line"),
        }
    }
}

/// Layers in precedence order, plus failures met while reading sources.
///
/// A source that fails to load is recorded rather than aborting, so one
/// run reports every broken source.
#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<(LayerSource, Value)>,
    errors: Vec<Arc<ConfgenError>>,
}

impl LayerStack {
    /// Adds a layer above all existing ones.
    pub fn push(&mut self, source: LayerSource, value: Value) {
        self.layers.push((source, value));
    }

    /// Records a source that could not be read.
    pub fn record_error(&mut self, err: Arc<ConfgenError>) {
        self.errors.push(err);
    }

    /// Sources of the stacked layers, lowest precedence first.
    pub fn sources(&self) -> impl Iterator<Item = &LayerSource> {
        self.layers.iter().map(|(source, _)| source)
    }

    /// Overlays every layer and deserialises the result.
    ///
    /// # Errors
    ///
    /// Returns the recorded source errors, together with a
    /// [`ConfgenError::Merge`] when the merged value does not fit `T`.
    pub fn resolve<T: DeserializeOwned>(self) -> ConfgenResult<T> {
        let Self { layers, mut errors } = self;
        let mut merged = Value::Object(Map::new());
        for (source, value) in layers {
            tracing::trace!(%source, "applying configuration layer");
            overlay(&mut merged, value);
        }
        match serde_json::from_value(merged) {
            Ok(config) if errors.is_empty() => Ok(config),
            Ok(_) => Err(fold(errors)),
            Err(err) => {
                errors.push(ConfgenError::merge(err));
                Err(fold(errors))
            }
        }
    }
}

fn fold(errors: Vec<Arc<ConfgenError>>) -> Arc<ConfgenError> {
    match <[Arc<ConfgenError>; 1]>::try_from(errors) {
        Ok([only]) => only,
        Err(several) => Arc::new(ConfgenError::Aggregate(several)),
    }
}

/// Overlays `layer` onto `target`.
///
/// Objects merge key by key, recursively. Arrays and scalars replace the
/// target wholesale; trigger lists are merged by id later, against the board
/// defaults.
///
/// ```rust
/// use ctb_confgen::layers::overlay;
/// use serde_json::json;
///
/// let mut acc = json!({"boot": {"use_k8s": false, "base_command_port": 3333}});
/// overlay(&mut acc, json!({"boot": {"use_k8s": true}}));
/// assert_eq!(acc, json!({"boot": {"use_k8s": true, "base_command_port": 3333}}));
/// ```
pub fn overlay(target: &mut Value, layer: Value) {
    let Value::Object(entries) = layer else {
        *target = layer;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Some(target_map) = target.as_object_mut() else {
        return;
    };
    for (key, value) in entries {
        match target_map.get_mut(&key) {
            Some(existing) => overlay(existing, value),
            None => {
                target_map.insert(key, value);
            }
        }
    }
}
