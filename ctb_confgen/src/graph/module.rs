//! Graph nodes and edges.

use serde::Serialize;
use serde_json::Value;

use crate::{ConfgenError, ConfgenResult};

/// A DAQ module instance: a plugin plus its configuration payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaqModule {
    /// Instance name, unique within the application.
    pub name: String,
    /// Plugin implementing the module.
    pub plugin: String,
    /// Serialised configuration sent with the `conf` command.
    pub conf: Value,
}

impl DaqModule {
    /// Builds a module, serialising `conf` into its JSON payload.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Encode`] when `conf` cannot be serialised.
    pub fn new(
        name: impl Into<String>,
        plugin: impl Into<String>,
        conf: &impl Serialize,
    ) -> ConfgenResult<Self> {
        let name = name.into();
        let conf = serde_json::to_value(conf)
            .map_err(|err| ConfgenError::encode(format!("configuration of module '{name}'"), err))?;
        Ok(Self {
            name,
            plugin: plugin.into(),
            conf,
        })
    }
}

/// A queue connecting two modules of the same application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Queue {
    /// Producer side, as `module.endpoint`.
    pub push: String,
    /// Consumer side, as `module.endpoint`.
    pub pop: String,
    /// Type of the queued objects.
    pub data_type: String,
    /// Connection name.
    pub name: String,
    /// Queue capacity in elements.
    pub capacity: usize,
}

impl Queue {
    /// Builds a queue from `push` to `pop`.
    pub fn new(
        push: impl Into<String>,
        pop: impl Into<String>,
        data_type: impl Into<String>,
        name: impl Into<String>,
        capacity: usize,
    ) -> Self {
        Self {
            push: push.into(),
            pop: pop.into(),
            data_type: data_type.into(),
            name: name.into(),
            capacity,
        }
    }
}

/// Direction of an endpoint relative to its application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Data enters the application.
    In,
    /// Data leaves the application.
    Out,
}

/// A connection point exposed to other applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Name other applications refer to; `None` for bare subscribers.
    pub external_name: Option<String>,
    /// Module endpoint, as `module.endpoint`; `None` for bare subscribers.
    pub internal_name: Option<String>,
    /// Type of the transferred objects.
    pub data_type: String,
    /// Direction relative to the application.
    pub direction: Direction,
    /// Published/subscribed rather than point-to-point.
    pub is_pubsub: bool,
    /// Participates in application start ordering.
    pub toposort: bool,
}

impl Endpoint {
    /// A point-to-point output from `internal_name`, published as `external_name`.
    pub fn output(
        external_name: impl Into<String>,
        internal_name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            external_name: Some(external_name.into()),
            internal_name: Some(internal_name.into()),
            data_type: data_type.into(),
            direction: Direction::Out,
            is_pubsub: false,
            toposort: true,
        }
    }

    /// A subscription to every publisher of `data_type`, bound to no module.
    pub fn subscriber(data_type: impl Into<String>) -> Self {
        Self {
            external_name: None,
            internal_name: None,
            data_type: data_type.into(),
            direction: Direction::In,
            is_pubsub: true,
            toposort: true,
        }
    }

    /// Marks the endpoint as publish/subscribe.
    #[must_use]
    pub fn pubsub(mut self) -> Self {
        self.is_pubsub = true;
        self
    }

    /// Excludes the endpoint from application start ordering.
    #[must_use]
    pub fn without_toposort(mut self) -> Self {
        self.toposort = false;
        self
    }
}

/// A source of readout data answering trigger requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentProducer {
    /// Source id of the produced fragments, unique within the system.
    pub source_id: u32,
    /// Detector subsystem of the source.
    pub subsystem: String,
    /// Module endpoint receiving data requests.
    pub requests_in: String,
    /// Module endpoint emitting fragments.
    pub fragments_out: String,
}

/// Splits a `module.endpoint` reference into its two halves.
///
/// Returns `None` when either half is empty or the separator is missing.
///
/// # Examples
///
/// ```rust
/// use ctb_confgen::graph::split_endpoint;
///
/// assert_eq!(split_endpoint("ctb.llt_output"), Some(("ctb", "llt_output")));
/// assert_eq!(split_endpoint("ctb"), None);
/// ```
#[must_use]
pub fn split_endpoint(reference: &str) -> Option<(&str, &str)> {
    let (module, endpoint) = reference.split_once('.')?;
    if module.is_empty() || endpoint.is_empty() {
        return None;
    }
    Some((module, endpoint))
}
