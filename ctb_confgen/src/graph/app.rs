//! Applications and the system that groups them.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::module::Direction;
use super::modulegraph::ModuleGraph;
use crate::{ConfgenError, ConfgenResult};

/// Host used when an application does not name one.
pub const DEFAULT_HOST: &str = "localhost";

/// One DAQ application: a validated module graph bound to a host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct App {
    name: String,
    host: String,
    modulegraph: ModuleGraph,
    /// Kubernetes resources requested by the application.
    pub resources: BTreeMap<String, String>,
}

impl App {
    /// Validates `modulegraph` and binds it to `host`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Graph`] when the graph does not validate or
    /// the name or host is blank.
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        modulegraph: ModuleGraph,
    ) -> ConfgenResult<Self> {
        let name = name.into();
        let host = host.into();
        if name.trim().is_empty() {
            return Err(ConfgenError::graph(name, "application name is blank"));
        }
        if host.trim().is_empty() {
            return Err(ConfgenError::graph(name, "application host is blank"));
        }
        modulegraph.validate(&name)?;
        Ok(Self {
            name,
            host,
            modulegraph,
            resources: BTreeMap::new(),
        })
    }

    /// Like [`App::new`] on [`DEFAULT_HOST`].
    ///
    /// # Errors
    ///
    /// See [`App::new`].
    pub fn on_localhost(name: impl Into<String>, modulegraph: ModuleGraph) -> ConfgenResult<Self> {
        Self::new(name, DEFAULT_HOST, modulegraph)
    }

    /// Application name, unique within a [`System`].
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host the application runs on.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The validated module graph.
    #[must_use]
    pub const fn modulegraph(&self) -> &ModuleGraph {
        &self.modulegraph
    }
}

/// First port handed out to network endpoints unless configured otherwise.
pub const DEFAULT_NETWORK_BASE_PORT: u16 = 15_000;

/// The applications generated together, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct System {
    apps: BTreeMap<String, App>,
    network_base_port: u16,
}

impl Default for System {
    fn default() -> Self {
        Self::with_network_base_port(DEFAULT_NETWORK_BASE_PORT)
    }
}

impl System {
    /// An empty system on [`DEFAULT_NETWORK_BASE_PORT`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty system whose network endpoints are numbered from `port`.
    #[must_use]
    pub const fn with_network_base_port(port: u16) -> Self {
        Self {
            apps: BTreeMap::new(),
            network_base_port: port,
        }
    }

    /// First port handed to network endpoints.
    #[must_use]
    pub const fn network_base_port(&self) -> u16 {
        self.network_base_port
    }

    /// Adds `app` under its own name.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Graph`] when an application of that name is
    /// already present, or when one of its external endpoint names is
    /// already published by another application.
    pub fn add_app(&mut self, app: App) -> ConfgenResult<()> {
        if self.apps.contains_key(app.name()) {
            return Err(ConfgenError::graph(app.name(), "application already defined"));
        }
        let published: BTreeSet<&str> = self
            .apps
            .values()
            .flat_map(|other| other.modulegraph.endpoints())
            .filter_map(|endpoint| endpoint.external_name.as_deref())
            .collect();
        if let Some(clash) = app
            .modulegraph
            .endpoints()
            .iter()
            .filter_map(|endpoint| endpoint.external_name.as_deref())
            .find(|name| published.contains(name))
        {
            return Err(ConfgenError::graph(
                app.name(),
                format!("endpoint '{clash}' is already published by another application"),
            ));
        }
        tracing::debug!(app = app.name(), host = app.host(), "adding application");
        self.apps.insert(app.name.clone(), app);
        Ok(())
    }

    /// The application called `name`.
    #[must_use]
    pub fn app(&self, name: &str) -> Option<&App> {
        self.apps.get(name)
    }

    /// Mutable access, used to attach resources after construction.
    pub fn app_mut(&mut self, name: &str) -> Option<&mut App> {
        self.apps.get_mut(name)
    }

    /// Applications in name order.
    pub fn apps(&self) -> impl Iterator<Item = &App> {
        self.apps.values()
    }

    /// True when no application has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Application names in start order: an application subscribing to a
    /// data type starts before the applications publishing it. Endpoints
    /// excluded from toposort and self-subscriptions add no ordering.
    /// Stop order is the reverse.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Graph`] when the dependencies form a cycle.
    pub fn app_start_order(&self) -> ConfgenResult<Vec<&str>> {
        let names: Vec<&str> = self.apps.keys().map(String::as_str).collect();
        let mut producers_of: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for app in self.apps.values() {
            for endpoint in app.modulegraph.endpoints() {
                if endpoint.toposort && endpoint.direction == Direction::Out {
                    producers_of
                        .entry(endpoint.data_type.as_str())
                        .or_default()
                        .insert(app.name());
                }
            }
        }

        // consumer -> producers it must start before
        let mut before: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut pending: BTreeMap<&str, usize> = names.iter().map(|name| (*name, 0)).collect();
        for app in self.apps.values() {
            let consumed = app.modulegraph.endpoints().iter().filter(|endpoint| {
                endpoint.toposort && endpoint.direction == Direction::In
            });
            for endpoint in consumed {
                let Some(producers) = producers_of.get(endpoint.data_type.as_str()) else {
                    continue;
                };
                for producer in producers.iter().filter(|producer| **producer != app.name()) {
                    if before.entry(app.name()).or_default().insert(*producer)
                        && let Some(count) = pending.get_mut(producer)
                    {
                        *count += 1;
                    }
                }
            }
        }

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(names.len());
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for producer in before.get(next).into_iter().flatten() {
                if let Some(count) = pending.get_mut(producer) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*producer);
                    }
                }
            }
        }

        if order.len() == names.len() {
            Ok(order)
        } else {
            Err(ConfgenError::graph("system", "application dependencies form a cycle"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DaqModule, Endpoint};
    use rstest::rstest;
    use serde_json::json;

    fn graph(module: &str, endpoints: Vec<Endpoint>) -> ModuleGraph {
        let mut graph = ModuleGraph::new(
            vec![DaqModule::new(module, "Dummy", &json!({})).expect("module")],
            Vec::new(),
        );
        for endpoint in endpoints {
            graph.add_endpoint(endpoint);
        }
        graph
    }

    #[rstest]
    fn blank_host_is_rejected() {
        let err = App::new("ctb", " ", graph("ctb", Vec::new())).expect_err("blank host");
        assert!(err.to_string().contains("host"));
    }

    #[rstest]
    fn invalid_graph_is_rejected() {
        let bad = graph("ctb", vec![Endpoint::output("events", "ghost.out", "HSIEvent")]);
        assert!(App::on_localhost("ctb", bad).is_err());
    }

    #[rstest]
    fn duplicate_apps_are_rejected() {
        let mut system = System::new();
        system
            .add_app(App::on_localhost("ctb", graph("ctb", Vec::new())).expect("app"))
            .expect("first add");
        let err = system
            .add_app(App::on_localhost("ctb", graph("ctb", Vec::new())).expect("app"))
            .expect_err("second add");
        assert!(err.to_string().contains("already defined"));
    }

    #[rstest]
    fn clashing_endpoint_names_are_rejected() {
        let mut system = System::new();
        let first = graph("a", vec![Endpoint::output("events", "a.out", "HSIEvent")]);
        let second = graph("b", vec![Endpoint::output("events", "b.out", "HSIEvent")]);
        system.add_app(App::on_localhost("a", first).expect("app")).expect("add a");
        assert!(system.add_app(App::on_localhost("b", second).expect("app")).is_err());
    }

    #[rstest]
    fn subscribers_start_before_publishers() {
        let mut system = System::new();
        let publisher = graph("src", vec![Endpoint::output("events", "src.out", "HSIEvent")]);
        let subscriber = graph("dst", vec![Endpoint::subscriber("HSIEvent")]);
        system
            .add_app(App::on_localhost("alpha", publisher).expect("app"))
            .expect("add publisher");
        system
            .add_app(App::on_localhost("beta", subscriber).expect("app"))
            .expect("add subscriber");
        assert_eq!(system.app_start_order().expect("order"), vec!["beta", "alpha"]);
    }

    #[rstest]
    fn endpoints_outside_toposort_add_no_ordering() {
        let mut system = System::new();
        let publisher = graph(
            "src",
            vec![
                Endpoint::output("timesync", "src.out", "TimeSync")
                    .pubsub()
                    .without_toposort(),
            ],
        );
        let subscriber = graph("dst", vec![Endpoint::subscriber("TimeSync")]);
        system
            .add_app(App::on_localhost("beta", publisher).expect("app"))
            .expect("add publisher");
        system
            .add_app(App::on_localhost("alpha", subscriber).expect("app"))
            .expect("add subscriber");
        assert_eq!(system.app_start_order().expect("order"), vec!["alpha", "beta"]);
    }
}
