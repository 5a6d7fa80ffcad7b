//! Per-application command payloads.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::Command;
use super::network::{Connection, NetworkPlan};
use crate::graph::{App, DaqModule, Direction, FragmentProducer, ModuleGraph, System, split_endpoint};
use crate::{ConfgenError, ConfgenResult};

/// Direction of a connection reference, seen from the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnDirection {
    /// The module receives on the connection.
    #[serde(rename = "kInput")]
    Input,
    /// The module sends on the connection.
    #[serde(rename = "kOutput")]
    Output,
}

/// Binds a module endpoint to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnRef {
    /// Endpoint name inside the module.
    pub name: String,
    /// Connection uid.
    pub uid: String,
    /// Whether the module reads or writes.
    pub dir: ConnDirection,
}

/// Module instantiation entry of the `init` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInit {
    /// Module instance name.
    pub inst: String,
    /// Plugin implementing the module.
    pub plugin: String,
    /// Instantiation arguments.
    pub data: ModuleInitData,
}

/// Instantiation arguments of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleInitData {
    /// Connections bound to the module's endpoints.
    pub conn_refs: Vec<ConnRef>,
}

/// `init` payload: modules, their connections and the fragment producers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitData {
    /// Modules to instantiate, in graph order.
    pub modules: Vec<ModuleInit>,
    /// Queues plus the network connections the application uses.
    pub connections: Vec<Connection>,
    /// Fragment producers registered with the dataflow.
    pub fragment_producers: Vec<FragmentProducer>,
}

/// Payload addressed to one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleCommand {
    /// Module instance the payload targets.
    #[serde(rename = "match")]
    pub target: String,
    /// Command arguments.
    pub data: Value,
}

/// Payloads of one command, in the order modules receive them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleCommands {
    /// One entry per targeted module.
    pub modules: Vec<ModuleCommand>,
}

impl ModuleCommands {
    fn empty_for<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            modules: names
                .into_iter()
                .map(|name| ModuleCommand {
                    target: name.to_owned(),
                    data: Value::Object(Map::new()),
                })
                .collect(),
        }
    }

    /// Target module names in order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|module| module.target.as_str())
    }
}

/// Everything run control sends to one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppCommandData {
    /// Module and connection setup.
    pub init: InitData,
    /// Per-module configuration.
    pub conf: ModuleCommands,
    /// Start, consumers first.
    pub start: ModuleCommands,
    /// Stop, producers first.
    pub stop: ModuleCommands,
    /// Teardown, in stop order.
    pub scrap: ModuleCommands,
}

impl AppCommandData {
    /// JSON payload for `command`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Encode`] when serialisation fails.
    pub fn payload(&self, command: Command) -> ConfgenResult<Value> {
        let encoded = match command {
            Command::Init => serde_json::to_value(&self.init),
            Command::Conf => serde_json::to_value(&self.conf),
            Command::Start => serde_json::to_value(&self.start),
            Command::Stop => serde_json::to_value(&self.stop),
            Command::Scrap => serde_json::to_value(&self.scrap),
        };
        encoded.map_err(|err| ConfgenError::encode(format!("{command} command data"), err))
    }
}

/// Renders the command payloads of `app`, resolving its network endpoints
/// against the rest of `system`.
///
/// Modules start consumers first and stop in the opposite order; `scrap`
/// follows the stop order.
///
/// # Errors
///
/// Returns a [`ConfgenError::Graph`] when the graph cannot be ordered or
/// network ports run out.
pub fn make_app_command_data(system: &System, app: &App) -> ConfgenResult<AppCommandData> {
    let graph = app.modulegraph();
    let plan = NetworkPlan::for_system(system)?;

    let mut connections: Vec<Connection> = graph.queues().iter().map(Connection::for_queue).collect();
    connections.extend(plan.connections_for(app));

    let mut conn_refs = conn_refs_by_module(graph);
    let modules = graph
        .modules()
        .iter()
        .map(|module| ModuleInit {
            inst: module.name.clone(),
            plugin: module.plugin.clone(),
            data: ModuleInitData {
                conn_refs: conn_refs.remove(module.name.as_str()).unwrap_or_default(),
            },
        })
        .collect();

    let start_order = graph.module_start_order(app.name())?;
    let stop_order: Vec<&str> = start_order.iter().rev().copied().collect();
    tracing::debug!(app = app.name(), ?start_order, "module start order");

    Ok(AppCommandData {
        init: InitData {
            modules,
            connections,
            fragment_producers: graph.fragment_producers().to_vec(),
        },
        conf: ModuleCommands {
            modules: graph.modules().iter().map(conf_command).collect(),
        },
        start: ModuleCommands::empty_for(start_order),
        stop: ModuleCommands::empty_for(stop_order.iter().copied()),
        scrap: ModuleCommands::empty_for(stop_order),
    })
}

fn conf_command(module: &DaqModule) -> ModuleCommand {
    ModuleCommand {
        target: module.name.clone(),
        data: module.conf.clone(),
    }
}

fn conn_refs_by_module(graph: &ModuleGraph) -> BTreeMap<&str, Vec<ConnRef>> {
    let mut refs = BTreeMap::new();
    for queue in graph.queues() {
        bind(&mut refs, &queue.push, &queue.name, ConnDirection::Output);
        bind(&mut refs, &queue.pop, &queue.name, ConnDirection::Input);
    }
    for endpoint in graph.endpoints() {
        if let (Some(internal), Some(uid)) = (
            endpoint.internal_name.as_deref(),
            endpoint.external_name.as_deref(),
        ) {
            let dir = match endpoint.direction {
                Direction::In => ConnDirection::Input,
                Direction::Out => ConnDirection::Output,
            };
            bind(&mut refs, internal, uid, dir);
        }
    }
    refs
}

fn bind<'g>(
    refs: &mut BTreeMap<&'g str, Vec<ConnRef>>,
    reference: &'g str,
    uid: &str,
    dir: ConnDirection,
) {
    if let Some((module, endpoint)) = split_endpoint(reference) {
        refs.entry(module).or_default().push(ConnRef {
            name: endpoint.to_owned(),
            uid: uid.to_owned(),
            dir,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::get_ctb_hsi_app;
    use crate::command_data::ConnectionType;
    use crate::schema::confgen::{CtbHsiConf, ReadoutParams};
    use rstest::{fixture, rstest};

    #[fixture]
    fn system() -> System {
        let mut system = System::with_network_base_port(16_000);
        let app = get_ctb_hsi_app(&CtbHsiConf::default(), "ctb", &ReadoutParams::default())
            .expect("hsi app");
        system.add_app(app).expect("add app");
        system
    }

    fn data(system: &System) -> AppCommandData {
        let app = system.app("ctb").expect("ctb app");
        make_app_command_data(system, app).expect("command data")
    }

    #[rstest]
    fn start_and_stop_orders_mirror_each_other(system: System) {
        let data = data(&system);
        let start: Vec<&str> = data.start.targets().collect();
        let stop: Vec<&str> = data.stop.targets().collect();
        assert_eq!(start, vec!["ctb_hlt_datahandler", "ctb_llt_datahandler", "ctb"]);
        assert_eq!(stop, vec!["ctb", "ctb_llt_datahandler", "ctb_hlt_datahandler"]);
        assert_eq!(data.scrap.targets().collect::<Vec<_>>(), stop);
    }

    #[rstest]
    fn conf_carries_module_payloads(system: System) {
        let data = data(&system);
        let ctb = data.conf.modules.first().expect("ctb conf");
        assert_eq!(ctb.target, "ctb");
        assert!(ctb.data.pointer("/board_config/ctb/HLT").is_some());
    }

    #[rstest]
    fn queues_and_endpoints_become_connections(system: System) {
        let data = data(&system);
        let by_uid = |uid: &str| {
            data.init
                .connections
                .iter()
                .find(|connection| connection.uid == uid)
                .cloned()
        };
        let link = by_uid("ctb_llt_link").expect("queue connection");
        assert_eq!(link.connection_type, ConnectionType::Queue);
        assert_eq!(link.uri, "queue://FollySPSC:100000");

        let events = by_uid("ctb_hsievents").expect("event connection");
        assert_eq!(events.connection_type, ConnectionType::SendRecv);
        let timesync = by_uid("timesync_ctb_hlt").expect("timesync connection");
        assert_eq!(timesync.connection_type, ConnectionType::PubSub);
        assert!(timesync.uri.starts_with("tcp://localhost:16"));
        assert_eq!(data.init.connections.len(), 5);
    }

    #[rstest]
    fn modules_reference_their_connections(system: System) {
        let data = data(&system);
        let ctb = data
            .init
            .modules
            .iter()
            .find(|module| module.inst == "ctb")
            .expect("ctb init");
        let names: Vec<&str> = ctb.data.conn_refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["llt_output", "hlt_output", "hsievents"]);
        assert!(ctb.data.conn_refs.iter().all(|r| r.dir == ConnDirection::Output));

        let handler = data
            .init
            .modules
            .iter()
            .find(|module| module.inst == "ctb_llt_datahandler")
            .expect("handler init");
        let raw_input = handler.data.conn_refs.first().expect("raw input ref");
        assert_eq!(raw_input.uid, "ctb_llt_link");
        assert_eq!(raw_input.dir, ConnDirection::Input);
        assert_eq!(data.init.fragment_producers.len(), 2);
    }

    #[rstest]
    #[case(Command::Init, "/modules/0/plugin")]
    #[case(Command::Conf, "/modules/0/match")]
    #[case(Command::Scrap, "/modules/2/match")]
    fn payloads_serialise_per_command(system: System, #[case] command: Command, #[case] pointer: &str) {
        let payload = data(&system).payload(command).expect("payload");
        assert!(payload.pointer(pointer).is_some(), "{command}: {payload}");
    }
}
