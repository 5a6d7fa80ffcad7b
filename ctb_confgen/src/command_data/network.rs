//! Connection descriptions and network port allocation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::{App, Direction, Queue, System};
use crate::{ConfgenError, ConfgenResult};

/// Transport of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionType {
    /// In-process queue between two modules of one application.
    #[serde(rename = "kQueue")]
    Queue,
    /// Point-to-point network connection.
    #[serde(rename = "kSendRecv")]
    SendRecv,
    /// Publish/subscribe network connection.
    #[serde(rename = "kPubSub")]
    PubSub,
}

/// A named connection and where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    /// Unique connection name.
    pub uid: String,
    /// Payload type carried.
    pub data_type: String,
    /// Transport.
    pub connection_type: ConnectionType,
    /// `queue://` or `tcp://` address.
    pub uri: String,
}

impl Connection {
    pub(crate) fn for_queue(queue: &Queue) -> Self {
        Self {
            uid: queue.name.clone(),
            data_type: queue.data_type.clone(),
            connection_type: ConnectionType::Queue,
            uri: format!("queue://FollySPSC:{}", queue.capacity),
        }
    }
}

/// Network connections of a system, keyed by external endpoint name.
#[derive(Debug, Default)]
pub(crate) struct NetworkPlan {
    connections: BTreeMap<String, Connection>,
}

impl NetworkPlan {
    /// Assigns `tcp://<host>:<port>` URIs to every named endpoint, with
    /// ports numbered from the system's network base port in application
    /// name order, then endpoint declaration order.
    pub(crate) fn for_system(system: &System) -> ConfgenResult<Self> {
        let mut plan = Self::default();
        let mut next_port = Some(system.network_base_port());
        for app in system.apps() {
            for endpoint in app.modulegraph().endpoints() {
                let Some(uid) = endpoint.external_name.as_deref() else {
                    continue;
                };
                let port = next_port.ok_or_else(|| {
                    ConfgenError::graph(app.name(), "network port range exhausted")
                })?;
                next_port = port.checked_add(1);
                let connection_type = if endpoint.is_pubsub {
                    ConnectionType::PubSub
                } else {
                    ConnectionType::SendRecv
                };
                tracing::debug!(app = app.name(), uid, port, "assigned network endpoint");
                plan.connections.insert(
                    uid.to_owned(),
                    Connection {
                        uid: uid.to_owned(),
                        data_type: endpoint.data_type.clone(),
                        connection_type,
                        uri: format!("tcp://{}:{port}", app.host()),
                    },
                );
            }
        }
        Ok(plan)
    }

    /// Network connections `app` publishes or subscribes to, ordered by uid.
    pub(crate) fn connections_for(&self, app: &App) -> Vec<Connection> {
        let mut wanted: BTreeMap<&str, &Connection> = BTreeMap::new();
        for endpoint in app.modulegraph().endpoints() {
            if let Some(connection) = endpoint
                .external_name
                .as_deref()
                .and_then(|uid| self.connections.get(uid))
            {
                wanted.insert(connection.uid.as_str(), connection);
            }
            if endpoint.direction == Direction::In && endpoint.is_pubsub {
                let publishers = self.connections.values().filter(|connection| {
                    connection.connection_type == ConnectionType::PubSub
                        && connection.data_type == endpoint.data_type
                });
                for connection in publishers {
                    wanted.insert(connection.uid.as_str(), connection);
                }
            }
        }
        wanted.into_values().cloned().collect()
    }
}
