//! Module graphs and the applications built from them.
//!
//! A [`ModuleGraph`] holds the DAQ modules of one application, the queues
//! connecting them, the endpoints exposed to other applications, and the
//! fragment producers answering data requests. An [`App`] places a validated
//! graph on a host, and a [`System`] collects the applications written out
//! together.

mod app;
mod module;
mod modulegraph;

pub use app::{App, DEFAULT_HOST, DEFAULT_NETWORK_BASE_PORT, System};
pub use module::{DaqModule, Direction, Endpoint, FragmentProducer, Queue, split_endpoint};
pub use modulegraph::ModuleGraph;
