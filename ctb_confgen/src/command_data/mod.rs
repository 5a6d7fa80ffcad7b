//! Command data consumed by the DAQ run-control tooling.
//!
//! Every application receives one payload per run-control [`Command`]
//! ([`make_app_command_data`]); the system as a whole receives a boot
//! description and one top-level file per command naming the per-app
//! payloads ([`make_system_command_datas`]).

mod app;
mod network;
mod system;

use std::fmt;

use serde::Serialize;

pub use app::{
    AppCommandData, ConnDirection, ConnRef, InitData, ModuleCommand, ModuleCommands, ModuleInit,
    ModuleInitData, make_app_command_data,
};
pub use network::{Connection, ConnectionType};
pub use system::{
    BootApp, BootData, ExecSpec, ResponseListener, SystemCommandData, TopLevelCommand,
    make_system_command_datas,
};

/// Run-control commands with generated payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Instantiates modules and connections.
    Init,
    /// Configures modules.
    Conf,
    /// Starts a run.
    Start,
    /// Stops a run.
    Stop,
    /// Tears modules down.
    Scrap,
}

impl Command {
    /// Every command, in the order run control issues them.
    pub const ALL: [Self; 5] = [Self::Init, Self::Conf, Self::Start, Self::Stop, Self::Scrap];

    /// Lowercase command name used in file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Conf => "conf",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Scrap => "scrap",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative path, without extension, of the payload for `app` and `command`.
#[must_use]
pub fn app_data_stem(app: &str, command: Command) -> String {
    format!("data/{app}_{command}")
}
