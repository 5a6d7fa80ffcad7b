//! System-wide boot description and top-level command files.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::{Command, app_data_stem};
use crate::graph::System;
use crate::schema::confgen::BootConf;
use crate::{ConfgenError, ConfgenResult};

const EXEC_SSH: &str = "daq_application_ssh";
const EXEC_K8S: &str = "daq_application_k8s";

/// How one application is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootApp {
    /// Key into [`BootData::exec`].
    pub exec: String,
    /// Key into [`BootData::hosts`].
    pub host: String,
    /// Command port of the application.
    pub port: u16,
    /// Kubernetes resources requested by the application.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, String>,
}

/// Launch recipe shared by applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecSpec {
    /// Executable name.
    pub cmd: String,
    /// Arguments, with `{APP_NAME}`-style placeholders filled in at boot.
    pub args: Vec<String>,
    /// Environment of the launched process; `getenv` copies the value from
    /// the launching shell.
    pub env: BTreeMap<String, String>,
    /// Container image, for Kubernetes deployments only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Contents of `boot.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootData {
    /// Applications by name.
    pub apps: BTreeMap<String, BootApp>,
    /// Host aliases referenced by [`BootApp::host`].
    pub hosts: BTreeMap<String, String>,
    /// Environment shared by every application.
    pub env: BTreeMap<String, String>,
    /// Launch recipes referenced by [`BootApp::exec`].
    pub exec: BTreeMap<String, ExecSpec>,
    /// Where applications send command responses.
    pub response_listener: ResponseListener,
}

/// Run-control response listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseListener {
    /// Listening port.
    pub port: u16,
}

/// A top-level command file: which payload each application receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopLevelCommand {
    /// Application name to payload path, relative and without extension.
    pub apps: BTreeMap<String, String>,
    /// Order in which applications receive the command, when it matters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
}

/// Everything written at the top of the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemCommandData {
    /// Contents of `boot.json`.
    pub boot: BootData,
    /// Top-level command files, one per command.
    pub commands: BTreeMap<Command, TopLevelCommand>,
}

impl SystemCommandData {
    /// JSON payload of `boot.json`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Encode`] when serialisation fails.
    pub fn boot_payload(&self) -> ConfgenResult<Value> {
        serde_json::to_value(&self.boot).map_err(|err| ConfgenError::encode("boot data", err))
    }

    /// JSON payload of the top-level file for `command`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Encode`] when serialisation fails.
    pub fn command_payload(&self, command: Command) -> ConfgenResult<Option<Value>> {
        self.commands
            .get(&command)
            .map(|data| {
                serde_json::to_value(data)
                    .map_err(|err| ConfgenError::encode(format!("{command} command file"), err))
            })
            .transpose()
    }
}

/// Renders the boot description and top-level command files of `system`.
///
/// Command ports are numbered from `boot.base_command_port` in application
/// name order. `start` is issued in [`System::app_start_order`] and `stop`
/// in the reverse order.
///
/// # Errors
///
/// Returns a [`ConfgenError::Graph`] when the system is empty, the
/// application order cannot be resolved or command ports run out.
pub fn make_system_command_datas(boot: &BootConf, system: &System) -> ConfgenResult<SystemCommandData> {
    if system.is_empty() {
        return Err(ConfgenError::graph("system", "no applications to generate"));
    }

    let exec_name = if boot.use_k8s { EXEC_K8S } else { EXEC_SSH };
    let mut apps = BTreeMap::new();
    let mut hosts = BTreeMap::new();
    let mut next_port = Some(boot.base_command_port);
    for app in system.apps() {
        let port = next_port
            .ok_or_else(|| ConfgenError::graph(app.name(), "command port range exhausted"))?;
        next_port = port.checked_add(1);
        let host_key = format!("host_{}", app.name());
        hosts.insert(host_key.clone(), app.host().to_owned());
        apps.insert(
            app.name().to_owned(),
            BootApp {
                exec: exec_name.to_owned(),
                host: host_key,
                port,
                resources: app.resources.clone(),
            },
        );
    }

    let start_order: Vec<String> = system
        .app_start_order()?
        .into_iter()
        .map(str::to_owned)
        .collect();
    let mut stop_order = start_order.clone();
    stop_order.reverse();

    let commands = Command::ALL
        .into_iter()
        .map(|command| {
            let order = match command {
                Command::Start => Some(start_order.clone()),
                Command::Stop => Some(stop_order.clone()),
                Command::Init | Command::Conf | Command::Scrap => None,
            };
            let targets = system
                .apps()
                .map(|app| (app.name().to_owned(), app_data_stem(app.name(), command)))
                .collect();
            (
                command,
                TopLevelCommand {
                    apps: targets,
                    order,
                },
            )
        })
        .collect();

    tracing::debug!(apps = apps.len(), exec = exec_name, "rendered boot data");
    Ok(SystemCommandData {
        boot: BootData {
            apps,
            hosts,
            env: system_env(boot),
            exec: BTreeMap::from([(exec_name.to_owned(), exec_spec(boot))]),
            response_listener: ResponseListener {
                port: boot.response_listener_port,
            },
        },
        commands,
    })
}

fn system_env(boot: &BootConf) -> BTreeMap<String, String> {
    let mut env = captured_env(boot);
    env.insert(String::from("DUNEDAQ_OP_ENV"), boot.op_env.clone());
    env
}

fn captured_env(boot: &BootConf) -> BTreeMap<String, String> {
    boot.capture_env_vars
        .iter()
        .map(|name| (name.clone(), String::from("getenv")))
        .collect()
}

fn exec_spec(boot: &BootConf) -> ExecSpec {
    let args = ["--name", "{APP_NAME}", "-c", "{CMD_FAC}", "-i", "{INFO_SVC}"]
        .into_iter()
        .map(str::to_owned)
        .collect();
    ExecSpec {
        cmd: String::from("daq_application"),
        args,
        env: captured_env(boot),
        image: boot.use_k8s.then(|| boot.image.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::get_boardcontroller_app;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn system() -> System {
        let mut system = System::new();
        system
            .add_app(get_boardcontroller_app("ctb").expect("controller"))
            .expect("add controller");
        system
    }

    #[rstest]
    fn boot_lists_apps_with_ports_and_hosts(system: System) {
        let data = make_system_command_datas(&BootConf::default(), &system).expect("system data");
        let boot = data.boot_payload().expect("boot payload");
        assert_eq!(boot.pointer("/apps/ctb/port"), Some(&json!(3333)));
        assert_eq!(boot.pointer("/apps/ctb/exec"), Some(&json!(EXEC_SSH)));
        assert_eq!(boot.pointer("/hosts/host_ctb"), Some(&json!("localhost")));
        assert_eq!(boot.pointer("/response_listener/port"), Some(&json!(56_789)));
        assert_eq!(boot.pointer("/env/TIMING_SHARE"), Some(&json!("getenv")));
        assert!(boot.pointer("/apps/ctb/resources").is_none());
    }

    #[rstest]
    fn k8s_boot_uses_the_image(mut system: System) {
        let boot = BootConf {
            use_k8s: true,
            image: String::from("dunedaq/ctb:latest"),
            ..BootConf::default()
        };
        if let Some(app) = system.app_mut("ctb") {
            app.resources
                .insert(String::from("ctb.example/board"), String::from("1"));
        }
        let data = make_system_command_datas(&boot, &system).expect("system data");
        let payload = data.boot_payload().expect("boot payload");
        assert_eq!(
            payload.pointer("/exec/daq_application_k8s/image"),
            Some(&json!("dunedaq/ctb:latest"))
        );
        assert_eq!(
            payload.pointer("/apps/ctb/resources/ctb.example~1board"),
            Some(&json!("1"))
        );
    }

    #[rstest]
    #[case(Command::Init, false)]
    #[case(Command::Start, true)]
    #[case(Command::Stop, true)]
    fn command_files_point_at_app_data(system: System, #[case] command: Command, #[case] ordered: bool) {
        let data = make_system_command_datas(&BootConf::default(), &system).expect("system data");
        let payload = data
            .command_payload(command)
            .expect("payload")
            .expect("command file");
        assert_eq!(
            payload.pointer("/apps/ctb"),
            Some(&json!(format!("data/ctb_{command}")))
        );
        assert_eq!(payload.get("order").is_some(), ordered);
    }

    #[rstest]
    fn empty_system_is_rejected() {
        assert!(make_system_command_datas(&BootConf::default(), &System::new()).is_err());
    }
}
