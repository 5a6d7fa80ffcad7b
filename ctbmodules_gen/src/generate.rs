//! The generation pipeline behind each subcommand.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use ctb_confgen::apps::{DEFAULT_NICKNAME, get_boardcontroller_app, get_ctb_hsi_app};
use ctb_confgen::command_data::{make_app_command_data, make_system_command_datas};
use ctb_confgen::graph::System;
use ctb_confgen::metadata::write_metadata_file;
use ctb_confgen::output::{ensure_output_dir_absent, write_json_files};
use ctb_confgen::{GenConfig, load_gen_config};

use crate::cli::Commands;
use crate::error::Result;

/// Generator name recorded for the board controller.
pub const CONTROLLER_GENERATOR: &str = "ctbcontrollers_gen";
/// Generator name recorded for the CTB HSI application.
pub const HSI_GENERATOR: &str = "ctbmodules_gen";

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// Every JSON file written, in write order.
    pub json_files: Vec<Utf8PathBuf>,
    /// The metadata record.
    pub metadata_file: Utf8PathBuf,
}

/// Runs `command`: checks the output directory, loads configuration, builds
/// the system and writes it out.
///
/// # Errors
///
/// Fails when the output directory already exists, configuration cannot be
/// loaded, or generation fails.
pub fn run(command: &Commands) -> Result<Generated> {
    let args = command.args();
    ensure_output_dir_absent(&args.json_dir)?;

    let config = load_gen_config(&args.sources())?;
    let (system, generator) = build_system(command, &config)?;

    let mut app_datas = BTreeMap::new();
    for app in system.apps() {
        app_datas.insert(app.name().to_owned(), make_app_command_data(&system, app)?);
    }
    let system_datas = make_system_command_datas(&config.boot, &system)?;

    let json_files = write_json_files(&app_datas, &system_datas, &args.json_dir)?;
    let metadata_file =
        write_metadata_file(&args.json_dir, generator, args.config_file.as_deref())?;
    tracing::info!(dir = %args.json_dir, generator, "configuration generated");
    Ok(Generated {
        json_files,
        metadata_file,
    })
}

fn build_system(command: &Commands, config: &GenConfig) -> Result<(System, &'static str)> {
    let mut system = System::with_network_base_port(config.boot.network_base_port);
    let (app, generator) = match command {
        Commands::Controller(_) => (get_boardcontroller_app(DEFAULT_NICKNAME)?, CONTROLLER_GENERATOR),
        Commands::Hsi(_) => (
            get_ctb_hsi_app(&config.ctb_hsi, DEFAULT_NICKNAME, &config.readout)?,
            HSI_GENERATOR,
        ),
    };
    system.add_app(app)?;
    Ok((system, generator))
}
