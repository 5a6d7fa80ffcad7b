//! `ctbmodules-gen` entry point: parse arguments, load configuration, write
//! the JSON tree.

use clap::Parser;
use ctbmodules_gen::cli::{CommandLine, is_display_request};
use ctbmodules_gen::error::Result;
use ctbmodules_gen::{generate, logging};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    run().map_err(color_eyre::eyre::Report::from)
}

fn run() -> Result<()> {
    let cli = parse_command_line()?;
    logging::init()?;
    generate::run(&cli.command)?;
    Ok(())
}

fn parse_command_line() -> Result<CommandLine> {
    match CommandLine::try_parse() {
        Ok(cli) => Ok(cli),
        Err(err) => {
            if is_display_request(&err) {
                err.exit();
            }
            Err(err.into())
        }
    }
}
