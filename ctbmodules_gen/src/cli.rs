//! Command-line surface of `ctbmodules-gen`.
//!
//! Flags here are the highest-precedence configuration layer. Only flags the
//! user actually passes are layered, so file and environment values survive
//! when a flag is absent.

use camino::Utf8PathBuf;
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use ctb_confgen::ConfigSources;
use serde::Serialize;
use serde_json::Value;

/// Parsed command line.
#[derive(Debug, Parser)]
#[command(
    name = "ctbmodules-gen",
    bin_name = "ctbmodules-gen",
    about = "Generate DAQ configuration for Central Trigger Board applications",
    version
)]
pub struct CommandLine {
    /// Application to generate.
    #[command(subcommand)]
    pub command: Commands,
}

/// Applications the generator can produce.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Stand-alone board controller with the default board configuration.
    Controller(GenArgs),
    /// CTB HSI application with merged trigger definitions and readout.
    Hsi(GenArgs),
}

impl Commands {
    /// Arguments shared by every subcommand.
    #[must_use]
    pub const fn args(&self) -> &GenArgs {
        match self {
            Self::Controller(args) | Self::Hsi(args) => args,
        }
    }
}

/// Arguments shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GenArgs {
    /// JSON or TOML generator configuration.
    #[arg(short = 'c', long = "config-file", value_name = "PATH")]
    pub config_file: Option<Utf8PathBuf>,
    /// Individual configuration overrides.
    #[command(flatten)]
    pub overrides: CliOverrides,
    /// Output directory; must not exist yet.
    #[arg(value_name = "JSON_DIR")]
    pub json_dir: Utf8PathBuf,
}

impl GenArgs {
    /// Configuration sources described by these arguments.
    #[must_use]
    pub fn sources(&self) -> ConfigSources {
        ConfigSources {
            config_file: self.config_file.clone(),
            cli: self.overrides.to_layer(),
        }
    }
}

/// Flags overriding individual configuration values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct CliOverrides {
    /// Host running the CTB HSI application.
    #[arg(long, value_name = "HOST")]
    pub host_ctb_hsi: Option<String>,
    /// Deploy on Kubernetes.
    #[arg(long)]
    pub use_k8s: bool,
    /// First application command port.
    #[arg(long, value_name = "PORT")]
    pub base_command_port: Option<u16>,
    /// Source id of the low-level trigger stream.
    #[arg(long, value_name = "ID")]
    pub llt_source_id: Option<u32>,
    /// Source id of the high-level trigger stream.
    #[arg(long, value_name = "ID")]
    pub hlt_source_id: Option<u32>,
}

/// Whether `err` is a `--help` or `--version` request rather than a
/// failure. Such requests should still exit with status zero.
#[must_use]
pub fn is_display_request(err: &clap::Error) -> bool {
    matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

#[derive(Serialize)]
struct Layer<'a> {
    #[serde(skip_serializing_if = "BootLayer::is_empty")]
    boot: BootLayer,
    #[serde(skip_serializing_if = "CtbHsiLayer::is_empty")]
    ctb_hsi: CtbHsiLayer<'a>,
    #[serde(skip_serializing_if = "ReadoutLayer::is_empty")]
    readout: ReadoutLayer,
}

#[derive(Serialize)]
struct BootLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    use_k8s: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_command_port: Option<u16>,
}

impl BootLayer {
    const fn is_empty(&self) -> bool {
        self.use_k8s.is_none() && self.base_command_port.is_none()
    }
}

#[derive(Serialize)]
struct CtbHsiLayer<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    host_ctb_hsi: Option<&'a str>,
}

impl CtbHsiLayer<'_> {
    const fn is_empty(&self) -> bool {
        self.host_ctb_hsi.is_none()
    }
}

#[derive(Serialize)]
struct ReadoutLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    llt_source_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hlt_source_id: Option<u32>,
}

impl ReadoutLayer {
    const fn is_empty(&self) -> bool {
        self.llt_source_id.is_none() && self.hlt_source_id.is_none()
    }
}

impl CliOverrides {
    /// The overrides as a configuration layer; `null` when no flag was given.
    #[must_use]
    pub fn to_layer(&self) -> Value {
        let layer = Layer {
            boot: BootLayer {
                use_k8s: self.use_k8s.then_some(true),
                base_command_port: self.base_command_port,
            },
            ctb_hsi: CtbHsiLayer {
                host_ctb_hsi: self.host_ctb_hsi.as_deref(),
            },
            readout: ReadoutLayer {
                llt_source_id: self.llt_source_id,
                hlt_source_id: self.hlt_source_id,
            },
        };
        match serde_json::to_value(layer) {
            Ok(Value::Object(map)) if !map.is_empty() => Value::Object(map),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn parse(args: &[&str]) -> CommandLine {
        CommandLine::try_parse_from(args).expect("arguments parse")
    }

    #[rstest]
    #[case::controller(&["ctbmodules-gen", "controller", "out"], false)]
    #[case::hsi(&["ctbmodules-gen", "hsi", "out"], true)]
    fn subcommands_select_the_app(#[case] args: &[&str], #[case] is_hsi: bool) {
        let cli = parse(args);
        assert_eq!(matches!(cli.command, Commands::Hsi(_)), is_hsi);
        assert_eq!(cli.command.args().json_dir, Utf8PathBuf::from("out"));
    }

    #[rstest]
    fn absent_flags_produce_no_layer() {
        let cli = parse(&["ctbmodules-gen", "hsi", "out"]);
        assert_eq!(cli.command.args().overrides.to_layer(), Value::Null);
    }

    #[rstest]
    fn given_flags_are_nested_by_section() {
        let cli = parse(&[
            "ctbmodules-gen",
            "hsi",
            "-c",
            "ctb.toml",
            "--host-ctb-hsi",
            "np04-srv-012",
            "--use-k8s",
            "--hlt-source-id",
            "7",
            "out",
        ]);
        let args = cli.command.args();
        assert_eq!(args.config_file, Some(Utf8PathBuf::from("ctb.toml")));
        assert_eq!(
            args.overrides.to_layer(),
            json!({
                "boot": {"use_k8s": true},
                "ctb_hsi": {"host_ctb_hsi": "np04-srv-012"},
                "readout": {"hlt_source_id": 7}
            })
        );
    }

    #[rstest]
    #[case(&["ctbmodules-gen", "--help"], true)]
    #[case(&["ctbmodules-gen", "--version"], true)]
    #[case(&["ctbmodules-gen", "hsi", "--bogus", "out"], false)]
    fn display_requests_are_told_apart_from_failures(#[case] args: &[&str], #[case] display: bool) {
        let err = CommandLine::try_parse_from(args).expect_err("parse stops early");
        assert_eq!(is_display_request(&err), display);
    }

    #[rstest]
    fn json_dir_is_required() {
        let err = CommandLine::try_parse_from(["ctbmodules-gen", "hsi"]).expect_err("missing dir");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
