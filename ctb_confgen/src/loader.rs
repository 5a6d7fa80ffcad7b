//! Layered loading of [`GenConfig`].

use std::sync::Arc;

use camino::Utf8PathBuf;
use figment::Figment;
use serde_json::Value;

use crate::env::ShapedEnv;
use crate::file::load_config_value;
use crate::layers::{LayerSource, LayerStack};
use crate::{ConfgenError, ConfgenResult, GenConfig};

/// Prefix of environment variables read by [`load_gen_config`]. Nested keys
/// are separated by `__`, e.g. `CTBMODULES_GEN_CTB_HSI__HOST_CTB_HSI`.
pub const ENV_PREFIX: &str = "CTBMODULES_GEN_";

/// Inputs layered over the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Configuration file, JSON or TOML.
    pub config_file: Option<Utf8PathBuf>,
    /// Overrides from the command line, shaped like [`GenConfig`]. `null`
    /// means no overrides.
    pub cli: Value,
}

/// Loads the generator configuration with precedence
/// defaults < file < environment < CLI, then validates it.
///
/// Failures in several sources are reported together.
///
/// # Errors
///
/// Returns a [`ConfgenError`] when a source cannot be read, the merged value
/// does not match [`GenConfig`], or validation fails.
pub fn load_gen_config(sources: &ConfigSources) -> ConfgenResult<GenConfig> {
    let mut stack = LayerStack::default();

    let shape = match serde_json::to_value(GenConfig::default()) {
        Ok(defaults) => {
            stack.push(LayerSource::Defaults, defaults.clone());
            defaults
        }
        Err(err) => {
            stack.record_error(ConfgenError::encode("default configuration", err));
            Value::Null
        }
    };

    if let Some(path) = &sources.config_file {
        match load_config_value(path) {
            Ok(value) => {
                tracing::info!(path = %path, "using configuration file");
                stack.push(LayerSource::File(path.clone()), value);
            }
            Err(err) => stack.record_error(err),
        }
    }

    match Figment::from(ShapedEnv::new(ENV_PREFIX, shape)).extract::<Value>() {
        Ok(value) => stack.push(LayerSource::Environment, value),
        Err(err) => stack.record_error(Arc::new(ConfgenError::gathering(err))),
    }

    if !sources.cli.is_null() {
        stack.push(LayerSource::CommandLine, sources.cli.clone());
    }

    let config: GenConfig = stack.resolve()?;
    config.validate()?;
    tracing::debug!(?config, "resolved configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, ensure};
    use rstest::rstest;
    use serde_json::json;
    use test_helpers::figment::{figment_error, with_jail};

    fn sources(config_file: Option<&str>, cli: Value) -> ConfigSources {
        ConfigSources {
            config_file: config_file.map(Utf8PathBuf::from),
            cli,
        }
    }

    #[rstest]
    fn defaults_apply_without_sources() -> Result<()> {
        let config = with_jail(|_| load_gen_config(&ConfigSources::default()).map_err(figment_error))?;
        ensure!(config == GenConfig::default(), "unexpected config {config:?}");
        Ok(())
    }

    #[rstest]
    fn layers_apply_in_precedence_order() -> Result<()> {
        let config = with_jail(|j| {
            j.create_file(
                "ctb.toml",
                "[ctb_hsi]\nhost_ctb_hsi = \"from-file\"\n[boot]\nbase_command_port = 4000\nop_env = \"file\"\n",
            )?;
            j.set_env("CTBMODULES_GEN_CTB_HSI__HOST_CTB_HSI", "from-env");
            j.set_env("CTBMODULES_GEN_BOOT__OP_ENV", "env");
            let cli = json!({"ctb_hsi": {"host_ctb_hsi": "from-cli"}});
            load_gen_config(&sources(Some("ctb.toml"), cli)).map_err(figment_error)
        })?;
        ensure!(config.ctb_hsi.host_ctb_hsi == "from-cli", "cli should win");
        ensure!(config.boot.op_env == "env", "env should beat the file");
        ensure!(config.boot.base_command_port == 4000, "file should beat defaults");
        ensure!(config.boot.network_base_port == 15_000, "defaults should fill gaps");
        Ok(())
    }

    #[rstest]
    fn trigger_overrides_load_from_json() -> Result<()> {
        let config = with_jail(|j| {
            j.create_file(
                "ctb.json",
                r#"{"ctb_hsi": {"crt_llt_triggers": [{"id": "LLT_11", "enable": true}]}}"#,
            )?;
            load_gen_config(&sources(Some("ctb.json"), Value::Null)).map_err(figment_error)
        })?;
        let crt = config.ctb_hsi.crt_llt_triggers.unwrap_or_default();
        ensure!(crt.len() == 1, "expected one override, got {crt:?}");
        ensure!(crt.first().is_some_and(|t| t.enable), "override should be enabled");
        Ok(())
    }

    #[rstest]
    fn numeric_looking_hosts_stay_strings() -> Result<()> {
        let config = with_jail(|j| {
            j.set_env("CTBMODULES_GEN_CTB_HSI__HOST_CTB_HSI", "12345");
            j.set_env("CTBMODULES_GEN_BOOT__BASE_COMMAND_PORT", "4000");
            load_gen_config(&ConfigSources::default()).map_err(figment_error)
        })?;
        ensure!(config.ctb_hsi.host_ctb_hsi == "12345", "host should stay text");
        ensure!(config.boot.base_command_port == 4000, "ports should still parse");
        Ok(())
    }

    #[rstest]
    #[case::file_section(r#"{"ctb_hsi": {"hlt_trigger": [{"id": "HLT_9", "enable": true}]}}"#)]
    #[case::trigger_field(r#"{"ctb_hsi": {"hlt_triggers": [{"id": "HLT_9", "enabled": true}]}}"#)]
    #[case::top_level(r#"{"bot": {"use_k8s": true}}"#)]
    fn misspelt_keys_fail_to_load(#[case] contents: &str) -> Result<()> {
        let err = with_jail(|j| {
            j.create_file("ctb.json", contents)?;
            load_gen_config(&sources(Some("ctb.json"), Value::Null))
                .err()
                .ok_or_else(|| figment_error("expected unknown field error"))
        })?;
        ensure!(matches!(&*err, ConfgenError::Merge(_)), "unexpected error {err}");
        ensure!(err.to_string().contains("unknown field"), "unexpected error {err}");
        Ok(())
    }

    #[rstest]
    fn invalid_values_fail_validation() -> Result<()> {
        let err = with_jail(|j| {
            j.set_env("CTBMODULES_GEN_READOUT__HLT_SOURCE_ID", "1");
            load_gen_config(&ConfigSources::default())
                .err()
                .ok_or_else(|| figment_error("expected validation failure"))
        })?;
        ensure!(
            matches!(&*err, ConfgenError::Validation { key, .. } if key == "readout.hlt_source_id"),
            "unexpected error {err}"
        );
        Ok(())
    }

    #[rstest]
    fn file_and_type_errors_are_reported_together() -> Result<()> {
        let err = with_jail(|j| {
            j.set_env("CTBMODULES_GEN_BOOT__BASE_COMMAND_PORT", "not-a-port");
            load_gen_config(&sources(Some("missing.toml"), Value::Null))
                .err()
                .ok_or_else(|| figment_error("expected failure"))
        })?;
        ensure!(
            matches!(&*err, ConfgenError::Aggregate(errors) if errors.len() == 2),
            "unexpected error {err}"
        );
        Ok(())
    }
}
