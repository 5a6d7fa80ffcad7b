//! Input schema of the generator.
//!
//! [`GenConfig`] is what users write in configuration files, environment
//! variables and CLI flags. Trigger lists here are overrides: absent lists
//! leave the board defaults from [`super::ctbmodule`] untouched.

use serde::{Deserialize, Serialize};

use super::ctbmodule::{HltTrigger, LltTrigger, RandomTrigger};
use crate::graph::DEFAULT_NETWORK_BASE_PORT;
use crate::{ConfgenError, ConfgenResult};

/// Complete generator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenConfig {
    /// Boot and process-deployment settings.
    pub boot: BootConf,
    /// CTB HSI application settings.
    pub ctb_hsi: CtbHsiConf,
    /// Readout parameters of the HSI data-link handlers.
    pub readout: ReadoutParams,
}

/// Boot and process-deployment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootConf {
    /// Deploys applications on Kubernetes instead of SSH.
    pub use_k8s: bool,
    /// Container image used when `use_k8s` is set.
    pub image: String,
    /// First port assigned to application command interfaces.
    pub base_command_port: u16,
    /// First port assigned to network (pub/sub) connections.
    pub network_base_port: u16,
    /// Port of the run-control response listener.
    pub response_listener_port: u16,
    /// Operational environment label.
    pub op_env: String,
    /// Environment variables forwarded from the launching shell.
    pub capture_env_vars: Vec<String>,
}

impl Default for BootConf {
    fn default() -> Self {
        Self {
            use_k8s: false,
            image: String::new(),
            base_command_port: 3333,
            network_base_port: DEFAULT_NETWORK_BASE_PORT,
            response_listener_port: 56_789,
            op_env: String::from("swtest"),
            capture_env_vars: vec![
                String::from("TIMING_SHARE"),
                String::from("DETCHANNELMAPS_SHARE"),
            ],
        }
    }
}

/// CTB HSI application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CtbHsiConf {
    /// Host running the CTB HSI application; also the board's receiver host.
    pub host_ctb_hsi: String,
    /// High-level trigger overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hlt_triggers: Option<Vec<HltTrigger>>,
    /// Beam low-level trigger overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beam_llt_triggers: Option<Vec<LltTrigger>>,
    /// CRT low-level trigger overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crt_llt_triggers: Option<Vec<LltTrigger>>,
    /// PDS low-level trigger overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pds_llt_triggers: Option<Vec<LltTrigger>>,
    /// Replacement for the first random trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fake_trig_1: Option<RandomTrigger>,
    /// Replacement for the second random trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fake_trig_2: Option<RandomTrigger>,
}

impl Default for CtbHsiConf {
    fn default() -> Self {
        Self {
            host_ctb_hsi: String::from("localhost"),
            hlt_triggers: None,
            beam_llt_triggers: None,
            crt_llt_triggers: None,
            pds_llt_triggers: None,
            fake_trig_1: None,
            fake_trig_2: None,
        }
    }
}

/// Readout parameters of the HSI data-link handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadoutParams {
    /// Source id of the low-level trigger stream.
    pub llt_source_id: u32,
    /// Source id of the high-level trigger stream.
    pub hlt_source_id: u32,
    /// Milliseconds to wait when popping raw input.
    pub queue_pop_wait_ms: u32,
    /// Latency buffer capacity in elements.
    pub latency_buffer_size: u32,
    /// Milliseconds before a data request times out.
    pub data_request_timeout_ms: u32,
}

impl Default for ReadoutParams {
    fn default() -> Self {
        Self {
            llt_source_id: 1,
            hlt_source_id: 2,
            queue_pop_wait_ms: 10,
            latency_buffer_size: 100_000,
            data_request_timeout_ms: 1000,
        }
    }
}

impl GenConfig {
    /// Validates the resolved configuration, reporting every problem at once.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfgenError::Validation`] for a single problem or a
    /// [`ConfgenError::Aggregate`] listing all of them.
    pub fn validate(&self) -> ConfgenResult<()> {
        let mut errors = Vec::new();
        self.boot.collect_errors(&mut errors);
        self.ctb_hsi.collect_errors(&mut errors);
        self.readout.collect_errors(&mut errors);
        ConfgenError::collected(errors)
    }
}

impl BootConf {
    fn collect_errors(&self, errors: &mut Vec<ConfgenError>) {
        if self.base_command_port == 0 {
            errors.push(ConfgenError::validation(
                "boot.base_command_port",
                "must be non-zero",
            ));
        }
        if self.network_base_port == 0 {
            errors.push(ConfgenError::validation(
                "boot.network_base_port",
                "must be non-zero",
            ));
        }
        if self.response_listener_port == 0 {
            errors.push(ConfgenError::validation(
                "boot.response_listener_port",
                "must be non-zero",
            ));
        }
        if self.use_k8s && self.image.trim().is_empty() {
            errors.push(ConfgenError::validation(
                "boot.image",
                "an image is required when use_k8s is set",
            ));
        }
    }
}

impl CtbHsiConf {
    fn collect_errors(&self, errors: &mut Vec<ConfgenError>) {
        if self.host_ctb_hsi.trim().is_empty() {
            errors.push(ConfgenError::validation(
                "ctb_hsi.host_ctb_hsi",
                "must contain visible characters",
            ));
        }
        let hlt_ids = self
            .hlt_triggers
            .iter()
            .flatten()
            .map(|trigger| trigger.id.as_str());
        check_ids("ctb_hsi.hlt_triggers", hlt_ids, errors);
        for (key, list) in [
            ("ctb_hsi.beam_llt_triggers", &self.beam_llt_triggers),
            ("ctb_hsi.crt_llt_triggers", &self.crt_llt_triggers),
            ("ctb_hsi.pds_llt_triggers", &self.pds_llt_triggers),
        ] {
            let ids = list.iter().flatten().map(|trigger| trigger.id.as_str());
            check_ids(key, ids, errors);
        }
    }
}

fn check_ids<'a>(key: &str, ids: impl Iterator<Item = &'a str>, errors: &mut Vec<ConfgenError>) {
    for (index, id) in ids.enumerate() {
        if id.trim().is_empty() {
            errors.push(ConfgenError::validation(
                format!("{key}[{index}].id"),
                "trigger ids must contain visible characters",
            ));
        }
    }
}

impl ReadoutParams {
    fn collect_errors(&self, errors: &mut Vec<ConfgenError>) {
        if self.llt_source_id == self.hlt_source_id {
            errors.push(ConfgenError::validation(
                "readout.hlt_source_id",
                format!(
                    "must differ from readout.llt_source_id ({})",
                    self.llt_source_id
                ),
            ));
        }
        if self.latency_buffer_size == 0 {
            errors.push(ConfgenError::validation(
                "readout.latency_buffer_size",
                "must be non-zero",
            ));
        }
    }
}
