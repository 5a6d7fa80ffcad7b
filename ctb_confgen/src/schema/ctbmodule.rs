//! `CTBModule` configuration and the CTB board JSON schema.
//!
//! [`Conf`] is the payload attached to the `CTBModule` DAQ module. Its
//! [`BoardConfig`] is forwarded verbatim to the board, so field names follow
//! the firmware's JSON interface (`HLT`, `randomtrigger_1`, hexadecimal
//! strings for masks and prescales).

use serde::{Deserialize, Serialize};

use super::hex_zero;
use crate::merge::Keyed;

/// Configuration of one `CTBModule` instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conf {
    /// Board configuration forwarded to the CTB.
    pub board_config: BoardConfig,
    /// Hostname of the CTB control interface.
    pub ctb_hostname: String,
    /// TCP port of the CTB control interface.
    pub control_connection_port: u16,
    /// Local TCP port on which the board pushes readout words.
    pub receiver_connection_port: u16,
    /// Capacity of the word buffer, in words.
    pub buffer_size: u32,
    /// Divides the receiver timeout derived from the rollover period.
    pub receiver_timeout_scaling: u32,
    /// Directory for the calibration stream; empty disables it.
    pub calibration_stream_output: String,
    /// Minutes between calibration file rotations.
    pub calibration_update: u32,
    /// Directory for the run trigger report; empty disables it.
    pub run_trigger_output: String,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            board_config: BoardConfig::default(),
            ctb_hostname: String::from("np04-ctb-1"),
            control_connection_port: 8991,
            receiver_connection_port: 8992,
            buffer_size: 5000,
            receiver_timeout_scaling: 1,
            calibration_stream_output: String::new(),
            calibration_update: 5,
            run_trigger_output: String::new(),
        }
    }
}

/// Root of the board JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// The board section.
    pub ctb: Ctb,
}

/// Board section of the board JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ctb {
    /// Socket endpoints the board connects to.
    pub sockets: Sockets,
    /// Random triggers, pulser, timing and miscellaneous switches.
    pub misc: Misc,
    /// High-level trigger definitions.
    #[serde(rename = "HLT")]
    pub hlt: Hlt,
    /// Low-level trigger subsystems.
    pub subsystems: Subsystems,
}

/// Socket endpoints of the board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sockets {
    /// Readout receiver.
    pub receiver: Receiver,
    /// Monitoring stream.
    pub monitor: Monitor,
    /// Statistics stream.
    pub statistics: Statistics,
}

/// Readout receiver endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Receiver {
    /// Timestamp-word period in board clock ticks.
    pub rollover: u32,
    /// Host receiving readout words.
    pub host: String,
    /// Port receiving readout words.
    pub port: u16,
}

impl Default for Receiver {
    fn default() -> Self {
        Self {
            rollover: 125_000,
            host: String::from("localhost"),
            port: 8992,
        }
    }
}

/// Monitoring stream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Monitor {
    /// Enables the monitoring stream.
    pub enable: bool,
    /// Host receiving monitoring packets.
    pub host: String,
    /// Port receiving monitoring packets.
    pub port: u16,
    /// Seconds between monitoring packets.
    pub period: u32,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            enable: false,
            host: String::from("localhost"),
            port: 8993,
            period: 1,
        }
    }
}

/// Statistics stream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    /// Enables the statistics stream.
    pub enable: bool,
    /// Port receiving statistics.
    pub port: u16,
    /// Seconds between statistics updates.
    pub updt_period: u32,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            enable: false,
            port: 8994,
            updt_period: 1,
        }
    }
}

/// Miscellaneous board settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Misc {
    /// First random ("fake") trigger.
    pub randomtrigger_1: RandomTrigger,
    /// Second random ("fake") trigger.
    pub randomtrigger_2: RandomTrigger,
    /// Calibration pulser.
    pub pulser: Pulser,
    /// Timing endpoint settings.
    pub timing: Timing,
    /// Emits channel-status words.
    pub ch_status: bool,
    /// Runs the board without a timing master.
    pub standalone_enable: bool,
}

impl Default for Misc {
    fn default() -> Self {
        Self {
            randomtrigger_1: RandomTrigger::with_description(
                "Random trigger that can optionally be set to fire only during beam spill",
            ),
            randomtrigger_2: RandomTrigger::with_description(
                "Random trigger that can optionally be set to fire only during beam spill",
            ),
            pulser: Pulser::default(),
            timing: Timing::default(),
            ch_status: false,
            standalone_enable: false,
        }
    }
}

/// Random trigger generator. Replaced wholesale when overridden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RandomTrigger {
    /// Free-text description.
    pub description: String,
    /// Enables the generator.
    pub enable: bool,
    /// Fires at a fixed frequency instead of randomly.
    pub fixed_freq: bool,
    /// Restricts firing to the beam spill.
    pub beam_mode: bool,
    /// Period in board clock ticks.
    pub period: u32,
}

impl RandomTrigger {
    fn with_description(description: &str) -> Self {
        Self {
            description: description.to_owned(),
            ..Self::default()
        }
    }
}

impl Default for RandomTrigger {
    fn default() -> Self {
        Self {
            description: String::new(),
            enable: false,
            fixed_freq: true,
            beam_mode: true,
            period: 100_000,
        }
    }
}

/// Calibration pulser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pulser {
    /// Enables the pulser.
    pub enable: bool,
    /// Pulser frequency in Hz.
    pub frequency: u32,
}

impl Default for Pulser {
    fn default() -> Self {
        Self {
            enable: false,
            frequency: 50,
        }
    }
}

/// Timing endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Endpoint address.
    pub address: String,
    /// Partition group.
    pub group: u32,
    /// Forwards triggers to the timing system.
    pub triggers: bool,
    /// Lockout window after a trigger.
    pub lockout: String,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            address: String::from("0xF0"),
            group: 0,
            triggers: true,
            lockout: String::from("0x10"),
        }
    }
}

/// High-level trigger section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hlt {
    /// Ordered high-level trigger definitions.
    pub trigger: Vec<HltTrigger>,
}

impl Default for Hlt {
    fn default() -> Self {
        Self {
            trigger: vec![
                HltTrigger::new("HLT_1", "Random trigger", "0x1", "0x0"),
                HltTrigger::new("HLT_2", "Beam particle trigger", "0x3", "0x0"),
                HltTrigger::new("HLT_3", "CRT coincidence trigger", "0x1800", "0x0"),
                HltTrigger::new("HLT_4", "Photon detector trigger", "0x4000", "0x3"),
            ],
        }
    }
}

/// High-level trigger: a coincidence of low-level triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HltTrigger {
    /// Identifier, unique within the HLT list.
    pub id: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Enables the trigger.
    #[serde(default)]
    pub enable: bool,
    /// Low-level triggers that must be present.
    #[serde(default = "hex_zero")]
    pub minc: String,
    /// Low-level triggers that must be absent.
    #[serde(default = "hex_zero")]
    pub mexc: String,
    /// Prescale factor.
    #[serde(default = "hex_zero")]
    pub prescale: String,
}

impl HltTrigger {
    fn new(id: &str, description: &str, minc: &str, mexc: &str) -> Self {
        Self {
            id: id.to_owned(),
            description: description.to_owned(),
            enable: false,
            minc: minc.to_owned(),
            mexc: mexc.to_owned(),
            prescale: hex_zero(),
        }
    }
}

impl Keyed for HltTrigger {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Low-level trigger on one subsystem's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LltTrigger {
    /// Identifier, unique within the subsystem's list.
    pub id: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Enables the trigger.
    #[serde(default)]
    pub enable: bool,
    /// Input channel mask.
    #[serde(default = "hex_zero")]
    pub mask: String,
    /// Multiplicity comparison type (CRT and PDS only).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Multiplicity threshold (CRT and PDS only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
    /// Prescale factor.
    #[serde(default = "hex_zero")]
    pub prescale: String,
}

impl LltTrigger {
    fn beam(id: &str, description: &str, mask: &str) -> Self {
        Self {
            id: id.to_owned(),
            description: description.to_owned(),
            enable: false,
            mask: mask.to_owned(),
            kind: None,
            count: None,
            prescale: hex_zero(),
        }
    }

    fn counting(id: &str, description: &str, mask: &str, kind: &str, count: &str) -> Self {
        Self {
            kind: Some(kind.to_owned()),
            count: Some(count.to_owned()),
            ..Self::beam(id, description, mask)
        }
    }
}

impl Keyed for LltTrigger {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Low-level trigger subsystems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subsystems {
    /// Photon detection system.
    pub pds: Pds,
    /// Cosmic ray tagger.
    pub crt: Crt,
    /// Beam instrumentation.
    pub beam: Beam,
}

/// Photon detection system inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pds {
    /// Enabled input channels.
    pub channel_mask: String,
    /// Input pulse reshaping length in clock ticks.
    pub reshape_length: u32,
    /// Per-channel input delays.
    pub delays: Vec<u32>,
    /// Per-channel discriminator thresholds.
    pub dac_thresholds: Vec<u32>,
    /// Ordered low-level trigger definitions.
    pub triggers: Vec<LltTrigger>,
}

impl Default for Pds {
    fn default() -> Self {
        Self {
            channel_mask: hex_zero(),
            reshape_length: 5,
            delays: vec![0; 24],
            dac_thresholds: vec![2200; 24],
            triggers: vec![
                LltTrigger::counting("LLT_14", "PDS multiplicity trigger", "0xFFFFFF", "0x1", "0x2"),
                LltTrigger::counting("LLT_15", "PDS single channel trigger", "0x1", "0x1", "0x0"),
            ],
        }
    }
}

/// Cosmic ray tagger inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Crt {
    /// Enabled input channels.
    pub channel_mask: String,
    /// Groups adjacent channels into pixels.
    pub pixelate: bool,
    /// Input pulse reshaping length in clock ticks.
    pub reshape_length: u32,
    /// Per-channel input delays.
    pub delays: Vec<u32>,
    /// Ordered low-level trigger definitions.
    pub triggers: Vec<LltTrigger>,
}

impl Default for Crt {
    fn default() -> Self {
        Self {
            channel_mask: hex_zero(),
            pixelate: false,
            reshape_length: 5,
            delays: vec![0; 32],
            triggers: vec![
                LltTrigger::counting("LLT_11", "CRT upstream panel", "0xFFFF", "0x1", "0x0"),
                LltTrigger::counting("LLT_12", "CRT downstream panel", "0xFFFF0000", "0x1", "0x0"),
            ],
        }
    }
}

/// Beam instrumentation inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Beam {
    /// Enabled input channels.
    pub channel_mask: String,
    /// Input pulse reshaping length in clock ticks.
    pub reshape_length: u32,
    /// Per-channel input delays.
    pub delays: Vec<u32>,
    /// Ordered low-level trigger definitions.
    pub triggers: Vec<LltTrigger>,
}

impl Default for Beam {
    fn default() -> Self {
        Self {
            channel_mask: hex_zero(),
            reshape_length: 5,
            delays: vec![0; 9],
            triggers: vec![
                LltTrigger::beam("LLT_1", "Beam gate", "0x1"),
                LltTrigger::beam("LLT_2", "Beam particle with Cherenkov veto", "0x6"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn board_json_uses_firmware_field_names() {
        let value = serde_json::to_value(BoardConfig::default()).expect("serialise board config");
        assert!(value.pointer("/ctb/HLT/trigger/0/minc").is_some());
        assert!(value.pointer("/ctb/misc/randomtrigger_1/period").is_some());
        assert_eq!(value.pointer("/ctb/sockets/receiver/port"), Some(&json!(8992)));
    }

    #[rstest]
    fn beam_triggers_omit_multiplicity_fields() {
        let beam = serde_json::to_value(Beam::default()).expect("serialise beam");
        let first = beam.pointer("/triggers/0").expect("first beam trigger");
        assert!(first.get("type").is_none());
        assert!(first.get("count").is_none());

        let pds = serde_json::to_value(Pds::default()).expect("serialise pds");
        assert_eq!(pds.pointer("/triggers/0/type"), Some(&json!("0x1")));
    }

    #[rstest]
    fn partial_trigger_definitions_fill_defaults() {
        let trigger: LltTrigger =
            serde_json::from_value(json!({"id": "LLT_20", "enable": true})).expect("trigger");
        assert_eq!(trigger.mask, "0x0");
        assert_eq!(trigger.prescale, "0x0");
        assert!(trigger.kind.is_none());
        assert!(trigger.enable);
    }

    #[rstest]
    fn misspelt_trigger_fields_are_rejected() {
        let result = serde_json::from_value::<LltTrigger>(json!({"id": "LLT_11", "enabled": true}));
        assert!(result.is_err());
        let random = serde_json::from_value::<RandomTrigger>(json!({"periode": 100}));
        assert!(random.is_err());
    }

    #[rstest]
    fn trigger_without_id_is_rejected() {
        let result = serde_json::from_value::<HltTrigger>(json!({"enable": true}));
        assert!(result.is_err());
    }

    #[rstest]
    fn default_lists_have_unique_ids() {
        let board = BoardConfig::default();
        let lists: [Vec<&str>; 4] = [
            board.ctb.hlt.trigger.iter().map(Keyed::key).collect(),
            board.ctb.subsystems.beam.triggers.iter().map(Keyed::key).collect(),
            board.ctb.subsystems.crt.triggers.iter().map(Keyed::key).collect(),
            board.ctb.subsystems.pds.triggers.iter().map(Keyed::key).collect(),
        ];
        for ids in lists {
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), ids.len(), "duplicate ids in {ids:?}");
        }
    }
}
