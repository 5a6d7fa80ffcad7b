//! `HSIDataLinkHandler` configuration.

use serde::{Deserialize, Serialize};

/// Configuration of one data-link handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conf {
    /// Readout model settings.
    pub readoutmodelconf: ReadoutModelConf,
    /// Latency buffer sizing.
    pub latencybufferconf: LatencyBufferConf,
    /// Raw data processor settings.
    pub rawdataprocessorconf: RawDataProcessorConf,
    /// Data request handling.
    pub requesthandlerconf: RequestHandlerConf,
}

impl Conf {
    /// Handler configuration for `source_id` with the shared readout knobs.
    #[must_use]
    pub fn for_source(
        source_id: u32,
        queue_pop_wait_ms: u32,
        latency_buffer_size: u32,
        data_request_timeout_ms: u32,
    ) -> Self {
        Self {
            readoutmodelconf: ReadoutModelConf {
                source_queue_timeout_ms: queue_pop_wait_ms,
                source_id,
                send_partial_fragment_if_available: true,
                ..ReadoutModelConf::default()
            },
            latencybufferconf: LatencyBufferConf {
                latency_buffer_size,
                ..LatencyBufferConf::default()
            },
            rawdataprocessorconf: RawDataProcessorConf {
                source_id,
                ..RawDataProcessorConf::default()
            },
            requesthandlerconf: RequestHandlerConf {
                latency_buffer_size,
                pop_limit_pct: 0.8,
                pop_size_pct: 0.1,
                source_id,
                request_timeout_ms: data_request_timeout_ms,
                warn_about_empty_buffer: false,
                enable_raw_recording: false,
                ..RequestHandlerConf::default()
            },
        }
    }
}

/// Readout model settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadoutModelConf {
    /// Milliseconds to wait when popping from the raw input queue.
    pub source_queue_timeout_ms: u32,
    /// Source identifier of the produced fragments.
    pub source_id: u32,
    /// Sends fragments even when the requested window is incomplete.
    pub send_partial_fragment_if_available: bool,
    /// Publishes timesync messages.
    pub timesync_connection_name: String,
}

impl Default for ReadoutModelConf {
    fn default() -> Self {
        Self {
            source_queue_timeout_ms: 2000,
            source_id: 0,
            send_partial_fragment_if_available: false,
            timesync_connection_name: String::new(),
        }
    }
}

/// Latency buffer sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyBufferConf {
    /// Buffer capacity in elements.
    pub latency_buffer_size: u32,
    /// Preallocates the buffer memory.
    pub latency_buffer_preallocation: bool,
}

impl Default for LatencyBufferConf {
    fn default() -> Self {
        Self {
            latency_buffer_size: 100_000,
            latency_buffer_preallocation: false,
        }
    }
}

/// Raw data processor settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDataProcessorConf {
    /// Source identifier of the processed stream.
    pub source_id: u32,
}

/// Data request handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestHandlerConf {
    /// Buffer capacity in elements; mirrors the latency buffer.
    pub latency_buffer_size: u32,
    /// Occupancy fraction above which old data is popped.
    pub pop_limit_pct: f64,
    /// Fraction of the buffer popped at once.
    pub pop_size_pct: f64,
    /// Source identifier answering requests.
    pub source_id: u32,
    /// Milliseconds before an unanswered request times out.
    pub request_timeout_ms: u32,
    /// Warns when a request hits an empty buffer.
    pub warn_about_empty_buffer: bool,
    /// Enables raw recording.
    pub enable_raw_recording: bool,
    /// Raw recording output file.
    pub output_file: String,
}

impl Default for RequestHandlerConf {
    fn default() -> Self {
        Self {
            latency_buffer_size: 100_000,
            pop_limit_pct: 0.5,
            pop_size_pct: 0.8,
            source_id: 0,
            request_timeout_ms: 1000,
            warn_about_empty_buffer: true,
            enable_raw_recording: false,
            output_file: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Conf;
    use rstest::rstest;

    #[rstest]
    fn source_id_reaches_every_section() {
        let conf = Conf::for_source(7, 10, 5000, 250);
        assert_eq!(conf.readoutmodelconf.source_id, 7);
        assert_eq!(conf.rawdataprocessorconf.source_id, 7);
        assert_eq!(conf.requesthandlerconf.source_id, 7);
        assert_eq!(conf.latencybufferconf.latency_buffer_size, 5000);
        assert_eq!(conf.requesthandlerconf.latency_buffer_size, 5000);
        assert_eq!(conf.requesthandlerconf.request_timeout_ms, 250);
        assert_eq!(conf.readoutmodelconf.source_queue_timeout_ms, 10);
        assert!(conf.readoutmodelconf.send_partial_fragment_if_available);
        assert!(!conf.requesthandlerconf.warn_about_empty_buffer);
    }
}
