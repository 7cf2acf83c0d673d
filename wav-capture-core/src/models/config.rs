/// Configuration for a recorder.
///
/// The sample rate is deliberately absent: it is whatever the device reports
/// when the stream attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfiguration {
    /// Expected samples per block (default: 128). Pooled hand-off buffers are
    /// pre-sized to this, and backends request it as the platform buffer size.
    pub quantum_size: usize,

    /// Number of blocks the producer → aggregator hand-off can hold (default: 256).
    pub handoff_capacity: usize,

    /// Specific microphone device ID, or None for system default.
    pub mic_device_id: Option<String>,

    /// Accept a header-only WAV when a recording captured nothing (default: false).
    pub allow_empty_recording: bool,

    /// How long the aggregator thread waits for a block before re-checking
    /// whether it should exit (default: 20 ms).
    pub drain_interval_ms: u64,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.quantum_size == 0 {
            return Err("quantum size must be positive".into());
        }
        if self.handoff_capacity == 0 {
            return Err("hand-off capacity must be positive".into());
        }
        if self.drain_interval_ms == 0 {
            return Err("drain interval must be positive".into());
        }
        Ok(())
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            quantum_size: 128,
            handoff_capacity: 256,
            mic_device_id: None,
            allow_empty_recording: false,
            drain_interval_ms: 20,
        }
    }
}
