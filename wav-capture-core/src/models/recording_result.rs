use serde::{Deserialize, Serialize};

use crate::processing::wav_format::WavBuffer;

use super::error::CaptureError;

/// Result returned when a recording is stopped and encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub wav: WavBuffer,
    pub metadata: RecordingMetadata,
}

impl RecordingResult {
    pub fn duration_secs(&self) -> f64 {
        self.metadata.duration_secs
    }
}

/// Metadata describing an encoded recording.
///
/// Serializable for JSON upload alongside the WAV body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub sample_rate: u32,
    pub sample_count: u64,
    pub duration_secs: f64,
    pub byte_length: u64,
    pub checksum: String,
    pub dropped_blocks: u64,
    pub device_name: String,
}

impl RecordingMetadata {
    /// Describe a freshly encoded buffer.
    pub fn for_buffer(wav: &WavBuffer, dropped_blocks: u64, device_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            sample_rate: wav.sample_rate(),
            sample_count: wav.sample_count() as u64,
            duration_secs: wav.duration_secs(),
            byte_length: wav.len() as u64,
            checksum: wav.checksum(),
            dropped_blocks,
            device_name: device_name.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, CaptureError> {
        serde_json::to_string(self)
            .map_err(|e| CaptureError::Unknown(format!("failed to serialize metadata: {}", e)))
    }
}
