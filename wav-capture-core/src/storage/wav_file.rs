use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::processing::wav_format::{self, WavInfo};

use super::metadata;

/// Persist a finished recording into `directory`.
///
/// Writes `recording_<id>.wav` and its `recording_<id>.metadata.json` sidecar,
/// creating the directory if needed. Returns the WAV path.
pub fn save_recording(result: &RecordingResult, directory: &Path) -> Result<PathBuf, CaptureError> {
    fs::create_dir_all(directory)
        .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;

    let file_path = directory.join(format!("recording_{}.wav", result.metadata.id));
    fs::write(&file_path, result.wav.as_bytes())
        .map_err(|e| CaptureError::StorageError(format!("failed to write recording: {}", e)))?;
    metadata::write_metadata(&result.metadata, &file_path)?;

    log::debug!("saved {} bytes to {}", result.wav.len(), file_path.display());
    Ok(file_path)
}

/// Load a WAV file written by [`save_recording`] and decode its samples.
pub fn load_recording(path: &Path) -> Result<(WavInfo, Vec<f32>), CaptureError> {
    let bytes = fs::read(path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read recording: {}", e)))?;
    wav_format::parse_wav(&bytes)
}
