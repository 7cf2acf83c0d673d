//! JSON sidecar next to a saved recording.
//!
//! `recording_<id>.wav` is described by `recording_<id>.metadata.json`. The
//! sidecar carries the container's length and SHA-256, so a copy of the
//! pair can be checked with [`verify_recording`] before upload.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;
use crate::processing::wav_format;

fn storage_error(action: &'static str) -> impl Fn(io::Error) -> CaptureError {
    move |e| CaptureError::StorageError(format!("failed to {} metadata: {}", action, e))
}

/// Sidecar path for a recording: `recording_x.wav` → `recording_x.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write the sidecar for `recording_path`, replacing any previous one.
///
/// The JSON goes to a temporary file first and is renamed into place, so a
/// reader never sees a half-written sidecar.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), CaptureError> {
    let target = metadata_path(recording_path);
    let staging = target.with_extension("json.tmp");

    let json = serde_json::to_vec_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&staging, json).map_err(storage_error("write"))?;
    fs::rename(&staging, &target).map_err(storage_error("replace"))
}

pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let json = fs::read(metadata_path(recording_path)).map_err(storage_error("read"))?;
    serde_json::from_slice(&json)
        .map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))
}

/// Check a saved recording against its sidecar and return the metadata.
///
/// Fails with `StorageError` when the WAV's length or checksum differs from
/// what the sidecar recorded.
pub fn verify_recording(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let metadata = read_metadata(recording_path)?;
    let bytes = fs::read(recording_path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read recording: {}", e)))?;

    if bytes.len() as u64 != metadata.byte_length {
        return Err(CaptureError::StorageError(format!(
            "{} is {} bytes, sidecar says {}",
            recording_path.display(),
            bytes.len(),
            metadata.byte_length
        )));
    }
    if wav_format::checksum(&bytes) != metadata.checksum {
        return Err(CaptureError::StorageError(format!(
            "{} does not match its sidecar checksum",
            recording_path.display()
        )));
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::SampleBlock;
    use crate::models::recording_session::RecordingSession;

    fn saved_pair(dir: &Path) -> (PathBuf, RecordingMetadata) {
        let mut session = RecordingSession::new(16000).unwrap();
        session.push_block(SampleBlock::new(vec![0.25; 32]));
        let wav = wav_format::encode(session);
        let metadata = RecordingMetadata::for_buffer(&wav, 0, "Desk Mic");

        let path = dir.join("recording_a.wav");
        fs::write(&path, wav.as_bytes()).unwrap();
        write_metadata(&metadata, &path).unwrap();
        (path, metadata)
    }

    #[test]
    fn untouched_pair_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let (path, metadata) = saved_pair(dir.path());

        assert_eq!(verify_recording(&path).unwrap(), metadata);
        assert!(!dir.path().join("recording_a.metadata.json.tmp").exists());
    }

    #[test]
    fn modified_wav_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = saved_pair(dir.path());

        let mut bytes = fs::read(&path).unwrap();
        bytes[50] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            verify_recording(&path),
            Err(CaptureError::StorageError(msg)) if msg.contains("checksum")
        ));

        bytes.truncate(60);
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            verify_recording(&path),
            Err(CaptureError::StorageError(msg)) if msg.contains("bytes")
        ));
    }

    #[test]
    fn rewrite_replaces_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut metadata) = saved_pair(dir.path());

        metadata.dropped_blocks = 7;
        write_metadata(&metadata, &path).unwrap();
        assert_eq!(read_metadata(&path).unwrap().dropped_blocks, 7);
    }

    #[test]
    fn missing_or_garbled_sidecar_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording_b.wav");
        assert!(matches!(read_metadata(&path), Err(CaptureError::StorageError(_))));

        fs::write(metadata_path(&path), "{ not json").unwrap();
        assert!(matches!(read_metadata(&path), Err(CaptureError::StorageError(_))));
    }
}
