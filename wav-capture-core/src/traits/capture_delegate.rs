use crate::models::audio_models::AudioLevels;
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;

/// Event delegate for recorder notifications.
///
/// `on_levels_updated` is called from the aggregator thread; the rest are
/// called from whichever thread drives the recorder. Implementations should
/// marshal to a UI thread if needed.
pub trait CaptureDelegate: Send + Sync {
    fn on_state_changed(&self, state: &CaptureState);

    /// Called at most every 100 ms while recording.
    fn on_levels_updated(&self, levels: &AudioLevels);

    fn on_error(&self, error: &CaptureError);

    /// Called once the WAV buffer for a recording has been produced.
    fn on_recording_finished(&self, result: &RecordingResult);
}
