use super::error::CaptureError;
use super::recording_result::RecordingResult;

/// Recorder state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopping → completed → idle
///            ↓           ↓
///          failed      failed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Recording { duration_secs: f64 },
    Stopping,
    Completed(Box<RecordingResult>),
    Failed(CaptureError),
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }

    /// Returns the current duration if in a state that tracks it.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Recording { duration_secs } => Some(*duration_secs),
            Self::Completed(result) => Some(result.duration_secs()),
            _ => None,
        }
    }
}
