use thiserror::Error;

/// Errors that can occur during capture, aggregation, or WAV handling.
///
/// All variants are returned synchronously at the point of misuse; nothing
/// here is retried by the library.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Microphone permission denied, or no input device present.
    #[error("device not available")]
    DeviceUnavailable,

    /// `start` called on a producer that is already attached to a stream.
    #[error("already recording")]
    AlreadyRecording,

    /// `append_block` / `end_session` without an open session.
    #[error("no active session")]
    NoActiveSession,

    /// `begin_session` while a previous session is still open.
    #[error("a session is already active")]
    SessionAlreadyActive,

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// A session ended with zero samples and the configuration does not
    /// accept header-only containers.
    #[error("recording contains no samples")]
    EmptyRecording,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("malformed wav: {0}")]
    MalformedWav(String),

    #[error("storage error: {0}")]
    StorageError(String),

    /// Asynchronous failure reported by the platform stream.
    #[error("stream error: {0}")]
    StreamError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}
