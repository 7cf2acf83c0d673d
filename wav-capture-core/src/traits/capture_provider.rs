use std::sync::Arc;

use crate::models::audio_models::AudioSource;
use crate::models::error::CaptureError;

/// Callback invoked once per captured quantum with mono f32 samples.
///
/// Runs on the platform's real-time audio thread: implementations must not
/// block, lock, or allocate.
pub type BlockCallback = Arc<dyn Fn(&[f32]) + Send + Sync + 'static>;

/// Callback for failures the platform reports after the stream has started,
/// e.g. the device being unplugged. Must not block.
pub type StreamErrorCallback = Arc<dyn Fn(CaptureError) + Send + Sync + 'static>;

/// Interface for platform-specific microphone sources.
///
/// Implemented by `CpalMicCapture` in `wav-capture-cpal`.
pub trait CaptureProvider: Send + Sync {
    /// Whether an input device is present.
    fn is_available(&self) -> bool;

    /// Install the handler for asynchronous stream failures. Called before
    /// `start`; providers that cannot fail mid-stream may ignore it.
    fn set_error_callback(&mut self, _callback: StreamErrorCallback) {}

    /// Attach to the device and start delivering blocks via `callback`.
    ///
    /// Returns the native sample rate of the opened stream. Fails with
    /// `DeviceUnavailable` when the platform denies or lacks a microphone.
    fn start(&mut self, callback: BlockCallback) -> Result<u32, CaptureError>;

    /// Detach from the device. No callbacks fire after this returns.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Information about the device backing this provider.
    fn device_info(&self) -> AudioSource;
}
