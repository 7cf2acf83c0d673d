//! # wav-capture-core
//!
//! Platform-agnostic microphone capture core.
//!
//! Turns a live mono microphone stream into a self-contained 16-bit PCM WAV
//! buffer. Platform backends (e.g. `wav-capture-cpal`) implement the
//! `CaptureProvider` trait and plug into the generic `Recorder`.
//!
//! ## Architecture
//!
//! ```text
//! wav-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, SampleBlock, RecordingSession
//! ├── processing/   ← FrameProducer, block hand-off, WAV encoding
//! ├── session/      ← Aggregator, Recorder (orchestrator)
//! └── storage/      ← WAV file + JSON metadata sidecar
//! ```
//!
//! ## Usage
//! ```ignore
//! use wav_capture_core::{CaptureConfiguration, Recorder};
//! use wav_capture_cpal::CpalMicCapture;
//!
//! let mut recorder = Recorder::new(CpalMicCapture::default_device(), CaptureConfiguration::default())?;
//! recorder.start_recording()?;
//! // ...
//! let result = recorder.stop_recording()?;
//! upload(result.wav.as_bytes(), &result.metadata.to_json()?);
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioLevels, AudioSource, CaptureDiagnostics, SampleBlock};
pub use models::config::CaptureConfiguration;
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::recording_session::RecordingSession;
pub use models::state::CaptureState;
pub use processing::frame_producer::{BlockForwarder, FrameProducer};
pub use processing::handoff::{block_channel, BlockReceiver, BlockSender, HandoffClosed};
pub use processing::wav_format::{encode, parse_wav, WavBuffer, WavInfo};
pub use session::aggregator::Aggregator;
pub use session::recorder::Recorder;
pub use storage::metadata::verify_recording;
pub use storage::wav_file::{load_recording, save_recording};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_provider::{BlockCallback, CaptureProvider, StreamErrorCallback};
