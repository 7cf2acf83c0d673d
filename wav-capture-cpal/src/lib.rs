//! # wav-capture-cpal
//!
//! Cross-platform microphone backend for wav-capture, built on cpal
//! (WASAPI, CoreAudio, ALSA/PulseAudio/JACK).
//!
//! Provides:
//! - `CpalMicCapture` — `CaptureProvider` over a cpal input stream
//! - `DeviceEnumerator` — input device listing
//!
//! ## Usage
//! ```ignore
//! use wav_capture_cpal::CpalMicCapture;
//! use wav_capture_core::{CaptureConfiguration, Recorder};
//!
//! let config = CaptureConfiguration::default();
//! let mic = CpalMicCapture::from_config(&config);
//! let mut recorder = Recorder::new(mic, config)?;
//! ```

pub mod cpal_mic;
pub mod device_enumerator;

pub use cpal_mic::CpalMicCapture;
pub use device_enumerator::DeviceEnumerator;
