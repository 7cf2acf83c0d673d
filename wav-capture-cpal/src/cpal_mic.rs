//! cpal microphone capture provider.
//!
//! Opens an input device at its native rate and delivers mono f32 blocks via
//! the `BlockCallback`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SupportedBufferSize};
use crossbeam_channel::bounded;
use parking_lot::Mutex;

use wav_capture_core::models::audio_models::AudioSource;
use wav_capture_core::models::config::CaptureConfiguration;
use wav_capture_core::models::error::CaptureError;
use wav_capture_core::traits::capture_provider::{
    BlockCallback, CaptureProvider, StreamErrorCallback,
};

use crate::device_enumerator::DeviceEnumerator;

/// cpal microphone capture.
///
/// `cpal::Stream` is not `Send`, so the stream is built and owned by a
/// dedicated `cpal-mic-capture` thread that lives until `stop`.
pub struct CpalMicCapture {
    device_id: Option<String>,
    quantum_size: usize,
    on_error: Option<StreamErrorCallback>,
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalMicCapture {
    /// Create a capture for the system default microphone.
    pub fn default_device() -> Self {
        Self::with_device(None, CaptureConfiguration::default().quantum_size)
    }

    /// Create a capture for a specific microphone by device name.
    pub fn with_device(device_id: Option<String>, quantum_size: usize) -> Self {
        Self {
            device_id,
            quantum_size: quantum_size.max(1),
            on_error: None,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
        }
    }

    pub fn from_config(config: &CaptureConfiguration) -> Self {
        Self::with_device(config.mic_device_id.clone(), config.quantum_size)
    }
}

impl CaptureProvider for CpalMicCapture {
    fn is_available(&self) -> bool {
        DeviceEnumerator::new()
            .find_input_device(self.device_id.as_deref())
            .is_some()
    }

    fn set_error_callback(&mut self, callback: StreamErrorCallback) {
        self.on_error = Some(callback);
    }

    fn start(&mut self, callback: BlockCallback) -> Result<u32, CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyRecording);
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let device_id = self.device_id.clone();
        let quantum_size = self.quantum_size;
        let on_error = self.on_error.clone();
        let (ready_tx, ready_rx) = bounded::<Result<u32, CaptureError>>(1);

        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                match open_stream(device_id.as_deref(), quantum_size, callback, on_error) {
                    Ok((stream, sample_rate)) => {
                        let _ = ready_tx.send(Ok(sample_rate));
                        while running.load(Ordering::SeqCst) {
                            thread::sleep(Duration::from_millis(10));
                        }
                        if let Err(e) = stream.pause() {
                            log::debug!("failed to pause mic stream: {}", e);
                        }
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::Unknown(format!("failed to spawn mic thread: {}", e))
            })?;

        let opened = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(CaptureError::Unknown("mic thread exited early".into())));

        match opened {
            Ok(sample_rate) => {
                *self.capture_handle.lock() = Some(handle);
                Ok(sample_rate)
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.lock().take() {
            handle
                .join()
                .map_err(|_| CaptureError::Unknown("mic thread panicked".into()))?;
        }
        Ok(())
    }

    fn device_info(&self) -> AudioSource {
        let name = match &self.device_id {
            Some(id) => id.clone(),
            None => DeviceEnumerator::new()
                .default_input_device_name()
                .unwrap_or_else(|| "Default Microphone".into()),
        };
        AudioSource {
            id: self.device_id.clone().unwrap_or_else(|| "default-mic".into()),
            name,
            is_default: self.device_id.is_none(),
        }
    }
}

/// Open and start an input stream. Returns the stream and its native rate.
///
/// Runs on the capture thread.
fn open_stream(
    device_id: Option<&str>,
    quantum_size: usize,
    callback: BlockCallback,
    on_error: Option<StreamErrorCallback>,
) -> Result<(cpal::Stream, u32), CaptureError> {
    let device = DeviceEnumerator::new()
        .find_input_device(device_id)
        .ok_or(CaptureError::DeviceUnavailable)?;

    let supported = device.default_input_config().map_err(|e| {
        log::error!("no usable input config: {}", e);
        CaptureError::DeviceUnavailable
    })?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let mut config = supported.config();
    if let SupportedBufferSize::Range { min, max } = supported.buffer_size() {
        let frames = quantum_size as u32;
        if (*min..=*max).contains(&frames) {
            config.buffer_size = BufferSize::Fixed(frames);
        }
    }

    let mut folder = MonoFolder::new(channels, quantum_size);
    let on_stream_error = stream_error_handler(on_error);
    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| callback(folder.fold(data, |s| s)),
            on_stream_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                callback(folder.fold(data, |s| s as f32 / 32_768.0))
            },
            on_stream_error,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                callback(folder.fold(data, |s| (s as f32 - 32_768.0) / 32_768.0))
            },
            on_stream_error,
            None,
        ),
        other => {
            return Err(CaptureError::ConfigurationFailed(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| {
        log::error!("failed to build input stream: {}", e);
        CaptureError::DeviceUnavailable
    })?;

    stream.play().map_err(|e| {
        log::error!("failed to start input stream: {}", e);
        CaptureError::DeviceUnavailable
    })?;

    log::info!(
        "mic stream open: {} Hz, {} channel(s), {:?}",
        sample_rate,
        channels,
        config.buffer_size
    );
    Ok((stream, sample_rate))
}

fn stream_error_handler(
    on_error: Option<StreamErrorCallback>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        log::error!("mic stream error: {}", err);
        if let Some(cb) = &on_error {
            cb(stream_error(err));
        }
    }
}

fn stream_error(err: cpal::StreamError) -> CaptureError {
    match err {
        cpal::StreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        other => CaptureError::StreamError(other.to_string()),
    }
}

/// Converts interleaved device frames to mono f32 in a reusable scratch
/// buffer, so the audio callback does not allocate.
///
/// Multi-channel frames are averaged; a single-channel stream passes through.
struct MonoFolder {
    channels: usize,
    scratch: Vec<f32>,
}

impl MonoFolder {
    fn new(channels: usize, quantum_size: usize) -> Self {
        Self {
            channels: channels.max(1),
            scratch: Vec::with_capacity(quantum_size),
        }
    }

    fn fold<T: Copy>(&mut self, data: &[T], convert: impl Fn(T) -> f32) -> &[f32] {
        self.scratch.clear();
        if self.channels == 1 {
            self.scratch.extend(data.iter().map(|&s| convert(s)));
        } else {
            let scale = 1.0 / self.channels as f32;
            self.scratch.extend(
                data.chunks_exact(self.channels)
                    .map(|frame| frame.iter().map(|&s| convert(s)).sum::<f32>() * scale),
            );
        }
        &self.scratch
    }
}
