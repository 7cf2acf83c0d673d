//! Bridge between a platform stream and the block hand-off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::audio_models::AudioSource;
use crate::models::error::CaptureError;
use crate::processing::handoff::BlockSender;
use crate::traits::capture_provider::{BlockCallback, CaptureProvider, StreamErrorCallback};

/// The piece that runs on the real-time thread.
///
/// Cloned into the provider callback. Once the producer is stopped the
/// `attached` flag is cleared and any block still arriving is discarded.
#[derive(Clone)]
pub struct BlockForwarder {
    sender: Arc<BlockSender>,
    attached: Arc<AtomicBool>,
}

impl BlockForwarder {
    /// Hand one quantum to the aggregator, unmodified. Returns `false` when
    /// the block was discarded (detached, or hand-off full).
    pub fn on_block_ready(&self, samples: &[f32]) -> bool {
        if !self.attached.load(Ordering::Acquire) {
            return false;
        }
        self.sender.forward(samples)
    }
}

/// Attaches a [`CaptureProvider`] to a [`BlockSender`].
pub struct FrameProducer<P: CaptureProvider> {
    provider: P,
    attached: Option<Arc<AtomicBool>>,
    on_error: Option<StreamErrorCallback>,
}

impl<P: CaptureProvider> FrameProducer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            attached: None,
            on_error: None,
        }
    }

    /// Handler for stream failures of the next `start`. Failures reported
    /// after `stop` are discarded like late blocks.
    pub fn set_error_callback(&mut self, callback: StreamErrorCallback) {
        self.on_error = Some(callback);
    }

    pub fn is_running(&self) -> bool {
        self.attached.is_some()
    }

    pub fn device_info(&self) -> AudioSource {
        self.provider.device_info()
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Attach to the device and start forwarding blocks into `sender`.
    ///
    /// Returns the stream's native sample rate.
    pub fn start(&mut self, sender: BlockSender) -> Result<u32, CaptureError> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRecording);
        }
        if !self.provider.is_available() {
            return Err(CaptureError::DeviceUnavailable);
        }

        let attached = Arc::new(AtomicBool::new(true));
        let forwarder = BlockForwarder {
            sender: Arc::new(sender),
            attached: Arc::clone(&attached),
        };
        let callback: BlockCallback = Arc::new(move |samples: &[f32]| {
            forwarder.on_block_ready(samples);
        });
        if let Some(on_error) = self.on_error.clone() {
            let attached = Arc::clone(&attached);
            self.provider
                .set_error_callback(Arc::new(move |error: CaptureError| {
                    if attached.load(Ordering::Acquire) {
                        on_error(error);
                    }
                }));
        }

        match self.provider.start(callback) {
            Ok(sample_rate) => {
                log::info!(
                    "frame producer attached to '{}' at {} Hz",
                    self.provider.device_info().name,
                    sample_rate
                );
                self.attached = Some(attached);
                Ok(sample_rate)
            }
            Err(e) => {
                attached.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Detach from the device. Safe to call at any time; a block that has not
    /// been forwarded yet is discarded.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(attached) = self.attached.take() else {
            return Ok(());
        };
        attached.store(false, Ordering::Release);
        self.provider.stop()?;
        log::info!("frame producer detached");
        Ok(())
    }
}
