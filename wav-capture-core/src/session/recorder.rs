use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;

use crate::models::audio_models::{AudioLevels, AudioSource, CaptureDiagnostics, SampleBlock};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::CaptureState;
use crate::processing::frame_producer::FrameProducer;
use crate::processing::handoff::{block_channel, BlockReceiver, HandoffClosed};
use crate::processing::wav_format;
use crate::session::aggregator::Aggregator;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::CaptureProvider;

const LEVELS_INTERVAL: Duration = Duration::from_millis(100);

/// Internal mutable recorder state, protected by `parking_lot::Mutex`.
struct RecorderState {
    state: CaptureState,
    levels: AudioLevels,
    diagnostics: CaptureDiagnostics,
    sample_rate: u32,
}

impl RecorderState {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            levels: AudioLevels::default(),
            diagnostics: CaptureDiagnostics::default(),
            sample_rate: 0,
        }
    }

    fn captured_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.diagnostics.samples_received as f64 / self.sample_rate as f64
    }
}

/// Microphone → WAV recorder.
///
/// Data flow:
/// ```text
/// [Provider callback] → [FrameProducer] → [hand-off] → [aggregator thread] → [Aggregator]
///                                                                                 ↓ stop
///                                                                      [wav_format::encode]
/// ```
pub struct Recorder<P: CaptureProvider> {
    producer: FrameProducer<P>,
    config: CaptureConfiguration,
    aggregator: Arc<Mutex<Aggregator>>,
    shared: Arc<Mutex<RecorderState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,

    receiver: Option<Arc<BlockReceiver>>,
    drain_running: Arc<AtomicBool>,
    drain_handle: Option<thread::JoinHandle<()>>,
}

impl<P: CaptureProvider> Recorder<P> {
    pub fn new(provider: P, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            producer: FrameProducer::new(provider),
            config,
            aggregator: Arc::new(Mutex::new(Aggregator::new())),
            shared: Arc::new(Mutex::new(RecorderState::new())),
            delegate: None,
            receiver: None,
            drain_running: Arc::new(AtomicBool::new(false)),
            drain_handle: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.shared.lock().state.clone()
    }

    pub fn current_levels(&self) -> AudioLevels {
        self.shared.lock().levels
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        let mut diagnostics = self.shared.lock().diagnostics;
        if let Some(receiver) = &self.receiver {
            diagnostics.blocks_dropped = receiver.dropped_blocks();
        }
        diagnostics
    }

    pub fn available_audio_sources(&self) -> Vec<AudioSource> {
        if self.producer.is_available() {
            vec![self.producer.device_info()]
        } else {
            Vec::new()
        }
    }

    /// Start recording. Transitions: idle → recording.
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.receiver.is_some()
            || matches!(
                self.shared.lock().state,
                CaptureState::Recording { .. } | CaptureState::Stopping
            )
        {
            return Err(CaptureError::AlreadyRecording);
        }

        let (sender, receiver) =
            block_channel(self.config.handoff_capacity, self.config.quantum_size);

        // One slot: the first stream failure is the one reported.
        let (fault_tx, fault_rx) = bounded::<CaptureError>(1);
        self.producer.set_error_callback(Arc::new(move |error: CaptureError| {
            let _ = fault_tx.try_send(error);
        }));

        let sample_rate = match self.producer.start(sender) {
            Ok(rate) => rate,
            Err(e) => {
                self.notify_error(&e);
                return Err(e);
            }
        };

        let begun = self.aggregator.lock().begin_session(sample_rate);
        if let Err(e) = begun {
            self.stop_producer();
            self.notify_error(&e);
            return Err(e);
        }

        {
            let mut s = self.shared.lock();
            s.levels = AudioLevels::default();
            s.diagnostics = CaptureDiagnostics::default();
            s.sample_rate = sample_rate;
        }

        let receiver = Arc::new(receiver);
        if let Err(e) = self.start_drain_thread(Arc::clone(&receiver), fault_rx) {
            self.stop_producer();
            let _ = self.aggregator.lock().end_session();
            self.notify_error(&e);
            return Err(e);
        }
        self.receiver = Some(receiver);

        self.set_state(CaptureState::Recording { duration_secs: 0.0 });
        Ok(())
    }

    /// Stop recording, encode what was captured, return the result.
    /// Transitions: recording → stopping → completed → idle.
    ///
    /// Also valid after a stream failure moved the state to `Failed`: the
    /// samples captured before the failure are still encoded.
    pub fn stop_recording(&mut self) -> Result<RecordingResult, CaptureError> {
        if self.receiver.is_none() {
            return Err(CaptureError::NoActiveSession);
        }

        self.set_state(CaptureState::Stopping);
        let dropped_blocks = self.halt_capture();
        let device_name = self.producer.device_info().name;

        let ended = self.aggregator.lock().end_session();
        let session = match ended {
            Ok(session) => session,
            Err(e) => return Err(self.fail(e)),
        };

        if session.is_empty() && !self.config.allow_empty_recording {
            return Err(self.fail(CaptureError::EmptyRecording));
        }

        let wav = wav_format::encode(session);
        let metadata = RecordingMetadata::for_buffer(&wav, dropped_blocks, &device_name);
        log::info!(
            "recording {} finished: {} samples at {} Hz, {} bytes, {} blocks dropped",
            metadata.id,
            metadata.sample_count,
            metadata.sample_rate,
            metadata.byte_length,
            dropped_blocks
        );

        let result = RecordingResult { wav, metadata };
        self.set_state(CaptureState::Completed(Box::new(result.clone())));

        if let Some(ref delegate) = self.delegate {
            delegate.on_recording_finished(&result);
        }

        // Reset for next recording
        self.shared.lock().state = CaptureState::Idle;

        Ok(result)
    }

    /// Stop recording and discard everything captured.
    pub fn cancel_recording(&mut self) -> Result<(), CaptureError> {
        if self.receiver.is_none() {
            return Err(CaptureError::NoActiveSession);
        }

        self.set_state(CaptureState::Stopping);
        self.halt_capture();
        let ended = self.aggregator.lock().end_session();
        let discarded = ended.map_err(|e| self.fail(e))?;
        log::info!("recording cancelled, {} samples discarded", discarded.sample_count());

        self.set_state(CaptureState::Idle);
        Ok(())
    }

    // --- Internal helpers ---

    fn set_state(&self, new_state: CaptureState) {
        {
            let mut s = self.shared.lock();
            s.state = new_state.clone();
        }
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    fn notify_error(&self, error: &CaptureError) {
        log::error!("recorder error: {}", error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }

    /// Record a failure, notify, and return to idle so a new recording can start.
    fn fail(&self, error: CaptureError) -> CaptureError {
        self.set_state(CaptureState::Failed(error.clone()));
        self.notify_error(&error);
        self.shared.lock().state = CaptureState::Idle;
        error
    }

    fn stop_producer(&mut self) {
        if let Err(e) = self.producer.stop() {
            log::warn!("failed to stop capture provider: {}", e);
        }
    }

    /// Detach the producer, join the aggregator thread, and append whatever
    /// was already handed off. Returns the dropped-block total.
    fn halt_capture(&mut self) -> u64 {
        self.stop_producer();

        self.drain_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.drain_handle.take() {
            if handle.join().is_err() {
                log::error!("aggregator thread panicked");
            }
        }

        let Some(receiver) = self.receiver.take() else {
            return 0;
        };
        while let Some(block) = receiver.try_recv() {
            ingest_block(block, &self.aggregator, &self.shared);
        }

        let dropped = receiver.dropped_blocks();
        self.shared.lock().diagnostics.blocks_dropped = dropped;
        if dropped > 0 {
            log::warn!("{} blocks dropped during hand-off", dropped);
        }
        dropped
    }

    /// Start the thread that moves blocks from the hand-off into the session.
    fn start_drain_thread(
        &mut self,
        receiver: Arc<BlockReceiver>,
        faults: Receiver<CaptureError>,
    ) -> Result<(), CaptureError> {
        self.drain_running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.drain_running);
        let aggregator = Arc::clone(&self.aggregator);
        let shared = Arc::clone(&self.shared);
        let delegate = self.delegate.clone();
        let interval = Duration::from_millis(self.config.drain_interval_ms);

        let handle = thread::Builder::new()
            .name("wav-aggregator".into())
            .spawn(move || {
                let mut last_levels = Instant::now();
                let mut handoff_open = true;
                while running.load(Ordering::SeqCst) {
                    if let Ok(error) = faults.try_recv() {
                        report_stream_error(error, &shared, delegate.as_deref());
                    }

                    if !handoff_open {
                        // No block can arrive any more; only a stream fault or stop.
                        match faults.recv_timeout(interval) {
                            Ok(error) => report_stream_error(error, &shared, delegate.as_deref()),
                            Err(RecvTimeoutError::Timeout) => {}
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                        continue;
                    }

                    let block = match receiver.recv_timeout(interval) {
                        Ok(Some(block)) => block,
                        Ok(None) => continue,
                        Err(HandoffClosed) => {
                            log::debug!("capture provider released its block callback");
                            handoff_open = false;
                            continue;
                        }
                    };
                    ingest_block(block, &aggregator, &shared);

                    if last_levels.elapsed() >= LEVELS_INTERVAL {
                        last_levels = Instant::now();
                        let levels = {
                            let mut s = shared.lock();
                            if s.state.is_recording() {
                                let duration_secs = s.captured_secs();
                                s.state = CaptureState::Recording { duration_secs };
                            }
                            s.levels
                        };
                        if let Some(ref d) = delegate {
                            d.on_levels_updated(&levels);
                        }
                    }
                }
            })
            .map_err(|e| {
                self.drain_running.store(false, Ordering::SeqCst);
                CaptureError::Unknown(format!("failed to spawn aggregator thread: {}", e))
            })?;

        self.drain_handle = Some(handle);
        Ok(())
    }
}

impl<P: CaptureProvider> Drop for Recorder<P> {
    fn drop(&mut self) {
        if self.producer.is_running() || self.drain_handle.is_some() {
            self.halt_capture();
        }
    }
}

/// Move a recording to `Failed` after the platform stream broke. The session
/// stays open until the caller stops or cancels.
fn report_stream_error(
    error: CaptureError,
    shared: &Mutex<RecorderState>,
    delegate: Option<&dyn CaptureDelegate>,
) {
    log::error!("capture stream failed: {}", error);
    let failed = CaptureState::Failed(error.clone());
    {
        let mut s = shared.lock();
        if !s.state.is_recording() {
            return;
        }
        s.state = failed.clone();
    }
    if let Some(d) = delegate {
        d.on_state_changed(&failed);
        d.on_error(&error);
    }
}

/// Append one block to the open session and update metering.
fn ingest_block(block: SampleBlock, aggregator: &Mutex<Aggregator>, shared: &Mutex<RecorderState>) {
    let levels = AudioLevels::measure(&block);
    let samples = block.len() as u64;

    if let Err(e) = aggregator.lock().append_block(block) {
        log::warn!("block arrived without an open session: {}", e);
        return;
    }

    let mut s = shared.lock();
    s.levels = levels;
    s.diagnostics.blocks_received += 1;
    s.diagnostics.samples_received += samples;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::capture_provider::BlockCallback;

    struct SilentMic;

    impl CaptureProvider for SilentMic {
        fn is_available(&self) -> bool {
            true
        }

        fn start(&mut self, _callback: BlockCallback) -> Result<u32, CaptureError> {
            Ok(16000)
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn device_info(&self) -> AudioSource {
            AudioSource {
                id: "silent".into(),
                name: "Silent".into(),
                is_default: true,
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CaptureConfiguration {
            quantum_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            Recorder::new(SilentMic, config),
            Err(CaptureError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn state_round_trip() {
        let mut recorder = Recorder::new(SilentMic, CaptureConfiguration::default()).unwrap();
        assert!(recorder.state().is_idle());

        recorder.start_recording().unwrap();
        assert!(recorder.state().is_recording());
        assert_eq!(recorder.state().duration(), Some(0.0));

        recorder.cancel_recording().unwrap();
        assert!(recorder.state().is_idle());
    }

    #[test]
    fn stop_while_idle_is_rejected() {
        let mut recorder = Recorder::new(SilentMic, CaptureConfiguration::default()).unwrap();
        assert!(matches!(
            recorder.stop_recording(),
            Err(CaptureError::NoActiveSession)
        ));
        assert_eq!(
            recorder.cancel_recording(),
            Err(CaptureError::NoActiveSession)
        );
    }

    #[test]
    fn levels_follow_latest_block() {
        let aggregator = Mutex::new(Aggregator::new());
        let shared = Mutex::new(RecorderState::new());
        aggregator.lock().begin_session(8).unwrap();

        ingest_block(SampleBlock::new(vec![0.5, -0.5]), &aggregator, &shared);
        ingest_block(SampleBlock::new(vec![0.25; 6]), &aggregator, &shared);

        let s = shared.lock();
        assert_eq!(s.levels.peak_level, 0.25);
        assert_eq!(s.diagnostics.blocks_received, 2);
        assert_eq!(s.diagnostics.samples_received, 8);
    }
}
