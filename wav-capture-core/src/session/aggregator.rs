use crate::models::audio_models::SampleBlock;
use crate::models::error::CaptureError;
use crate::models::recording_session::RecordingSession;

/// Owns the [`RecordingSession`] for the lifetime of one capture.
///
/// At most one session is open at a time. Not thread-safe on its own; the
/// recorder wraps it in a `parking_lot::Mutex`.
#[derive(Debug, Default)]
pub struct Aggregator {
    session: Option<RecordingSession>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Samples accumulated so far in the open session (0 if none).
    pub fn sample_count(&self) -> usize {
        self.session.as_ref().map_or(0, RecordingSession::sample_count)
    }

    /// Open a new, empty session at `sample_rate`.
    pub fn begin_session(&mut self, sample_rate: u32) -> Result<(), CaptureError> {
        if sample_rate == 0 {
            return Err(CaptureError::InvalidSampleRate(sample_rate));
        }
        if self.session.is_some() {
            return Err(CaptureError::SessionAlreadyActive);
        }
        self.session = Some(RecordingSession::new(sample_rate)?);
        log::debug!("session opened at {} Hz", sample_rate);
        Ok(())
    }

    /// Append `block` after every block received so far.
    pub fn append_block(&mut self, block: SampleBlock) -> Result<(), CaptureError> {
        let session = self.session.as_mut().ok_or(CaptureError::NoActiveSession)?;
        session.push_block(block);
        Ok(())
    }

    /// Close the open session and hand it to the caller.
    pub fn end_session(&mut self) -> Result<RecordingSession, CaptureError> {
        let session = self.session.take().ok_or(CaptureError::NoActiveSession)?;
        log::debug!(
            "session closed: {} blocks, {} samples",
            session.blocks().len(),
            session.sample_count()
        );
        Ok(session)
    }
}
