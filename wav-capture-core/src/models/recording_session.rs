use super::audio_models::SampleBlock;
use super::error::CaptureError;

/// Accumulated audio of one capture.
///
/// Blocks are kept in arrival order, which is also playback order. The sample
/// rate is fixed when the session is created. A session is consumed by the
/// encoder once and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSession {
    sample_rate: u32,
    blocks: Vec<SampleBlock>,
    sample_count: usize,
}

impl RecordingSession {
    pub fn new(sample_rate: u32) -> Result<Self, CaptureError> {
        if sample_rate == 0 {
            return Err(CaptureError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            sample_rate,
            blocks: Vec::new(),
            sample_count: 0,
        })
    }

    pub fn push_block(&mut self, block: SampleBlock) {
        self.sample_count += block.len();
        self.blocks.push(block);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn blocks(&self) -> &[SampleBlock] {
        &self.blocks
    }

    /// Total samples across all blocks.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Iterate every sample in capture order.
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.blocks.iter().flat_map(|b| b.samples().iter().copied())
    }

    pub fn duration_secs(&self) -> f64 {
        self.sample_count as f64 / self.sample_rate as f64
    }
}
