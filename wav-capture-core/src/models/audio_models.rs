use std::ops::Deref;
use std::sync::Arc;

/// One quantum of captured mono audio.
///
/// Samples are normalized amplitude, nominally in `[-1.0, 1.0]`. A block is
/// immutable once built; cloning shares the underlying storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    samples: Arc<[f32]>,
}

impl SampleBlock {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Vec<f32>> for SampleBlock {
    fn from(samples: Vec<f32>) -> Self {
        Self::new(samples)
    }
}

impl From<&[f32]> for SampleBlock {
    fn from(samples: &[f32]) -> Self {
        Self {
            samples: samples.into(),
        }
    }
}

impl Deref for SampleBlock {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.samples
    }
}

/// An input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Real-time level metering of the most recent block (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub rms_level: f32,
    pub peak_level: f32,
}

impl AudioLevels {
    pub fn measure(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        Self {
            rms_level: (sum_sq / samples.len() as f32).sqrt(),
            peak_level: samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max),
        }
    }
}

/// Counters for debugging a recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub blocks_received: u64,
    pub samples_received: u64,
    /// Blocks the real-time side could not hand off (pool exhausted or queue full).
    pub blocks_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn block_from_slice_keeps_order() {
        let block = SampleBlock::from(&[0.1f32, -0.2, 0.3][..]);
        assert_eq!(block.len(), 3);
        assert_eq!(block.samples(), &[0.1, -0.2, 0.3]);
    }

    #[test]
    fn clone_shares_storage() {
        let block = SampleBlock::new(vec![0.5; 4]);
        let copy = block.clone();
        assert!(Arc::ptr_eq(&block.samples, &copy.samples));
    }

    #[test]
    fn levels_of_constant_signal() {
        let levels = AudioLevels::measure(&[0.5, -0.5, 0.5, -0.5]);
        assert_relative_eq!(levels.rms_level, 0.5, epsilon = 1e-6);
        assert_relative_eq!(levels.peak_level, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn levels_of_silence() {
        assert_eq!(AudioLevels::measure(&[]), AudioLevels::default());
        assert_eq!(AudioLevels::measure(&[0.0; 8]).peak_level, 0.0);
    }
}
