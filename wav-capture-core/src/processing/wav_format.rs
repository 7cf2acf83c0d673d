//! WAV container utilities.
//!
//! Serializes a [`RecordingSession`] into a canonical 44-byte-header,
//! single-channel, 16-bit PCM RIFF/WAVE buffer, and reads such buffers back.

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::models::recording_session::RecordingSession;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;
pub const BLOCK_ALIGN: u16 = CHANNELS * BITS_PER_SAMPLE / 8;

/// Largest even `data_size` whose RIFF chunk size (`36 + data_size`) still
/// fits in a u32. About 12.4 hours of mono PCM16 at 48 kHz.
pub const MAX_DATA_SIZE: u32 = (u32::MAX - 36) & !1;

const NEGATIVE_SCALE: f32 = 0x8000 as f32;
const POSITIVE_SCALE: f32 = 0x7FFF as f32;

/// Generate a 44-byte mono PCM16 header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  1 (channels)
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * block_align
/// [32-33]  block_align = 2
/// [34-35]  16 (bits per sample)
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
///
/// Size fields saturate: a `data_size` above [`MAX_DATA_SIZE`] is written as
/// `MAX_DATA_SIZE`.
pub fn generate_wav_header(sample_rate: u32, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate.saturating_mul(BLOCK_ALIGN as u32);
    let data_size = data_size.min(MAX_DATA_SIZE);
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&BLOCK_ALIGN.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Convert a normalized sample to signed 16-bit PCM.
///
/// Clamps to `[-1.0, 1.0]`, then scales negatives by 32768 and everything
/// else by 32767 so that -1.0 maps to `i16::MIN` without overflow. The
/// product is truncated toward zero (float → int cast), so 0.5 becomes
/// 16383, not 16384. NaN becomes 0.
pub fn quantize_sample(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * NEGATIVE_SCALE) as i16
    } else {
        (clamped * POSITIVE_SCALE) as i16
    }
}

/// Inverse of [`quantize_sample`], up to quantization error.
pub fn dequantize_sample(value: i16) -> f32 {
    if value < 0 {
        value as f32 / NEGATIVE_SCALE
    } else {
        value as f32 / POSITIVE_SCALE
    }
}

/// `data_size` header field for `sample_count` samples, pinned at
/// [`MAX_DATA_SIZE`] when the payload outgrows the 32-bit RIFF fields.
pub fn data_size_for(sample_count: usize) -> u32 {
    let bytes = (sample_count as u64).saturating_mul(BLOCK_ALIGN as u64);
    u32::try_from(bytes).map_or(MAX_DATA_SIZE, |size| size.min(MAX_DATA_SIZE))
}

/// Serialize a finished session into a WAV buffer.
///
/// Never fails; an empty session produces a header-only buffer. Every
/// sample is written even past [`MAX_DATA_SIZE`]; the header size fields then
/// saturate instead of wrapping, and [`parse_wav`] rejects the result.
pub fn encode(session: RecordingSession) -> WavBuffer {
    let sample_rate = session.sample_rate();
    let sample_count = session.sample_count();
    let data_size = data_size_for(sample_count);

    let mut bytes = Vec::with_capacity(WAV_HEADER_SIZE + sample_count * BLOCK_ALIGN as usize);
    bytes.extend_from_slice(&generate_wav_header(sample_rate, data_size));
    for sample in session.samples() {
        bytes.extend_from_slice(&quantize_sample(sample).to_le_bytes());
    }

    WavBuffer {
        bytes,
        sample_rate,
        sample_count,
    }
}

/// A complete, immutable RIFF/WAVE container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavBuffer {
    bytes: Vec<u8>,
    sample_rate: u32,
    sample_count: usize,
}

impl WavBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn duration_secs(&self) -> f64 {
        self.sample_count as f64 / self.sample_rate as f64
    }

    /// Lowercase hex SHA-256 of the whole container.
    pub fn checksum(&self) -> String {
        checksum(&self.bytes)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn checksum(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

impl AsRef<[u8]> for WavBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Header fields of a parsed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub data_size: u32,
}

/// Parse a buffer in the layout produced by [`encode`] and decode its samples.
pub fn parse_wav(bytes: &[u8]) -> Result<(WavInfo, Vec<f32>), CaptureError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(CaptureError::MalformedWav(format!(
            "{} bytes is shorter than the header",
            bytes.len()
        )));
    }

    let u16_at = |offset: usize| u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
    let u32_at = |offset: usize| {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    };

    let expect_tag = |range: std::ops::Range<usize>, tag: &[u8; 4]| {
        if &bytes[range.clone()] == tag {
            Ok(())
        } else {
            Err(CaptureError::MalformedWav(format!(
                "expected {:?} at offset {}",
                String::from_utf8_lossy(tag),
                range.start
            )))
        }
    };
    expect_tag(0..4, b"RIFF")?;
    expect_tag(8..12, b"WAVE")?;
    expect_tag(12..16, b"fmt ")?;
    expect_tag(36..40, b"data")?;

    if u32_at(16) != 16 || u16_at(20) != 1 {
        return Err(CaptureError::MalformedWav("not a plain PCM fmt chunk".into()));
    }
    if u16_at(22) != CHANNELS || u16_at(34) != BITS_PER_SAMPLE || u16_at(32) != BLOCK_ALIGN {
        return Err(CaptureError::MalformedWav(format!(
            "unsupported layout: {} channel(s), {} bits",
            u16_at(22),
            u16_at(34)
        )));
    }

    let info = WavInfo {
        sample_rate: u32_at(24),
        byte_rate: u32_at(28),
        data_size: u32_at(40),
    };
    if info.sample_rate == 0 {
        return Err(CaptureError::MalformedWav("sample rate is zero".into()));
    }

    let data = &bytes[WAV_HEADER_SIZE..];
    if data.len() != info.data_size as usize
        || data.len() % 2 != 0
        || u32_at(4) as usize != bytes.len() - 8
    {
        return Err(CaptureError::MalformedWav(format!(
            "size fields disagree with {} byte buffer",
            bytes.len()
        )));
    }

    let samples = data
        .chunks_exact(2)
        .map(|pair| dequantize_sample(i16::from_le_bytes([pair[0], pair[1]])))
        .collect();
    Ok((info, samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::SampleBlock;
    use approx::assert_abs_diff_eq;

    fn session_of(sample_rate: u32, blocks: &[&[f32]]) -> RecordingSession {
        let mut session = RecordingSession::new(sample_rate).unwrap();
        for block in blocks {
            session.push_block(SampleBlock::from(*block));
        }
        session
    }

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn header_size_is_44_bytes() {
        assert_eq!(generate_wav_header(48000, 0).len(), WAV_HEADER_SIZE);
    }

    #[test]
    fn header_magic_and_fixed_fields() {
        let header = generate_wav_header(48000, 9600);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");

        assert_eq!(u32_at(&header, 16), 16);
        assert_eq!(u16_at(&header, 20), 1);
        assert_eq!(u16_at(&header, 22), 1);
        assert_eq!(u32_at(&header, 24), 48000);
        assert_eq!(u32_at(&header, 28), 96000);
        assert_eq!(u16_at(&header, 32), 2);
        assert_eq!(u16_at(&header, 34), 16);
        assert_eq!(u32_at(&header, 40), 9600);
        assert_eq!(u32_at(&header, 4), 36 + 9600);
    }

    #[test]
    fn boundary_quantization() {
        assert_eq!(quantize_sample(1.0), 32767);
        assert_eq!(quantize_sample(-1.0), -32768);
        assert_eq!(quantize_sample(1.5), 32767);
        assert_eq!(quantize_sample(-2.0), -32768);
        assert_eq!(quantize_sample(0.0), 0);
        assert_eq!(quantize_sample(-0.0), 0);
    }

    #[test]
    fn quantization_truncates_toward_zero() {
        assert_eq!(quantize_sample(0.5), 16383);
        assert_eq!(quantize_sample(-0.5), -16384);
        // 0.00002 * 32767 = 0.655..., -0.00002 * 32768 = -0.655...
        assert_eq!(quantize_sample(0.00002), 0);
        assert_eq!(quantize_sample(-0.00002), 0);
    }

    #[test]
    fn nan_quantizes_to_zero() {
        assert_eq!(quantize_sample(f32::NAN), 0);
    }

    #[test]
    fn reference_scenario_44100() {
        let wav = encode(session_of(44100, &[&[0.0, 0.5, -0.5, 1.0]]));
        let bytes = wav.as_bytes();

        assert_eq!(bytes.len(), 52);
        assert_eq!(u32_at(bytes, 24), 44100);
        assert_eq!(u32_at(bytes, 28), 88200);
        assert_eq!(u32_at(bytes, 40), 8);
        assert_eq!(u32_at(bytes, 4), 44);
        assert_eq!(
            &bytes[44..],
            &[0x00, 0x00, 0xFF, 0x3F, 0x00, 0xC0, 0xFF, 0x7F]
        );
    }

    #[test]
    fn empty_session_is_header_only() {
        let wav = encode(RecordingSession::new(48000).unwrap());
        let bytes = wav.as_bytes();

        assert_eq!(bytes.len(), 44);
        assert_eq!(u32_at(bytes, 40), 0);
        assert_eq!(u32_at(bytes, 4), 36);
        assert_eq!(wav.sample_count(), 0);
    }

    #[test]
    fn oversized_payload_saturates_size_fields() {
        assert_eq!(data_size_for(1000), 2000);
        assert_eq!(data_size_for(MAX_DATA_SIZE as usize / 2), MAX_DATA_SIZE);
        assert_eq!(data_size_for(1 << 31), MAX_DATA_SIZE);
        assert_eq!(data_size_for(usize::MAX), MAX_DATA_SIZE);

        let header = generate_wav_header(48000, u32::MAX);
        assert_eq!(u32_at(&header, 40), MAX_DATA_SIZE);
        assert_eq!(u32_at(&header, 4), MAX_DATA_SIZE + 36);
        assert_eq!(MAX_DATA_SIZE % 2, 0);
    }

    #[test]
    fn length_and_derived_fields_track_input() {
        let cases: Vec<(u32, Vec<Vec<f32>>)> = vec![
            (1, vec![vec![0.3]]),
            (8000, vec![vec![0.1, 0.2], vec![], vec![0.3]]),
            (44100, vec![vec![0.1; 1000], vec![0.1; 200]]),
            (192000, vec![vec![-1.0, 1.0, 0.0]]),
        ];

        for (rate, blocks) in cases {
            let total: usize = blocks.iter().map(|b| b.len()).sum();
            let slices: Vec<&[f32]> = blocks.iter().map(|b| b.as_slice()).collect();
            let wav = encode(session_of(rate, &slices));
            let bytes = wav.as_bytes();

            assert_eq!(bytes.len(), 44 + 2 * total, "rate {}", rate);
            assert_eq!(&bytes[0..4], b"RIFF");
            assert_eq!(&bytes[8..12], b"WAVE");
            assert_eq!(u32_at(bytes, 28), rate * 2);
            assert_eq!(u16_at(bytes, 32), 2);
            assert_eq!(u16_at(bytes, 34), 16);
            assert_eq!(u16_at(bytes, 22), 1);
        }
    }

    #[test]
    fn samples_follow_block_order() {
        let wav = encode(session_of(8000, &[&[1.0], &[-1.0], &[0.0]]));
        assert_eq!(
            &wav.as_bytes()[44..],
            &[0xFF, 0x7F, 0x00, 0x80, 0x00, 0x00]
        );
    }

    #[test]
    fn decode_reproduces_input_within_one_step() {
        let input: Vec<f32> = (0..2001).map(|i| (i as f32 / 1000.0) - 1.0).collect();
        let wav = encode(session_of(22050, &[&input[..]]));

        let (info, decoded) = parse_wav(wav.as_bytes()).unwrap();
        assert_eq!(info.sample_rate, 22050);
        assert_eq!(info.byte_rate, 44100);
        assert_eq!(decoded.len(), input.len());
        for (original, restored) in input.iter().zip(&decoded) {
            assert_abs_diff_eq!(*original, *restored, epsilon = 1.0 / 32767.0 + 1e-6);
        }
    }

    #[test]
    fn parse_rejects_foreign_layouts() {
        let wav = encode(session_of(16000, &[&[0.1, 0.2]]));

        let mut stereo = wav.as_bytes().to_vec();
        stereo[22] = 2;
        assert!(matches!(parse_wav(&stereo), Err(CaptureError::MalformedWav(_))));

        let mut truncated = wav.as_bytes().to_vec();
        truncated.pop();
        assert!(matches!(parse_wav(&truncated), Err(CaptureError::MalformedWav(_))));

        assert!(matches!(parse_wav(b"RIFF"), Err(CaptureError::MalformedWav(_))));
    }

    #[test]
    fn checksum_is_stable_sha256_hex() {
        let a = encode(session_of(16000, &[&[0.1, 0.2]]));
        let b = encode(session_of(16000, &[&[0.1, 0.2]]));
        let c = encode(session_of(16000, &[&[0.1, 0.3]]));

        assert_eq!(a.checksum(), b.checksum());
        assert_ne!(a.checksum(), c.checksum());
        assert_eq!(a.checksum().len(), 64);
        assert!(a.checksum().chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
