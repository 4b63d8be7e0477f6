//! Audio codec bridge: raw PCM in, WAV container out.
//!
//! The speech endpoint returns headerless signed 16-bit little-endian PCM.
//! [`decode_pcm16`] turns those bytes into a [`SampleBuffer`] of normalised
//! `f32` samples; [`encode_wav`] turns a [`SampleBuffer`] back into a
//! canonical 44-byte-header WAV file for download.
//!
//! | Direction | Negative samples | Non-negative samples |
//! |-----------|------------------|----------------------|
//! | decode    | `i / 32768`      | `i / 32768`          |
//! | encode    | `s * 32768`      | `s * 32767`          |
//!
//! The scale is the usual asymmetric 16-bit signed conversion, and
//! the pair round-trips exactly: `encode(decode(pcm))` reproduces `pcm` in its
//! data chunk bit-for-bit.

use std::io::Cursor;

use thiserror::Error;

/// Sample rate of the remote speech model's PCM output.
pub const SAMPLE_RATE: u32 = 24_000;

/// Size of the canonical RIFF/WAVE header written by [`encode_wav`].
pub const WAV_HEADER_LEN: usize = 44;

/// Bytes per sample for 16-bit PCM.
const BYTES_PER_SAMPLE: usize = 2;

/// WAVE format tag for uncompressed linear PCM.
const FORMAT_PCM: u16 = 1;

const BITS_PER_SAMPLE: u16 = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("channel count must be at least 1")]
    ZeroChannels,
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("{channels} channels at {sample_rate} Hz overflow the WAV byte-rate field")]
    FormatTooLarge { sample_rate: u32, channels: usize },
    #[error("channel {channel} has {len} frames, expected {expected}")]
    RaggedChannels {
        channel: usize,
        len: usize,
        expected: usize,
    },
    #[error("unsupported WAV: {bits}-bit {format:?} (only 16-bit integer PCM is read)")]
    UnsupportedWav {
        bits: u16,
        format: hound::SampleFormat,
    },
    #[error("WAV read error: {0}")]
    Wav(#[from] hound::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// PcmFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Sample rate and channel layout of a headerless PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    sample_rate: u32,
    channels: u16,
}

impl PcmFormat {
    /// Validate a layout. Besides being non-zero, the block align
    /// (`channels × 2`) must fit the 16-bit header field and the byte rate
    /// (`rate × block align`) the 32-bit one.
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, CodecError> {
        if channels == 0 {
            return Err(CodecError::ZeroChannels);
        }
        if sample_rate == 0 {
            return Err(CodecError::ZeroSampleRate);
        }
        let block_align = u64::from(channels) * BYTES_PER_SAMPLE as u64;
        if block_align > u64::from(u16::MAX) || u64::from(sample_rate) * block_align > u64::from(u32::MAX) {
            return Err(CodecError::FormatTooLarge { sample_rate, channels: channels as usize });
        }
        Ok(Self { sample_rate, channels })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// 24 kHz mono: what the speech endpoint produces.
impl Default for PcmFormat {
    fn default() -> Self {
        Self { sample_rate: SAMPLE_RATE, channels: 1 }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SampleBuffer
// ─────────────────────────────────────────────────────────────────────────────

/// Decoded audio: one `Vec<f32>` per channel plus the format it was decoded at.
///
/// Every channel holds exactly [`frame_count`](Self::frame_count) samples.
/// The sample rate and channel count always travel with the data so playback
/// and encoding never have to guess them.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    format: PcmFormat,
    channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// Build a buffer from planar channel data.
    pub fn from_channels(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, CodecError> {
        let count = u16::try_from(channels.len())
            .map_err(|_| CodecError::FormatTooLarge { sample_rate, channels: channels.len() })?;
        let format = PcmFormat::new(sample_rate, count)?;
        let expected = channels[0].len();
        if let Some((channel, ch)) = channels.iter().enumerate().find(|(_, c)| c.len() != expected) {
            return Err(CodecError::RaggedChannels { channel, len: ch.len(), expected });
        }
        Ok(Self { format, channels })
    }

    /// Zero-frame buffer in the given format.
    pub fn empty(format: PcmFormat) -> Self {
        Self {
            format,
            channels: vec![Vec::new(); format.channels as usize],
        }
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.format.channels
    }

    /// Samples per channel.
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Samples of one channel, or `None` if `index` is out of range.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.frame_count() as f32 / self.format.sample_rate as f32
    }

    /// Samples interleaved frame by frame (`L R L R …`), the layout audio
    /// devices and WAV data chunks expect.
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frame_count();
        let mut out = Vec::with_capacity(frames * self.channels.len());
        for i in 0..frames {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decode: PCM16 LE → SampleBuffer
// ─────────────────────────────────────────────────────────────────────────────

/// Decode headerless signed 16-bit little-endian PCM.
///
/// Each integer is divided by 32768, giving `[-1.0, 1.0)`. A trailing partial
/// sample or partial frame is dropped; malformed lengths never fail.
pub fn decode_pcm16(bytes: &[u8], format: PcmFormat) -> SampleBuffer {
    let n_channels = format.channels as usize;
    let frame_bytes = BYTES_PER_SAMPLE * n_channels;
    let frames = bytes.len() / frame_bytes;

    let mut channels: Vec<Vec<f32>> = (0..n_channels).map(|_| Vec::with_capacity(frames)).collect();
    for frame in bytes[..frames * frame_bytes].chunks_exact(frame_bytes) {
        for (ch, sample) in channels.iter_mut().zip(frame.chunks_exact(BYTES_PER_SAMPLE)) {
            let v = i16::from_le_bytes([sample[0], sample[1]]);
            ch.push(v as f32 / 32768.0);
        }
    }

    SampleBuffer { format, channels }
}

// ─────────────────────────────────────────────────────────────────────────────
// Encode: SampleBuffer → WAV
// ─────────────────────────────────────────────────────────────────────────────

/// Quantise one normalised sample to a signed 16-bit integer.
///
/// Negative samples scale by 32768 and truncate toward zero. Non-negative
/// samples scale by 32767 and take the next integer step up, which lands
/// exactly on `i` for every `i / 32768` produced by [`decode_pcm16`] (the
/// product is computed in `f64`, where it is exact).
///
/// Because of the step up, any positive input smaller than one LSB (say
/// `1e-9`) encodes as `1`, not `0`. Only exact zero maps to `0`.
pub fn quantize_sample(s: f32) -> i16 {
    let s = if s.is_nan() { 0.0 } else { f64::from(s.clamp(-1.0, 1.0)) };
    if s < 0.0 {
        (s * 32768.0).trunc() as i16
    } else {
        (s * 32767.0).ceil() as i16
    }
}

/// Encode a [`SampleBuffer`] as a 16-bit PCM WAV file.
///
/// Layout (all integers little-endian):
///
/// | Offset | Field                                  |
/// |--------|----------------------------------------|
/// | 0      | `"RIFF"`, total length − 8             |
/// | 8      | `"WAVE"`                               |
/// | 12     | `"fmt "`, 16, format 1, channels       |
/// | 24     | sample rate, byte rate, block align, 16|
/// | 36     | `"data"`, data length                  |
/// | 44     | interleaved samples                    |
pub fn encode_wav(buffer: &SampleBuffer) -> Vec<u8> {
    let channels = buffer.channel_count();
    let sample_rate = buffer.sample_rate();
    let data_len = buffer.frame_count() * channels as usize * BYTES_PER_SAMPLE;
    let block_align = channels * BYTES_PER_SAMPLE as u16;
    let byte_rate = sample_rate * block_align as u32;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&len_u32(WAV_HEADER_LEN + data_len - 8).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&len_u32(data_len).to_le_bytes());

    for i in 0..buffer.frame_count() {
        for ch in &buffer.channels {
            out.extend_from_slice(&quantize_sample(ch[i]).to_le_bytes());
        }
    }
    out
}

/// RIFF sizes are 32-bit; anything larger saturates (such a file is invalid
/// anyway, but the header stays well-formed).
fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

// ─────────────────────────────────────────────────────────────────────────────
// WAV read-back
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a 16-bit integer PCM WAV (e.g. a saved download) into a
/// [`SampleBuffer`], using the same ÷32768 conversion as [`decode_pcm16`].
pub fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer, CodecError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.bits_per_sample != BITS_PER_SAMPLE || spec.sample_format != hound::SampleFormat::Int {
        return Err(CodecError::UnsupportedWav {
            bits: spec.bits_per_sample,
            format: spec.sample_format,
        });
    }
    let format = PcmFormat::new(spec.sample_rate, spec.channels)?;
    let n_channels = spec.channels as usize;

    // The header's frame count is only a hint: never reserve more than the
    // payload actually present could fill.
    let available = bytes.len().saturating_sub(WAV_HEADER_LEN) / BYTES_PER_SAMPLE / n_channels;
    let hint = (reader.duration() as usize).min(available);
    let mut channels: Vec<Vec<f32>> = (0..n_channels).map(|_| Vec::with_capacity(hint)).collect();
    for (i, sample) in reader.samples::<i16>().enumerate() {
        channels[i % n_channels].push(sample? as f32 / 32768.0);
    }
    // Drop a trailing partial frame, as decode_pcm16 does.
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    for ch in &mut channels {
        ch.truncate(frames);
    }

    Ok(SampleBuffer { format, channels })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
