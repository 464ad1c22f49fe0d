//! Clip formats, encoding negotiation, and sample conversion

use crate::{Error, Result};

/// Container/codec combinations a recording session may produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipFormat {
    /// Opus in a `WebM` container
    OpusWebm,
    /// Opus in an Ogg container
    OpusOgg,
    /// PCM WAV
    Wav,
}

impl ClipFormat {
    /// Container tag that travels with the clip so the server can pick a
    /// matching decode path
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::OpusWebm => "webm",
            Self::OpusOgg => "ogg",
            Self::Wav => "wav",
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::OpusWebm => "audio/webm",
            Self::OpusOgg => "audio/ogg",
            Self::Wav => "audio/wav",
        }
    }

    /// Whether an encoder for this format is available in this build
    ///
    /// Only the WAV encoder ships in-tree; the opus slots become
    /// reachable once an opus encoder is wired in.
    #[must_use]
    pub const fn encoder_available(self) -> bool {
        matches!(self, Self::Wav)
    }
}

/// Preference-ordered encoding candidates, most preferred first
pub const ENCODING_PREFERENCES: [ClipFormat; 3] =
    [ClipFormat::OpusWebm, ClipFormat::OpusOgg, ClipFormat::Wav];

/// Commit to the first preference with an available encoder
///
/// WAV is the guaranteed-available fallback, so negotiation always
/// succeeds.
#[must_use]
pub fn negotiate_format() -> ClipFormat {
    ENCODING_PREFERENCES
        .into_iter()
        .find(|f| f.encoder_available())
        .unwrap_or(ClipFormat::Wav)
}

/// The materialized result of a finished recording session
///
/// Immutable bytes plus the format tag. Ownership transfers by value
/// through capture, bridge, and network; it is never shared.
#[derive(Debug, Clone)]
pub struct AudioClip {
    bytes: Vec<u8>,
    format: ClipFormat,
}

impl AudioClip {
    #[must_use]
    pub const fn new(bytes: Vec<u8>, format: ClipFormat) -> Self {
        Self { bytes, format }
    }

    /// The distinguished empty-clip marker for a session that collected
    /// no chunks; downstream stages read this as "no speech", not a fault
    #[must_use]
    pub const fn empty(format: ClipFormat) -> Self {
        Self {
            bytes: Vec::new(),
            format,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub const fn format(&self) -> ClipFormat {
        self.format
    }

    /// Consume the clip, yielding its bytes and format tag
    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, ClipFormat) {
        (self.bytes, self.format)
    }
}

/// Convert f32 samples to 16-bit WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Resample mono audio between rates using rubato
///
/// # Errors
///
/// Returns error if the resampler cannot be constructed or fails
#[allow(clippy::cast_possible_truncation)]
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let chunk_size = 1024;
    let sub_chunks = 2;

    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, sub_chunks, 1)
            .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let input: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();

    let mut output = Vec::new();
    for chunk in input.chunks(chunk_size) {
        if chunk.len() == chunk_size {
            let result = resampler
                .process(&[chunk.to_vec()], None)
                .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
            output.extend_from_slice(&result[0]);
        }
    }

    Ok(output.iter().map(|&s| s as f32).collect())
}
