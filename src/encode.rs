use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio_buffer::AudioBuffer;
use crate::error::Result;

pub const WAV_MIME: &str = "audio/wav";
pub const WAV_EXTENSION: &str = "wav";

/// Sample encoding of written WAV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WavFormat {
    /// 32-bit IEEE float, lossless for decoded samples.
    #[default]
    Float32,
    /// 16-bit signed integer PCM.
    Pcm16,
}

impl FromStr for WavFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float32" => Ok(WavFormat::Float32),
            "pcm16" => Ok(WavFormat::Pcm16),
            other => Err(format!("unknown WAV format '{}' (expected float32 or pcm16)", other)),
        }
    }
}

impl fmt::Display for WavFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WavFormat::Float32 => write!(f, "float32"),
            WavFormat::Pcm16 => write!(f, "pcm16"),
        }
    }
}

/// An encoded audio file held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub extension: &'static str,
}

impl EncodedAudio {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        log::info!("Wrote {} bytes ({}) to {}", self.bytes.len(), self.mime, path.display());
        Ok(())
    }
}

/// Encodes the buffer as a WAV file with the same channel count and sample rate.
///
/// Samples are clamped to `[-1.0, 1.0]` before writing.
pub fn encode_wav(buffer: &AudioBuffer, format: WavFormat) -> Result<EncodedAudio> {
    let (bits_per_sample, sample_format) = match format {
        WavFormat::Float32 => (32, hound::SampleFormat::Float),
        WavFormat::Pcm16 => (16, hound::SampleFormat::Int),
    };
    let spec = hound::WavSpec {
        channels: buffer.channel_count() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample,
        sample_format,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for sample in buffer.interleaved() {
            let v = sample.clamp(-1.0, 1.0);
            match format {
                WavFormat::Float32 => writer.write_sample(v)?,
                WavFormat::Pcm16 => writer.write_sample((v * i16::MAX as f32).round() as i16)?,
            }
        }
        writer.finalize()?;
    }

    Ok(EncodedAudio {
        bytes: cursor.into_inner(),
        mime: WAV_MIME,
        extension: WAV_EXTENSION,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stereo() -> AudioBuffer {
        AudioBuffer::new(vec![vec![0.5, 1.5, -0.25], vec![-0.5, -3.0, 0.0]], 22050).unwrap()
    }

    #[test]
    fn float_wav_keeps_layout_and_clamps() {
        let encoded = encode_wav(&stereo(), WavFormat::Float32).unwrap();
        assert_eq!(encoded.mime, "audio/wav");

        let mut reader = hound::WavReader::new(Cursor::new(encoded.bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        assert_eq!(reader.duration(), 3);

        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.5, -0.5, 1.0, -1.0, -0.25, 0.0]);
    }

    #[test]
    fn pcm16_wav_scales_samples() {
        let encoded = encode_wav(&stereo(), WavFormat::Pcm16).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(encoded.bytes)).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples[2], i16::MAX);
        assert_eq!(samples[3], -i16::MAX);
        assert_relative_eq!(samples[0] as f32 / i16::MAX as f32, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn format_parses_from_cli_text() {
        assert_eq!("PCM16".parse::<WavFormat>(), Ok(WavFormat::Pcm16));
        assert_eq!("float32".parse::<WavFormat>(), Ok(WavFormat::Float32));
        assert!("mp3".parse::<WavFormat>().is_err());
        assert_eq!(WavFormat::Pcm16.to_string(), "pcm16");
    }
}
