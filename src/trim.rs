//! Region extraction and re-encoding.
//!
//! A trim runs in three steps: the region is copied out of the decoded buffer, the copy is
//! rendered offline into an independent buffer, and that buffer is encoded as WAV.

use rodio::buffer::SamplesBuffer;

use crate::audio_buffer::AudioBuffer;
use crate::encode::{encode_wav, EncodedAudio, WavFormat};
use crate::error::{CutterError, Result};
use crate::region::Region;

/// File name suffix of downloaded regions.
pub const DOWNLOAD_SUFFIX: &str = "_trimmed";
/// File name suffix of cut results that replace the working audio.
pub const CUT_SUFFIX: &str = "_cut";

/// Result of a trim: the rendered region and its encoded file.
#[derive(Debug, Clone)]
pub struct TrimmedAudio {
    pub buffer: AudioBuffer,
    pub encoded: EncodedAudio,
}

/// Copies the sample frames covered by `region` into a new buffer.
///
/// The region is clamped to the buffer duration first and its bounds are converted to frames
/// with `floor(time * sample_rate)`. Channel count and sample rate are preserved.
///
/// # Errors
///
/// [CutterError::EmptyRegion] if the clamped region contains no frame.
pub fn extract_region(buffer: &AudioBuffer, region: Region) -> Result<AudioBuffer> {
    let clamped = region.clamped(buffer.duration_secs());
    let start_frame = buffer.frame_at(clamped.start);
    let end_frame = buffer.frame_at(clamped.end);
    if clamped.is_empty() || end_frame <= start_frame {
        return Err(CutterError::EmptyRegion {
            start: region.start,
            end: region.end,
        });
    }

    let channels = (0..buffer.channel_count())
        .filter_map(|c| buffer.channel(c))
        .map(|data| data[start_frame..end_frame].to_vec())
        .collect();
    AudioBuffer::new(channels, buffer.sample_rate())
}

/// Renders the buffer through a rodio source without real-time pacing.
///
/// The output shares no storage with the input.
pub fn render_offline(buffer: &AudioBuffer) -> Result<AudioBuffer> {
    let source = SamplesBuffer::new(
        buffer.channel_count() as u16,
        buffer.sample_rate(),
        buffer.interleaved(),
    );
    let rendered: Vec<f32> = source.collect();
    AudioBuffer::from_interleaved(&rendered, buffer.channel_count(), buffer.sample_rate())
}

/// Extracts, renders and encodes the region.
pub fn trim(buffer: &AudioBuffer, region: Region, format: WavFormat) -> Result<TrimmedAudio> {
    let extracted = extract_region(buffer, region)?;
    let rendered = render_offline(&extracted)?;
    let encoded = encode_wav(&rendered, format)?;
    log::info!(
        "Trimmed {:.3}s..{:.3}s: {} frames, {} channels, {} bytes",
        region.start,
        region.end,
        rendered.frames(),
        rendered.channel_count(),
        encoded.bytes.len()
    );
    Ok(TrimmedAudio {
        buffer: rendered,
        encoded,
    })
}

/// Builds `<stem><suffix>.<extension>`, e.g. `song_trimmed.wav`.
pub fn output_file_name(stem: &str, suffix: &str, extension: &str) -> String {
    format!("{}{}.{}", stem, suffix, extension)
}
