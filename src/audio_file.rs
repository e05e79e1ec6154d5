use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use rodio::Source;

use crate::audio_buffer::AudioBuffer;
use crate::error::{CutterError, Result};
use crate::worker::CancelToken;

/// Number of decoded samples between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1 << 16;

/// Audio containers accepted by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    Wav,
    Mp3,
}

impl AudioKind {
    /// Maps a MIME type to an accepted kind. Parameters after `;` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some(AudioKind::Wav),
            "audio/mp3" | "audio/mpeg" => Some(AudioKind::Mp3),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "wav" | "wave" => Some(AudioKind::Wav),
            "mp3" => Some(AudioKind::Mp3),
            _ => None,
        }
    }

    /// Extensions offered by the file dialog.
    pub fn dialog_extensions() -> &'static [&'static str] {
        &["mp3", "wav"]
    }
}

/// An audio file picked by the user, or a cut result re-opened as the working source.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    path: PathBuf,
    name: String,
    kind: AudioKind,
}

impl AudioSource {
    /// Validates the file type and creates a source.
    ///
    /// # Parameters
    ///
    /// * `path` - location of the audio file.
    /// * `mime` - MIME type reported by the platform (drag-and-drop), if any. When present and
    ///   non-empty it takes precedence over the file extension.
    pub fn open(path: &Path, mime: Option<&str>) -> Result<Self> {
        let kind = match mime.map(str::trim).filter(|m| !m.is_empty()) {
            Some(mime) => AudioKind::from_mime(mime).ok_or_else(|| CutterError::InvalidFileType {
                path: path.to_path_buf(),
                detail: format!("unsupported MIME type {}", mime),
            })?,
            None => AudioKind::from_path(path).ok_or_else(|| CutterError::InvalidFileType {
                path: path.to_path_buf(),
                detail: "expected a .wav or .mp3 file".to_string(),
            })?,
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            path: path.to_path_buf(),
            name,
            kind,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AudioKind {
        self.kind
    }

    /// File name without its extension, used to name outputs.
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "audio".to_string())
    }
}

/// Decodes the whole source into a planar buffer.
pub fn decode_source(source: &AudioSource, token: &CancelToken) -> Result<AudioBuffer> {
    let file = File::open(source.path())?;
    log::debug!("Decoding {} ({:?})", source.name(), source.kind());
    decode_reader(BufReader::new(file), token)
}

/// Decodes any seekable byte stream rodio understands.
///
/// # Errors
///
/// [CutterError::Cancelled] if `token` is cancelled while decoding, [CutterError::EmptyAudio] if
/// no complete frame was decoded.
pub fn decode_reader<R>(reader: R, token: &CancelToken) -> Result<AudioBuffer>
where
    R: Read + Seek + Send + Sync + 'static,
{
    let decoder = rodio::Decoder::new(reader).map_err(|e| CutterError::Decode(e.to_string()))?;
    let channel_count = decoder.channels() as usize;
    let sample_rate = decoder.sample_rate();
    if channel_count == 0 || sample_rate == 0 {
        return Err(CutterError::Decode(format!(
            "unusable stream: {} channels at {} Hz",
            channel_count, sample_rate
        )));
    }

    let mut samples = Vec::new();
    for (i, sample) in decoder.enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 && token.is_cancelled() {
            return Err(CutterError::Cancelled);
        }
        samples.push(sample);
    }
    if token.is_cancelled() {
        return Err(CutterError::Cancelled);
    }
    if samples.len() < channel_count {
        return Err(CutterError::EmptyAudio);
    }

    let buffer = AudioBuffer::from_interleaved(&samples, channel_count, sample_rate)?;
    log::debug!(
        "Decoded {} frames, {} channels at {} Hz",
        buffer.frames(),
        buffer.channel_count(),
        buffer.sample_rate()
    );
    Ok(buffer)
}
