use std::path::PathBuf;

/// Message shown to the user when a picked file is not an accepted audio type.
pub const INVALID_FILE_TYPE_MESSAGE: &str =
    "Invalid file type. Please upload the correct audio file.";

/// Errors produced by the audio cutter library.
#[derive(Debug, thiserror::Error)]
pub enum CutterError {
    /// The picked file is neither WAV nor MP3.
    #[error("invalid file type for {path}: {detail}")]
    InvalidFileType { path: PathBuf, detail: String },

    /// The decoder could not read the audio data.
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// Decoding succeeded but produced no sample frames.
    #[error("audio contains no samples")]
    EmptyAudio,

    /// Buffer construction with inconsistent channel data.
    #[error("invalid audio buffer: {0}")]
    InvalidBuffer(String),

    /// The selected region covers no sample frames after clamping.
    #[error("selected region {start:.3}s..{end:.3}s is empty")]
    EmptyRegion { start: f64, end: f64 },

    #[error("no audio loaded")]
    NoAudio,

    /// A cut or download is still in progress.
    #[error("another operation is still processing")]
    Busy,

    #[error("failed to encode WAV: {0}")]
    Encode(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The job was superseded before it finished.
    #[error("operation cancelled")]
    Cancelled,
}

impl CutterError {
    /// Text for the error banner in the editor.
    pub fn user_message(&self) -> String {
        match self {
            CutterError::InvalidFileType { .. } => INVALID_FILE_TYPE_MESSAGE.to_string(),
            other => {
                let text = other.to_string();
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => text,
                }
            }
        }
    }
}

/// Convenience alias so callers can write `Result<T>` instead of `Result<T, CutterError>`.
pub type Result<T> = std::result::Result<T, CutterError>;
