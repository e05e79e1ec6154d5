//! Configuration for the audio cutter
//!
//! Stored as TOML in the user's config directory.
//! Default location: ~/.config/audio-cutter/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::encode::WavFormat;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutterConfig {
    /// Directory for downloaded regions.
    /// GUI default: the user's downloads folder. CLI default: next to the input file.
    pub output_dir: Option<PathBuf>,
    /// Sample encoding of written WAV files
    pub wav_format: WavFormat,
    /// How often the playback thread checks the cursor against the region (milliseconds)
    pub playback_poll_ms: u64,
}

impl Default for CutterConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            wav_format: WavFormat::default(),
            playback_poll_ms: 100,
        }
    }
}

impl CutterConfig {
    /// Output directory offered by the save dialog.
    pub fn download_dir(&self) -> Option<PathBuf> {
        self.output_dir.clone().or_else(dirs::download_dir)
    }
}

/// Get the default config file path
///
/// Returns: ~/.config/audio-cutter/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("audio-cutter")
        .join("config.toml")
}

/// Load configuration from a TOML file
///
/// If the file doesn't exist, returns default config.
/// If the file exists but is invalid, logs a warning and returns default config.
pub fn load_config(path: &Path) -> CutterConfig {
    if !path.exists() {
        log::info!("load_config: {:?} doesn't exist, using defaults", path);
        return CutterConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents).unwrap_or_else(|e| {
            log::warn!("load_config: Invalid config {:?}: {}, using defaults", path, e);
            CutterConfig::default()
        }),
        Err(e) => {
            log::warn!("load_config: Failed to read {:?}: {}, using defaults", path, e);
            CutterConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<CutterConfig, toml::de::Error> {
    let mut config: CutterConfig = toml::from_str(contents)?;
    config.playback_poll_ms = config.playback_poll_ms.clamp(5, 1000);
    Ok(config)
}
