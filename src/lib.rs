//! Audio Cutter: select a region of a WAV or MP3 file and cut it out or save it as WAV.
//!
//! The editor GUI lives in [audio_cutter_app]. Everything below it works without a UI:
//! [audio_file] validates and decodes input, [region] models the selection, [trim] extracts
//! and re-encodes it, and [session] ties those together for the editor.

pub mod artifacts;
pub mod audio_buffer;
pub mod audio_cutter_app;
pub mod audio_file;
mod audio_thread;
pub mod config;
pub mod encode;
pub mod error;
pub mod region;
pub mod session;
pub mod trim;
pub mod worker;

pub use audio_buffer::AudioBuffer;
pub use error::{CutterError, Result};
pub use region::Region;
