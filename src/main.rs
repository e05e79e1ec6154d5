use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use audio_cutter::audio_cutter_app;
use audio_cutter::audio_file::{decode_source, AudioSource};
use audio_cutter::config::{self, CutterConfig};
use audio_cutter::encode::{WavFormat, WAV_EXTENSION};
use audio_cutter::trim::{self, DOWNLOAD_SUFFIX};
use audio_cutter::worker::CancelToken;
use audio_cutter::Region;
use clap::{Parser, Subcommand};
use eframe::egui;

#[derive(Parser)]
#[command(name = "audio-cutter", about = "Cut a region out of a WAV or MP3 file")]
struct Cli {
    /// Config file (default: ~/.config/audio-cutter/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Trim a file without opening the editor
    Trim {
        /// Input WAV or MP3 file
        input: PathBuf,

        /// Region start in seconds
        #[arg(long, allow_negative_numbers = true)]
        start: f64,

        /// Region end in seconds
        #[arg(long, allow_negative_numbers = true)]
        end: f64,

        /// Output file (default: <stem>_trimmed.wav in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sample encoding of the output
        #[arg(long, value_parser = ["float32", "pcm16"])]
        format: Option<String>,
    },
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path);

    match cli.command {
        None => run_editor(config),
        Some(Command::Trim {
            input,
            start,
            end,
            output,
            format,
        }) => {
            let format = match format {
                Some(text) => text.parse::<WavFormat>().map_err(|e| anyhow!(e))?,
                None => config.wav_format,
            };
            let written = trim_file(&config, &input, Region::new(start, end), output, format)?;
            println!("{}", written.display());
            Ok(())
        }
    }
}

fn run_editor(config: CutterConfig) -> Result<()> {
    let window_options = eframe::NativeOptions {
        // Viewport is an area in which the objects are going to be rendered (i.e. native window)
        viewport: egui::ViewportBuilder::default()
            .with_min_inner_size([600.0, 360.0])
            .with_inner_size([800.0, 420.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Audio Cutter",
        window_options,
        Box::new(|_cc| Ok(Box::new(audio_cutter_app::AudioCutterApp::new(config)))),
    )
    .map_err(|e| anyhow!("editor failed: {}", e))
}

/// Validates, decodes and trims `input`, then writes the region as WAV.
fn trim_file(
    config: &CutterConfig,
    input: &std::path::Path,
    region: Region,
    output: Option<PathBuf>,
    format: WavFormat,
) -> Result<PathBuf> {
    let source = AudioSource::open(input, None)?;
    let buffer = decode_source(&source, &CancelToken::new())
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let clamped = region.clamped(buffer.duration_secs());
    if clamped != region {
        log::warn!(
            "Region {:.3}s..{:.3}s clamped to {:.3}s..{:.3}s",
            region.start,
            region.end,
            clamped.start,
            clamped.end
        );
    }
    let trimmed = trim::trim(&buffer, clamped, format)?;

    let dest = match output {
        Some(path) => path,
        None => {
            let dir = config
                .output_dir
                .clone()
                .or_else(|| input.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));
            dir.join(trim::output_file_name(
                &source.stem(),
                DOWNLOAD_SUFFIX,
                WAV_EXTENSION,
            ))
        }
    };
    trimmed
        .encoded
        .write_to(&dest)
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(dest)
}
