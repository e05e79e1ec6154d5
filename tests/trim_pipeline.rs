//! End-to-end trims through real WAV files on disk.

use std::path::{Path, PathBuf};

use audio_cutter::audio_file::{decode_source, AudioSource};
use audio_cutter::encode::WavFormat;
use audio_cutter::error::INVALID_FILE_TYPE_MESSAGE;
use audio_cutter::region::RegionState;
use audio_cutter::session::EditorSession;
use audio_cutter::trim;
use audio_cutter::worker::{run_load, run_trim, CancelToken, TrimOutput};
use audio_cutter::{CutterError, Region};

/// Writes a 16-bit WAV with a ramp per channel.
fn write_wav(dir: &Path, name: &str, channels: u16, sample_rate: u32, seconds: f64) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    let frames = (seconds * sample_rate as f64) as usize;
    for i in 0..frames {
        for c in 0..channels {
            writer.write_sample(((i % 1000) as i16 - 500) * (c as i16 + 1)).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

fn load(session: &mut EditorSession, path: &Path) {
    let request = session.select_file(path, None).unwrap();
    assert!(session.finish_load(run_load(request)));
}

#[test]
fn ten_second_mono_file_region_two_to_four() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "speech.wav", 1, 44100, 10.0);

    let source = AudioSource::open(&input, None).unwrap();
    let buffer = decode_source(&source, &CancelToken::new()).unwrap();
    assert_eq!(buffer.frames(), 441000);

    let trimmed = trim::trim(&buffer, Region::new(2.0, 4.0), WavFormat::Pcm16).unwrap();
    assert_eq!(trimmed.buffer.frames(), 88200);

    let out = dir.path().join("speech_trimmed.wav");
    trimmed.encoded.write_to(&out).unwrap();
    let reader = hound::WavReader::open(&out).unwrap();
    assert_eq!(reader.duration(), 88200);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().sample_rate, 44100);
}

#[test]
fn download_through_session_keeps_channels_and_rate() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "loop.wav", 2, 22050, 3.0);

    let mut session = EditorSession::new();
    load(&mut session, &input);
    assert_eq!(session.region_state(), RegionState::Full(Region::new(0.0, 3.0)));

    session.set_region(0.5, 1.5);
    let dest = dir.path().join(session.download_file_name());
    let request = session
        .begin_trim(TrimOutput::Download(dest.clone()), WavFormat::Float32)
        .unwrap();
    session.finish_trim(run_trim(request));

    assert_eq!(session.last_download(), Some(dest.as_path()));
    assert_eq!(dest.file_name().unwrap(), "loop_trimmed.wav");
    let reader = hound::WavReader::open(&dest).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_rate, 22050);
    assert_eq!(reader.duration(), 22050);
}

#[test]
fn iterative_cuts_shrink_working_audio() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "take.wav", 1, 8000, 10.0);

    let mut session = EditorSession::new();
    load(&mut session, &input);

    session.set_region(2.0, 8.0);
    let request = session.begin_trim(TrimOutput::Cut, WavFormat::Float32).unwrap();
    assert!(session.finish_trim(run_trim(request)));
    assert_eq!(session.region_state(), RegionState::Full(Region::new(0.0, 6.0)));

    // The cut result is a real file that decodes to the same length.
    let source = session.source().unwrap().clone();
    assert_eq!(source.name(), "take_cut.wav");
    let reloaded = decode_source(&source, &CancelToken::new()).unwrap();
    assert_eq!(reloaded.frames(), 48000);

    session.set_region(1.0, 2.0);
    let request = session.begin_trim(TrimOutput::Cut, WavFormat::Float32).unwrap();
    assert!(session.finish_trim(run_trim(request)));
    assert_eq!(session.buffer().unwrap().frames(), 8000);
    assert!(!source.path().exists());
    assert_eq!(session.download_file_name(), "take_trimmed.wav");
}

#[test]
fn dragging_past_the_ends_clamps_region() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "ten.wav", 1, 8000, 10.0);

    let mut session = EditorSession::new();
    load(&mut session, &input);
    assert_eq!(session.set_region(-1.0, 12.0), Some(Region::new(0.0, 10.0)));

    let request = session.begin_trim(TrimOutput::Cut, WavFormat::Float32).unwrap();
    assert_eq!(request.region, Region::new(0.0, 10.0));
}

#[test]
fn invalid_upload_shows_message_and_keeps_state() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "keep.wav", 1, 8000, 2.0);
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not audio").unwrap();

    let mut session = EditorSession::new();
    load(&mut session, &input);
    session.set_region(0.5, 1.0);

    let err = session.select_file(&notes, Some("text/plain")).unwrap_err();
    assert!(matches!(err, CutterError::InvalidFileType { .. }));
    assert_eq!(session.error(), Some(INVALID_FILE_TYPE_MESSAGE));
    assert_eq!(session.source().unwrap().name(), "keep.wav");
    assert_eq!(session.region(), Some(Region::new(0.5, 1.0)));
}

#[test]
fn corrupt_wav_reports_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.wav");
    std::fs::write(&broken, b"RIFF....WAVEjunkjunkjunk").unwrap();

    let mut session = EditorSession::new();
    let request = session.select_file(&broken, None).unwrap();
    assert!(!session.finish_load(run_load(request)));
    assert!(session.buffer().is_none());
    assert!(session.error().is_some());
}
