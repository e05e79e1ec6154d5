use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifacts::ArtifactStore;
use crate::audio_buffer::AudioBuffer;
use crate::audio_file::AudioSource;
use crate::encode::{WavFormat, WAV_EXTENSION};
use crate::error::{CutterError, Result};
use crate::region::{Region, RegionState, Selection};
use crate::trim::{output_file_name, CUT_SUFFIX, DOWNLOAD_SUFFIX};
use crate::worker::{CancelToken, LoadOutcome, LoadRequest, TrimOutcome, TrimOutput, TrimRequest};

/// A load that has been requested but not applied yet.
struct PendingLoad {
    generation: u64,
    token: CancelToken,
}

/// Editor state: the working audio, its region and the status of running jobs.
///
/// The session never decodes or encodes by itself. It hands out requests for the worker and
/// applies their outcomes, so that a failed or superseded job leaves the state untouched.
#[derive(Default)]
pub struct EditorSession {
    source: Option<AudioSource>,
    /// Stem of the file the user picked. Cut results keep it.
    original_stem: Option<String>,
    buffer: Option<Arc<AudioBuffer>>,
    selection: Selection,
    pending_load: Option<PendingLoad>,
    next_generation: u64,
    /// Bumped whenever the working buffer is replaced.
    revision: u64,
    /// Revision the running trim was started from.
    processing: Option<u64>,
    artifacts: ArtifactStore,
    last_download: Option<PathBuf>,
    error: Option<String>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a picked file and issues a load for it.
    ///
    /// Any load still in flight is cancelled. An invalid file records the error message and
    /// leaves the current audio untouched.
    pub fn select_file(&mut self, path: &Path, mime: Option<&str>) -> Result<LoadRequest> {
        let source = match AudioSource::open(path, mime) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Rejected {}: {}", path.display(), e);
                self.error = Some(e.user_message());
                return Err(e);
            }
        };
        self.error = None;
        Ok(self.issue_load(source))
    }

    fn issue_load(&mut self, source: AudioSource) -> LoadRequest {
        if let Some(pending) = self.pending_load.take() {
            log::debug!("Superseding load generation {}", pending.generation);
            pending.token.cancel();
        }
        self.next_generation += 1;
        let token = CancelToken::new();
        self.pending_load = Some(PendingLoad {
            generation: self.next_generation,
            token: token.clone(),
        });
        LoadRequest {
            generation: self.next_generation,
            source,
            token,
        }
    }

    /// Applies a finished load. Returns `true` if the working audio changed.
    pub fn finish_load(&mut self, outcome: LoadOutcome) -> bool {
        match &self.pending_load {
            Some(pending) if pending.generation == outcome.generation => {}
            _ => {
                log::debug!("Ignoring stale load generation {}", outcome.generation);
                return false;
            }
        }
        self.pending_load = None;

        match outcome.result {
            Ok(buffer) => {
                self.artifacts.revoke_all();
                self.original_stem = Some(outcome.source.stem());
                self.selection.reset(buffer.duration_secs());
                self.buffer = Some(Arc::new(buffer));
                self.revision += 1;
                self.source = Some(outcome.source);
                self.last_download = None;
                true
            }
            Err(CutterError::Cancelled) => false,
            Err(e) => {
                self.error = Some(e.user_message());
                false
            }
        }
    }

    /// Sets the region, clamped to the loaded audio.
    pub fn set_region(&mut self, start: f64, end: f64) -> Option<Region> {
        self.selection.adjust(start, end)
    }

    pub fn drag_start(&mut self, start: f64) -> Option<Region> {
        self.selection.adjust_start(start)
    }

    pub fn drag_end(&mut self, end: f64) -> Option<Region> {
        self.selection.adjust_end(end)
    }

    /// Prepares a cut or download of the current region.
    ///
    /// # Errors
    ///
    /// [CutterError::NoAudio] without loaded audio, [CutterError::Busy] while another trim runs,
    /// [CutterError::EmptyRegion] if the region is empty. Errors are recorded for display.
    pub fn begin_trim(&mut self, output: TrimOutput, format: WavFormat) -> Result<TrimRequest> {
        let request = self.trim_request(output, format);
        match &request {
            Ok(_) => {
                self.processing = Some(self.revision);
                self.error = None;
            }
            Err(e) => self.error = Some(e.user_message()),
        }
        request
    }

    fn trim_request(&self, output: TrimOutput, format: WavFormat) -> Result<TrimRequest> {
        if self.processing.is_some() {
            return Err(CutterError::Busy);
        }
        let (buffer, region) = match (&self.buffer, self.selection.region()) {
            (Some(buffer), Some(region)) => (Arc::clone(buffer), region),
            _ => return Err(CutterError::NoAudio),
        };
        let clamped = region.clamped(buffer.duration_secs());
        if clamped.is_empty() {
            return Err(CutterError::EmptyRegion {
                start: region.start,
                end: region.end,
            });
        }
        Ok(TrimRequest {
            buffer,
            region: clamped,
            format,
            output,
        })
    }

    /// Applies a finished trim. Returns `true` if the working audio changed.
    pub fn finish_trim(&mut self, outcome: TrimOutcome) -> bool {
        let started_from = self.processing.take();
        match outcome {
            TrimOutcome::Cut(Ok(_)) if started_from != Some(self.revision) => {
                log::info!("Discarding cut of audio that has been replaced meanwhile");
                false
            }
            TrimOutcome::Cut(Ok((buffer, encoded))) => {
                let name = self.cut_file_name();
                let path = match self.artifacts.store(&encoded, &name) {
                    Ok(path) => path,
                    Err(e) => {
                        log::error!("Error during cut operation: {}", e);
                        self.error = Some(e.user_message());
                        return false;
                    }
                };
                match AudioSource::open(&path, Some(encoded.mime)) {
                    Ok(source) => self.source = Some(source),
                    Err(e) => {
                        log::error!("Error during cut operation: {}", e);
                        self.error = Some(e.user_message());
                        return false;
                    }
                }
                log::info!("Cut applied: {:.2}s remain", buffer.duration_secs());
                self.selection.reset(buffer.duration_secs());
                self.buffer = Some(Arc::new(buffer));
                self.revision += 1;
                true
            }
            TrimOutcome::Downloaded(Ok(path)) => {
                self.last_download = Some(path);
                false
            }
            TrimOutcome::Cut(Err(e)) | TrimOutcome::Downloaded(Err(e)) => {
                log::error!("Trim failed: {}", e);
                self.error = Some(e.user_message());
                false
            }
        }
    }

    fn stem(&self) -> String {
        self.original_stem.clone().unwrap_or_else(|| "audio".to_string())
    }

    /// `<original-stem>_trimmed.wav`
    pub fn download_file_name(&self) -> String {
        output_file_name(&self.stem(), DOWNLOAD_SUFFIX, WAV_EXTENSION)
    }

    /// `<original-stem>_cut.wav`
    pub fn cut_file_name(&self) -> String {
        output_file_name(&self.stem(), CUT_SUFFIX, WAV_EXTENSION)
    }

    pub fn source(&self) -> Option<&AudioSource> {
        self.source.as_ref()
    }

    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        self.buffer.as_ref()
    }

    pub fn region(&self) -> Option<Region> {
        self.selection.region()
    }

    pub fn region_state(&self) -> RegionState {
        self.selection.state()
    }

    pub fn duration(&self) -> f64 {
        self.selection.duration()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.is_some()
    }

    pub fn last_download(&self) -> Option<&Path> {
        self.last_download.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_wav;
    use crate::error::INVALID_FILE_TYPE_MESSAGE;

    fn tone(seconds: f64, sample_rate: u32) -> AudioBuffer {
        let frames = (seconds * sample_rate as f64) as usize;
        AudioBuffer::new(vec![vec![0.1; frames]], sample_rate).unwrap()
    }

    fn loaded(path: &str, seconds: f64) -> EditorSession {
        let mut session = EditorSession::new();
        let request = session.select_file(Path::new(path), None).unwrap();
        let changed = session.finish_load(LoadOutcome {
            generation: request.generation,
            source: request.source,
            result: Ok(tone(seconds, 8000)),
        });
        assert!(changed);
        session
    }

    #[test]
    fn load_resets_region_to_full_duration() {
        let mut session = loaded("/music/song.mp3", 10.0);
        assert_eq!(session.region_state(), RegionState::Full(Region::new(0.0, 10.0)));
        session.set_region(2.0, 4.0);

        let request = session.select_file(Path::new("/music/other.wav"), None).unwrap();
        session.finish_load(LoadOutcome {
            generation: request.generation,
            source: request.source,
            result: Ok(tone(6.0, 8000)),
        });
        assert_eq!(session.region_state(), RegionState::Full(Region::new(0.0, 6.0)));
        assert_eq!(session.source().unwrap().name(), "other.wav");
    }

    #[test]
    fn invalid_type_keeps_prior_state() {
        let mut session = loaded("/music/song.mp3", 10.0);
        session.set_region(1.0, 3.0);

        let err = session.select_file(Path::new("/music/cover.png"), None).unwrap_err();
        assert!(matches!(err, CutterError::InvalidFileType { .. }));
        assert_eq!(session.error(), Some(INVALID_FILE_TYPE_MESSAGE));
        assert_eq!(session.source().unwrap().name(), "song.mp3");
        assert_eq!(session.region(), Some(Region::new(1.0, 3.0)));
        assert!(!session.is_loading());
    }

    #[test]
    fn invalid_type_on_empty_session_loads_nothing() {
        let mut session = EditorSession::new();
        assert!(session.select_file(Path::new("song.ogg"), Some("audio/ogg")).is_err());
        assert!(session.buffer().is_none());
        assert_eq!(session.region_state(), RegionState::NoRegion);
    }

    #[test]
    fn newer_selection_cancels_and_outdates_older_load() {
        let mut session = EditorSession::new();
        let first = session.select_file(Path::new("a.wav"), None).unwrap();
        let second = session.select_file(Path::new("b.wav"), None).unwrap();
        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());

        let applied = session.finish_load(LoadOutcome {
            generation: first.generation,
            source: first.source,
            result: Ok(tone(1.0, 8000)),
        });
        assert!(!applied);
        assert!(session.buffer().is_none());
        assert!(session.is_loading());

        assert!(session.finish_load(LoadOutcome {
            generation: second.generation,
            source: second.source,
            result: Ok(tone(2.0, 8000)),
        }));
        assert_eq!(session.source().unwrap().name(), "b.wav");
    }

    #[test]
    fn decode_failure_keeps_previous_audio() {
        let mut session = loaded("/music/song.mp3", 10.0);
        let request = session.select_file(Path::new("/music/broken.wav"), None).unwrap();
        let applied = session.finish_load(LoadOutcome {
            generation: request.generation,
            source: request.source,
            result: Err(CutterError::Decode("bad header".to_string())),
        });
        assert!(!applied);
        assert_eq!(session.source().unwrap().name(), "song.mp3");
        assert_eq!(session.duration(), 10.0);
        assert!(session.error().unwrap().contains("bad header"));
    }

    #[test]
    fn trim_requires_audio_and_non_empty_region() {
        let mut session = EditorSession::new();
        assert!(matches!(
            session.begin_trim(TrimOutput::Cut, WavFormat::Float32),
            Err(CutterError::NoAudio)
        ));

        let mut session = loaded("song.wav", 10.0);
        session.set_region(5.0, 5.0);
        assert!(matches!(
            session.begin_trim(TrimOutput::Cut, WavFormat::Float32),
            Err(CutterError::EmptyRegion { .. })
        ));
        assert!(!session.is_processing());
    }

    #[test]
    fn only_one_trim_at_a_time() {
        let mut session = loaded("song.wav", 10.0);
        let request = session.begin_trim(TrimOutput::Cut, WavFormat::Float32).unwrap();
        assert_eq!(request.region, Region::new(0.0, 10.0));
        assert!(session.is_processing());
        assert!(matches!(
            session.begin_trim(TrimOutput::Cut, WavFormat::Float32),
            Err(CutterError::Busy)
        ));

        session.finish_trim(TrimOutcome::Cut(Err(CutterError::EmptyAudio)));
        assert!(!session.is_processing());
        assert_eq!(session.duration(), 10.0);
    }

    #[test]
    fn cut_replaces_working_audio_and_keeps_original_stem() {
        let mut session = loaded("/music/song.mp3", 10.0);
        session.set_region(2.0, 4.0);
        session.begin_trim(TrimOutput::Cut, WavFormat::Float32).unwrap();

        let clip = tone(2.0, 8000);
        let encoded = encode_wav(&clip, WavFormat::Float32).unwrap();
        assert!(session.finish_trim(TrimOutcome::Cut(Ok((clip, encoded)))));

        assert_eq!(session.region_state(), RegionState::Full(Region::new(0.0, 2.0)));
        let source = session.source().unwrap();
        assert_eq!(source.name(), "song_cut.wav");
        let first_artifact = source.path().to_path_buf();
        assert!(first_artifact.exists());
        assert_eq!(session.download_file_name(), "song_trimmed.wav");

        // A second cut supersedes the first artifact.
        session.set_region(0.5, 1.0);
        session.begin_trim(TrimOutput::Cut, WavFormat::Float32).unwrap();
        let clip = tone(0.5, 8000);
        let encoded = encode_wav(&clip, WavFormat::Float32).unwrap();
        session.finish_trim(TrimOutcome::Cut(Ok((clip, encoded))));
        assert!(!first_artifact.exists());
        assert_eq!(session.source().unwrap().name(), "song_cut.wav");
        assert_eq!(session.duration(), 0.5);
    }

    #[test]
    fn loading_a_new_file_revokes_cut_artifacts() {
        let mut session = loaded("/music/song.mp3", 10.0);
        session.begin_trim(TrimOutput::Cut, WavFormat::Float32).unwrap();
        let clip = tone(1.0, 8000);
        let encoded = encode_wav(&clip, WavFormat::Float32).unwrap();
        session.finish_trim(TrimOutcome::Cut(Ok((clip, encoded))));
        let artifact = session.source().unwrap().path().to_path_buf();

        let request = session.select_file(Path::new("/music/next.wav"), None).unwrap();
        session.finish_load(LoadOutcome {
            generation: request.generation,
            source: request.source,
            result: Ok(tone(3.0, 8000)),
        });
        assert!(!artifact.exists());
        assert_eq!(session.download_file_name(), "next_trimmed.wav");
    }

    #[test]
    fn cut_of_replaced_audio_is_discarded() {
        let mut session = loaded("/music/song.mp3", 10.0);
        session.begin_trim(TrimOutput::Cut, WavFormat::Float32).unwrap();

        let request = session.select_file(Path::new("/music/next.wav"), None).unwrap();
        session.finish_load(LoadOutcome {
            generation: request.generation,
            source: request.source,
            result: Ok(tone(3.0, 8000)),
        });

        let clip = tone(1.0, 8000);
        let encoded = encode_wav(&clip, WavFormat::Float32).unwrap();
        assert!(!session.finish_trim(TrimOutcome::Cut(Ok((clip, encoded)))));
        assert!(!session.is_processing());
        assert_eq!(session.source().unwrap().name(), "next.wav");
        assert_eq!(session.duration(), 3.0);
    }

    #[test]
    fn download_records_path_without_touching_audio() {
        let mut session = loaded("song.wav", 10.0);
        session.set_region(1.0, 2.0);
        session
            .begin_trim(TrimOutput::Download(PathBuf::from("/tmp/song_trimmed.wav")), WavFormat::Pcm16)
            .unwrap();
        let changed = session.finish_trim(TrimOutcome::Downloaded(Ok(PathBuf::from(
            "/tmp/song_trimmed.wav",
        ))));
        assert!(!changed);
        assert_eq!(session.last_download(), Some(Path::new("/tmp/song_trimmed.wav")));
        assert_eq!(session.region(), Some(Region::new(1.0, 2.0)));
    }
}
