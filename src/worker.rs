use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SendError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::audio_buffer::AudioBuffer;
use crate::audio_file::{decode_source, AudioSource};
use crate::encode::{EncodedAudio, WavFormat};
use crate::error::{CutterError, Result};
use crate::region::Region;
use crate::trim;

/// Cancellation flag shared between the requester and a background job.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Request to decode a newly picked file.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Increases with every file selection; results of older generations are stale.
    pub generation: u64,
    pub source: AudioSource,
    pub token: CancelToken,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub source: AudioSource,
    pub result: Result<AudioBuffer>,
}

/// Where a trimmed region goes.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutput {
    /// Replace the working audio with the region.
    Cut,
    /// Write the region to this file.
    Download(PathBuf),
}

#[derive(Debug, Clone)]
pub struct TrimRequest {
    pub buffer: Arc<AudioBuffer>,
    pub region: Region,
    pub format: WavFormat,
    pub output: TrimOutput,
}

#[derive(Debug)]
pub enum TrimOutcome {
    Cut(Result<(AudioBuffer, EncodedAudio)>),
    Downloaded(Result<PathBuf>),
}

/// Work handed to the background thread.
pub enum Job {
    Load(LoadRequest),
    Trim(TrimRequest),
}

pub enum JobResult {
    Load(LoadOutcome),
    Trim(TrimOutcome),
}

/// Struct that owns and controls the thread decoding and trimming audio off the UI thread.
pub struct Worker {
    /// Handle is wrapped in [Option] for joining when [Worker] is dropped.
    thread_handle: Option<JoinHandle<()>>,
    jobs_sender: Option<Sender<Job>>,
    results_receiver: Receiver<JobResult>,
}

impl Worker {
    /// Spawns the worker thread.
    ///
    /// # Parameters
    ///
    /// * `notify` - called after every finished job, e.g. to repaint the UI.
    ///
    /// # Errors
    ///
    /// Fails if the OS cannot create the thread.
    pub fn spawn<F>(notify: F) -> std::io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (jobs_sender, jobs_receiver) = std::sync::mpsc::channel::<Job>();
        let (results_sender, results_receiver) = std::sync::mpsc::channel::<JobResult>();

        let thread_handle = std::thread::Builder::new()
            .name("cutter-worker".to_string())
            .spawn(move || run_jobs(jobs_receiver, results_sender, notify))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            jobs_sender: Some(jobs_sender),
            results_receiver,
        })
    }

    pub fn send(&self, job: Job) -> std::result::Result<(), SendError<Job>> {
        match self.jobs_sender.as_ref() {
            Some(sender) => sender.send(job),
            None => Err(SendError(job)),
        }
    }

    /// Returns a finished job, if any, without blocking.
    pub fn try_recv(&self) -> Option<JobResult> {
        match self.results_receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Worker thread is gone");
                None
            }
        }
    }

    /// Blocks until the next finished job. `None` once the thread has exited.
    pub fn recv(&self) -> Option<JobResult> {
        self.results_receiver.recv().ok()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Disconnecting the jobs channel ends the thread loop
        drop(self.jobs_sender.take());
        if let Some(thread) = self.thread_handle.take() {
            if thread.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }
    }
}

fn run_jobs<F: Fn()>(jobs: Receiver<Job>, results: Sender<JobResult>, notify: F) {
    while let Ok(job) = jobs.recv() {
        let result = match job {
            Job::Load(request) => JobResult::Load(run_load(request)),
            Job::Trim(request) => JobResult::Trim(run_trim(request)),
        };
        if results.send(result).is_err() {
            return;
        }
        notify();
    }
    log::debug!("Worker thread exiting");
}

/// Decodes a picked file. Cancelled requests are not decoded at all.
pub fn run_load(request: LoadRequest) -> LoadOutcome {
    let LoadRequest {
        generation,
        source,
        token,
    } = request;
    let result = if token.is_cancelled() {
        Err(CutterError::Cancelled)
    } else {
        decode_source(&source, &token)
    };
    match &result {
        Ok(buffer) => log::info!(
            "Loaded {}: {:.2}s, {} channels at {} Hz",
            source.name(),
            buffer.duration_secs(),
            buffer.channel_count(),
            buffer.sample_rate()
        ),
        Err(CutterError::Cancelled) => log::info!("Loading {} was aborted", source.name()),
        Err(e) => log::error!("Error loading {}: {}", source.name(), e),
    }
    LoadOutcome {
        generation,
        source,
        result,
    }
}

/// Trims a region and delivers it as requested.
pub fn run_trim(request: TrimRequest) -> TrimOutcome {
    let trimmed = trim::trim(&request.buffer, request.region, request.format);
    match request.output {
        TrimOutput::Cut => TrimOutcome::Cut(trimmed.map(|t| (t.buffer, t.encoded))),
        TrimOutput::Download(path) => TrimOutcome::Downloaded(
            trimmed.and_then(|t| t.encoded.write_to(&path).map(|()| path)),
        ),
    }
}
