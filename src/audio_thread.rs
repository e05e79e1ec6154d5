use eframe::egui;
use rodio::buffer::SamplesBuffer;
use std::sync::mpsc::{SendError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio_buffer::AudioBuffer;
use crate::region::{PlayheadAction, Region};

/// Commands to control a thread, that performs audio playback.
pub enum AudioControlCommand {
    /// Start new playback of `source`, limited to `region`, from the region start.
    Play { source: SamplesBuffer, region: Region },
    /// The region was moved: playback continues from its new start.
    SetRegion(Region),
    Pause,
    Continue,
    Stop,
}

impl AudioControlCommand {
    /// Builds a [AudioControlCommand::Play] for a decoded buffer.
    pub fn play(buffer: &AudioBuffer, region: Region) -> Self {
        let source = SamplesBuffer::new(
            buffer.channel_count() as u16,
            buffer.sample_rate(),
            buffer.interleaved(),
        );
        AudioControlCommand::Play { source, region }
    }
}

/// Transport state published by the audio thread.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransportState {
    /// Cursor position within the whole buffer.
    pub position: Duration,
    /// `false` once playback was stopped or reached the region end.
    pub playing: bool,
}

/// Struct that owns and controls a thread, that performs audio playback process.
pub struct AudioThread {
    /// Thread handle to a thread, that performs audio playback.
    ///
    /// Handle is wrapped in [Option] for graceful joining, when [AudioThread] is dropped.
    thread_handle: Option<std::thread::JoinHandle<()>>,
    transport: Arc<Mutex<TransportState>>,
    commands_sender: Option<std::sync::mpsc::Sender<AudioControlCommand>>,
}

impl AudioThread {
    /// Creates new [AudioThread] object with a spawned audio thread.
    ///
    /// # Parameters
    ///
    /// * `ui_ctx` - UI context handle, used by audio playback thread to force UI repainting.
    /// * `poll_interval` - how often the cursor is checked against the region while playing.
    ///
    /// # Errors
    ///
    /// Fails if the OS fails to create a thread.
    pub fn spawn(ui_ctx: &egui::Context, poll_interval: Duration) -> std::io::Result<Self> {
        let (sender, receiver) = std::sync::mpsc::channel();
        let transport = Arc::new(Mutex::new(TransportState::default()));

        let thread_ctx = ThreadContext {
            commands_receiver: receiver,
            transport: Arc::clone(&transport),
            ui_ctx: ui_ctx.clone(),
            region: None,
            poll_interval,
        };

        let thread_handle = std::thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || playback_audio(thread_ctx))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            transport,
            commands_sender: Some(sender),
        })
    }

    /// Sends a command to the audio playback thread.
    ///
    /// # Parameters
    ///
    /// * `command` - the command to send to the audio playback thread.
    pub fn send(&self, command: AudioControlCommand) -> Result<(), SendError<AudioControlCommand>> {
        match self.commands_sender.as_ref() {
            Some(sender) => sender.send(command),
            None => Err(SendError(command)),
        }
    }

    /// Returns the latest transport state.
    pub fn transport(&self) -> TransportState {
        self.transport.lock().map(|state| *state).unwrap_or_default()
    }
}

impl Drop for AudioThread {
    fn drop(&mut self) {
        // Take sender end of the channel out of Option and then drop it for notifying the audio
        // thread about the stop.
        drop(self.commands_sender.take());

        if let Some(thread) = self.thread_handle.take() {
            if thread.join().is_err() {
                log::error!("Audio thread panicked");
            }
        }
    }
}

/// Struct that stores playback context data, controlled by the audio playback thread.
struct ThreadContext {
    commands_receiver: std::sync::mpsc::Receiver<AudioControlCommand>,
    transport: Arc<Mutex<TransportState>>,
    ui_ctx: egui::Context,
    /// Region of the current playback.
    region: Option<Region>,
    poll_interval: Duration,
}

impl ThreadContext {
    fn publish(&self, position: Duration, playing: bool) {
        if let Ok(mut state) = self.transport.lock() {
            *state = TransportState { position, playing };
        }
        // Force UI repainting to show new elapsed time
        self.ui_ctx.request_repaint();
    }

    fn is_playing(&self) -> bool {
        self.transport.lock().map(|s| s.playing).unwrap_or(false)
    }
}

/// Entry point for the audio playback thread.
///
/// # Parameters
///
/// * `thread_ctx` - playback context data, controlled by the audio playback thread.
fn playback_audio(mut thread_ctx: ThreadContext) {
    // The output stream must outlive the sink or playback ends.
    let audio_stream = match rodio::OutputStreamBuilder::open_default_stream() {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("No audio output available: {}", e);
            return;
        }
    };

    // Sink is a handle for easier playback control and represents audio track. rodio mixes it
    // on its own output thread; this thread only steers it and watches the cursor.
    let audio_sink = rodio::Sink::connect_new(audio_stream.mixer());

    loop {
        if audio_sink.empty() || audio_sink.is_paused() {
            if audio_sink.empty() && thread_ctx.is_playing() {
                // Source ran out before the region end
                let start = thread_ctx.region.map(|r| r.start_duration()).unwrap_or_default();
                thread_ctx.publish(start, false);
            }
            log::trace!("[Audio Thread] recv() ...");
            // If no sound is currently playing we can use blocking wait for new command in
            // order to save CPU time
            if let Ok(command) = thread_ctx.commands_receiver.recv() {
                handle_command(&mut thread_ctx, command, &audio_sink);
                continue;
            } else {
                // Disconnected
                return;
            }
        }

        // Otherwise sound is playing, and we have to handle new command or keep the cursor
        // inside the region without blocking
        match thread_ctx.commands_receiver.try_recv() {
            Ok(command) => handle_command(&mut thread_ctx, command, &audio_sink),
            Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => {
                follow_playhead(&thread_ctx, &audio_sink);
                std::thread::sleep(thread_ctx.poll_interval);
            }
        }
    }
}

/// Applies the region transport rules to the current sink position.
fn follow_playhead(thread_ctx: &ThreadContext, audio_sink: &rodio::Sink) {
    let position = audio_sink.get_pos();
    let Some(region) = thread_ctx.region else {
        thread_ctx.publish(position, true);
        return;
    };
    match region.playhead_action(position) {
        PlayheadAction::Continue => thread_ctx.publish(position, true),
        PlayheadAction::SeekTo(start) => {
            if let Err(e) = audio_sink.try_seek(start) {
                log::warn!("[Audio Thread] Seek to region start failed: {}", e);
            }
            thread_ctx.publish(start, true);
        }
        PlayheadAction::Stop => {
            log::debug!("[Audio Thread] Reached region end at {:?}", position);
            audio_sink.clear();
            thread_ctx.publish(region.start_duration(), false);
        }
    }
}

/// Handles single received audio control command.
///
/// # Parameters
///
/// * `thread_ctx` - playback context data, controlled by the audio playback thread.
/// * `command` - the command to handle.
/// * `audio_sink` - [rodio::Sink] that actually performs audio playback.
fn handle_command(
    thread_ctx: &mut ThreadContext,
    command: AudioControlCommand,
    audio_sink: &rodio::Sink,
) {
    match command {
        AudioControlCommand::Play { source, region } => {
            // Pauses playback and remove all loaded audio sources.
            // Note that stop() should not be used generally, as sink shouldn't be used after
            // stop(): https://github.com/RustAudio/rodio/issues/171
            audio_sink.clear();
            audio_sink.append(source);
            if let Err(e) = audio_sink.try_seek(region.start_duration()) {
                log::warn!("[Audio Thread] Seek to region start failed: {}", e);
            }
            audio_sink.play();
            thread_ctx.region = Some(region);
            thread_ctx.publish(region.start_duration(), true);
        }
        AudioControlCommand::SetRegion(region) => {
            thread_ctx.region = Some(region);
            if !audio_sink.empty() {
                if let Err(e) = audio_sink.try_seek(region.start_duration()) {
                    log::warn!("[Audio Thread] Seek to region start failed: {}", e);
                }
                thread_ctx.publish(region.start_duration(), !audio_sink.is_paused());
            }
        }
        AudioControlCommand::Pause => {
            audio_sink.pause();
            thread_ctx.publish(audio_sink.get_pos(), false);
        }
        AudioControlCommand::Continue => {
            audio_sink.play();
            thread_ctx.publish(audio_sink.get_pos(), true);
        }
        AudioControlCommand::Stop => {
            audio_sink.clear();
            // Also clear elapsed time of the audio
            thread_ctx.publish(Duration::ZERO, false);
        }
    }
}
