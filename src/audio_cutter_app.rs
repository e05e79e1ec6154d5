use crate::audio_file::AudioKind;
use crate::audio_thread::{self, AudioControlCommand};
use crate::config::CutterConfig;
use crate::session::EditorSession;
use crate::worker::{self, Job, JobResult, TrimOutput, Worker};
use eframe::egui;
use std::path::{Path, PathBuf};
use std::sync::mpsc::SendError;
use std::time::Duration;

const WAVEFORM_HEIGHT: f32 = 150.0;
/// Distance in points within which a click grabs a region handle.
const HANDLE_GRAB_DISTANCE: f32 = 12.0;

const WAVE_COLOR: egui::Color32 = egui::Color32::from_rgb(0x00, 0xfe, 0x8f);
const REGION_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 76, 43, 76);
const CURSOR_COLOR: egui::Color32 = egui::Color32::from_rgb(0xe3, 0xe3, 0xe4);

/// Current audio playback status.
#[derive(PartialEq)]
enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

/// Region handle being dragged on the waveform.
#[derive(Clone, Copy, PartialEq)]
enum RegionHandle {
    Start,
    End,
}

/// AudioCutterApp controls application UI.
pub struct AudioCutterApp {
    playback_status: PlaybackStatus,
    /// Play was sent but the audio thread has not reported playing yet.
    awaiting_transport: bool,

    /// AudioThread controls separate thread that performs audio playback process.
    audio_thread: Option<audio_thread::AudioThread>,
    /// Worker decodes and trims off the UI thread.
    worker: Option<Worker>,

    /// Working audio, its region and job status.
    session: EditorSession,
    config: CutterConfig,

    /// Waveform overview of the working audio, one min/max pair per horizontal point.
    peaks: Vec<(f32, f32)>,
    dragging: Option<RegionHandle>,
}

impl AudioCutterApp {
    pub fn new(config: CutterConfig) -> Self {
        Self {
            playback_status: PlaybackStatus::Stopped,
            awaiting_transport: false,
            audio_thread: None,
            worker: None,
            session: EditorSession::new(),
            config,
            peaks: Vec::new(),
            dragging: None,
        }
    }

    /// Starts the playback and worker threads on the first frame, when the UI context exists.
    fn ensure_threads(&mut self, ctx: &egui::Context) {
        if self.audio_thread.is_none() {
            log::debug!("[Audio Cutter App] Spawning audio thread ...");
            let poll = Duration::from_millis(self.config.playback_poll_ms);
            match audio_thread::AudioThread::spawn(ctx, poll) {
                Ok(thread) => self.audio_thread = Some(thread),
                Err(e) => log::error!("[Audio Cutter App] Cannot spawn audio thread: {}", e),
            }
        }
        if self.worker.is_none() {
            let repaint_ctx = ctx.clone();
            match Worker::spawn(move || repaint_ctx.request_repaint()) {
                Ok(worker) => self.worker = Some(worker),
                Err(e) => log::error!("[Audio Cutter App] Cannot spawn worker thread: {}", e),
            }
        }
    }

    fn send_playback(&self, command: AudioControlCommand) {
        let sent = match self.audio_thread.as_ref() {
            Some(thread) => thread.send(command).is_ok(),
            None => false,
        };
        if !sent {
            log::warn!("[Audio Cutter App] Audio thread is not running");
        }
    }

    /// Hands a job to the worker, or runs it right here if the worker is unavailable.
    fn dispatch(&mut self, job: Job) {
        let job = match self.worker.as_ref() {
            Some(worker) => match worker.send(job) {
                Ok(()) => return,
                Err(SendError(job)) => job,
            },
            None => job,
        };
        log::warn!("[Audio Cutter App] Worker unavailable, running job on the UI thread");
        let result = match job {
            Job::Load(request) => JobResult::Load(worker::run_load(request)),
            Job::Trim(request) => JobResult::Trim(worker::run_trim(request)),
        };
        self.apply(result);
    }

    fn apply(&mut self, result: JobResult) {
        let replaced = match result {
            JobResult::Load(outcome) => self.session.finish_load(outcome),
            JobResult::Trim(outcome) => self.session.finish_trim(outcome),
        };
        if replaced {
            self.on_audio_replaced();
        }
    }

    fn poll_worker(&mut self) {
        loop {
            let Some(result) = self.worker.as_ref().and_then(Worker::try_recv) else {
                break;
            };
            self.apply(result);
        }
    }

    /// Stops playback of the previous audio and drops its waveform.
    fn on_audio_replaced(&mut self) {
        if self.playback_status != PlaybackStatus::Stopped {
            self.send_playback(AudioControlCommand::Stop);
            self.playback_status = PlaybackStatus::Stopped;
        }
        self.peaks.clear();
        self.dragging = None;
    }

    fn open_file(&mut self, path: &Path, mime: Option<&str>) {
        log::info!("[Audio Cutter App] Loading audio source {} ...", path.display());
        if let Ok(request) = self.session.select_file(path, mime) {
            self.dispatch(Job::Load(request));
        }
    }

    fn region_changed(&self) {
        if let Some(region) = self.session.region() {
            if self.playback_status != PlaybackStatus::Stopped {
                self.send_playback(AudioControlCommand::SetRegion(region));
            }
        }
    }

    /// Controls behavior of opening file UI button.
    ///
    /// # Parameters
    ///
    /// * `ui` - `egui::UI` for placing the button on.
    fn open_file_button(&mut self, ui: &mut egui::Ui) {
        if ui.button("Открыть файл...").clicked() {
            if let Some(file) = rfd::FileDialog::new()
                .add_filter("WAV / MP3", AudioKind::dialog_extensions())
                .pick_file()
            {
                self.open_file(&file, None);
            }
        }
    }

    /// Opens the first file dropped onto the window. Its MIME type is checked when known.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some((path, mime)) = dropped
            .into_iter()
            .find_map(|f| f.path.map(|path| (path, f.mime)))
        {
            let mime = Some(mime.as_str()).filter(|m| !m.is_empty());
            self.open_file(&path, mime);
        }
    }

    /// Draws the waveform overview with the selection region and lets the user resize it.
    ///
    /// # Parameters
    ///
    /// * `ui` - `egui::UI` for placing the waveform on.
    fn waveform_region(&mut self, ui: &mut egui::Ui) {
        let (Some(buffer), Some(region)) = (self.session.buffer(), self.session.region()) else {
            return;
        };
        let duration = self.session.duration();
        let (response, painter) = ui.allocate_painter(
            egui::vec2(ui.available_width(), WAVEFORM_HEIGHT),
            egui::Sense::click_and_drag(),
        );
        let rect = response.rect;
        let bins = rect.width().max(1.0) as usize;
        if self.peaks.len() != bins {
            self.peaks = buffer.peaks(bins);
        }

        let x_at = |t: f64| rect.left() + (t / duration.max(f64::EPSILON)) as f32 * rect.width();
        let t_at = |x: f32| ((x - rect.left()) / rect.width()) as f64 * duration;

        painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);
        let mid = rect.center().y;
        let half = rect.height() / 2.0;
        for (i, (min, max)) in self.peaks.iter().enumerate() {
            let x = rect.left() + i as f32 + 0.5;
            painter.line_segment(
                [egui::pos2(x, mid - max * half), egui::pos2(x, mid - min * half)],
                (1.0, WAVE_COLOR),
            );
        }

        let (start_x, end_x) = (x_at(region.start), x_at(region.end));
        painter.rect_filled(
            egui::Rect::from_x_y_ranges(start_x..=end_x, rect.y_range()),
            0.0,
            REGION_COLOR,
        );
        for x in [start_x, end_x] {
            painter.line_segment(
                [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
                (2.0, WAVE_COLOR),
            );
        }

        if self.playback_status != PlaybackStatus::Stopped {
            if let Some(thread) = self.audio_thread.as_ref() {
                let cursor_x = x_at(thread.transport().position.as_secs_f64());
                painter.line_segment(
                    [egui::pos2(cursor_x, rect.top()), egui::pos2(cursor_x, rect.bottom())],
                    (1.0, CURSOR_COLOR),
                );
            }
        }

        // Only the handles move; the region itself is not draggable
        if response.drag_started() {
            self.dragging = response.interact_pointer_pos().and_then(|pos| {
                let to_start = (pos.x - start_x).abs();
                let to_end = (pos.x - end_x).abs();
                if to_start.min(to_end) > HANDLE_GRAB_DISTANCE {
                    None
                } else if to_start < to_end {
                    Some(RegionHandle::Start)
                } else {
                    Some(RegionHandle::End)
                }
            });
        }
        if let (Some(handle), Some(pos)) = (self.dragging, response.interact_pointer_pos()) {
            if response.dragged() {
                match handle {
                    RegionHandle::Start => self.session.drag_start(t_at(pos.x)),
                    RegionHandle::End => self.session.drag_end(t_at(pos.x)),
                };
            }
        }
        if response.drag_stopped() && self.dragging.take().is_some() {
            self.region_changed();
        }
    }

    /// Numeric fields for precise region bounds.
    fn region_fields(&mut self, ui: &mut egui::Ui) {
        let Some(region) = self.session.region() else {
            return;
        };
        let duration = self.session.duration();
        let (mut start, mut end) = (region.start, region.end);
        ui.horizontal(|ui| {
            ui.label("Начало:");
            let start_changed = ui
                .add(egui::DragValue::new(&mut start).speed(0.01).range(0.0..=duration).suffix(" с"))
                .changed();
            ui.label("Конец:");
            let end_changed = ui
                .add(egui::DragValue::new(&mut end).speed(0.01).range(0.0..=duration).suffix(" с"))
                .changed();
            if start_changed {
                self.session.drag_start(start);
            }
            if end_changed {
                self.session.drag_end(end);
            }
            if start_changed || end_changed {
                self.region_changed();
            }
        });
    }

    /// Controls audio playback part of the UI.
    ///
    /// # Parameters
    ///
    /// * `ui` - `egui::UI` for placing audio playback controls on.
    fn playback_control(&mut self, ui: &mut egui::Ui) {
        let action = if let PlaybackStatus::Playing = self.playback_status {
            "Пауза"
        } else {
            "Играть"
        };

        ui.horizontal(|ui| {
            // Button in the widget for stopping
            if ui.button("Стоп").clicked() {
                self.send_playback(AudioControlCommand::Stop);
                self.playback_status = PlaybackStatus::Stopped;
            }

            // Button in the widget for playing and pausing
            if ui.button(action).clicked() {
                match self.playback_status {
                    PlaybackStatus::Playing => {
                        self.send_playback(AudioControlCommand::Pause);
                        self.playback_status = PlaybackStatus::Paused;
                    }
                    PlaybackStatus::Paused => {
                        self.send_playback(AudioControlCommand::Continue);
                        self.playback_status = PlaybackStatus::Playing;
                    }
                    PlaybackStatus::Stopped => {
                        if let (Some(buffer), Some(region)) =
                            (self.session.buffer(), self.session.region())
                        {
                            log::debug!("[Audio Cutter App] Sending Play command ...");
                            self.send_playback(AudioControlCommand::play(buffer, region));
                            self.playback_status = PlaybackStatus::Playing;
                            self.awaiting_transport = true;
                        }
                    }
                }
            }

            let position = self
                .audio_thread
                .as_ref()
                .map(|t| t.transport().position.as_secs_f64())
                .unwrap_or(0.0);
            ui.label(format!(
                "{} / {}",
                format_time(position),
                format_time(self.session.duration())
            ));
        });
    }

    /// Follows the audio thread when it stops on its own at the region end.
    fn sync_transport(&mut self) {
        let Some(thread) = self.audio_thread.as_ref() else {
            return;
        };
        let transport = thread.transport();
        if transport.playing {
            self.awaiting_transport = false;
        } else if self.playback_status == PlaybackStatus::Playing && !self.awaiting_transport {
            self.playback_status = PlaybackStatus::Stopped;
        }
    }

    /// Cut and download buttons.
    fn edit_controls(&mut self, ui: &mut egui::Ui) {
        let busy = self.session.is_processing();
        ui.horizontal(|ui| {
            if ui.add_enabled(!busy, egui::Button::new("Вырезать")).clicked() {
                if let Ok(request) = self.session.begin_trim(TrimOutput::Cut, self.config.wav_format)
                {
                    self.dispatch(Job::Trim(request));
                }
            }
            if ui.add_enabled(!busy, egui::Button::new("Скачать фрагмент...")).clicked() {
                if let Some(dest) = self.pick_download_path() {
                    if let Ok(request) = self
                        .session
                        .begin_trim(TrimOutput::Download(dest), self.config.wav_format)
                    {
                        self.dispatch(Job::Trim(request));
                    }
                }
            }
            if busy {
                ui.spinner();
            }
        });
        if let Some(path) = self.session.last_download() {
            ui.label(format!("Сохранено: {}", path.display()));
        }
    }

    fn pick_download_path(&self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("WAV", &["wav"])
            .set_file_name(self.session.download_file_name());
        if let Some(dir) = self.config.download_dir() {
            dialog = dialog.set_directory(dir);
        }
        dialog.save_file()
    }

    fn error_banner(&mut self, ui: &mut egui::Ui) {
        let mut dismissed = false;
        if let Some(message) = self.session.error() {
            ui.horizontal(|ui| {
                ui.colored_label(egui::Color32::RED, message);
                dismissed = ui.small_button("×").clicked();
            });
        }
        if dismissed {
            self.session.clear_error();
        }
    }
}

impl Default for AudioCutterApp {
    fn default() -> Self {
        Self::new(CutterConfig::default())
    }
}

impl eframe::App for AudioCutterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_threads(ctx);
        self.poll_worker();
        self.sync_transport();
        self.handle_dropped_files(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Audio Cutter");

                self.open_file_button(ui);
                self.error_banner(ui);

                if self.session.is_loading() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Загрузка...");
                    });
                }

                if let Some(source) = self.session.source() {
                    ui.horizontal(|ui| {
                        ui.label("Открытый файл:");
                        ui.label(source.name());
                    });
                }
            });

            if self.session.buffer().is_some() {
                self.waveform_region(ui);
                self.region_fields(ui);
                self.playback_control(ui);
                self.edit_controls(ui);
            }
        });
    }
}

impl Drop for AudioCutterApp {
    fn drop(&mut self) {
        // Playback must end before the artifacts it may read are removed with the session
        drop(self.audio_thread.take());
        drop(self.worker.take());
    }
}

/// Formats seconds as `mm:ss`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}
