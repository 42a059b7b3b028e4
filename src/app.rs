//! Main application component for Echobox

use crate::audio::{
    wav_file, AudioCapture, AudioPlayer, CaptureEvent, CaptureState, SharedCaptureState,
    SharedPlaybackState,
};
use crate::config::Config;
use crate::library::RecordingLibrary;
use crate::state::{AppState, NoticeKind};
use crate::util::format_time;
use crate::waveform::{WaveformState, BAR_COUNT, CANVAS_HEIGHT};
use gpui::prelude::*;
use gpui::{InteractiveElement, *};
use log::error;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

/// The root application view
pub struct Echobox {
    state: AppState,
    config: Config,
    library: RecordingLibrary,
    audio_capture: AudioCapture,
    capture_state: SharedCaptureState,
    /// Single-consumer queue of events from the capture thread; drained on
    /// the UI thread by the refresh task
    capture_events: Option<Receiver<CaptureEvent>>,
    audio_player: AudioPlayer,
    playback_state: SharedPlaybackState,
    /// Currently loaded recording path for playback
    loaded_recording_path: Option<PathBuf>,
    waveform: WaveformState,
    volume_level: f32,
    recording_started: Option<Instant>,
    _ui_refresh_task: Option<Task<()>>,
}

impl Echobox {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        let config = Config::load();
        let library = RecordingLibrary::new(config.recordings_dir.clone());

        let mut state = AppState::new();
        match library.list() {
            Ok(recordings) => state.recordings = recordings,
            Err(e) => {
                error!("Failed to read recordings directory: {:#}", e);
                state.set_error(format!("Cannot read recordings: {}", e));
            }
        }

        let audio_capture = AudioCapture::new();
        let capture_state = audio_capture.shared_state();
        let audio_player = AudioPlayer::new();
        let playback_state = audio_player.shared_state();

        Self {
            state,
            config,
            library,
            audio_capture,
            capture_state,
            capture_events: None,
            audio_player,
            playback_state,
            loaded_recording_path: None,
            waveform: WaveformState::new(),
            volume_level: 0.0,
            recording_started: None,
            _ui_refresh_task: None,
        }
    }

    fn toggle_recording(&mut self, cx: &mut Context<Self>) {
        if self.state.is_recording {
            self.stop_recording();
        } else {
            self.start_recording(cx);
        }
    }

    /// Start a capture session and the UI refresh loop driving the timer and
    /// waveform animation.
    fn start_recording(&mut self, cx: &mut Context<Self>) {
        if self.playback_state.is_playing() {
            self.audio_player.stop();
        }

        match self.audio_capture.start() {
            Ok(events) => self.capture_events = Some(events),
            Err(e) => {
                error!("Failed to start audio capture: {}", e);
                self.state.set_error(format!("Cannot record: {}", e));
                return;
            }
        }

        self.state.start_recording();
        self.volume_level = 0.0;
        self.waveform.reset();
        self.waveform.start();
        self.recording_started = Some(Instant::now());

        self._ui_refresh_task = Some(cx.spawn({
            async move |this: WeakEntity<Self>, cx: &mut AsyncApp| {
                loop {
                    // ~20fps animation cadence
                    cx.background_executor()
                        .timer(Duration::from_millis(50))
                        .await;

                    let Some(this) = this.upgrade() else {
                        break;
                    };
                    let result = cx.update_entity(&this, |this, cx| {
                        let still_recording = this.state.is_recording;
                        if still_recording {
                            this.on_record_tick();
                        }
                        cx.notify();
                        still_recording
                    });
                    match result {
                        Ok(true) => continue,
                        _ => break,
                    }
                }
            }
        }));
    }

    /// One animation/timer frame while recording. Runs on the UI thread.
    fn on_record_tick(&mut self) {
        self.drain_capture_events();
        self.waveform.tick(&mut rand::rng());

        if let Some(started) = self.recording_started {
            self.state.elapsed_seconds = started.elapsed().as_secs_f64();
        }

        // A device failure ends the session; report it and re-enable the UI.
        if self.capture_state.state() == CaptureState::Error {
            let message = self
                .capture_state
                .error()
                .unwrap_or_else(|| "Audio device error".to_string());
            error!("Capture failed: {}", message);
            let _ = self.audio_capture.stop();
            self.finish_session(None);
            self.state.set_error(message);
        }
    }

    fn drain_capture_events(&mut self) {
        let Some(events) = &self.capture_events else {
            return;
        };
        let mut latest = None;
        while let Ok(event) = events.try_recv() {
            match event {
                CaptureEvent::Volume(level) => latest = Some(level),
            }
        }
        if let Some(level) = latest {
            self.volume_level = level;
            self.waveform.set_amplitude(level);
        }
    }

    fn stop_recording(&mut self) {
        match self.audio_capture.stop() {
            Ok(temp_path) => {
                self.finish_session(Some(temp_path));
                self.state
                    .set_info("Recording ready - play it back or save it");
            }
            Err(e) => {
                error!("Failed to stop audio capture: {}", e);
                self.finish_session(None);
                self.state.set_error(format!("Recording failed: {}", e));
            }
        }
    }

    fn finish_session(&mut self, temp_path: Option<PathBuf>) {
        self.state.finish_recording(temp_path);
        self.capture_events = None;
        self.recording_started = None;
        self.volume_level = 0.0;
        self.waveform.stop();
    }

    /// Play the current file, or stop playback if it is already running.
    fn play_current(&mut self, cx: &mut Context<Self>) {
        if self.playback_state.is_playing() {
            self.audio_player.stop();
            return;
        }

        let Some(path) = self.state.current_file.clone() else {
            self.state.set_error("No recording available to play.");
            return;
        };
        if !path.exists() {
            self.state.set_error("No recording available to play.");
            self.state.current_file = None;
            return;
        }

        if self.loaded_recording_path.as_ref() != Some(&path) {
            match wav_file::load_samples(&path) {
                Ok((samples, sample_rate)) => {
                    self.audio_player.load(samples, sample_rate);
                    self.loaded_recording_path = Some(path);
                }
                Err(e) => {
                    error!("Failed to load recording: {:#}", e);
                    self.state.set_error(format!("Cannot play: {}", e));
                    return;
                }
            }
        }

        if let Err(e) = self.audio_player.play() {
            error!("Failed to start playback: {}", e);
            self.state.set_error(format!("Cannot play: {}", e));
            return;
        }

        // Refresh the progress readout while playing
        let playback_state = self.playback_state.clone();
        self._ui_refresh_task = Some(cx.spawn({
            async move |this: WeakEntity<Self>, cx: &mut AsyncApp| {
                loop {
                    if !playback_state.is_playing() {
                        // One last update so the UI settles on the final state
                        if let Some(this) = this.upgrade() {
                            let _ = cx.update_entity(&this, |_, cx| cx.notify());
                        }
                        break;
                    }

                    cx.background_executor()
                        .timer(Duration::from_millis(16))
                        .await;

                    let Some(this) = this.upgrade() else {
                        break;
                    };
                    let result = cx.update_entity(&this, |_, cx| {
                        cx.notify();
                    });
                    if result.is_err() {
                        break;
                    }
                }
            }
        }));
    }

    /// Copy the current temp recording into the library under a generated
    /// timestamp name.
    fn save_current(&mut self) {
        if !self.state.can_save() {
            self.state.set_error("No recording available to save.");
            return;
        }
        let Some(source) = self.state.current_file.clone() else {
            return;
        };

        match self.library.save(&source, None) {
            Ok(dest) => {
                let name = dest
                    .file_name()
                    .map(|f| f.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.state.mark_saved();
                self.state.set_info(format!("Recording saved as {}", name));
                self.refresh_recordings();
            }
            Err(e) => {
                error!("Failed to save recording: {:#}", e);
                self.state.set_error(format!("Failed to save: {}", e));
            }
        }
    }

    fn refresh_recordings(&mut self) {
        match self.library.list() {
            Ok(recordings) => self.state.recordings = recordings,
            Err(e) => {
                error!("Failed to read recordings directory: {:#}", e);
                self.state.set_error(format!("Cannot read recordings: {}", e));
            }
        }
    }

    /// Point the current file at a saved recording from the list.
    fn select_recording(&mut self, name: &str) {
        let path = self.library.path_for(name);
        if !path.exists() {
            self.state.set_error(format!("File not found: {}", name));
            self.refresh_recordings();
            return;
        }
        self.state.select_saved(name.to_string(), path);
    }

    /// Delete a saved recording. With confirm-on-delete the first click only
    /// arms the row; the second click deletes.
    fn delete_recording(&mut self, name: &str) {
        if self.config.confirm_on_delete && self.state.pending_delete.as_deref() != Some(name) {
            self.state.pending_delete = Some(name.to_string());
            return;
        }
        self.state.pending_delete = None;

        match self.library.delete(name) {
            Ok(true) => {
                if self.state.selected.as_deref() == Some(name) {
                    self.state.selected = None;
                    self.state.current_file = None;
                    self.state.current_is_saved = false;
                }
                self.state.set_info(format!("Deleted {}", name));
            }
            Ok(false) => {
                self.state.set_error(format!("{} was already gone", name));
            }
            Err(e) => {
                error!("Failed to delete recording: {:#}", e);
                self.state.set_error(format!("Failed to delete: {}", e));
            }
        }
        self.refresh_recordings();
    }

    /// The time shown on the digital timer: the recording clock while
    /// recording, the playback position while playing, otherwise the length
    /// of the last take.
    fn timer_seconds(&self) -> f64 {
        if self.state.is_recording {
            self.state.elapsed_seconds
        } else if self.playback_state.is_playing() {
            self.playback_state.current_time()
        } else {
            self.state.elapsed_seconds
        }
    }
}

impl Render for Echobox {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let show_help = self.state.show_help;

        div()
            .size_full()
            .flex()
            .flex_col()
            .bg(rgb(0x121212))
            .key_context("Echobox")
            .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                match event.keystroke.key.as_str() {
                    "f1" => {
                        this.state.toggle_help();
                    }
                    "escape" => {
                        if this.state.show_help {
                            this.state.toggle_help();
                        } else {
                            this.state.pending_delete = None;
                        }
                    }
                    "r" if event.keystroke.modifiers.control => {
                        this.toggle_recording(cx);
                    }
                    "s" if event.keystroke.modifiers.control => {
                        this.save_current();
                    }
                    "space" if !this.state.show_help && !this.state.is_recording => {
                        this.play_current(cx);
                    }
                    "f5" => {
                        this.refresh_recordings();
                    }
                    "q" if event.keystroke.modifiers.control => {
                        // If recording, finalize the temp file before closing
                        if this.state.is_recording {
                            this.stop_recording();
                        }
                        window.remove_window();
                    }
                    _ => {}
                }
            }))
            // Custom titlebar
            .child(
                div()
                    .id("titlebar")
                    .flex()
                    .items_center()
                    .justify_between()
                    .w_full()
                    .h(px(36.0))
                    .bg(rgb(0x1a1a1a))
                    .border_b_1()
                    .border_color(rgb(0x2d2d2d))
                    .child(
                        // Window title (left side) - draggable area
                        div()
                            .id("titlebar-drag-area")
                            .flex()
                            .flex_grow()
                            .items_center()
                            .h_full()
                            .gap_2()
                            .px_4()
                            .on_mouse_down(
                                MouseButton::Left,
                                cx.listener(|_this, _event: &MouseDownEvent, window, _cx| {
                                    window.start_window_move();
                                }),
                            )
                            .child(
                                div()
                                    .text_sm()
                                    .font_weight(FontWeight::SEMIBOLD)
                                    .text_color(rgb(0xcccccc))
                                    .child("Echobox - Voice Recorder"),
                            ),
                    )
                    .child(
                        // Close button (right side) - NOT draggable
                        div()
                            .id("close-button")
                            .w(px(46.0))
                            .h(px(36.0))
                            .flex()
                            .items_center()
                            .justify_center()
                            .cursor_pointer()
                            .hover(|style| style.bg(rgb(0xe81123)))
                            .on_click(cx.listener(|this, _, window, _cx| {
                                // Stop a live session before closing so the
                                // temp file is finalized
                                if this.state.is_recording {
                                    this.stop_recording();
                                }
                                window.remove_window();
                            }))
                            .child(div().text_lg().text_color(rgb(0xcccccc)).child("×")),
                    ),
            )
            // Main content
            .child(
                div()
                    .flex()
                    .flex_col()
                    .flex_grow()
                    .overflow_hidden()
                    .px_8()
                    .py_4()
                    .gap_4()
                    .relative()
                    .child(self.render_header())
                    .child(self.render_recording_panel(cx))
                    .child(self.render_recordings_list(cx))
                    .when(show_help, |el| el.child(render_help_overlay())),
            )
    }
}

impl Echobox {
    fn render_header(&self) -> impl IntoElement {
        div()
            .flex()
            .items_center()
            .justify_between()
            .child(
                div()
                    .text_2xl()
                    .font_weight(FontWeight::BOLD)
                    .text_color(rgb(0xffffff))
                    .child("Voice Recorder"),
            )
            .child(div().text_sm().text_color(rgb(0xaaaaaa)).child("v0.1"))
    }

    fn render_recording_panel(&self, cx: &mut Context<Self>) -> impl IntoElement {
        let is_recording = self.state.is_recording;
        let is_playing = self.playback_state.is_playing();
        let can_play = self.state.can_play();
        let can_save = self.state.can_save();
        let volume_level = self.volume_level.clamp(0.0, 1.0);
        let heights: Vec<f32> = self.waveform.heights().to_vec();
        let timer_text = format_time(self.timer_seconds());
        let status = self.state.status.clone();

        div()
            .flex()
            .flex_col()
            .gap_3()
            .p_4()
            .rounded_lg()
            .bg(rgb(0x1e1e1e))
            .border_1()
            .border_color(rgb(0x2d2d2d))
            // Waveform canvas
            .child(
                div()
                    .flex()
                    .items_center()
                    .justify_center()
                    .gap_px()
                    .h(px(CANVAS_HEIGHT))
                    .children((0..BAR_COUNT).map(|i| {
                        let height = heights.get(i).copied().unwrap_or(2.0);
                        div()
                            .w(px(6.0))
                            .h(px(height))
                            .rounded_sm()
                            .bg(if is_recording {
                                rgb(0x4f7cac)
                            } else {
                                rgb(0x3d5d84)
                            })
                    })),
            )
            // Timer and volume meter
            .child(
                div()
                    .flex()
                    .items_center()
                    .justify_between()
                    .child(
                        div()
                            .text_3xl()
                            .font_weight(FontWeight::MEDIUM)
                            .text_color(if is_recording {
                                rgb(0xff5252)
                            } else {
                                rgb(0xaaaaaa)
                            })
                            .child(timer_text),
                    )
                    .child(
                        div()
                            .flex()
                            .items_center()
                            .gap_2()
                            .child(div().text_xs().text_color(rgb(0x888888)).child("Level"))
                            .child(
                                div()
                                    .w(px(140.0))
                                    .h(px(8.0))
                                    .bg(rgb(0x2d2d2d))
                                    .rounded_full()
                                    .child(
                                        div()
                                            .h_full()
                                            .rounded_full()
                                            .bg(if volume_level > 0.8 {
                                                rgb(0xff5252)
                                            } else if volume_level > 0.5 {
                                                rgb(0xff9800)
                                            } else {
                                                rgb(0x4caf50)
                                            })
                                            .w(relative(volume_level)),
                                    ),
                            ),
                    ),
            )
            // Status / error line
            .when_some(status, |el, notice| {
                el.child(
                    div()
                        .text_sm()
                        .text_color(match notice.kind {
                            NoticeKind::Error => rgb(0xf44336),
                            NoticeKind::Info => rgb(0x4caf50),
                        })
                        .child(notice.message),
                )
            })
            // Control buttons
            .child(
                div()
                    .flex()
                    .justify_center()
                    .gap_4()
                    .child(action_button(
                        "btn-record",
                        if is_recording { "Stop" } else { "Record" },
                        if is_recording {
                            rgb(0xe53935)
                        } else {
                            rgb(0xff5252)
                        },
                        true,
                        cx.listener(|this, _, _w, cx| {
                            this.toggle_recording(cx);
                        }),
                    ))
                    .child(action_button(
                        "btn-play",
                        if is_playing { "Stop Playback" } else { "Play" },
                        rgb(0x2d2d2d),
                        can_play,
                        cx.listener(|this, _, _w, cx| {
                            this.play_current(cx);
                        }),
                    ))
                    .child(action_button(
                        "btn-save",
                        "Save",
                        rgb(0x2d2d2d),
                        can_save,
                        cx.listener(|this, _, _w, _cx| {
                            this.save_current();
                        }),
                    )),
            )
            .child(
                div()
                    .flex()
                    .justify_center()
                    .text_xs()
                    .text_color(rgb(0x666666))
                    .child(if is_recording {
                        "Recording audio from your microphone"
                    } else {
                        "Click Record or press Ctrl+R to start - F1 for help"
                    }),
            )
    }

    fn render_recordings_list(&self, cx: &mut Context<Self>) -> impl IntoElement {
        let recordings = self.state.recordings.clone();
        let selected = self.state.selected.clone();
        let pending_delete = self.state.pending_delete.clone();

        div()
            .flex()
            .flex_col()
            .gap_2()
            .flex_grow()
            .overflow_hidden()
            .child(
                div()
                    .flex()
                    .items_center()
                    .justify_between()
                    .child(
                        div()
                            .text_lg()
                            .font_weight(FontWeight::BOLD)
                            .text_color(rgb(0xffffff))
                            .child("Saved Recordings"),
                    )
                    .child(
                        div()
                            .id("btn-refresh")
                            .px_4()
                            .py_1()
                            .rounded_md()
                            .bg(rgb(0x2d2d2d))
                            .text_sm()
                            .text_color(rgb(0xcccccc))
                            .cursor_pointer()
                            .hover(|style| style.bg(rgb(0x3d3d3d)))
                            .on_click(cx.listener(|this, _, _w, _cx| {
                                this.refresh_recordings();
                            }))
                            .child("Refresh"),
                    ),
            )
            .child(
                div()
                    .id("recordings-scroll")
                    .flex()
                    .flex_col()
                    .gap_1()
                    .flex_grow()
                    .overflow_y_scroll()
                    .when(recordings.is_empty(), |el| {
                        el.child(
                            div()
                                .p_4()
                                .text_sm()
                                .text_color(rgb(0x666666))
                                .child("No saved recordings found"),
                        )
                    })
                    .when(!recordings.is_empty(), |el| {
                        el.children(recordings.iter().enumerate().map(|(idx, entry)| {
                            let name = entry.name.clone();
                            let is_selected = selected.as_deref() == Some(name.as_str());
                            let is_armed = pending_delete.as_deref() == Some(name.as_str());
                            let modified_str = entry
                                .modified
                                .map(|t| {
                                    chrono::DateTime::<chrono::Local>::from(t)
                                        .format("%b %d, %Y %H:%M")
                                        .to_string()
                                })
                                .unwrap_or_default();
                            let name_for_select = name.clone();
                            let name_for_delete = name.clone();

                            div()
                                .id(SharedString::from(format!("recording-{}", idx)))
                                .flex()
                                .items_center()
                                .justify_between()
                                .px_4()
                                .py_2()
                                .rounded_md()
                                .bg(if is_selected {
                                    rgb(0x2d2d2d)
                                } else {
                                    rgb(0x1e1e1e)
                                })
                                .border_1()
                                .border_color(if is_selected {
                                    rgb(0xff5252)
                                } else {
                                    rgb(0x2d2d2d)
                                })
                                .cursor_pointer()
                                .hover(|style| style.border_color(rgb(0xff5252)))
                                .on_click(cx.listener(move |this, _, _w, _cx| {
                                    this.select_recording(&name_for_select);
                                }))
                                .child(
                                    div()
                                        .flex()
                                        .flex_col()
                                        .child(
                                            div()
                                                .text_sm()
                                                .font_weight(FontWeight::MEDIUM)
                                                .text_color(rgb(0xffffff))
                                                .child(name.clone()),
                                        )
                                        .child(
                                            div()
                                                .text_xs()
                                                .text_color(rgb(0x888888))
                                                .child(modified_str),
                                        ),
                                )
                                .child(
                                    div()
                                        .id(SharedString::from(format!("delete-{}", idx)))
                                        .px_3()
                                        .py_1()
                                        .rounded_md()
                                        .bg(if is_armed {
                                            rgb(0xf44336)
                                        } else {
                                            rgb(0x2d2d2d)
                                        })
                                        .text_xs()
                                        .text_color(if is_armed {
                                            rgb(0xffffff)
                                        } else {
                                            rgb(0xf44336)
                                        })
                                        .cursor_pointer()
                                        .hover(|style| style.bg(rgb(0x3d3d3d)))
                                        .on_click(cx.listener(move |this, _, _w, _cx| {
                                            this.delete_recording(&name_for_delete);
                                        }))
                                        .child(if is_armed { "Confirm?" } else { "Delete" }),
                                )
                        }))
                    }),
            )
    }
}

fn action_button(
    id: &'static str,
    label: &'static str,
    color: Rgba,
    enabled: bool,
    on_click: impl Fn(&ClickEvent, &mut Window, &mut App) + 'static,
) -> impl IntoElement {
    div()
        .id(id)
        .px_6()
        .py_2()
        .rounded_lg()
        .bg(color)
        .text_color(rgb(0xffffff))
        .font_weight(FontWeight::SEMIBOLD)
        .when(!enabled, |el| el.opacity(0.4))
        .when(enabled, |el| {
            el.cursor_pointer()
                .hover(|style| style.opacity(0.9))
                .on_click(on_click)
        })
        .child(label)
}

fn render_help_overlay() -> impl IntoElement {
    div()
        .absolute()
        .inset_0()
        .bg(rgba(0x000000aa))
        .flex()
        .items_center()
        .justify_center()
        .child(
            div()
                .w(px(500.0))
                .bg(rgb(0x1e1e1e))
                .rounded_xl()
                .border_1()
                .border_color(rgb(0x2d2d2d))
                .overflow_hidden()
                .flex()
                .flex_col()
                .child(
                    div()
                        .px_6()
                        .py_4()
                        .border_b_1()
                        .border_color(rgb(0x2d2d2d))
                        .flex()
                        .justify_between()
                        .items_center()
                        .child(
                            div()
                                .text_xl()
                                .font_weight(FontWeight::BOLD)
                                .text_color(rgb(0xffffff))
                                .child("Echobox Help"),
                        )
                        .child(
                            div()
                                .text_sm()
                                .text_color(rgb(0x888888))
                                .child("Press ESC or F1 to close"),
                        ),
                )
                .child(
                    div()
                        .p_6()
                        .flex()
                        .flex_col()
                        .gap_4()
                        .child(help_section(
                            "Keyboard Shortcuts",
                            vec![
                                ("Ctrl+R", "Start/stop recording"),
                                ("Space", "Play current recording"),
                                ("Ctrl+S", "Save recording"),
                                ("F5", "Refresh recordings list"),
                                ("F1", "Toggle this help"),
                            ],
                        ))
                        .child(help_section(
                            "Workflow",
                            vec![
                                ("Record", "Captures to a temporary file"),
                                ("Save", "Copies it into the recordings folder"),
                                ("Select", "Click a saved recording to play it"),
                                ("Delete", "Click twice to confirm"),
                            ],
                        )),
                ),
        )
}

fn help_section(title: &str, items: Vec<(&str, &str)>) -> impl IntoElement {
    div()
        .flex()
        .flex_col()
        .gap_2()
        .child(
            div()
                .text_base()
                .font_weight(FontWeight::SEMIBOLD)
                .text_color(rgb(0xff5252))
                .child(title.to_string()),
        )
        .child(
            div()
                .flex()
                .flex_col()
                .gap_1()
                .children(items.into_iter().map(|(key, desc)| {
                    div()
                        .flex()
                        .gap_4()
                        .child(
                            div()
                                .w(px(80.0))
                                .px_2()
                                .py_1()
                                .rounded_sm()
                                .bg(rgb(0x2d2d2d))
                                .text_sm()
                                .text_color(rgb(0xff5252))
                                .child(key.to_string()),
                        )
                        .child(
                            div()
                                .text_sm()
                                .text_color(rgb(0xcccccc))
                                .child(desc.to_string()),
                        )
                })),
        )
}
