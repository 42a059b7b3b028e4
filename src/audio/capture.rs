//! Audio capture using PipeWire
//!
//! Opens a microphone stream at the recording format (44.1kHz mono f32),
//! streams every chunk into the WAV sink, and posts per-chunk volume levels
//! to a single-consumer event queue drained on the UI thread.

use crate::audio::wav_sink::{self, WavSink};
use log::{debug, info};
use pipewire as pw;
use pw::spa;
use pw::spa::param::format::{MediaSubtype, MediaType};
use pw::spa::param::format_utils;
use pw::spa::pod::Pod;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Event posted from the capture thread to the UI thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureEvent {
    /// Normalized average-magnitude volume of one chunk (0.0 - 1.0)
    Volume(f32),
}

/// Current state of audio capture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Error,
}

/// Shared state for audio capture - thread-safe
#[derive(Clone)]
pub struct SharedCaptureState {
    inner: Arc<Mutex<CaptureStateInner>>,
}

struct CaptureStateInner {
    /// Latest per-chunk volume level (0.0 - 1.0)
    volume_level: f32,
    /// Samples written so far
    sample_count: usize,
    /// Current state
    state: CaptureState,
    /// Error message if any
    error: Option<String>,
}

impl SharedCaptureState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CaptureStateInner {
                volume_level: 0.0,
                sample_count: 0,
                state: CaptureState::Idle,
                error: None,
            })),
        }
    }

    pub fn volume_level(&self) -> f32 {
        self.inner.lock().unwrap().volume_level
    }

    pub fn state(&self) -> CaptureState {
        self.inner.lock().unwrap().state
    }

    /// Seconds captured so far, derived from the sample count.
    pub fn duration(&self) -> f64 {
        let count = self.inner.lock().unwrap().sample_count;
        count as f64 / wav_sink::SAMPLE_RATE as f64
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().unwrap().error.clone()
    }

    pub fn set_state(&self, state: CaptureState) {
        self.inner.lock().unwrap().state = state;
    }

    pub fn set_error(&self, error: String) {
        let mut inner = self.inner.lock().unwrap();
        inner.error = Some(error);
        inner.state = CaptureState::Error;
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.volume_level = 0.0;
        inner.sample_count = 0;
        inner.error = None;
        inner.state = CaptureState::Idle;
    }

    /// Record one chunk's worth of bookkeeping and return its volume level.
    fn process_chunk(&self, samples: &[f32]) -> f32 {
        let level = mean_abs(samples);
        let mut inner = self.inner.lock().unwrap();
        inner.volume_level = level;
        inner.sample_count += samples.len();
        level
    }
}

impl Default for SharedCaptureState {
    fn default() -> Self {
        Self::new()
    }
}

/// Audio capture manager using PipeWire
pub struct AudioCapture {
    state: SharedCaptureState,
    is_running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    sender: Option<pw::channel::Sender<CaptureCommand>>,
    temp_path: Option<PathBuf>,
}

enum CaptureCommand {
    Stop,
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            state: SharedCaptureState::new(),
            is_running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            sender: None,
            temp_path: None,
        }
    }

    /// Get shared capture state for UI updates
    pub fn shared_state(&self) -> SharedCaptureState {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Start capturing into a fresh temporary WAV file. Returns the receiving
    /// end of the capture event queue; the UI thread is its only consumer.
    pub fn start(&mut self) -> Result<Receiver<CaptureEvent>, String> {
        if self.is_running.load(Ordering::SeqCst) {
            return Err("Capture already running".to_string());
        }

        let temp_path =
            wav_sink::temp_wav_path().map_err(|e| format!("Failed to create temp file: {}", e))?;
        info!("Recording to {:?}", temp_path);

        self.state.reset();
        self.state.set_state(CaptureState::Capturing);
        self.is_running.store(true, Ordering::SeqCst);
        self.temp_path = Some(temp_path.clone());

        let state = self.state.clone();
        let is_running = self.is_running.clone();
        let (events_tx, events_rx) = mpsc::channel();

        // Channel for stopping the loop; sending wakes the main loop
        // immediately rather than waiting for a poll interval.
        let (sender, receiver) = pw::channel::channel::<CaptureCommand>();
        self.sender = Some(sender);

        let handle = thread::spawn(move || {
            if let Err(e) = run_capture_loop(state.clone(), temp_path, events_tx, receiver) {
                state.set_error(e);
            }
            is_running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(events_rx)
    }

    /// Stop capturing and return the finalized temp WAV path.
    pub fn stop(&mut self) -> Result<PathBuf, String> {
        if !self.is_running.load(Ordering::SeqCst) && self.thread_handle.is_none() {
            return Err("Capture not running".to_string());
        }

        if let Some(sender) = self.sender.take() {
            let _ = sender.send(CaptureCommand::Stop);
        }

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        self.is_running.store(false, Ordering::SeqCst);

        if let Some(error) = self.state.error() {
            self.temp_path = None;
            return Err(error);
        }
        self.state.set_state(CaptureState::Idle);

        self.temp_path
            .take()
            .ok_or_else(|| "No recording was produced".to_string())
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        if self.is_running.load(Ordering::SeqCst) {
            let _ = self.stop();
        }
    }
}

/// Run the PipeWire capture loop in a background thread
fn run_capture_loop(
    state: SharedCaptureState,
    temp_path: PathBuf,
    events: Sender<CaptureEvent>,
    receiver: pw::channel::Receiver<CaptureCommand>,
) -> Result<(), String> {
    let sink = WavSink::create(&temp_path)
        .map_err(|e| format!("Failed to open recording file: {}", e))?;

    pw::init();

    let mainloop = pw::main_loop::MainLoopRc::new(None)
        .map_err(|e| format!("Failed to create PipeWire main loop: {}", e))?;

    let context = pw::context::ContextRc::new(&mainloop, None)
        .map_err(|e| format!("Failed to create PipeWire context: {}", e))?;

    let core = context
        .connect_rc(None)
        .map_err(|e| format!("Failed to connect to PipeWire: {}", e))?;

    // Set up channel receiver to stop the loop
    let mainloop_weak = mainloop.downgrade();
    let _receiver = receiver.attach(mainloop.loop_(), move |cmd| match cmd {
        CaptureCommand::Stop => {
            if let Some(mainloop) = mainloop_weak.upgrade() {
                mainloop.quit();
            }
        }
    });

    // User data for the stream callbacks
    struct UserData {
        format: spa::param::audio::AudioInfoRaw,
        state: SharedCaptureState,
        sink: crate::audio::wav_sink::WavSinkHandle,
        events: Sender<CaptureEvent>,
    }

    let user_data = UserData {
        format: Default::default(),
        state: state.clone(),
        sink: sink.handle(),
        events,
    };

    // Create capture stream
    let props = pw::properties::properties! {
        *pw::keys::MEDIA_TYPE => "Audio",
        *pw::keys::MEDIA_CATEGORY => "Capture",
        *pw::keys::MEDIA_ROLE => "Communication",
        *pw::keys::APP_NAME => "Echobox Voice Recorder",
    };

    let stream = pw::stream::StreamBox::new(&core, "echobox-capture", props)
        .map_err(|e| format!("Failed to create PipeWire stream: {}", e))?;

    let _listener = stream
        .add_local_listener_with_user_data(user_data)
        .param_changed(|_, user_data, id, param| {
            let Some(param) = param else { return };
            if id != spa::param::ParamType::Format.as_raw() {
                return;
            }

            let (media_type, media_subtype) = match format_utils::parse_format(param) {
                Ok(v) => v,
                Err(_) => return,
            };

            if media_type != MediaType::Audio || media_subtype != MediaSubtype::Raw {
                return;
            }

            if user_data.format.parse(param).is_ok() {
                debug!(
                    "Capture format negotiated: {} Hz, {} channel(s)",
                    user_data.format.rate(),
                    user_data.format.channels()
                );
            }
        })
        .process(|stream, user_data| {
            let Some(mut buffer) = stream.dequeue_buffer() else {
                return;
            };

            let datas = buffer.datas_mut();
            if datas.is_empty() {
                return;
            }

            let data = &mut datas[0];
            let n_channels = user_data.format.channels().max(1);
            let n_samples = data.chunk().size() / (std::mem::size_of::<f32>() as u32);

            if let Some(raw_samples) = data.data() {
                // Convert bytes to f32 samples, taking the first channel
                let mut mono_samples = Vec::with_capacity((n_samples / n_channels) as usize);

                for i in (0..n_samples).step_by(n_channels as usize) {
                    let start = i as usize * std::mem::size_of::<f32>();
                    let end = start + std::mem::size_of::<f32>();
                    if end <= raw_samples.len() {
                        let sample = f32::from_le_bytes(
                            raw_samples[start..end].try_into().unwrap_or([0; 4]),
                        );
                        mono_samples.push(sample);
                    }
                }

                if mono_samples.is_empty() {
                    return;
                }

                let level = user_data.state.process_chunk(&mono_samples);
                let _ = user_data.events.send(CaptureEvent::Volume(level));

                if let Err(e) = user_data.sink.write_chunk(mono_samples) {
                    log::error!("Dropping chunk: {}", e);
                }
            }
        })
        .register()
        .map_err(|e| format!("Failed to register stream listener: {}", e))?;

    // Request the recording format directly; PipeWire resamples from the
    // device's native rate if needed.
    let mut audio_info = spa::param::audio::AudioInfoRaw::new();
    audio_info.set_format(spa::param::audio::AudioFormat::F32LE);
    audio_info.set_rate(wav_sink::SAMPLE_RATE);
    audio_info.set_channels(u32::from(wav_sink::CHANNELS));

    let obj = spa::pod::Object {
        type_: spa::utils::SpaTypes::ObjectParamFormat.as_raw(),
        id: spa::param::ParamType::EnumFormat.as_raw(),
        properties: audio_info.into(),
    };

    let values: Vec<u8> = spa::pod::serialize::PodSerializer::serialize(
        std::io::Cursor::new(Vec::new()),
        &spa::pod::Value::Object(obj),
    )
    .map_err(|e| format!("Failed to serialize audio format: {:?}", e))?
    .0
    .into_inner();

    let mut params = [Pod::from_bytes(&values).ok_or("Failed to build format pod")?];

    // Connect the stream
    stream
        .connect(
            spa::utils::Direction::Input,
            None,
            pw::stream::StreamFlags::AUTOCONNECT
                | pw::stream::StreamFlags::MAP_BUFFERS
                | pw::stream::StreamFlags::RT_PROCESS,
            &mut params,
        )
        .map_err(|e| format!("Failed to connect stream: {}", e))?;

    // Run until stopped
    mainloop.run();

    // A write failure here loses nothing the user can act on; log and move on.
    if let Err(e) = sink.finalize() {
        log::error!("Error saving temporary file: {}", e);
    }

    Ok(())
}

/// Normalized average magnitude of a chunk (0.0 - 1.0)
pub fn mean_abs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s.abs()).sum();
    (sum / samples.len() as f32).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_abs() {
        assert_eq!(mean_abs(&[]), 0.0);
        assert_eq!(mean_abs(&[0.0, 0.0]), 0.0);
        assert_eq!(mean_abs(&[0.5, -0.5]), 0.5);
        assert_eq!(mean_abs(&[2.0, -2.0]), 1.0);
    }

    #[test]
    fn test_shared_state_process_chunk() {
        let state = SharedCaptureState::new();
        let level = state.process_chunk(&[0.25; 44_100]);
        assert_eq!(level, 0.25);
        assert_eq!(state.volume_level(), 0.25);
        assert!((state.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_without_start_errors() {
        let mut capture = AudioCapture::new();
        assert!(capture.stop().is_err());
    }
}
