//! Audio playback using PipeWire
//!
//! Streams a loaded recording to the output device on a background thread and
//! tracks the playback position for the UI.

use log::error;
use pipewire as pw;
use pw::spa;
use pw::spa::param::format::{MediaSubtype, MediaType};
use pw::spa::param::format_utils;
use pw::spa::pod::Pod;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Shared state for audio playback - thread-safe
#[derive(Clone)]
pub struct SharedPlaybackState {
    inner: Arc<Mutex<PlaybackStateInner>>,
}

struct PlaybackStateInner {
    /// Audio samples to play
    samples: Vec<f32>,
    /// Sample rate
    sample_rate: u32,
    /// Current playback position (sample index)
    position: usize,
    /// Total duration in seconds
    duration: f64,
    /// Is playback active
    is_playing: bool,
}

impl SharedPlaybackState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlaybackStateInner {
                samples: Vec::new(),
                sample_rate: crate::audio::wav_sink::SAMPLE_RATE,
                position: 0,
                duration: 0.0,
                is_playing: false,
            })),
        }
    }

    /// Load audio samples for playback
    pub fn load(&self, samples: Vec<f32>, sample_rate: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.duration = samples.len() as f64 / sample_rate as f64;
        inner.samples = samples;
        inner.sample_rate = sample_rate;
        inner.position = 0;
    }

    /// Current playback position in seconds
    pub fn current_time(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        inner.position as f64 / inner.sample_rate as f64
    }

    pub fn duration(&self) -> f64 {
        self.inner.lock().unwrap().duration
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().is_playing
    }

    /// Playback progress as a fraction (0.0 - 1.0)
    pub fn progress(&self) -> f32 {
        let inner = self.inner.lock().unwrap();
        if inner.samples.is_empty() {
            0.0
        } else {
            inner.position as f32 / inner.samples.len() as f32
        }
    }

    fn set_playing(&self, playing: bool) {
        self.inner.lock().unwrap().is_playing = playing;
    }

    /// Rewind to the start.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.position = 0;
        inner.is_playing = false;
    }

    /// Take the next block of samples, advancing the position. Returns `None`
    /// once the recording is exhausted.
    fn next_block(&self, count: usize) -> Option<Vec<f32>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.position >= inner.samples.len() {
            inner.is_playing = false;
            return None;
        }

        let end = (inner.position + count).min(inner.samples.len());
        let block = inner.samples[inner.position..end].to_vec();
        inner.position = end;

        if inner.position >= inner.samples.len() {
            inner.is_playing = false;
        }

        Some(block)
    }
}

impl Default for SharedPlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

/// Audio player using PipeWire
pub struct AudioPlayer {
    state: SharedPlaybackState,
    is_running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    sender: Option<pw::channel::Sender<PlaybackCommand>>,
}

enum PlaybackCommand {
    Stop,
}

impl AudioPlayer {
    pub fn new() -> Self {
        Self {
            state: SharedPlaybackState::new(),
            is_running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            sender: None,
        }
    }

    /// Get shared playback state for UI updates
    pub fn shared_state(&self) -> SharedPlaybackState {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Load audio for playback
    pub fn load(&self, samples: Vec<f32>, sample_rate: u32) {
        self.state.load(samples, sample_rate);
    }

    /// Start playback
    pub fn play(&mut self) -> Result<(), String> {
        if self.is_running.load(Ordering::SeqCst) {
            return Err("Playback already running".to_string());
        }

        // Restart from the top if the last run played to the end
        if self.state.progress() >= 0.99 {
            self.state.reset();
        }

        self.state.set_playing(true);
        self.is_running.store(true, Ordering::SeqCst);

        let state = self.state.clone();
        let is_running = self.is_running.clone();

        let (sender, receiver) = pw::channel::channel::<PlaybackCommand>();
        self.sender = Some(sender);

        let handle = thread::spawn(move || {
            if let Err(e) = run_playback_loop(state.clone(), receiver) {
                error!("Playback error: {}", e);
            }
            state.set_playing(false);
            is_running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        if !self.is_running.load(Ordering::SeqCst) {
            return;
        }

        if let Some(sender) = self.sender.take() {
            let _ = sender.send(PlaybackCommand::Stop);
        }

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        self.is_running.store(false, Ordering::SeqCst);
        self.state.set_playing(false);
    }
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run the PipeWire playback loop in a background thread
fn run_playback_loop(
    state: SharedPlaybackState,
    receiver: pw::channel::Receiver<PlaybackCommand>,
) -> Result<(), String> {
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
        PlaybackCommand::Stop => {
            if let Some(mainloop) = mainloop_weak.upgrade() {
                mainloop.quit();
            }
        }
    });

    // User data for the stream callbacks
    struct UserData {
        format: spa::param::audio::AudioInfoRaw,
        state: SharedPlaybackState,
        mainloop_weak: pw::main_loop::MainLoopWeak,
    }

    let user_data = UserData {
        format: Default::default(),
        state: state.clone(),
        mainloop_weak: mainloop.downgrade(),
    };

    // Create playback stream
    let props = pw::properties::properties! {
        *pw::keys::MEDIA_TYPE => "Audio",
        *pw::keys::MEDIA_CATEGORY => "Playback",
        *pw::keys::MEDIA_ROLE => "Music",
        *pw::keys::APP_NAME => "Echobox Voice Recorder",
    };

    let stream = pw::stream::StreamBox::new(&core, "echobox-playback", props)
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

            let _ = user_data.format.parse(param);
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
            let n_channels = user_data.format.channels().max(1) as usize;
            let stride = std::mem::size_of::<f32>() * n_channels;

            let Some(slice) = data.data() else {
                return;
            };

            let n_frames = slice.len() / stride;

            match user_data.state.next_block(n_frames) {
                Some(block) => {
                    // Write mono samples to every output channel
                    for (i, &sample) in block.iter().enumerate() {
                        let offset = i * stride;
                        if offset + std::mem::size_of::<f32>() <= slice.len() {
                            let bytes = sample.to_le_bytes();
                            slice[offset..offset + 4].copy_from_slice(&bytes);
                            if n_channels > 1 && offset + 8 <= slice.len() {
                                slice[offset + 4..offset + 8].copy_from_slice(&bytes);
                            }
                        }
                    }
                    // Fill remainder with silence
                    let written = block.len() * stride;
                    if written < slice.len() {
                        slice[written..].fill(0);
                    }

                    let chunk = data.chunk_mut();
                    *chunk.offset_mut() = 0;
                    *chunk.stride_mut() = stride as i32;
                    *chunk.size_mut() = (block.len() * stride) as u32;
                }
                None => {
                    // Played to the end - stop the loop
                    if let Some(mainloop) = user_data.mainloop_weak.upgrade() {
                        mainloop.quit();
                    }
                }
            }
        })
        .register()
        .map_err(|e| format!("Failed to register stream listener: {}", e))?;

    // Request F32LE at the recording's sample rate
    let sample_rate = {
        let inner = state.inner.lock().unwrap();
        inner.sample_rate
    };
    let mut audio_info = spa::param::audio::AudioInfoRaw::new();
    audio_info.set_format(spa::param::audio::AudioFormat::F32LE);
    audio_info.set_rate(sample_rate);

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

    // Connect the stream (Output direction for playback)
    stream
        .connect(
            spa::utils::Direction::Output,
            None,
            pw::stream::StreamFlags::AUTOCONNECT
                | pw::stream::StreamFlags::MAP_BUFFERS
                | pw::stream::StreamFlags::RT_PROCESS,
            &mut params,
        )
        .map_err(|e| format!("Failed to connect stream: {}", e))?;

    // Run until stopped or playback ends
    mainloop.run();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_block_advances_and_exhausts() {
        let state = SharedPlaybackState::new();
        state.load(vec![0.1; 10], 44_100);
        state.set_playing(true);

        assert_eq!(state.next_block(4).unwrap().len(), 4);
        assert_eq!(state.next_block(4).unwrap().len(), 4);
        assert_eq!(state.next_block(4).unwrap().len(), 2);
        assert!(!state.is_playing());
        assert!(state.next_block(4).is_none());
        assert_eq!(state.progress(), 1.0);
    }

    #[test]
    fn test_duration_from_sample_rate() {
        let state = SharedPlaybackState::new();
        state.load(vec![0.0; 44_100], 44_100);
        assert!((state.duration() - 1.0).abs() < 1e-9);
        assert_eq!(state.current_time(), 0.0);
    }
}
