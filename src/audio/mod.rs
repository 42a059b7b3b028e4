//! Audio capture and playback using PipeWire
//!
//! This module provides:
//! - Microphone capture at 44.1kHz mono with per-chunk volume events
//! - A streaming WAV sink that writes chunks to disk as they arrive
//! - Playback of saved recordings with position tracking

mod capture;
mod playback;
pub mod wav_file;
pub mod wav_sink;

pub use capture::{AudioCapture, CaptureEvent, CaptureState, SharedCaptureState};
pub use playback::{AudioPlayer, SharedPlaybackState};
