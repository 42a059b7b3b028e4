//! Streaming WAV writer
//!
//! All file I/O happens on a dedicated thread so the audio capture path never
//! blocks on disk. Chunks are sent over a channel and written to the file as
//! they arrive, which keeps memory bounded no matter how long a recording
//! session runs.

use anyhow::{anyhow, Context as _, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::error;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// Recording sample rate in Hz
pub const SAMPLE_RATE: u32 = 44_100;

/// Recordings are mono
pub const CHANNELS: u16 = 1;

/// Recordings are 16-bit integer PCM
pub const BITS_PER_SAMPLE: u16 = 16;

enum WavCommand {
    Write(Vec<f32>),
    Finalize(Sender<Result<()>>),
}

/// Owner of the writer thread. Keep this in the scope that finishes the
/// recording; hand out [`WavSinkHandle`]s to the audio callbacks.
pub struct WavSink {
    tx: Sender<WavCommand>,
    handle: Option<JoinHandle<()>>,
}

/// Cheap clonable sender for feeding chunks into the sink.
#[derive(Clone)]
pub struct WavSinkHandle {
    tx: Sender<WavCommand>,
}

impl WavSink {
    /// Create the output file and spawn the writer thread.
    pub fn create(path: &Path) -> Result<Self> {
        let spec = WavSpec {
            channels: CHANNELS,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file {:?}", path))?;

        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            while let Ok(cmd) = rx.recv() {
                match cmd {
                    WavCommand::Write(samples) => {
                        for sample in samples {
                            let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                            if let Err(e) = writer.write_sample(amplitude) {
                                error!("Failed to write sample: {}", e);
                                return;
                            }
                        }
                    }
                    WavCommand::Finalize(reply) => {
                        let result = writer
                            .finalize()
                            .map_err(|e| anyhow!("failed to finalize WAV file: {}", e));
                        let _ = reply.send(result);
                        return;
                    }
                }
            }
        });

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    pub fn handle(&self) -> WavSinkHandle {
        WavSinkHandle {
            tx: self.tx.clone(),
        }
    }

    /// Flush remaining chunks, patch up the WAV header, and stop the thread.
    pub fn finalize(mut self) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(WavCommand::Finalize(reply_tx))
            .map_err(|_| anyhow!("WAV writer thread is gone"))?;

        let result = reply_rx
            .recv()
            .map_err(|_| anyhow!("WAV writer thread dropped the finalize reply"))?;

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        result
    }
}

impl WavSinkHandle {
    pub fn write_chunk(&self, samples: Vec<f32>) -> Result<()> {
        self.tx
            .send(WavCommand::Write(samples))
            .map_err(|_| anyhow!("WAV writer thread is gone"))
    }
}

/// Generate a fresh path for a temporary recording in the system temp dir.
pub fn temp_wav_path() -> Result<PathBuf> {
    let prefix = format!("echobox_{}_", uuid::Uuid::new_v4().simple());
    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".wav")
        .tempfile()
        .context("failed to create temporary recording file")?;
    let (_file, path) = file
        .keep()
        .context("failed to persist temporary recording file")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_silent_chunks_produce_valid_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.wav");

        let sink = WavSink::create(&path).unwrap();
        let handle = sink.handle();
        for _ in 0..3 {
            handle.write_chunk(vec![0.0f32; 1024]).unwrap();
        }
        sink.finalize().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.sample_format, SampleFormat::Int);
        assert_eq!(reader.len(), 3 * 1024);

        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_samples_are_clamped_and_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scale.wav");

        let sink = WavSink::create(&path).unwrap();
        sink.handle()
            .write_chunk(vec![1.0, -1.0, 2.0, 0.5])
            .unwrap();
        sink.finalize().unwrap();

        let samples: Vec<i16> = hound::WavReader::open(&path)
            .unwrap()
            .into_samples::<i16>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples[0], i16::MAX);
        assert_eq!(samples[1], -i16::MAX);
        assert_eq!(samples[2], i16::MAX);
        assert_eq!(samples[3], (0.5 * i16::MAX as f32) as i16);
    }

    #[test]
    fn test_temp_wav_path_is_unique() {
        let a = temp_wav_path().unwrap();
        let b = temp_wav_path().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "wav");
        std::fs::remove_file(a).unwrap();
        std::fs::remove_file(b).unwrap();
    }
}
