//! WAV file loading for playback

use anyhow::{Context as _, Result};
use std::path::Path;

/// Load a WAV file as f32 samples. Returns the samples and sample rate.
///
/// Integer formats are scaled to the -1.0..1.0 range; multi-channel files
/// keep their interleaving (recordings made by this app are mono).
pub fn load_samples(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open WAV file {:?}", path))?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;

    let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect()
        }
    };

    let samples = samples.with_context(|| format!("failed to read samples from {:?}", path))?;

    Ok((samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav_sink::WavSink;

    #[test]
    fn test_loads_what_the_sink_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");

        let sink = WavSink::create(&path).unwrap();
        sink.handle().write_chunk(vec![0.0, 0.5, -0.5]).unwrap();
        sink.finalize().unwrap();

        let (samples, rate) = load_samples(&path).unwrap();
        assert_eq!(rate, 44_100);
        assert_eq!(samples.len(), 3);
        assert!(samples[0].abs() < 1e-4);
        assert!((samples[1] - 0.5).abs() < 1e-3);
        assert!((samples[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_samples("/nonexistent/take.wav").is_err());
    }
}
