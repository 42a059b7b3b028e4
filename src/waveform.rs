//! Cosmetic waveform animation state
//!
//! The bars are a bounded random walk scaled by the latest reported volume
//! level, not a rendering of actual sample data. Each bar takes the previous
//! bar's height plus a random perturbation, which looks plausibly like speech
//! without being an oscilloscope.

use rand::Rng;

/// Number of bars drawn on the canvas
pub const BAR_COUNT: usize = 60;

/// Canvas height in pixels; bars are clamped to 80% of it
pub const CANVAS_HEIGHT: f32 = 120.0;

const MIN_BAR_HEIGHT: f32 = 2.0;

pub struct WaveformState {
    heights: Vec<f32>,
    amplitude: f32,
    animating: bool,
}

impl WaveformState {
    pub fn new() -> Self {
        Self {
            heights: vec![MIN_BAR_HEIGHT; BAR_COUNT],
            amplitude: 0.0,
            animating: false,
        }
    }

    /// Feed the latest 0-1 volume level. Scaled up slightly so quiet speech
    /// still moves the bars.
    pub fn set_amplitude(&mut self, level: f32) {
        self.amplitude = (level * 1.5).min(1.0);
    }

    pub fn start(&mut self) {
        self.animating = true;
    }

    /// Stop animating and settle back to a flat line.
    pub fn stop(&mut self) {
        self.animating = false;
        self.amplitude = 0.0;
        self.heights.fill(MIN_BAR_HEIGHT);
    }

    pub fn reset(&mut self) {
        self.stop();
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Advance the animation by one frame. No-op while stopped.
    pub fn tick(&mut self, rng: &mut impl Rng) {
        if !self.animating {
            return;
        }

        let max_height = CANVAS_HEIGHT * 0.8;
        for i in 0..self.heights.len() {
            let height = if i == 0 {
                self.amplitude * max_height
            } else {
                let max_diff = (self.amplitude * 20.0).max(5.0);
                self.heights[i - 1] + rng.random_range(-max_diff..=max_diff)
            };
            self.heights[i] = height.clamp(MIN_BAR_HEIGHT, max_height);
        }
    }
}

impl Default for WaveformState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_flat_line_when_idle() {
        let mut waveform = WaveformState::new();
        let mut rng = StdRng::seed_from_u64(7);
        waveform.set_amplitude(0.9);
        waveform.tick(&mut rng);
        assert!(waveform.heights().iter().all(|&h| h == 2.0));
    }

    #[test]
    fn test_heights_stay_within_bounds() {
        let mut waveform = WaveformState::new();
        let mut rng = StdRng::seed_from_u64(42);
        waveform.start();
        waveform.set_amplitude(1.0);
        for _ in 0..200 {
            waveform.tick(&mut rng);
            for &h in waveform.heights() {
                assert!((2.0..=CANVAS_HEIGHT * 0.8).contains(&h));
            }
        }
    }

    #[test]
    fn test_stop_resets_to_flat() {
        let mut waveform = WaveformState::new();
        let mut rng = StdRng::seed_from_u64(1);
        waveform.start();
        waveform.set_amplitude(0.8);
        waveform.tick(&mut rng);
        assert!(waveform.heights().iter().any(|&h| h > 2.0));

        waveform.stop();
        assert!(!waveform.is_animating());
        assert!(waveform.heights().iter().all(|&h| h == 2.0));
    }

    #[test]
    fn test_amplitude_is_clamped() {
        let mut waveform = WaveformState::new();
        waveform.set_amplitude(5.0);
        assert_eq!(waveform.amplitude, 1.0);
    }
}
