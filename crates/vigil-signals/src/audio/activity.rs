//! Speaking detection from spectrum energy.
//!
//! The flag is recomputed from scratch on every tick: mean byte magnitude
//! across all bins compared against a fixed calibration threshold.

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct AudioActivityConfig {
    /// Mean byte magnitude above which the learner counts as speaking
    pub speaking_threshold: f32,
}

impl Default for AudioActivityConfig {
    fn default() -> Self {
        Self {
            speaking_threshold: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AudioActivityState {
    pub is_speaking: bool,
    /// Mean byte magnitude of the latest tick
    pub last_level: f32,
}

pub struct AudioActivityDetector {
    config: AudioActivityConfig,
    state: AudioActivityState,
}

impl AudioActivityDetector {
    pub fn new() -> Self {
        Self::with_config(AudioActivityConfig::default())
    }

    pub fn with_config(config: AudioActivityConfig) -> Self {
        Self {
            config,
            state: AudioActivityState::default(),
        }
    }

    /// Update from one tick of byte frequency data
    pub fn update(&mut self, spectrum: &[u8]) -> AudioActivityState {
        let level = if spectrum.is_empty() {
            0.0
        } else {
            spectrum.iter().map(|&b| b as u32).sum::<u32>() as f32 / spectrum.len() as f32
        };
        self.state = AudioActivityState {
            is_speaking: level > self.config.speaking_threshold,
            last_level: level,
        };
        self.state
    }

    pub fn state(&self) -> AudioActivityState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = AudioActivityState::default();
    }
}

impl Default for AudioActivityDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict() {
        let mut detector = AudioActivityDetector::new();
        assert!(!detector.update(&[8; 256]).is_speaking);
        assert!(detector.update(&[9; 256]).is_speaking);
    }

    #[test]
    fn test_every_tick_overwrites() {
        let mut detector = AudioActivityDetector::new();
        detector.update(&[200; 256]);
        assert!(detector.state().is_speaking);

        let state = detector.update(&[0; 256]);
        assert!(!state.is_speaking);
        assert_eq!(state.last_level, 0.0);
    }

    #[test]
    fn test_mean_over_all_bins() {
        let mut detector = AudioActivityDetector::new();
        let mut spectrum = vec![0u8; 256];
        // 8 loud bins of 255 -> mean 7.97, still quiet
        spectrum[..8].fill(255);
        let state = detector.update(&spectrum);
        assert!(!state.is_speaking);
        assert!((state.last_level - 7.96875).abs() < 1e-4);

        spectrum[8] = 255;
        assert!(detector.update(&spectrum).is_speaking);
    }

    #[test]
    fn test_empty_spectrum_is_silent() {
        let mut detector = AudioActivityDetector::new();
        assert!(!detector.update(&[]).is_speaking);
    }
}
