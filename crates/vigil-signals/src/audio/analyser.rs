//! Spectrum Analyser
//!
//! Frequency-domain view of the most recent `fft_size` microphone samples,
//! scaled the way a browser analyser node reports byte frequency data:
//! Blackman window, |X[k]| / N, exponential smoothing over time, decibels,
//! then a linear map of `[min_decibels, max_decibels]` onto `0..=255`.

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

/// Analyser configuration
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// Transform window in samples (power of two)
    pub fft_size: usize,
    /// Weight of the previous spectrum in [0, 1)
    pub smoothing_time_constant: f32,
    /// Magnitude mapped to byte 0
    pub min_decibels: f32,
    /// Magnitude mapped to byte 255
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

pub struct SpectrumAnalyser {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    samples: VecDeque<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex32>,
}

impl SpectrumAnalyser {
    pub fn new() -> Self {
        Self::with_config(AnalyserConfig::default())
    }

    pub fn with_config(config: AnalyserConfig) -> Self {
        let n = config.fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);

        let window = (0..n)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / n as f32;
                0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
            })
            .collect();

        Self {
            fft,
            window,
            samples: VecDeque::from(vec![0.0; n]),
            smoothed: vec![0.0; n / 2],
            scratch: vec![Complex32::new(0.0, 0.0); n],
            config: AnalyserConfig { fft_size: n, ..config },
        }
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    /// Number of frequency bins, half the window
    pub fn frequency_bin_count(&self) -> usize {
        self.config.fft_size / 2
    }

    /// Append time-domain samples in [-1, 1]; only the newest window is kept
    pub fn push_samples(&mut self, samples: &[f32]) {
        let n = self.config.fft_size;
        let take = samples.len().min(n);
        for &s in &samples[samples.len() - take..] {
            if self.samples.len() == n {
                self.samples.pop_front();
            }
            self.samples.push_back(s);
        }
    }

    /// Current byte frequency data, one value per bin
    pub fn byte_frequency_data(&mut self) -> Vec<u8> {
        self.update_spectrum();

        let range = self.config.max_decibels - self.config.min_decibels;
        let scale = if range > 0.0 { 255.0 / range } else { 0.0 };

        self.smoothed
            .iter()
            .map(|&mag| {
                let db = if mag > 0.0 { 20.0 * mag.log10() } else { f32::NEG_INFINITY };
                let scaled = (db - self.config.min_decibels) * scale;
                scaled.floor().clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    fn update_spectrum(&mut self) {
        let n = self.config.fft_size;
        for (i, (slot, &s)) in self.scratch.iter_mut().zip(self.samples.iter()).enumerate() {
            *slot = Complex32::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.config.smoothing_time_constant.clamp(0.0, 1.0);
        let inv_n = 1.0 / n as f32;
        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let mag = self.scratch[k].norm() * inv_n;
            let next = tau * *smoothed + (1.0 - tau) * mag;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }
    }

    /// Drop buffered samples and smoothing history
    pub fn reset(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.smoothed.iter_mut().for_each(|m| *m = 0.0);
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}
