//! Audio module
//!
//! Live microphone analysis for the proctoring panel.
//!
//! - `SpectrumAnalyser` - windowed FFT with byte-scaled magnitude output
//! - `AudioActivityDetector` - mean-energy speaking flag

mod activity;
mod analyser;

pub use activity::{AudioActivityConfig, AudioActivityDetector, AudioActivityState};
pub use analyser::{AnalyserConfig, SpectrumAnalyser};
