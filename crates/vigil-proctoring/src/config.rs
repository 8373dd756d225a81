use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use vigil_signals::{AnalyserConfig, AudioActivityConfig, Resolution};

use crate::devices::{CaptureConstraints, DetectorOptions};
use crate::gate::CheatPolicy;
use crate::presence::PresenceConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub capture: CaptureConfig,
    pub detector: DetectorConfig,
    pub presence: PresenceConfig,
    pub audio: AudioConfig,
    pub quiz: QuizConfig,
    pub cheat_policy: CheatPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Requested video width (pixels)
    pub width: u32,
    /// Requested video height (pixels)
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Maximum faces reported per frame
    pub max_faces: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Analyser window in samples
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    /// Mean byte magnitude above which the learner is speaking
    pub speaking_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Countdown length (seconds)
    pub duration_secs: u32,
    /// Minimum score to pass (percent)
    pub pass_percent: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 720,
            height: 540,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_faces: 5,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        let analyser = AnalyserConfig::default();
        Self {
            fft_size: analyser.fft_size,
            smoothing_time_constant: analyser.smoothing_time_constant,
            min_decibels: analyser.min_decibels,
            max_decibels: analyser.max_decibels,
            speaking_threshold: AudioActivityConfig::default().speaking_threshold,
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            duration_secs: 600,
            pass_percent: 70,
        }
    }
}

impl CaptureConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            video: self.resolution(),
            audio: true,
        }
    }
}

impl DetectorConfig {
    pub fn options(&self) -> DetectorOptions {
        DetectorOptions {
            max_faces: self.max_faces,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
        }
    }
}

impl AudioConfig {
    pub fn analyser(&self) -> AnalyserConfig {
        AnalyserConfig {
            fft_size: self.fft_size,
            smoothing_time_constant: self.smoothing_time_constant,
            min_decibels: self.min_decibels,
            max_decibels: self.max_decibels,
        }
    }

    pub fn activity(&self) -> AudioActivityConfig {
        AudioActivityConfig {
            speaking_threshold: self.speaking_threshold,
        }
    }
}

impl VigilConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: VigilConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    /// Variables are prefixed with VIGIL_, e.g. VIGIL_QUIZ_DURATION_SECS=900
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults, then the file if it exists, then environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        env_override("VIGIL_CAPTURE_WIDTH", &mut self.capture.width)?;
        env_override("VIGIL_CAPTURE_HEIGHT", &mut self.capture.height)?;
        env_override("VIGIL_DETECTOR_MAX_FACES", &mut self.detector.max_faces)?;
        env_override(
            "VIGIL_PRESENCE_ABSENCE_THRESHOLD_SECS",
            &mut self.presence.absence_threshold_secs,
        )?;
        env_override(
            "VIGIL_AUDIO_SPEAKING_THRESHOLD",
            &mut self.audio.speaking_threshold,
        )?;
        env_override("VIGIL_QUIZ_DURATION_SECS", &mut self.quiz.duration_secs)?;
        env_override("VIGIL_QUIZ_PASS_PERCENT", &mut self.quiz.pass_percent)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ConfigError::Validation(
                "capture width and height must be positive".to_string(),
            ));
        }
        if self.detector.max_faces == 0 {
            return Err(ConfigError::Validation(
                "detector.max_faces must be at least 1".to_string(),
            ));
        }
        for (name, v) in [
            ("min_detection_confidence", self.detector.min_detection_confidence),
            ("min_tracking_confidence", self.detector.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::Validation(format!(
                    "detector.{} must be in [0, 1]",
                    name
                )));
            }
        }
        if self.presence.absence_threshold_secs <= 0.0 {
            return Err(ConfigError::Validation(
                "presence.absence_threshold_secs must be positive".to_string(),
            ));
        }
        if !self.audio.fft_size.is_power_of_two() || !(32..=32_768).contains(&self.audio.fft_size) {
            return Err(ConfigError::Validation(
                "audio.fft_size must be a power of two in [32, 32768]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.audio.smoothing_time_constant) {
            return Err(ConfigError::Validation(
                "audio.smoothing_time_constant must be in [0, 1]".to_string(),
            ));
        }
        if self.audio.min_decibels >= self.audio.max_decibels {
            return Err(ConfigError::Validation(
                "audio.min_decibels must be below audio.max_decibels".to_string(),
            ));
        }
        if self.audio.speaking_threshold < 0.0 {
            return Err(ConfigError::Validation(
                "audio.speaking_threshold must be non-negative".to_string(),
            ));
        }
        if self.quiz.duration_secs == 0 {
            return Err(ConfigError::Validation(
                "quiz.duration_secs must be positive".to_string(),
            ));
        }
        if self.quiz.pass_percent > 100 {
            return Err(ConfigError::Validation(
                "quiz.pass_percent must be <= 100".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_override<T: FromStr>(name: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var(name) {
        *target = val
            .parse()
            .map_err(|_| ConfigError::Validation(format!("Invalid {}", name)))?;
    }
    Ok(())
}
