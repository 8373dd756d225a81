//! Capture and Detection Interfaces
//!
//! The host environment (browser bindings, native camera stack, or test
//! fakes) implements these traits; the controller only talks to them.
//!
//! - `MediaDevices` grants a combined video+audio `CaptureStream`
//! - `CaptureStream` exposes playback, native size, audio and track stop
//! - `AudioInput` yields raw microphone samples for the analyser
//! - `LandmarkModel` runs face-mesh detection on one video frame
//! - `DetectionObserver` receives every detection result

use thiserror::Error;
use vigil_signals::{DetectionFrame, Resolution};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("capture permission denied")]
    PermissionDenied,
    #[error("no capture device available")]
    NotFound,
    #[error("stream metadata unavailable: {0}")]
    Metadata(String),
    #[error("audio input error: {0}")]
    Audio(String),
    #[error("failed to stop media tracks: {0}")]
    TrackStop(String),
    #[error("capture error: {0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Playback interrupted by a teardown that raced with start
    #[error("playback aborted")]
    Aborted,
    #[error("playback failed: {0}")]
    Failed(String),
}

impl PlaybackError {
    /// Expected during fast unmounts; not worth an error log
    pub fn is_benign(&self) -> bool {
        matches!(self, PlaybackError::Aborted)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("detector initialization failed: {0}")]
    Init(String),
    #[error("detector inference failed: {0}")]
    Inference(String),
    #[error("detector panicked")]
    Panicked,
}

/// What to request from the capture devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub video: Resolution,
    pub audio: bool,
}

/// Landmark model options
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOptions {
    pub max_faces: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

/// One video frame handed to the detector
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub timestamp_us: i64,
    pub resolution: Resolution,
    /// Packed RGBA pixels; may be empty when the host feeds the
    /// detector out of band
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub fn new(timestamp_us: i64, resolution: Resolution) -> Self {
        Self {
            timestamp_us,
            resolution,
            data: Vec::new(),
        }
    }
}

pub trait MediaDevices {
    /// Request camera and microphone access
    fn get_user_media(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

pub trait CaptureStream {
    /// Block until the stream knows its native dimensions
    fn wait_until_ready(&mut self) -> Result<(), CaptureError>;

    fn play(&mut self) -> Result<(), PlaybackError>;

    /// Native video size, once known
    fn native_resolution(&self) -> Option<Resolution>;

    /// Open the captured audio track for analysis
    fn open_audio(&mut self) -> Result<Box<dyn AudioInput>, CaptureError>;

    /// Stop every media track of the stream
    fn stop_tracks(&mut self) -> Result<(), CaptureError>;
}

pub trait AudioInput {
    /// Samples in [-1, 1] captured since the previous call
    fn read_samples(&mut self) -> Vec<f32>;

    fn close(&mut self) -> Result<(), CaptureError>;
}

pub trait LandmarkModel {
    /// Run detection on one frame; at most one call is in flight at a time
    fn detect(&mut self, frame: &VideoFrame) -> Result<DetectionFrame, DetectorError>;
}

pub trait LandmarkModelFactory {
    fn create(&self, options: &DetectorOptions) -> Result<Box<dyn LandmarkModel>, DetectorError>;
}

/// Subscription interface for detection results
pub trait DetectionObserver {
    fn on_detection(&mut self, frame: &DetectionFrame, timestamp_us: i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_abort_is_benign() {
        assert!(PlaybackError::Aborted.is_benign());
        assert!(!PlaybackError::Failed("NotAllowedError".into()).is_benign());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CaptureError::PermissionDenied.to_string(),
            "capture permission denied"
        );
        assert_eq!(
            DetectorError::Inference("bad frame".into()).to_string(),
            "detector inference failed: bad frame"
        );
    }
}
