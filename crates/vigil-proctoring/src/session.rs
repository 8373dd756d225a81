//! Proctoring Session
//!
//! Owns every tracker for one quiz attempt:
//! - Face presence (gap sessions)
//! - Multi-face events
//! - Head tilt / gaze / micro-movement accumulators
//! - Speaking flag
//! - Focus loss count
//!
//! Lifecycle is explicit: create, observe many times, read snapshots,
//! `reset` on retake. Nothing here touches devices.

use serde::Serialize;
use vigil_signals::{
    AudioActivityDetector, AudioActivityState, BoundingBox, DetectionFrame, FeatureExtractor,
    MetricSet, MetricSummary, Resolution,
};

use crate::config::VigilConfig;
use crate::devices::DetectionObserver;
use crate::driver::DriverStats;
use crate::focus::{FocusLossState, FocusLossTracker};
use crate::multi_face::{MultiFaceState, MultiFaceTracker};
use crate::presence::{FacePresenceState, FacePresenceTracker, PresenceEvent};

/// Read-only view of all proctoring signals, taken once per render
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProctoringSnapshot {
    /// False when capture or model setup failed
    pub proctoring_enabled: bool,
    pub presence: FacePresenceState,
    pub multi_face: MultiFaceState,
    pub audio: AudioActivityState,
    pub head_pose: MetricSummary,
    pub eye_gaze: MetricSummary,
    pub micro_movement: MetricSummary,
    pub focus: FocusLossState,
    /// Primary face outline for the overlay
    pub face_box: Option<BoundingBox>,
    pub pipeline: DriverStats,
    pub detector_failures: u64,
    /// Faces whose mesh lacked the eye landmarks
    pub feature_errors: u64,
}

pub struct ProctoringSession {
    extractor: FeatureExtractor,
    metrics: MetricSet,
    presence: FacePresenceTracker,
    multi_face: MultiFaceTracker,
    audio: AudioActivityDetector,
    focus: FocusLossTracker,
    feature_errors: u64,
    frames_observed: u64,
}

impl ProctoringSession {
    pub fn new(resolution: Resolution, started_at_us: i64) -> Self {
        Self::with_config(&VigilConfig::default(), resolution, started_at_us)
    }

    pub fn with_config(config: &VigilConfig, resolution: Resolution, started_at_us: i64) -> Self {
        Self {
            extractor: FeatureExtractor::new(resolution),
            metrics: MetricSet::new(),
            presence: FacePresenceTracker::with_config(config.presence.clone(), started_at_us),
            multi_face: MultiFaceTracker::new(),
            audio: AudioActivityDetector::with_config(config.audio.activity()),
            focus: FocusLossTracker::new(),
            feature_errors: 0,
            frames_observed: 0,
        }
    }

    /// Pixel scale for micro-movement
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.extractor.set_resolution(resolution);
    }

    /// Detection is about to start; absence is measured from `now_us`
    /// until the first frame arrives.
    pub fn detector_started(&mut self, now_us: i64) {
        if self.frames_observed == 0 {
            self.presence.reset(now_us);
        }
    }

    /// Apply one detection result to every tracker
    pub fn observe_detection(&mut self, frame: &DetectionFrame, timestamp_us: i64) {
        self.frames_observed += 1;
        let face_count = frame.face_count();

        self.multi_face.observe(face_count);

        match self.presence.observe(face_count > 0, timestamp_us) {
            Some(PresenceEvent::GapStarted) => {
                log::info!("face missing since {} us", timestamp_us);
            }
            Some(PresenceEvent::GapEnded { duration_secs }) => {
                log::info!("face back after {:.1}s", duration_secs);
            }
            None => {}
        }

        match self.extractor.extract(frame) {
            Ok(Some(sample)) => self.metrics.apply(&sample),
            Ok(None) => {}
            Err(e) => {
                self.feature_errors += 1;
                log::warn!("skipping face metrics for frame at {} us: {}", timestamp_us, e);
            }
        }
    }

    /// Apply one tick of analyser output
    pub fn observe_spectrum(&mut self, spectrum: &[u8]) -> AudioActivityState {
        self.audio.update(spectrum)
    }

    pub fn observe_blur(&mut self) {
        self.focus.on_blur();
        log::debug!("window lost focus ({} total)", self.focus.state().loss_count);
    }

    pub fn frames_observed(&self) -> u64 {
        self.frames_observed
    }

    pub fn snapshot(&self) -> ProctoringSnapshot {
        ProctoringSnapshot {
            proctoring_enabled: false,
            presence: self.presence.state(),
            multi_face: self.multi_face.state(),
            audio: self.audio.state(),
            head_pose: self.metrics.head_tilt.summary(),
            eye_gaze: self.metrics.gaze.summary(),
            micro_movement: self.metrics.micro_movement.summary(),
            focus: self.focus.state(),
            face_box: None,
            pipeline: DriverStats::default(),
            detector_failures: 0,
            feature_errors: self.feature_errors,
        }
    }

    /// Zero every tracker as if the session had just been created at `now_us`
    pub fn reset(&mut self, now_us: i64) {
        self.extractor.reset();
        self.metrics.reset();
        self.presence.reset(now_us);
        self.multi_face.reset();
        self.audio.reset();
        self.focus.reset();
        self.feature_errors = 0;
        self.frames_observed = 0;
    }
}

impl DetectionObserver for ProctoringSession {
    fn on_detection(&mut self, frame: &DetectionFrame, timestamp_us: i64) {
        self.observe_detection(frame, timestamp_us);
    }
}
