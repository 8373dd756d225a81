//! Scenario files and the scripted devices that replay them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::Deserialize;
use vigil_proctoring::{
    AudioInput, CaptureConstraints, CaptureError, CaptureStream, Course, DetectorError,
    DetectorOptions, LandmarkModel, LandmarkModelFactory, MediaDevices, PlaybackError, UserProfile,
    VideoFrame,
};
use vigil_signals::{indices, DetectionFrame, FaceLandmarkSet, LandmarkPoint, Resolution};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub course: Course,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub fail_completion: bool,
    #[serde(default)]
    pub capture: CaptureScript,
    pub events: Vec<TimedEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureScript {
    pub deny: bool,
    pub native_width: u32,
    pub native_height: u32,
    pub playback: PlaybackScript,
}

impl Default for CaptureScript {
    fn default() -> Self {
        Self {
            deny: false,
            native_width: 720,
            native_height: 540,
            playback: PlaybackScript::Ok,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackScript {
    Ok,
    Aborted,
    Failed,
}

#[derive(Debug, Deserialize)]
pub struct TimedEvent {
    pub at_ms: i64,
    #[serde(flatten)]
    pub event: Event,
}

impl TimedEvent {
    /// Event time in microseconds, clamped for out-of-range scenario values
    pub fn timestamp_us(&self) -> i64 {
        self.at_ms.saturating_mul(1_000)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// Camera frame with `faces` synthetic faces
    Frame {
        faces: usize,
        /// Vertical offset between the outer eye corners
        #[serde(default)]
        tilt: f32,
        /// Horizontal shift of the whole mesh, normalized
        #[serde(default)]
        shift: f32,
    },
    /// Camera frame on which the model fails
    FrameError,
    Audio {
        signal: Signal,
        #[serde(default = "unit_gain")]
        gain: f32,
    },
    Blur,
    Tick,
    Answer {
        option: String,
    },
    Next,
    Previous,
    Submit,
    Claim,
    Retake,
}

fn unit_gain() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Silence,
    /// Centered impulse, flat spectrum
    Click,
}

impl Signal {
    pub fn samples(self, len: usize, gain: f32) -> Vec<f32> {
        let mut samples = vec![0.0; len];
        if let (Signal::Click, Some(mid)) = (self, samples.get_mut(len / 2)) {
            *mid = gain;
        }
        samples
    }
}

/// Synthetic face mesh
pub fn synthetic_face(tilt: f32, shift: f32) -> FaceLandmarkSet {
    let mut points = vec![LandmarkPoint::new(0.5 + shift, 0.5); indices::FACE_MESH_POINTS];
    points[indices::LEFT_EYE_OUTER] = LandmarkPoint::new(0.30 + shift, 0.40);
    points[indices::LEFT_EYE_INNER] = LandmarkPoint::new(0.40 + shift, 0.40);
    points[indices::RIGHT_EYE_INNER] = LandmarkPoint::new(0.60 + shift, 0.40 + tilt);
    points[indices::RIGHT_EYE_OUTER] = LandmarkPoint::new(0.70 + shift, 0.40 + tilt);
    FaceLandmarkSet::new(points)
}

pub type DetectionQueue = Rc<RefCell<VecDeque<Result<DetectionFrame, DetectorError>>>>;
pub type AudioBuffer = Rc<RefCell<Vec<f32>>>;

/// Devices driven by the scenario's capture script
pub struct ScriptedDevices {
    pub script: CaptureScript,
    pub audio: AudioBuffer,
}

impl MediaDevices for ScriptedDevices {
    fn get_user_media(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        log::debug!(
            "capture requested at {}x{}",
            constraints.video.width,
            constraints.video.height
        );
        if self.script.deny {
            return Err(CaptureError::PermissionDenied);
        }
        Ok(Box::new(ScriptedStream {
            native: Resolution::new(self.script.native_width, self.script.native_height),
            playback: self.script.playback,
            audio: self.audio.clone(),
        }))
    }
}

struct ScriptedStream {
    native: Resolution,
    playback: PlaybackScript,
    audio: AudioBuffer,
}

impl CaptureStream for ScriptedStream {
    fn wait_until_ready(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        match self.playback {
            PlaybackScript::Ok => Ok(()),
            PlaybackScript::Aborted => Err(PlaybackError::Aborted),
            PlaybackScript::Failed => Err(PlaybackError::Failed("scripted failure".into())),
        }
    }

    fn native_resolution(&self) -> Option<Resolution> {
        Some(self.native)
    }

    fn open_audio(&mut self) -> Result<Box<dyn AudioInput>, CaptureError> {
        Ok(Box::new(ScriptedAudio {
            buffer: self.audio.clone(),
        }))
    }

    fn stop_tracks(&mut self) -> Result<(), CaptureError> {
        log::debug!("media tracks stopped");
        Ok(())
    }
}

struct ScriptedAudio {
    buffer: AudioBuffer,
}

impl AudioInput for ScriptedAudio {
    fn read_samples(&mut self) -> Vec<f32> {
        self.buffer.borrow().clone()
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        log::debug!("audio input closed");
        Ok(())
    }
}

/// Model that returns whatever the replay loop queued for the next frame
pub struct ScriptedModels {
    pub queue: DetectionQueue,
}

impl LandmarkModelFactory for ScriptedModels {
    fn create(&self, options: &DetectorOptions) -> Result<Box<dyn LandmarkModel>, DetectorError> {
        log::debug!("landmark model created: {:?}", options);
        Ok(Box::new(ScriptedModel {
            queue: self.queue.clone(),
        }))
    }
}

struct ScriptedModel {
    queue: DetectionQueue,
}

impl LandmarkModel for ScriptedModel {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<DetectionFrame, DetectorError> {
        self.queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(DetectionFrame::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scenario() {
        let json = r#"{
            "course": {"id": "c1", "title": "Intro", "quizQuestions": [
                {"question": "?", "options": ["a", "b"], "correctAnswer": 1}
            ]},
            "capture": {"playback": "aborted"},
            "events": [
                {"at_ms": 0, "kind": "frame", "faces": 2},
                {"at_ms": 40, "kind": "audio", "signal": "click"},
                {"at_ms": 1000, "kind": "answer", "option": "b"},
                {"at_ms": 1100, "kind": "next"}
            ]
        }"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.events.len(), 4);
        assert_eq!(scenario.capture.native_width, 720);
        assert!(matches!(scenario.capture.playback, PlaybackScript::Aborted));
        assert!(matches!(
            scenario.events[0].event,
            Event::Frame { faces: 2, .. }
        ));
        assert!(matches!(
            scenario.events[1].event,
            Event::Audio { gain, .. } if gain == 1.0
        ));
    }

    #[test]
    fn test_event_time_saturates() {
        let event: TimedEvent =
            serde_json::from_str(r#"{"at_ms": 9223372036854775807, "kind": "blur"}"#).unwrap();
        assert_eq!(event.timestamp_us(), i64::MAX);

        let event: TimedEvent = serde_json::from_str(r#"{"at_ms": 1500, "kind": "tick"}"#).unwrap();
        assert_eq!(event.timestamp_us(), 1_500_000);
    }

    #[test]
    fn test_click_signal() {
        let samples = Signal::Click.samples(512, 0.5);
        assert_eq!(samples[256], 0.5);
        assert_eq!(samples.iter().filter(|&&s| s != 0.0).count(), 1);
        assert!(Signal::Silence.samples(8, 1.0).iter().all(|&s| s == 0.0));
    }
}
