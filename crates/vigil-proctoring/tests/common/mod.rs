#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use vigil_proctoring::{
    AudioInput, CaptureConstraints, CaptureError, CaptureStream, DetectorError, DetectorOptions,
    LandmarkModel, LandmarkModelFactory, MediaDevices, PlaybackError, VideoFrame,
};
use vigil_signals::{indices, DetectionFrame, FaceLandmarkSet, LandmarkPoint, Resolution};

pub const SEC: i64 = 1_000_000;

/// What the fake devices saw
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub requests: Vec<CaptureConstraints>,
    pub plays: u32,
    pub track_stops: u32,
    pub audio_closes: u32,
}

pub type SharedLog = Rc<RefCell<DeviceLog>>;

#[derive(Clone)]
pub struct FakeDevices {
    pub log: SharedLog,
    pub deny: bool,
    pub metadata_error: bool,
    pub play_result: Result<(), PlaybackError>,
    pub native: Option<Resolution>,
    pub audio_error: bool,
    /// Samples returned by every audio read
    pub audio: Rc<RefCell<Vec<f32>>>,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self {
            log: SharedLog::default(),
            deny: false,
            metadata_error: false,
            play_result: Ok(()),
            native: Some(Resolution::new(640, 480)),
            audio_error: false,
            audio: Rc::new(RefCell::new(silence())),
        }
    }
}

impl MediaDevices for FakeDevices {
    fn get_user_media(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        self.log.borrow_mut().requests.push(*constraints);
        if self.deny {
            return Err(CaptureError::PermissionDenied);
        }
        Ok(Box::new(FakeStream {
            devices: self.clone(),
        }))
    }
}

struct FakeStream {
    devices: FakeDevices,
}

impl CaptureStream for FakeStream {
    fn wait_until_ready(&mut self) -> Result<(), CaptureError> {
        if self.devices.metadata_error {
            Err(CaptureError::Metadata("no video track".into()))
        } else {
            Ok(())
        }
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.devices.log.borrow_mut().plays += 1;
        self.devices.play_result.clone()
    }

    fn native_resolution(&self) -> Option<Resolution> {
        self.devices.native
    }

    fn open_audio(&mut self) -> Result<Box<dyn AudioInput>, CaptureError> {
        if self.devices.audio_error {
            return Err(CaptureError::Audio("no audio track".into()));
        }
        Ok(Box::new(FakeAudio {
            log: self.devices.log.clone(),
            samples: self.devices.audio.clone(),
        }))
    }

    fn stop_tracks(&mut self) -> Result<(), CaptureError> {
        self.devices.log.borrow_mut().track_stops += 1;
        Ok(())
    }
}

struct FakeAudio {
    log: SharedLog,
    samples: Rc<RefCell<Vec<f32>>>,
}

impl AudioInput for FakeAudio {
    fn read_samples(&mut self) -> Vec<f32> {
        self.samples.borrow().clone()
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        self.log.borrow_mut().audio_closes += 1;
        Ok(())
    }
}

pub fn silence() -> Vec<f32> {
    vec![0.0; 512]
}

/// Unit impulse at the window center: flat spectrum across every bin
pub fn click() -> Vec<f32> {
    let mut samples = silence();
    samples[256] = 1.0;
    samples
}

pub enum Scripted {
    Frame(DetectionFrame),
    Fail(DetectorError),
    Panic,
}

/// Landmark model replaying a script; an empty script yields empty frames
#[derive(Clone, Default)]
pub struct ScriptedModels {
    pub script: Rc<RefCell<VecDeque<Scripted>>>,
    pub options: Rc<RefCell<Option<DetectorOptions>>>,
    pub fail_init: bool,
}

impl ScriptedModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, step: Scripted) {
        self.script.borrow_mut().push_back(step);
    }
}

impl LandmarkModelFactory for ScriptedModels {
    fn create(&self, options: &DetectorOptions) -> Result<Box<dyn LandmarkModel>, DetectorError> {
        *self.options.borrow_mut() = Some(options.clone());
        if self.fail_init {
            return Err(DetectorError::Init("wasm backend unavailable".into()));
        }
        Ok(Box::new(ScriptedModel {
            script: self.script.clone(),
        }))
    }
}

struct ScriptedModel {
    script: Rc<RefCell<VecDeque<Scripted>>>,
}

impl LandmarkModel for ScriptedModel {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<DetectionFrame, DetectorError> {
        let step = self.script.borrow_mut().pop_front();
        match step {
            Some(Scripted::Frame(frame)) => Ok(frame),
            Some(Scripted::Fail(e)) => Err(e),
            Some(Scripted::Panic) => panic!("model crashed"),
            None => Ok(DetectionFrame::empty()),
        }
    }
}

/// Full mesh with a level gaze and a slight tilt
pub fn face() -> FaceLandmarkSet {
    let mut points = vec![LandmarkPoint::new(0.5, 0.5); indices::FACE_MESH_POINTS];
    points[indices::LEFT_EYE_OUTER] = LandmarkPoint::new(0.30, 0.40);
    points[indices::LEFT_EYE_INNER] = LandmarkPoint::new(0.40, 0.40);
    points[indices::RIGHT_EYE_INNER] = LandmarkPoint::new(0.60, 0.41);
    points[indices::RIGHT_EYE_OUTER] = LandmarkPoint::new(0.70, 0.41);
    FaceLandmarkSet::new(points)
}

pub fn faces(n: usize) -> DetectionFrame {
    DetectionFrame::new((0..n).map(|_| face()).collect())
}

pub fn video_frame(timestamp_us: i64) -> VideoFrame {
    VideoFrame::new(timestamp_us, Resolution::new(640, 480))
}
