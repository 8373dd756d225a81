//! Session Controller
//!
//! Wires the capture devices, the landmark model, the spectrum analyser and
//! the proctoring session together, and owns their lifecycle.
//!
//! # Startup
//! Capture, metadata, playback, overlay, audio analyser, landmark model,
//! presence clock, frame driver, audio loop. Any failure leaves the
//! controller `Disabled`; the quiz keeps working without proctoring.
//!
//! # Teardown
//! Three independently guarded steps that each run at most once: stop the
//! frame driver, stop the media tracks, close the audio input. They also
//! run when startup fails part way. After teardown, late detection results
//! and animation ticks are ignored.

use std::panic::{catch_unwind, AssertUnwindSafe};

use vigil_signals::{DetectionFrame, SpectrumAnalyser};

use crate::config::VigilConfig;
use crate::devices::{
    AudioInput, CaptureError, CaptureStream, DetectionObserver, DetectorError, LandmarkModel,
    LandmarkModelFactory, MediaDevices, VideoFrame,
};
use crate::driver::{DetectionTicket, FrameDriver};
use crate::overlay::Overlay;
use crate::session::{ProctoringSession, ProctoringSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ControllerStatus {
    /// Not started yet
    Idle,
    Running,
    /// Startup failed; proctoring is off
    Disabled,
    Disposed,
}

pub struct SessionController {
    config: VigilConfig,
    status: ControllerStatus,
    session: ProctoringSession,
    overlay: Overlay,
    driver: FrameDriver,
    stream: Option<Box<dyn CaptureStream>>,
    audio_input: Option<Box<dyn AudioInput>>,
    analyser: Option<SpectrumAnalyser>,
    model: Option<Box<dyn LandmarkModel>>,
    observers: Vec<Box<dyn DetectionObserver>>,
    detector_failures: u64,
    driver_released: bool,
}

impl SessionController {
    pub fn new(config: VigilConfig, started_at_us: i64) -> Self {
        let resolution = config.capture.resolution();
        Self {
            session: ProctoringSession::with_config(&config, resolution, started_at_us),
            overlay: Overlay::new(resolution),
            config,
            status: ControllerStatus::Idle,
            driver: FrameDriver::new(),
            stream: None,
            audio_input: None,
            analyser: None,
            model: None,
            observers: Vec::new(),
            detector_failures: 0,
            driver_released: false,
        }
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    pub fn is_disposed(&self) -> bool {
        self.status == ControllerStatus::Disposed
    }

    pub fn session(&self) -> &ProctoringSession {
        &self.session
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Extra receiver for every accepted detection result
    pub fn subscribe(&mut self, observer: Box<dyn DetectionObserver>) {
        self.observers.push(observer);
    }

    /// Bring up capture and detection. Never fails: on error the controller
    /// logs, keeps whatever was acquired for teardown, and turns `Disabled`.
    pub fn start(
        &mut self,
        devices: &mut dyn MediaDevices,
        models: &dyn LandmarkModelFactory,
        now_us: i64,
    ) -> ControllerStatus {
        if self.status != ControllerStatus::Idle {
            log::debug!("start ignored in state {:?}", self.status);
            return self.status;
        }

        self.status = match self.try_start(devices, models, now_us) {
            Ok(()) => {
                log::info!(
                    "proctoring started at {}x{}",
                    self.overlay.resolution().width,
                    self.overlay.resolution().height
                );
                ControllerStatus::Running
            }
            Err(e) => {
                log::error!("proctoring disabled: {}", e);
                self.release_devices();
                ControllerStatus::Disabled
            }
        };
        self.status
    }

    fn try_start(
        &mut self,
        devices: &mut dyn MediaDevices,
        models: &dyn LandmarkModelFactory,
        now_us: i64,
    ) -> Result<(), StartupError> {
        let requested = self.config.capture.resolution();

        // 1. capture
        let stream = devices.get_user_media(&self.config.capture.constraints())?;
        let stream = self.stream.insert(stream);

        // 2. metadata
        stream.wait_until_ready()?;

        // 3. playback
        match stream.play() {
            Ok(()) => {}
            Err(e) if e.is_benign() => log::debug!("video playback interrupted: {}", e),
            Err(e) => log::error!("video playback failed: {}", e),
        }

        // 4. overlay
        let native = stream.native_resolution();
        self.overlay = Overlay::sized_for(native, requested);
        self.session.set_resolution(self.overlay.resolution());

        // 5. audio analyser
        let audio = stream.open_audio()?;
        self.audio_input = Some(audio);
        self.analyser = Some(SpectrumAnalyser::with_config(self.config.audio.analyser()));

        // 6. landmark model
        let model = models
            .create(&self.config.detector.options())
            .map_err(StartupError::Detector)?;
        self.model = Some(model);

        // 7. presence clock starts with the detector; results reach the
        // session through finish_detection
        self.session.detector_started(now_us);

        // 8. frame driver
        self.driver.start();

        // 9. audio loop is armed by the analyser being present
        Ok(())
    }

    /// Take the detection slot for a frame. Hosts running the model
    /// themselves call this, then `finish_detection` with the result.
    pub fn begin_detection(&mut self, timestamp_us: i64) -> Option<DetectionTicket> {
        if self.is_disposed() {
            return None;
        }
        self.driver.begin(timestamp_us)
    }

    /// Apply a detection result; stale or failed results are dropped
    pub fn finish_detection(
        &mut self,
        ticket: DetectionTicket,
        result: Result<DetectionFrame, DetectorError>,
    ) {
        let timestamp_us = ticket.timestamp_us();
        if !self.driver.complete(ticket) || self.is_disposed() {
            log::debug!("discarding detection result from {} us", timestamp_us);
            return;
        }

        match result {
            Ok(frame) => {
                self.session.observe_detection(&frame, timestamp_us);
                self.overlay.on_detection(&frame, timestamp_us);
                for observer in self.observers.iter_mut() {
                    observer.on_detection(&frame, timestamp_us);
                }
            }
            Err(e) => {
                self.detector_failures += 1;
                log::warn!("skipping frame at {} us: {}", timestamp_us, e);
            }
        }
    }

    /// Run the owned model on a camera frame, if no detection is in flight
    pub fn on_video_frame(&mut self, frame: &VideoFrame) {
        let Some(ticket) = self.begin_detection(frame.timestamp_us) else {
            return;
        };
        let result = match self.model.as_mut() {
            Some(model) => catch_unwind(AssertUnwindSafe(|| model.detect(frame)))
                .unwrap_or(Err(DetectorError::Panicked)),
            None => Err(DetectorError::Inference("model not loaded".to_string())),
        };
        self.finish_detection(ticket, result);
    }

    /// One audio-loop step. Returns `false` once the loop should stop.
    pub fn on_animation_frame(&mut self) -> bool {
        if self.status != ControllerStatus::Running {
            return false;
        }
        let (Some(input), Some(analyser)) = (self.audio_input.as_mut(), self.analyser.as_mut())
        else {
            return false;
        };

        let samples = input.read_samples();
        analyser.push_samples(&samples);
        let spectrum = analyser.byte_frequency_data();
        let state = self.session.observe_spectrum(&spectrum);
        log::trace!("audio level {:.2}", state.last_level);
        true
    }

    pub fn on_window_blur(&mut self) {
        if !self.is_disposed() {
            self.session.observe_blur();
        }
    }

    pub fn snapshot(&self) -> ProctoringSnapshot {
        ProctoringSnapshot {
            proctoring_enabled: self.status == ControllerStatus::Running,
            face_box: self.overlay.face_box(),
            pipeline: self.driver.stats(),
            detector_failures: self.detector_failures,
            ..self.session.snapshot()
        }
    }

    /// Zero every accumulator and the pipeline counters; capture stays up.
    /// A detection dispatched before the reset is discarded when it lands.
    pub fn reset_metrics(&mut self, now_us: i64) {
        if self.is_disposed() {
            return;
        }
        self.driver.reset();
        self.session.reset(now_us);
        if self.status == ControllerStatus::Running {
            self.session.detector_started(now_us);
        }
        if let Some(analyser) = self.analyser.as_mut() {
            analyser.reset();
        }
        self.overlay.clear();
        self.detector_failures = 0;
        log::info!("proctoring metrics reset");
    }

    /// Release every device. Safe to call any number of times.
    pub fn teardown(&mut self) {
        if !self.is_disposed() {
            log::info!("tearing down proctoring ({:?})", self.status);
        }
        self.status = ControllerStatus::Disposed;
        self.release_devices();
    }

    fn release_devices(&mut self) {
        if !self.driver_released {
            self.driver_released = true;
            self.driver.stop();
            self.model = None;
        }

        if let Some(mut stream) = self.stream.take() {
            guarded("stop media tracks", || stream.stop_tracks());
        }

        if let Some(mut input) = self.audio_input.take() {
            guarded("close audio input", || input.close());
        }
        self.analyser = None;
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Run one teardown step; errors and panics are logged, never raised
fn guarded<F>(step: &str, f: F)
where
    F: FnOnce() -> Result<(), CaptureError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => log::debug!("{}: done", step),
        Ok(Err(e)) => log::warn!("{}: {}", step, e),
        Err(_) => log::error!("{}: panicked", step),
    }
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Detector(DetectorError),
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("status", &self.status)
            .field("resolution", &self.overlay.resolution())
            .field("pipeline", &self.driver.stats())
            .finish()
    }
}
