//! # vigil-proctoring
//!
//! Learner-side proctoring for timed course quizzes.
//!
//! This crate provides:
//! - **Trackers**: face presence gaps, multi-face frames, window focus loss
//! - **Session**: one owned object holding every tracker, with snapshots
//! - **Controller**: capture/model lifecycle with guarded teardown
//! - **Quiz**: countdown, navigation, scoring and the certificate gate
//! - **Page**: the quiz page tying quiz, controller and backend together
//!
//! Devices, the landmark model and the course backend are traits the host
//! implements (see [`devices`] and [`backend`]).
//!
//! ## Example
//!
//! ```ignore
//! use vigil_proctoring::{InMemoryBackend, ProctoredQuiz, VigilConfig};
//!
//! let mut page = ProctoredQuiz::new("rust-101", backend, VigilConfig::default(), now_us);
//! page.open(&mut camera, &face_mesh, now_us);
//!
//! // host event loop
//! page.on_video_frame(&frame);
//! page.on_animation_frame();
//! page.on_timer_tick(now_us);
//!
//! println!("{:?}", page.snapshot());
//! page.unmount();
//! ```

pub mod backend;
pub mod config;
pub mod controller;
pub mod devices;
pub mod driver;
pub mod focus;
pub mod gate;
pub mod multi_face;
pub mod overlay;
pub mod page;
pub mod presence;
pub mod quiz;
pub mod session;

pub use backend::{BackendError, InMemoryBackend, QuizBackend, UserProfile};
pub use config::{ConfigError, VigilConfig};
pub use controller::{ControllerStatus, SessionController};
pub use devices::{
    AudioInput, CaptureConstraints, CaptureError, CaptureStream, DetectionObserver,
    DetectorError, DetectorOptions, LandmarkModel, LandmarkModelFactory, MediaDevices,
    PlaybackError, VideoFrame,
};
pub use driver::{DetectionTicket, DriverStats, FrameDriver};
pub use focus::{FocusLossState, FocusLossTracker};
pub use gate::{
    CertificateGate, CheatAssessment, CheatPolicy, CheatReason, CheatThresholds, ClaimError,
};
pub use multi_face::{MultiFaceState, MultiFaceTracker};
pub use overlay::Overlay;
pub use page::{CertificateClaim, PageState, ProctoredQuiz};
pub use presence::{FacePresenceState, FacePresenceTracker, PresenceConfig, PresenceEvent};
pub use quiz::{
    Course, Navigation, QuizError, QuizQuestion, QuizResult, QuizSession, QuizSessionState,
    TickOutcome,
};
pub use session::{ProctoringSession, ProctoringSnapshot};
