//! Proctored Quiz Page
//!
//! One quiz attempt as the learner sees it: course loading, the timed quiz,
//! the proctoring controller running alongside, the result screen and the
//! certificate claim.
//!
//! # States
//! - `Loading` until `open` runs
//! - `Error` when the course cannot be loaded or has no questions
//! - `AlreadyCompleted` when the learner already holds the certificate
//! - `Active` while the quiz runs
//! - `Completed` once submitted (by the learner or the timer)
//!
//! Proctoring failures never change the page state.

use serde::Serialize;

use crate::backend::{QuizBackend, UserProfile};
use crate::config::VigilConfig;
use crate::controller::SessionController;
use crate::devices::{LandmarkModelFactory, MediaDevices, VideoFrame};
use crate::gate::{CertificateGate, CheatAssessment, ClaimError};
use crate::quiz::{Navigation, QuizError, QuizResult, QuizSession, TickOutcome};
use crate::session::ProctoringSnapshot;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load quiz";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum PageState {
    Loading,
    Error(String),
    AlreadyCompleted,
    Active,
    Completed(QuizResult),
}

/// Successful claim; the host navigates to the certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateClaim {
    pub course_id: String,
    pub certificate_path: String,
}

pub struct ProctoredQuiz<B: QuizBackend> {
    course_id: String,
    config: VigilConfig,
    backend: B,
    gate: CertificateGate,
    state: PageState,
    course_title: Option<String>,
    profile: Option<UserProfile>,
    quiz: Option<QuizSession>,
    controller: SessionController,
}

impl<B: QuizBackend> ProctoredQuiz<B> {
    pub fn new(course_id: impl Into<String>, backend: B, config: VigilConfig, now_us: i64) -> Self {
        Self {
            course_id: course_id.into(),
            gate: CertificateGate::new(config.cheat_policy.clone()),
            controller: SessionController::new(config.clone(), now_us),
            config,
            backend,
            state: PageState::Loading,
            course_title: None,
            profile: None,
            quiz: None,
        }
    }

    /// Load the learner and the course, then start the quiz and proctoring
    pub fn open(
        &mut self,
        devices: &mut dyn MediaDevices,
        models: &dyn LandmarkModelFactory,
        now_us: i64,
    ) -> &PageState {
        if self.state != PageState::Loading {
            return &self.state;
        }

        self.profile = match self.backend.fetch_profile() {
            Ok(profile) => Some(profile),
            Err(e) => {
                log::debug!("no learner profile: {}", e);
                None
            }
        };

        let course = match self.backend.fetch_course(&self.course_id) {
            Ok(course) => course,
            Err(e) => {
                log::warn!("failed to load course {}: {}", self.course_id, e);
                self.state = PageState::Error(LOAD_FAILED_MESSAGE.to_string());
                return &self.state;
            }
        };
        self.course_title = Some(course.title.clone());

        let quiz = match QuizSession::with_config(
            course.quiz_questions,
            self.config.quiz.clone(),
            now_us,
        ) {
            Ok(quiz) => quiz,
            Err(e) => {
                log::info!("course {} has no quiz", self.course_id);
                self.state = PageState::Error(e.to_string());
                return &self.state;
            }
        };

        if self
            .profile
            .as_ref()
            .map_or(false, |p| p.has_completed(&self.course_id))
        {
            self.state = PageState::AlreadyCompleted;
            return &self.state;
        }

        log::info!("opening quiz for {} ({} questions)", course.title, quiz.len());
        self.quiz = Some(quiz);
        self.state = PageState::Active;
        self.controller.start(devices, models, now_us);
        &self.state
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn course_title(&self) -> Option<&str> {
        self.course_title.as_deref()
    }

    pub fn quiz(&self) -> Option<&QuizSession> {
        self.quiz.as_ref()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SessionController {
        &mut self.controller
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn snapshot(&self) -> ProctoringSnapshot {
        self.controller.snapshot()
    }

    pub fn cheat_assessment(&self) -> CheatAssessment {
        self.gate.policy().assess(&self.controller.snapshot())
    }

    pub fn on_video_frame(&mut self, frame: &VideoFrame) {
        self.controller.on_video_frame(frame);
    }

    pub fn on_animation_frame(&mut self) -> bool {
        self.controller.on_animation_frame()
    }

    pub fn on_window_blur(&mut self) {
        self.controller.on_window_blur();
    }

    /// Countdown tick, once per second while the quiz is active
    pub fn on_timer_tick(&mut self, now_us: i64) -> Option<TickOutcome> {
        if self.state != PageState::Active {
            return None;
        }
        let outcome = self.quiz.as_mut()?.tick(now_us);
        if let TickOutcome::Expired(result) = outcome {
            self.state = PageState::Completed(result);
        }
        Some(outcome)
    }

    pub fn answer(&mut self, option: &str) -> Result<(), QuizError> {
        self.active_quiz()?.answer(option)
    }

    pub fn next(&mut self) -> Result<Navigation, QuizError> {
        let nav = self.active_quiz()?.next()?;
        if let Navigation::Submitted(result) = nav {
            self.state = PageState::Completed(result);
        }
        Ok(nav)
    }

    pub fn previous(&mut self) -> Result<usize, QuizError> {
        Ok(self.active_quiz()?.previous())
    }

    pub fn complete(&mut self) -> Result<QuizResult, QuizError> {
        let result = self.active_quiz()?.complete();
        self.state = PageState::Completed(result);
        Ok(result)
    }

    /// Claim the certificate. A backend failure while recording completion
    /// is logged and does not block the claim.
    pub fn claim_certificate(&mut self) -> Result<CertificateClaim, ClaimError> {
        let result = self.quiz.as_ref().and_then(QuizSession::result);
        self.gate.check(result, &self.controller.snapshot())?;

        match self.backend.complete_course(&self.course_id) {
            Ok(()) => {
                if let Some(profile) = self.profile.as_mut() {
                    if !profile.has_completed(&self.course_id) {
                        profile.completed_courses.push(self.course_id.clone());
                    }
                }
            }
            Err(e) => log::warn!("failed to mark {} completed: {}", self.course_id, e),
        }

        Ok(CertificateClaim {
            course_id: self.course_id.clone(),
            certificate_path: format!("/certificates/{}", self.course_id),
        })
    }

    /// Start the quiz over; proctoring metrics are zeroed, capture stays up
    pub fn retake(&mut self, now_us: i64) -> Result<(), QuizError> {
        let quiz = self.quiz.as_mut().ok_or(QuizError::NoQuestions)?;
        quiz.retake(now_us);
        self.controller.reset_metrics(now_us);
        self.state = PageState::Active;
        log::info!("quiz retake for {}", self.course_id);
        Ok(())
    }

    pub fn unmount(&mut self) {
        self.controller.teardown();
    }

    fn active_quiz(&mut self) -> Result<&mut QuizSession, QuizError> {
        match (&self.state, self.quiz.as_mut()) {
            (PageState::Active, Some(quiz)) => Ok(quiz),
            (PageState::Completed(_), Some(_)) => Err(QuizError::Finished),
            _ => Err(QuizError::NoQuestions),
        }
    }
}
