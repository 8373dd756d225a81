//! Course backend interface and an in-memory implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quiz::Course;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("course not found: {0}")]
    NotFound(String),
    #[error("not authenticated")]
    Unauthorized,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid backend data: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "completedCourses")]
    pub completed_courses: Vec<String>,
}

impl UserProfile {
    pub fn has_completed(&self, course_id: &str) -> bool {
        self.completed_courses.iter().any(|c| c == course_id)
    }
}

/// Course retrieval and completion, implemented by the host.
///
/// Implementations can be:
/// - An HTTP client for the course service
/// - `InMemoryBackend` for tests and scenario replay
pub trait QuizBackend {
    fn fetch_course(&mut self, course_id: &str) -> Result<Course, BackendError>;

    /// Profile of the signed-in learner
    fn fetch_profile(&mut self) -> Result<UserProfile, BackendError>;

    /// Record that the learner completed the course
    fn complete_course(&mut self, course_id: &str) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryBackend {
    pub courses: HashMap<String, Course>,
    pub profile: Option<UserProfile>,
    /// Make `complete_course` fail with a transport error
    pub fail_completion: bool,
    #[serde(skip)]
    completions: Vec<String>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_course(mut self, course: Course) -> Self {
        self.courses.insert(course.id.clone(), course);
        self
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Successful `complete_course` calls, in order
    pub fn completions(&self) -> &[String] {
        &self.completions
    }
}

impl QuizBackend for InMemoryBackend {
    fn fetch_course(&mut self, course_id: &str) -> Result<Course, BackendError> {
        self.courses
            .get(course_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(course_id.to_string()))
    }

    fn fetch_profile(&mut self) -> Result<UserProfile, BackendError> {
        self.profile.clone().ok_or(BackendError::Unauthorized)
    }

    fn complete_course(&mut self, course_id: &str) -> Result<(), BackendError> {
        if self.fail_completion {
            return Err(BackendError::Transport("completion endpoint unavailable".into()));
        }
        self.completions.push(course_id.to_string());
        if let Some(profile) = self.profile.as_mut() {
            if !profile.has_completed(course_id) {
                profile.completed_courses.push(course_id.to_string());
            }
        }
        Ok(())
    }
}
