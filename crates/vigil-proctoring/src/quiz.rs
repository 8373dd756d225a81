//! Quiz Timing & Scoring
//!
//! Timed multiple-choice quiz state:
//! - One-second countdown ticks with force-submit at expiry
//! - Per-question time spent (wall-clock delta between ticks)
//! - Per-question answer change counters
//! - Percent score and pass mark

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::QuizConfig;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuizError {
    #[error("This course does not have any quiz questions yet.")]
    NoQuestions,
    #[error("question {index} has no answer")]
    Unanswered { index: usize },
    #[error("'{option}' is not an option of question {index}")]
    UnknownOption { index: usize, option: String },
    #[error("quiz already submitted")]
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    #[serde(alias = "correctAnswer")]
    pub correct_answer: usize,
}

impl QuizQuestion {
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default, alias = "quizQuestions")]
    pub quiz_questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizResult {
    pub correct: usize,
    pub total: usize,
    /// round(100 * correct / total)
    pub score: u32,
    pub pass_percent: u32,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining_secs: u32 },
    /// Time ran out; the quiz was submitted
    Expired(QuizResult),
    /// Quiz already submitted, timer is stopped
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved(usize),
    Submitted(QuizResult),
}

/// Serializable view of the quiz
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSessionState {
    pub current_question: usize,
    pub answers: Vec<Option<String>>,
    pub remaining_secs: u32,
    pub completed: bool,
    pub score: Option<u32>,
    pub time_spent_secs: Vec<f32>,
    pub answer_changes: Vec<u32>,
}

pub fn score_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as u32
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    config: QuizConfig,
    current: usize,
    answers: Vec<Option<String>>,
    remaining_secs: u32,
    time_spent_secs: Vec<f32>,
    answer_changes: Vec<u32>,
    last_tick_us: i64,
    result: Option<QuizResult>,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>, started_at_us: i64) -> Result<Self, QuizError> {
        Self::with_config(questions, QuizConfig::default(), started_at_us)
    }

    pub fn with_config(
        questions: Vec<QuizQuestion>,
        config: QuizConfig,
        started_at_us: i64,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let n = questions.len();
        Ok(Self {
            questions,
            current: 0,
            answers: vec![None; n],
            remaining_secs: config.duration_secs,
            time_spent_secs: vec![0.0; n],
            answer_changes: vec![0; n],
            last_tick_us: started_at_us,
            result: None,
            config,
        })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &QuizQuestion {
        &self.questions[self.current]
    }

    pub fn current_answer(&self) -> Option<&str> {
        self.answers[self.current].as_deref()
    }

    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<QuizResult> {
        self.result
    }

    pub fn time_spent_secs(&self) -> &[f32] {
        &self.time_spent_secs
    }

    pub fn answer_changes(&self) -> &[u32] {
        &self.answer_changes
    }

    /// One countdown tick. The elapsed wall-clock time since the previous
    /// tick goes to the question on screen.
    pub fn tick(&mut self, now_us: i64) -> TickOutcome {
        if self.result.is_some() {
            return TickOutcome::Stopped;
        }
        if self.remaining_secs <= 1 {
            self.remaining_secs = 0;
            log::info!("quiz time expired, submitting");
            return TickOutcome::Expired(self.complete());
        }

        let delta_us = (now_us - self.last_tick_us).max(0);
        self.time_spent_secs[self.current] += delta_us as f32 / 1_000_000.0;
        self.last_tick_us = now_us;
        self.remaining_secs -= 1;
        TickOutcome::Running {
            remaining_secs: self.remaining_secs,
        }
    }

    /// Record `option` for the current question
    pub fn answer(&mut self, option: &str) -> Result<(), QuizError> {
        if self.result.is_some() {
            return Err(QuizError::Finished);
        }
        let question = &self.questions[self.current];
        if !question.options.iter().any(|o| o == option) {
            return Err(QuizError::UnknownOption {
                index: self.current,
                option: option.to_string(),
            });
        }

        let slot = &mut self.answers[self.current];
        if slot.as_deref() != Some(option) {
            self.answer_changes[self.current] += 1;
            *slot = Some(option.to_string());
        }
        Ok(())
    }

    /// Advance, or submit from the last question
    pub fn next(&mut self) -> Result<Navigation, QuizError> {
        if self.result.is_some() {
            return Err(QuizError::Finished);
        }
        if self.answers[self.current].is_none() {
            return Err(QuizError::Unanswered {
                index: self.current,
            });
        }
        if self.is_last_question() {
            Ok(Navigation::Submitted(self.complete()))
        } else {
            self.current += 1;
            Ok(Navigation::Moved(self.current))
        }
    }

    pub fn previous(&mut self) -> usize {
        if self.result.is_none() && self.current > 0 {
            self.current -= 1;
        }
        self.current
    }

    /// Submit and score; repeated calls return the first result
    pub fn complete(&mut self) -> QuizResult {
        if let Some(result) = self.result {
            return result;
        }

        let correct = self
            .questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| a.is_some() && a.as_deref() == q.correct_option())
            .count();
        let total = self.questions.len();
        let score = score_percent(correct, total);
        let result = QuizResult {
            correct,
            total,
            score,
            pass_percent: self.config.pass_percent,
            passed: score >= self.config.pass_percent,
        };

        log::info!(
            "quiz submitted: {}/{} correct, score {}% ({})",
            correct,
            total,
            score,
            if result.passed { "passed" } else { "failed" }
        );
        self.result = Some(result);
        result
    }

    /// Start over with the same questions
    pub fn retake(&mut self, now_us: i64) {
        let n = self.questions.len();
        self.current = 0;
        self.answers = vec![None; n];
        self.remaining_secs = self.config.duration_secs;
        self.time_spent_secs = vec![0.0; n];
        self.answer_changes = vec![0; n];
        self.last_tick_us = now_us;
        self.result = None;
    }

    pub fn state(&self) -> QuizSessionState {
        QuizSessionState {
            current_question: self.current,
            answers: self.answers.clone(),
            remaining_secs: self.remaining_secs,
            completed: self.result.is_some(),
            score: self.result.map(|r| r.score),
            time_spent_secs: self.time_spent_secs.clone(),
            answer_changes: self.answer_changes.clone(),
        }
    }
}
