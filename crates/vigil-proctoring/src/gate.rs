//! Certificate Gate
//!
//! Decides whether the accumulated proctoring signals block the
//! certificate claim. The default policy is permissive: signals are shown
//! to the learner but never raise the cheat flag. `Thresholds` flags a
//! session when any configured limit is exceeded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quiz::QuizResult;
use crate::session::ProctoringSnapshot;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClaimError {
    #[error("quiz has not been submitted")]
    NotCompleted,
    #[error("score {score}% is below the passing mark of {pass_percent}%")]
    NotPassed { score: u32, pass_percent: u32 },
    #[error("Cheating suspected. You cannot claim the certificate.")]
    CheatingSuspected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CheatPolicy {
    /// Never flag
    Permissive,
    /// Flag when any limit is exceeded
    Thresholds(CheatThresholds),
}

impl Default for CheatPolicy {
    fn default() -> Self {
        Self::Permissive
    }
}

/// Limits for the threshold policy; `None` disables a check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheatThresholds {
    pub max_face_missing_sessions: Option<u32>,
    pub max_longest_face_missing_secs: Option<u32>,
    pub max_total_face_missing_secs: Option<f32>,
    pub max_multi_face_events: Option<u64>,
    pub max_focus_losses: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheatReason {
    FaceMissingSessions,
    LongFaceAbsence,
    TotalFaceAbsence,
    MultipleFaces,
    FocusLoss,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheatAssessment {
    pub flagged: bool,
    pub reasons: Vec<CheatReason>,
}

impl CheatPolicy {
    pub fn assess(&self, snapshot: &ProctoringSnapshot) -> CheatAssessment {
        let limits = match self {
            CheatPolicy::Permissive => return CheatAssessment::default(),
            CheatPolicy::Thresholds(limits) => limits,
        };

        let mut reasons = Vec::new();
        let presence = &snapshot.presence;

        if exceeds(presence.gap_sessions, limits.max_face_missing_sessions) {
            reasons.push(CheatReason::FaceMissingSessions);
        }
        if exceeds(presence.longest_gap_secs, limits.max_longest_face_missing_secs) {
            reasons.push(CheatReason::LongFaceAbsence);
        }
        if exceeds(presence.total_gap_secs, limits.max_total_face_missing_secs) {
            reasons.push(CheatReason::TotalFaceAbsence);
        }
        if exceeds(
            snapshot.multi_face.total_multi_face_events,
            limits.max_multi_face_events,
        ) {
            reasons.push(CheatReason::MultipleFaces);
        }
        if exceeds(snapshot.focus.loss_count, limits.max_focus_losses) {
            reasons.push(CheatReason::FocusLoss);
        }

        CheatAssessment {
            flagged: !reasons.is_empty(),
            reasons,
        }
    }
}

/// Claim checks, in order: quiz submitted, passing score, no cheat flag
#[derive(Debug, Clone, Default)]
pub struct CertificateGate {
    policy: CheatPolicy,
}

impl CertificateGate {
    pub fn new(policy: CheatPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CheatPolicy {
        &self.policy
    }

    pub fn check(
        &self,
        result: Option<QuizResult>,
        snapshot: &ProctoringSnapshot,
    ) -> Result<(), ClaimError> {
        let result = result.ok_or(ClaimError::NotCompleted)?;
        if !result.passed {
            return Err(ClaimError::NotPassed {
                score: result.score,
                pass_percent: result.pass_percent,
            });
        }
        let assessment = self.policy.assess(snapshot);
        if assessment.flagged {
            log::warn!("certificate blocked: {:?}", assessment.reasons);
            return Err(ClaimError::CheatingSuspected);
        }
        Ok(())
    }
}

fn exceeds<T: PartialOrd>(value: T, limit: Option<T>) -> bool {
    limit.map_or(false, |max| value > max)
}
