//! Face Presence Tracking
//!
//! Two-state machine over per-frame face detection:
//!
//! - PRESENT -> ABSENT: a frame without faces arrives at least
//!   `absence_threshold_secs` after the face was last seen. Opens a gap
//!   session.
//! - ABSENT -> PRESENT: any frame with a face. Closes the gap session.
//!
//! Shorter misses are single-frame detector dropouts and leave the state
//! untouched.

use serde::{Deserialize, Serialize};

const US_PER_SEC: f32 = 1_000_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Minimum absence before a gap session opens (seconds)
    pub absence_threshold_secs: f32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            absence_threshold_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresencePhase {
    Present,
    Absent,
}

/// Accumulated face-absence statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FacePresenceState {
    /// Whole seconds since the face was last seen, 0 while present
    pub current_gap_secs: u32,
    /// Total time spent in gap sessions
    pub total_gap_secs: f32,
    /// Longest single gap, whole seconds
    pub longest_gap_secs: u32,
    /// Number of gap sessions opened
    pub gap_sessions: u32,
    pub session_active: bool,
    /// Frames observed inside gap sessions
    pub absent_frames: u64,
}

/// Transition reported by `FacePresenceTracker::observe`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PresenceEvent {
    GapStarted,
    GapEnded { duration_secs: f32 },
}

pub struct FacePresenceTracker {
    config: PresenceConfig,
    phase: PresencePhase,
    last_seen_us: i64,
    last_absent_tick_us: Option<i64>,
    state: FacePresenceState,
}

impl FacePresenceTracker {
    /// Tracker starting PRESENT, as if the face was seen at `started_at_us`
    pub fn new(started_at_us: i64) -> Self {
        Self::with_config(PresenceConfig::default(), started_at_us)
    }

    pub fn with_config(config: PresenceConfig, started_at_us: i64) -> Self {
        Self {
            config,
            phase: PresencePhase::Present,
            last_seen_us: started_at_us,
            last_absent_tick_us: None,
            state: FacePresenceState::default(),
        }
    }

    /// Feed one detection result
    pub fn observe(&mut self, face_present: bool, timestamp_us: i64) -> Option<PresenceEvent> {
        if face_present {
            return self.on_face(timestamp_us);
        }

        let elapsed = secs_between(self.last_seen_us, timestamp_us);
        if elapsed < self.config.absence_threshold_secs {
            return None;
        }

        let event = match self.phase {
            PresencePhase::Present => {
                self.phase = PresencePhase::Absent;
                self.state.gap_sessions += 1;
                self.state.session_active = true;
                self.state.total_gap_secs += elapsed;
                Some(PresenceEvent::GapStarted)
            }
            PresencePhase::Absent => {
                let since_tick = self
                    .last_absent_tick_us
                    .map(|t| secs_between(t, timestamp_us))
                    .unwrap_or(0.0);
                self.state.total_gap_secs += since_tick;
                None
            }
        };

        self.last_absent_tick_us = Some(timestamp_us);
        self.state.current_gap_secs = elapsed.floor() as u32;
        self.state.longest_gap_secs = self.state.longest_gap_secs.max(self.state.current_gap_secs);
        self.state.absent_frames += 1;
        event
    }

    fn on_face(&mut self, timestamp_us: i64) -> Option<PresenceEvent> {
        let event = match self.phase {
            PresencePhase::Absent => Some(PresenceEvent::GapEnded {
                duration_secs: secs_between(self.last_seen_us, timestamp_us),
            }),
            PresencePhase::Present => None,
        };
        self.phase = PresencePhase::Present;
        self.state.current_gap_secs = 0;
        self.state.session_active = false;
        self.last_seen_us = self.last_seen_us.max(timestamp_us);
        self.last_absent_tick_us = None;
        event
    }

    pub fn phase(&self) -> PresencePhase {
        self.phase
    }

    pub fn state(&self) -> FacePresenceState {
        self.state
    }

    /// Clear statistics and restart as PRESENT at `now_us`
    pub fn reset(&mut self, now_us: i64) {
        self.phase = PresencePhase::Present;
        self.last_seen_us = now_us;
        self.last_absent_tick_us = None;
        self.state = FacePresenceState::default();
    }
}

fn secs_between(from_us: i64, to_us: i64) -> f32 {
    (to_us - from_us).max(0) as f32 / US_PER_SEC
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MS: i64 = 1_000;
    const SEC: i64 = 1_000_000;

    #[test]
    fn test_starts_present() {
        let tracker = FacePresenceTracker::new(0);
        assert_eq!(tracker.phase(), PresencePhase::Present);
        assert_eq!(tracker.state(), FacePresenceState::default());
    }

    #[test]
    fn test_single_missed_frame_is_debounced() {
        let mut tracker = FacePresenceTracker::new(0);
        tracker.observe(true, 100 * MS);
        assert_eq!(tracker.observe(false, 133 * MS), None);
        assert_eq!(tracker.observe(true, 166 * MS), None);

        let state = tracker.state();
        assert_eq!(state.gap_sessions, 0);
        assert_eq!(state.current_gap_secs, 0);
        assert_eq!(state.absent_frames, 0);
    }

    #[test]
    fn test_three_second_gap_counts_once() {
        let mut tracker = FacePresenceTracker::new(0);
        tracker.observe(true, 0);

        let mut events = Vec::new();
        let mut t = 100 * MS;
        while t <= 3 * SEC {
            events.extend(tracker.observe(false, t));
            t += 100 * MS;
        }
        assert_eq!(events, vec![PresenceEvent::GapStarted]);

        let during = tracker.state();
        assert!(during.session_active);
        assert_eq!(during.current_gap_secs, 3);
        assert_eq!(during.gap_sessions, 1);

        let ended = tracker.observe(true, 3 * SEC + 100 * MS);
        assert!(matches!(ended, Some(PresenceEvent::GapEnded { duration_secs }) if duration_secs >= 3.0));

        let after = tracker.state();
        assert_eq!(after.gap_sessions, 1);
        assert!(after.longest_gap_secs >= 3);
        assert_eq!(after.current_gap_secs, 0);
        assert!(!after.session_active);
        assert!((after.total_gap_secs - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_absence_from_detector_start() {
        let mut tracker = FacePresenceTracker::new(10 * SEC);
        assert_eq!(tracker.observe(false, 10 * SEC + 500 * MS), None);
        assert_eq!(
            tracker.observe(false, 11 * SEC),
            Some(PresenceEvent::GapStarted)
        );
        assert_eq!(tracker.phase(), PresencePhase::Absent);
        assert_eq!(tracker.state().current_gap_secs, 1);
    }

    #[test]
    fn test_separate_gaps_are_separate_sessions() {
        let mut tracker = FacePresenceTracker::new(0);
        tracker.observe(false, 2 * SEC);
        tracker.observe(true, 3 * SEC);
        tracker.observe(false, 4 * SEC + 500 * MS);
        tracker.observe(false, 8 * SEC);
        tracker.observe(true, 9 * SEC);

        let state = tracker.state();
        assert_eq!(state.gap_sessions, 2);
        assert_eq!(state.longest_gap_secs, 5);
        assert_eq!(state.absent_frames, 3);
        // 2.0 + (1.5 + 3.5)
        assert!((state.total_gap_secs - 7.0).abs() < 1e-3);
    }

    #[test]
    fn test_backwards_timestamp_does_not_open_gap() {
        let mut tracker = FacePresenceTracker::new(5 * SEC);
        assert_eq!(tracker.observe(false, 0), None);
        assert_eq!(tracker.state().gap_sessions, 0);
    }

    #[test]
    fn test_older_face_does_not_rewind_clock() {
        let mut tracker = FacePresenceTracker::new(10 * SEC);
        tracker.observe(true, SEC);
        assert_eq!(tracker.observe(false, 10 * SEC + 200 * MS), None);
        assert_eq!(tracker.state().gap_sessions, 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut tracker = FacePresenceTracker::new(0);
        tracker.observe(false, 5 * SEC);
        tracker.reset(6 * SEC);
        assert_eq!(tracker.phase(), PresencePhase::Present);
        assert_eq!(tracker.state(), FacePresenceState::default());
        assert_eq!(tracker.observe(false, 6 * SEC + 500 * MS), None);
    }

    #[test]
    fn test_custom_threshold() {
        let config = PresenceConfig {
            absence_threshold_secs: 2.5,
        };
        let mut tracker = FacePresenceTracker::with_config(config, 0);
        assert_eq!(tracker.observe(false, 2 * SEC), None);
        assert_eq!(tracker.observe(false, 2_500 * MS), Some(PresenceEvent::GapStarted));
    }

    /// Gap sessions an absence-run model expects for the same frames
    fn expected_sessions(frames: &[(bool, i64)]) -> u32 {
        let mut t = 0;
        let mut last_seen = 0;
        let mut run_end = None;
        let mut sessions = 0;
        for &(face, dt_ms) in frames {
            t += dt_ms * MS;
            if face {
                if let Some(end) = run_end.take() {
                    sessions += u32::from(end - last_seen >= SEC);
                }
                last_seen = t;
            } else {
                run_end = Some(t);
            }
        }
        if let Some(end) = run_end {
            sessions += u32::from(end - last_seen >= SEC);
        }
        sessions
    }

    proptest! {
        #[test]
        fn prop_one_session_per_long_absence(
            frames in prop::collection::vec((any::<bool>(), 1i64..400), 1..300)
        ) {
            let mut tracker = FacePresenceTracker::new(0);
            let mut t = 0;
            for &(face, dt_ms) in &frames {
                t += dt_ms * MS;
                tracker.observe(face, t);
            }
            prop_assert_eq!(tracker.state().gap_sessions, expected_sessions(&frames));
        }

        #[test]
        fn prop_short_misses_never_open_a_gap(
            misses in prop::collection::vec(1i64..1000, 1..100)
        ) {
            let mut tracker = FacePresenceTracker::new(0);
            let mut t = 0;
            for miss_ms in misses {
                tracker.observe(false, t + miss_ms * MS - 1);
                t += miss_ms * MS;
                tracker.observe(true, t);
            }
            let state = tracker.state();
            prop_assert_eq!(state.gap_sessions, 0);
            prop_assert_eq!(state.absent_frames, 0);
        }
    }
}
