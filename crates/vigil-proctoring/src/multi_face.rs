//! Multi-face detection counter.
//!
//! Every frame with more than one face counts as an event, so a second
//! person sitting in view for a minute produces one event per frame.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MultiFaceState {
    /// Faces beyond the primary one in the latest frame
    pub current_extra_faces: usize,
    /// Frames that contained more than one face
    pub total_multi_face_events: u64,
}

#[derive(Debug, Default)]
pub struct MultiFaceTracker {
    state: MultiFaceState,
}

impl MultiFaceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the face count of one detection
    pub fn observe(&mut self, face_count: usize) {
        self.state.current_extra_faces = face_count.saturating_sub(1);
        if face_count > 1 {
            self.state.total_multi_face_events += 1;
        }
    }

    pub fn state(&self) -> MultiFaceState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = MultiFaceState::default();
    }
}
