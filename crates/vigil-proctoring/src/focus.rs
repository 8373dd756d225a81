//! Window focus loss counter.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FocusLossState {
    pub loss_count: u32,
}

/// Counts window blur events; every blur counts, no debouncing.
#[derive(Debug, Default)]
pub struct FocusLossTracker {
    state: FocusLossState,
}

impl FocusLossTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_blur(&mut self) {
        self.state.loss_count = self.state.loss_count.saturating_add(1);
    }

    pub fn state(&self) -> FocusLossState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = FocusLossState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rapid_blurs_all_count() {
        let mut tracker = FocusLossTracker::new();
        for _ in 0..7 {
            tracker.on_blur();
        }
        assert_eq!(tracker.state().loss_count, 7);
        tracker.reset();
        assert_eq!(tracker.state().loss_count, 0);
    }
}
