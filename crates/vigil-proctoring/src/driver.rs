//! Frame Delivery Driver
//!
//! One-slot work queue between the camera and the landmark model. A frame
//! is only handed to the model when no detection is in flight; frames that
//! arrive meanwhile are skipped, so a slow model throttles the pipeline
//! instead of piling up work.
//!
//! Tickets carry the driver generation. `reset` starts a new generation, so
//! a result dispatched before it is discarded when it lands.

use serde::Serialize;

/// Proof that a detection slot was taken; returned to `FrameDriver::complete`
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a ticket that is never completed blocks the driver"]
pub struct DetectionTicket {
    seq: u64,
    generation: u64,
    timestamp_us: i64,
}

impl DetectionTicket {
    pub fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriverStats {
    /// Frames handed to the model
    pub frames_dispatched: u64,
    /// Detections completed and accepted
    pub frames_completed: u64,
    /// Frames dropped because a detection was in flight
    pub frames_skipped: u64,
    /// Results discarded because they landed after stop or reset
    pub results_discarded: u64,
}

#[derive(Debug, Default)]
pub struct FrameDriver {
    running: bool,
    next_seq: u64,
    generation: u64,
    in_flight: Option<u64>,
    stats: DriverStats,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop accepting frames; a detection already in flight may still
    /// complete but its result is reported as stale.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Start a new generation and zero the counters. A detection in flight
    /// keeps the slot until it lands, then gets discarded.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.stats = DriverStats::default();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Take the detection slot for a new frame, if it is free
    pub fn begin(&mut self, timestamp_us: i64) -> Option<DetectionTicket> {
        if !self.running {
            return None;
        }
        if self.in_flight.is_some() {
            self.stats.frames_skipped += 1;
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some(seq);
        self.stats.frames_dispatched += 1;
        Some(DetectionTicket {
            seq,
            generation: self.generation,
            timestamp_us,
        })
    }

    /// Release the slot. Returns `true` when the result should be applied.
    pub fn complete(&mut self, ticket: DetectionTicket) -> bool {
        if self.in_flight == Some(ticket.seq) {
            self.in_flight = None;
        }
        if self.running && ticket.generation == self.generation {
            self.stats.frames_completed += 1;
            true
        } else {
            self.stats.results_discarded += 1;
            false
        }
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }
}
