//! Running Metric Accumulators
//!
//! Constant-space average/maximum trackers. One accumulator per scalar
//! feature; they are only cleared by an explicit session reset.

use serde::Serialize;

use crate::features::FeatureSample;

/// Running count, sum and maximum of a scalar signal
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricAccumulator {
    count: u64,
    sum: f64,
    max: Option<f32>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation
    pub fn observe(&mut self, value: f32) {
        self.count += 1;
        self.sum += value as f64;
        self.max = Some(match self.max {
            Some(m) => m.max(value),
            None => value,
        });
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of all observations, 0.0 with no data
    pub fn average(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum / self.count as f64) as f32
        }
    }

    /// Largest observation, 0.0 with no data
    pub fn max(&self) -> f32 {
        self.max.unwrap_or(0.0)
    }

    pub fn summary(&self) -> MetricSummary {
        MetricSummary {
            average: self.average(),
            max: self.max(),
            samples: self.count,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Read-only view of an accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricSummary {
    pub average: f32,
    pub max: f32,
    pub samples: u64,
}

/// The three per-face metrics, updated together from one sample
#[derive(Debug, Clone, Default)]
pub struct MetricSet {
    pub head_tilt: MetricAccumulator,
    pub gaze: MetricAccumulator,
    pub micro_movement: MetricAccumulator,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, sample: &FeatureSample) {
        self.head_tilt.observe(sample.head_tilt);
        self.gaze.observe(sample.gaze_proxy);
        self.micro_movement.observe(sample.micro_movement);
    }

    pub fn reset(&mut self) {
        self.head_tilt.reset();
        self.gaze.reset();
        self.micro_movement.reset();
    }
}
