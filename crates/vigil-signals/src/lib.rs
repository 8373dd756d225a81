//! # vigil-signals
//!
//! Signal processing for learner-side quiz proctoring.
//!
//! This crate provides:
//! - **Landmarks**: face-mesh detection types in normalized image space
//! - **Features**: head tilt, gaze proxy and micro-movement per frame
//! - **Accumulators**: running average/maximum per metric
//! - **Audio**: spectrum analyser and speaking detector
//!
//! ## Example
//!
//! ```ignore
//! use vigil_signals::{FeatureExtractor, MetricSet, Resolution};
//!
//! let mut extractor = FeatureExtractor::new(Resolution::new(720, 540));
//! let mut metrics = MetricSet::new();
//!
//! for frame in detections {
//!     if let Ok(Some(sample)) = extractor.extract(&frame) {
//!         metrics.apply(&sample);
//!     }
//! }
//! println!("head tilt avg {:.3}", metrics.head_tilt.average());
//! ```

pub mod accumulator;
pub mod audio;
pub mod features;
pub mod landmarks;

pub use accumulator::{MetricAccumulator, MetricSet, MetricSummary};
pub use audio::{
    AnalyserConfig, AudioActivityConfig, AudioActivityDetector, AudioActivityState,
    SpectrumAnalyser,
};
pub use features::{FeatureError, FeatureExtractor, FeatureSample};
pub use landmarks::{
    indices, BoundingBox, DetectionFrame, FaceLandmarkSet, LandmarkPoint, Resolution,
};
