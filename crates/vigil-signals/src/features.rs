//! Landmark Feature Extraction
//!
//! Turns a raw detection into the scalar features the proctoring metrics
//! track for the primary face:
//! - head tilt: vertical offset between the two outer eye corners
//! - gaze proxy: horizontal distance between the two eye centers
//! - micro-movement: mean per-landmark pixel displacement since the
//!   previous sampled face

use thiserror::Error;

use crate::landmarks::{indices, DetectionFrame, FaceLandmarkSet, LandmarkPoint, Resolution};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("primary face has no landmark {index} ({available} points available)")]
    MissingLandmark { index: usize, available: usize },
}

/// Features computed from one frame with at least one face
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureSample {
    /// |left outer eye y - right outer eye y|, normalized units
    pub head_tilt: f32,
    /// |left eye center x - right eye center x|, normalized units
    pub gaze_proxy: f32,
    /// Mean landmark displacement in pixels
    pub micro_movement: f32,
    /// Faces in the frame, including the primary one
    pub face_count: usize,
}

/// Stateful extractor; keeps the previous primary face as the
/// micro-movement baseline.
pub struct FeatureExtractor {
    resolution: Resolution,
    prev_face: Option<FaceLandmarkSet>,
}

impl FeatureExtractor {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            prev_face: None,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Change the pixel scale used for micro-movement
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    /// Extract features from a detection.
    ///
    /// Returns `Ok(None)` for a frame without faces; the baseline is left
    /// untouched so the next face is compared with the last one seen.
    pub fn extract(&mut self, frame: &DetectionFrame) -> Result<Option<FeatureSample>, FeatureError> {
        let face = match frame.primary_face() {
            Some(face) => face,
            None => return Ok(None),
        };

        let head_tilt = head_tilt(face)?;
        let gaze_proxy = gaze_proxy(face)?;

        let micro_movement = match &self.prev_face {
            Some(prev) if prev.len() == face.len() => {
                mean_displacement(&prev.points, &face.points, self.resolution)
            }
            Some(prev) => {
                log::debug!(
                    "landmark count changed {} -> {}, resetting movement baseline",
                    prev.len(),
                    face.len()
                );
                0.0
            }
            None => 0.0,
        };
        self.prev_face = Some(face.clone());

        Ok(Some(FeatureSample {
            head_tilt,
            gaze_proxy,
            micro_movement,
            face_count: frame.face_count(),
        }))
    }

    /// Forget the movement baseline
    pub fn reset(&mut self) {
        self.prev_face = None;
    }
}

fn landmark(face: &FaceLandmarkSet, index: usize) -> Result<LandmarkPoint, FeatureError> {
    face.get(index).ok_or(FeatureError::MissingLandmark {
        index,
        available: face.len(),
    })
}

/// Vertical offset between the outer eye corners
pub fn head_tilt(face: &FaceLandmarkSet) -> Result<f32, FeatureError> {
    let left = landmark(face, indices::LEFT_EYE_OUTER)?;
    let right = landmark(face, indices::RIGHT_EYE_OUTER)?;
    Ok((left.y - right.y).abs())
}

/// Horizontal distance between the two eye centers
pub fn gaze_proxy(face: &FaceLandmarkSet) -> Result<f32, FeatureError> {
    let l1 = landmark(face, indices::LEFT_EYE_OUTER)?;
    let l2 = landmark(face, indices::LEFT_EYE_INNER)?;
    let r1 = landmark(face, indices::RIGHT_EYE_INNER)?;
    let r2 = landmark(face, indices::RIGHT_EYE_OUTER)?;
    let left_x = (l1.x + l2.x) / 2.0;
    let right_x = (r1.x + r2.x) / 2.0;
    Ok((left_x - right_x).abs())
}

/// Mean Euclidean displacement between matching points, in pixels
pub fn mean_displacement(prev: &[LandmarkPoint], curr: &[LandmarkPoint], resolution: Resolution) -> f32 {
    let n = prev.len().min(curr.len());
    if n == 0 {
        return 0.0;
    }
    let w = resolution.width as f32;
    let h = resolution.height as f32;
    let sum: f32 = prev
        .iter()
        .zip(curr.iter())
        .map(|(a, b)| {
            let dx = (b.x - a.x) * w;
            let dy = (b.y - a.y) * h;
            (dx * dx + dy * dy).sqrt()
        })
        .sum();
    sum / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mesh() -> FaceLandmarkSet {
        let mut points = vec![LandmarkPoint::new(0.5, 0.5); indices::FACE_MESH_POINTS];
        points[indices::LEFT_EYE_OUTER] = LandmarkPoint::new(0.30, 0.40);
        points[indices::LEFT_EYE_INNER] = LandmarkPoint::new(0.40, 0.41);
        points[indices::RIGHT_EYE_INNER] = LandmarkPoint::new(0.60, 0.41);
        points[indices::RIGHT_EYE_OUTER] = LandmarkPoint::new(0.70, 0.43);
        FaceLandmarkSet::new(points)
    }

    fn shifted(face: &FaceLandmarkSet, dx: f32, dy: f32) -> FaceLandmarkSet {
        FaceLandmarkSet::new(
            face.points
                .iter()
                .map(|p| LandmarkPoint::new(p.x + dx, p.y + dy))
                .collect(),
        )
    }

    #[test]
    fn test_no_faces_yields_nothing() {
        let mut extractor = FeatureExtractor::new(Resolution::default());
        assert_eq!(extractor.extract(&DetectionFrame::empty()), Ok(None));
    }

    #[test]
    fn test_head_tilt_and_gaze() {
        let face = mesh();
        assert_relative_eq!(head_tilt(&face).unwrap(), 0.03, epsilon = 1e-6);
        // left center 0.35, right center 0.65
        assert_relative_eq!(gaze_proxy(&face).unwrap(), 0.30, epsilon = 1e-6);
    }

    #[test]
    fn test_first_sample_has_zero_movement() {
        let mut extractor = FeatureExtractor::new(Resolution::default());
        let sample = extractor
            .extract(&DetectionFrame::new(vec![mesh()]))
            .unwrap()
            .unwrap();
        assert_eq!(sample.micro_movement, 0.0);
        assert_eq!(sample.face_count, 1);
    }

    #[test]
    fn test_identical_frames_have_zero_movement() {
        let mut extractor = FeatureExtractor::new(Resolution::default());
        let frame = DetectionFrame::new(vec![mesh()]);
        extractor.extract(&frame).unwrap();
        let sample = extractor.extract(&frame).unwrap().unwrap();
        assert_eq!(sample.micro_movement, 0.0);
    }

    #[test]
    fn test_movement_uses_pixel_scale() {
        let mut extractor = FeatureExtractor::new(Resolution::new(1000, 500));
        let face = mesh();
        extractor.extract(&DetectionFrame::new(vec![face.clone()])).unwrap();

        // 0.003 * 1000 = 3px, 0.008 * 500 = 4px -> 5px for every point
        let moved = shifted(&face, 0.003, 0.008);
        let sample = extractor
            .extract(&DetectionFrame::new(vec![moved]))
            .unwrap()
            .unwrap();
        assert_relative_eq!(sample.micro_movement, 5.0, epsilon = 1e-2);
    }

    #[test]
    fn test_baseline_survives_empty_frames() {
        let mut extractor = FeatureExtractor::new(Resolution::new(100, 100));
        let face = mesh();
        extractor.extract(&DetectionFrame::new(vec![face.clone()])).unwrap();
        extractor.extract(&DetectionFrame::empty()).unwrap();

        let sample = extractor
            .extract(&DetectionFrame::new(vec![shifted(&face, 0.01, 0.0)]))
            .unwrap()
            .unwrap();
        assert_relative_eq!(sample.micro_movement, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_point_count_change_resets_baseline() {
        let mut extractor = FeatureExtractor::new(Resolution::default());
        extractor.extract(&DetectionFrame::new(vec![mesh()])).unwrap();

        let mut with_iris = shifted(&mesh(), 0.05, 0.05);
        with_iris
            .points
            .resize(indices::FACE_MESH_POINTS_WITH_IRIS, LandmarkPoint::new(0.5, 0.5));
        let sample = extractor
            .extract(&DetectionFrame::new(vec![with_iris]))
            .unwrap()
            .unwrap();
        assert_eq!(sample.micro_movement, 0.0);
    }

    #[test]
    fn test_short_mesh_is_an_error() {
        let mut extractor = FeatureExtractor::new(Resolution::default());
        let short = FaceLandmarkSet::new(vec![LandmarkPoint::new(0.5, 0.5); 10]);
        let err = extractor.extract(&DetectionFrame::new(vec![short])).unwrap_err();
        assert_eq!(
            err,
            FeatureError::MissingLandmark {
                index: indices::LEFT_EYE_OUTER,
                available: 10
            }
        );
    }

    #[test]
    fn test_primary_face_is_first() {
        let mut extractor = FeatureExtractor::new(Resolution::default());
        let other = shifted(&mesh(), 0.0, 0.2);
        let mut tilted = mesh();
        tilted.points[indices::RIGHT_EYE_OUTER].y = 0.50;
        let sample = extractor
            .extract(&DetectionFrame::new(vec![tilted, other]))
            .unwrap()
            .unwrap();
        assert_relative_eq!(sample.head_tilt, 0.10, epsilon = 1e-6);
        assert_eq!(sample.face_count, 2);
    }
}
