//! Face Mesh Landmark Types and Indices
//!
//! Detector output in normalized image space: every point has `x`, `y` in
//! `[0, 1]` relative to the frame, plus an optional relative depth `z`.

use serde::{Deserialize, Serialize};

/// MediaPipe Face Mesh landmark indices used by the proctoring features
pub mod indices {
    /// Left eye outer corner
    pub const LEFT_EYE_OUTER: usize = 33;
    /// Left eye inner corner
    pub const LEFT_EYE_INNER: usize = 133;
    /// Right eye inner corner
    pub const RIGHT_EYE_INNER: usize = 362;
    /// Right eye outer corner
    pub const RIGHT_EYE_OUTER: usize = 263;

    /// Points in the base mesh
    pub const FACE_MESH_POINTS: usize = 468;
    /// Points with iris refinement enabled
    pub const FACE_MESH_POINTS_WITH_IRIS: usize = 478;
}

/// One landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Convert to pixel space for a frame of the given size
    pub fn to_pixels(&self, resolution: Resolution) -> [f32; 2] {
        [
            self.x * resolution.width as f32,
            self.y * resolution.height as f32,
        ]
    }
}

/// Ordered landmark set for a single detected face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarkSet {
    pub points: Vec<LandmarkPoint>,
}

impl FaceLandmarkSet {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    /// Landmark by index, `None` if the mesh is shorter than expected
    pub fn get(&self, idx: usize) -> Option<LandmarkPoint> {
        self.points.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounding box of all points, in pixels
    pub fn bounding_box(&self, resolution: Resolution) -> Option<BoundingBox> {
        let mut iter = self.points.iter().map(|p| p.to_pixels(resolution));
        let [x0, y0] = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for [x, y] in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}

/// Result of one detector invocation
///
/// Faces are in detector order; the first one is the primary face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub faces: Vec<FaceLandmarkSet>,
}

impl DetectionFrame {
    pub fn new(faces: Vec<FaceLandmarkSet>) -> Self {
        Self { faces }
    }

    /// Frame with no detected faces
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn primary_face(&self) -> Option<&FaceLandmarkSet> {
        self.faces.first()
    }

    /// Faces beyond the primary one
    pub fn extra_faces(&self) -> usize {
        self.faces.len().saturating_sub(1)
    }
}

/// Pixel dimensions of a video stream or drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(720, 540)
    }
}

/// Pixel-space rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}
