//! Overlay surface state: the primary-face bounding box drawn over the
//! video preview. The surface matches the stream's native size.

use vigil_signals::{BoundingBox, DetectionFrame, Resolution};

use crate::devices::DetectionObserver;

#[derive(Debug, Clone)]
pub struct Overlay {
    resolution: Resolution,
    face_box: Option<BoundingBox>,
}

impl Overlay {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            face_box: None,
        }
    }

    /// Size to the native stream resolution, or the requested one if the
    /// stream does not report it.
    pub fn sized_for(native: Option<Resolution>, requested: Resolution) -> Self {
        let resolution = native.filter(|r| !r.is_empty()).unwrap_or(requested);
        Self::new(resolution)
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn face_box(&self) -> Option<BoundingBox> {
        self.face_box
    }

    pub fn clear(&mut self) {
        self.face_box = None;
    }
}

impl DetectionObserver for Overlay {
    fn on_detection(&mut self, frame: &DetectionFrame, _timestamp_us: i64) {
        self.face_box = frame
            .primary_face()
            .and_then(|face| face.bounding_box(self.resolution));
    }
}
