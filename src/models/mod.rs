/// Pose model interface
///
/// A `Model` turns one RGB frame into ranked pose candidates in source pixel
/// coordinates. It holds no cross-frame state; tracking lives in the
/// `detection` sessions built on top of it.
///
/// ```text
/// RgbImage → preprocess → NCHW tensor → ort run → raw rows → postprocess
///          → Vec<PoseCandidate>
/// ```
use anyhow::Result;
use image::RgbImage;

use crate::{Bbox, Point2};

pub mod yolov8_pose;

pub use yolov8_pose::YOLOv8Pose;

/// One decoded subject before session-level filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseCandidate {
    /// Subject box in source pixels; its confidence is the detection score
    pub bbox: Bbox,
    /// Keypoints in source pixels, ordered by topology index
    pub keypoints: Vec<Point2>,
}

impl PoseCandidate {
    pub fn score(&self) -> f32 {
        self.bbox.confidence()
    }

    /// Mean keypoint confidence, 0 for an empty pose.
    pub fn presence(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        self.keypoints.iter().map(|k| k.confidence()).sum::<f32>() / self.keypoints.len() as f32
    }
}

/// Unified pose model interface
pub trait Model {
    /// Full single-image pass: preprocess → run → postprocess
    fn forward(&mut self, image: &RgbImage) -> Result<Vec<PoseCandidate>>;

    /// Keypoints per subject (topology size)
    fn num_keypoints(&self) -> usize;

    /// Logs model information
    fn summary(&self) {}
}
