/// Pose estimator adapter
///
/// Wraps a pose `Model` behind the video-mode contract used by the pipeline:
/// - PoseLandmarker:    owns the loaded model and its static configuration
/// - LandmarkerSession: one video's call sequence (timestamps + tracking state)
/// - SubjectTracker:    previous-frame subjects, drives the tracking threshold
pub mod landmarker;
pub mod tracker;

use image::RgbImage;

use crate::error::Result;
use crate::types::{FrameTimestamp, SubjectPose};

pub use landmarker::{LandmarkerSession, PoseLandmarker};
pub use tracker::SubjectTracker;

/// Stateful video-mode pose estimation.
///
/// Timestamps must strictly increase within one estimator; a repeated or earlier
/// timestamp is an `EstimatorFault`.
pub trait PoseEstimator {
    fn infer(&mut self, image: &RgbImage, timestamp: FrameTimestamp) -> Result<Vec<SubjectPose>>;
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for &mut E {
    fn infer(&mut self, image: &RgbImage, timestamp: FrameTimestamp) -> Result<Vec<SubjectPose>> {
        (**self).infer(image, timestamp)
    }
}
