//! Landmarker (pose estimator adapter)
//! Model output → ranked, tracked, normalized `SubjectPose`s

use image::RgbImage;

use super::tracker::SubjectTracker;
use super::PoseEstimator;
use crate::config::{LandmarkerConfig, ModelTier};
use crate::error::{EstimatorFault, Result};
use crate::models::{Model, PoseCandidate, YOLOv8Pose};
use crate::types::{FrameTimestamp, Keypoint, SubjectPose};
use crate::NUM_KEYPOINTS;

pub struct PoseLandmarker<M = YOLOv8Pose> {
    model: M,
    config: LandmarkerConfig,
}

impl PoseLandmarker<YOLOv8Pose> {
    /// Loads the model for `tier` from the directory of `config.model_path`.
    pub fn create(tier: ModelTier, mut config: LandmarkerConfig) -> Result<Self> {
        let dir = config
            .model_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        config.model_path = dir.join(tier.file_name());
        if config.output_segmentation_masks {
            tracing::warn!("segmentation masks requested, pose models produce none");
        }

        let model =
            YOLOv8Pose::new(&config).map_err(|e| EstimatorFault::ModelLoad(format!("{:#}", e)))?;
        model.summary();
        Self::new(model, config)
    }
}

impl<M: Model> PoseLandmarker<M> {
    /// Wraps a loaded model, rejecting one whose keypoints do not match `SKELETON`.
    pub fn new(model: M, config: LandmarkerConfig) -> Result<Self> {
        let nk = model.num_keypoints();
        if nk != NUM_KEYPOINTS {
            return Err(EstimatorFault::ModelLoad(format!(
                "model predicts {} keypoints, the skeleton needs {}",
                nk, NUM_KEYPOINTS
            ))
            .into());
        }
        Ok(Self::with_model(model, config))
    }

    pub fn with_model(model: M, config: LandmarkerConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &LandmarkerConfig {
        &self.config
    }

    /// Starts a fresh call sequence for one video.
    pub fn session(&mut self) -> LandmarkerSession<'_, M> {
        LandmarkerSession {
            model: &mut self.model,
            config: &self.config,
            tracker: SubjectTracker::new(),
            last_timestamp: None,
            calls: 0,
        }
    }
}

/// One video's estimator session. Dropped when the video finishes.
pub struct LandmarkerSession<'a, M> {
    model: &'a mut M,
    config: &'a LandmarkerConfig,
    tracker: SubjectTracker,
    last_timestamp: Option<FrameTimestamp>,
    calls: u64,
}

impl<M: Model> LandmarkerSession<'_, M> {
    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn check_timestamp(&self, timestamp: FrameTimestamp) -> Result<()> {
        match self.last_timestamp {
            Some(previous) if timestamp <= previous => {
                Err(EstimatorFault::NonIncreasingTimestamp {
                    previous,
                    current: timestamp,
                }
                .into())
            }
            _ => Ok(()),
        }
    }
}

impl<M: Model> PoseEstimator for LandmarkerSession<'_, M> {
    fn infer(&mut self, image: &RgbImage, timestamp: FrameTimestamp) -> Result<Vec<SubjectPose>> {
        self.check_timestamp(timestamp)?;
        self.last_timestamp = Some(timestamp);
        self.calls += 1;

        let candidates = self
            .model
            .forward(image)
            .map_err(|e| EstimatorFault::Inference(format!("{:#}", e)))?;
        let selected = self.tracker.select(candidates, self.config);

        let (w, h) = image.dimensions();
        Ok(selected
            .iter()
            .map(|c| normalize_candidate(c, w as f32, h as f32))
            .collect())
    }
}

/// Pixel candidate → frame-normalized pose. The model is planar, so z is 0.
fn normalize_candidate(candidate: &PoseCandidate, width: f32, height: f32) -> SubjectPose {
    let keypoints = candidate
        .keypoints
        .iter()
        .map(|k| {
            Keypoint::new(
                (k.x() / width).clamp(0.0, 1.0),
                (k.y() / height).clamp(0.0, 1.0),
                0.0,
            )
        })
        .collect();
    SubjectPose::new(candidate.score(), keypoints)
}
