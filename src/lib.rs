#![allow(clippy::type_complexity)]
// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // run configuration (command line)
pub mod detection; // pose estimator adapter: sessions + tracking
pub mod error; // per-video error kinds
pub mod input; // frame source
pub mod models; // pose model interface + YOLOv8-pose
pub mod normalizer; // native poses -> keyed records
pub mod ort_backend;
pub mod output; // video sink + landmark document
pub mod pipeline; // orchestrator + batch coordinator
pub mod renderer; // skeleton annotation
pub mod types;

pub use crate::config::{AnnotationMode, Args, LandmarkerConfig, ModelTier};
pub use crate::detection::{LandmarkerSession, PoseEstimator, PoseLandmarker};
pub use crate::error::{EstimatorFault, PipelineError};
pub use crate::models::{Model, PoseCandidate, YOLOv8Pose};
pub use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP};
pub use crate::pipeline::{
    AnnotationOptions, BatchCoordinator, BatchOptions, BatchReport, OpenCvIo, VideoIo,
    VideoPipeline,
};
pub use crate::types::{
    FrameRecord, FrameTimestamp, KeyedKeypoint, KeyedPose, Keypoint, SubjectPose, VideoDataset,
    VideoTask,
};

/// Keeps the highest-scoring candidate of every overlapping group, in score order.
pub fn non_max_suppression(xs: &mut Vec<PoseCandidate>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.bbox.confidence().total_cmp(&b1.bbox.confidence()));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].bbox.iou(&xs[index].bbox);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

/// COCO-17 skeleton connections, indexed by keypoint.
pub const SKELETON: [(usize, usize); 16] = [
    (0, 1),
    (0, 2),
    (1, 3),
    (2, 4),
    (5, 6),
    (5, 11),
    (6, 12),
    (11, 12),
    (5, 7),
    (6, 8),
    (7, 9),
    (8, 10),
    (11, 13),
    (12, 14),
    (13, 15),
    (14, 16),
];

/// Number of keypoints in a COCO pose.
pub const NUM_KEYPOINTS: usize = 17;

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Point2 {
    // A point2d with x, y, conf
    x: f32,
    y: f32,
    confidence: f32,
}

impl Point2 {
    pub fn new_with_conf(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bbox {
    // a bounding box around a subject, in source pixels
    xmin: f32,
    ymin: f32,
    width: f32,
    height: f32,
    confidence: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, width: f32, height: f32, confidence: f32) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
            confidence,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.xmin.max(another.xmin);
        let r = self.xmax().min(another.xmax());
        let t = self.ymin.max(another.ymin);
        let b = self.ymax().min(another.ymax());
        (r - l).max(0.) * (b - t).max(0.)
    }

    pub fn union(&self, another: &Bbox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    pub fn iou(&self, another: &Bbox) -> f32 {
        let union = self.union(another);
        if union <= 0. {
            return 0.;
        }
        self.intersection_area(another) / union
    }
}
