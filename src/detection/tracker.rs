//! Frame-to-frame subject tracking for one session
//!
//! Candidates that continue a subject reported in the previous frame are held to the
//! tracking threshold; new subjects must clear the detection threshold (high/low split
//! as in ByteTrack, without motion prediction).

use crate::config::LandmarkerConfig;
use crate::models::PoseCandidate;
use crate::Bbox;

/// Minimum IoU for a candidate to continue a previous subject
pub const TRACK_IOU: f32 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct SubjectTracker {
    /// Boxes reported in the previous frame, in rank order
    previous: Vec<Bbox>,
}

impl SubjectTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self) -> bool {
        !self.previous.is_empty()
    }

    fn continues_subject(&self, bbox: &Bbox) -> bool {
        self.previous.iter().any(|p| p.iou(bbox) >= TRACK_IOU)
    }

    /// Filters score-ranked candidates down to the reported subjects and remembers them
    /// for the next frame.
    pub fn select(
        &mut self,
        mut candidates: Vec<PoseCandidate>,
        config: &LandmarkerConfig,
    ) -> Vec<PoseCandidate> {
        candidates.sort_by(|a, b| b.score().total_cmp(&a.score()));

        let mut selected = Vec::with_capacity(config.num_poses);
        for candidate in candidates {
            if selected.len() >= config.num_poses {
                break;
            }
            let threshold = if self.continues_subject(&candidate.bbox) {
                config.min_tracking_confidence
            } else {
                config.min_pose_detection_confidence
            };
            if candidate.score() < threshold {
                continue;
            }
            if candidate.presence() < config.min_pose_presence_confidence {
                continue;
            }
            selected.push(candidate);
        }

        self.previous = selected.iter().map(|c| c.bbox).collect();
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point2, NUM_KEYPOINTS};

    fn candidate(x: f32, score: f32, presence: f32) -> PoseCandidate {
        PoseCandidate {
            bbox: Bbox::new(x, 0., 100., 200., score),
            keypoints: vec![Point2::new_with_conf(x, 0., presence); NUM_KEYPOINTS],
        }
    }

    fn config(num_poses: usize) -> LandmarkerConfig {
        LandmarkerConfig {
            num_poses,
            min_pose_detection_confidence: 0.6,
            min_pose_presence_confidence: 0.5,
            min_tracking_confidence: 0.3,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_subject_needs_detection_confidence() {
        let mut tracker = SubjectTracker::new();
        let ys = tracker.select(vec![candidate(0., 0.4, 0.9)], &config(1));
        assert!(ys.is_empty());
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn test_tracked_subject_uses_tracking_confidence() {
        let mut tracker = SubjectTracker::new();
        assert_eq!(tracker.select(vec![candidate(0., 0.8, 0.9)], &config(1)).len(), 1);
        assert!(tracker.is_tracking());

        // same place, weaker score: kept while tracked
        let ys = tracker.select(vec![candidate(5., 0.4, 0.9)], &config(1));
        assert_eq!(ys.len(), 1);

        // far away with the same score: treated as new and dropped
        let ys = tracker.select(vec![candidate(1000., 0.4, 0.9)], &config(1));
        assert!(ys.is_empty());
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn test_presence_and_limit() {
        let mut tracker = SubjectTracker::new();
        let ys = tracker.select(
            vec![
                candidate(0., 0.7, 0.9),
                candidate(300., 0.95, 0.9),
                candidate(600., 0.9, 0.2),
                candidate(900., 0.8, 0.9),
            ],
            &config(2),
        );
        assert_eq!(ys.len(), 2);
        assert_eq!(ys[0].score(), 0.95);
        assert_eq!(ys[1].score(), 0.8);
    }
}
