/// Frame result normalizer
///
/// Re-keys native subject poses by topology index (`point_<n>`) so serialization
/// and later analysis never depend on the estimator's result type.
use crate::types::{FrameRecord, KeyedKeypoint, KeyedPose, SubjectPose};

pub fn normalize_subject(subject: &SubjectPose) -> KeyedPose {
    KeyedPose {
        points: subject
            .keypoints
            .iter()
            .enumerate()
            .map(|(i, point)| KeyedKeypoint {
                key: KeyedKeypoint::key_for(i),
                point: *point,
            })
            .collect(),
    }
}

pub fn normalize(subjects: &[SubjectPose]) -> Vec<KeyedPose> {
    subjects.iter().map(normalize_subject).collect()
}

/// Record for the frame at `frame_index`; an empty detection still yields a record.
pub fn frame_record(frame_index: usize, subjects: &[SubjectPose]) -> FrameRecord {
    FrameRecord {
        frame_index,
        subjects: normalize(subjects),
    }
}
