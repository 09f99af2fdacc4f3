/// Landmark data model
///
/// Native estimator output (`SubjectPose`) and the keyed, serializable shape
/// (`KeyedPose` / `FrameRecord` / `VideoDataset`) written to the landmark document.
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ========== Keypoints ==========

/// Normalized keypoint: x, y in [0, 1] of the frame, z relative depth as reported by the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One detected subject as reported by the estimator.
///
/// `keypoints` is ordered by topology index; `score` is the detection confidence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubjectPose {
    pub score: f32,
    pub keypoints: Vec<Keypoint>,
}

impl SubjectPose {
    pub fn new(score: f32, keypoints: Vec<Keypoint>) -> Self {
        Self { score, keypoints }
    }
}

/// Keypoint addressed by a stable string key (`point_<n>`).
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedKeypoint {
    pub key: String,
    pub point: Keypoint,
}

impl KeyedKeypoint {
    pub fn key_for(index: usize) -> String {
        format!("point_{}", index)
    }

    /// Topology index encoded in the key, if it is a `point_<n>` key.
    pub fn index(&self) -> Option<usize> {
        self.key.strip_prefix("point_")?.parse().ok()
    }
}

impl Serialize for KeyedKeypoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.point)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for KeyedKeypoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, Keypoint>::deserialize(deserializer)?;
        let mut entries = map.into_iter();
        match (entries.next(), entries.next()) {
            (Some((key, point)), None) => Ok(Self { key, point }),
            _ => Err(D::Error::custom("keypoint entry must hold exactly one `point_<n>` key")),
        }
    }
}

/// A subject re-keyed for serialization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyedPose {
    pub points: Vec<KeyedKeypoint>,
}

impl KeyedPose {
    pub fn get(&self, key: &str) -> Option<&Keypoint> {
        self.points.iter().find(|p| p.key == key).map(|p| &p.point)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.key.as_str())
    }
}

// ========== Frames and datasets ==========

/// Landmarks of one decoded frame. Produced once per frame, even when no subject was found.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub subjects: Vec<KeyedPose>,
}

impl FrameRecord {
    pub fn key(&self) -> String {
        format!("frame_{}", self.frame_index)
    }
}

// Serialized as `{"frame_<i>": [{"point_<n>": {...}}, ...]}`: subjects are concatenated in
// detection order; decoding starts a new subject at every `point_0`.
impl Serialize for FrameRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let points: Vec<&KeyedKeypoint> =
            self.subjects.iter().flat_map(|s| s.points.iter()).collect();
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key(), &points)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for FrameRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, Vec<KeyedKeypoint>>::deserialize(deserializer)?;
        let mut entries = map.into_iter();
        let (key, points) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => return Err(D::Error::custom("frame entry must hold exactly one `frame_<i>` key")),
        };
        let frame_index = key
            .strip_prefix("frame_")
            .and_then(|i| i.parse().ok())
            .ok_or_else(|| D::Error::custom(format!("invalid frame key `{}`", key)))?;

        let mut subjects: Vec<KeyedPose> = Vec::new();
        for point in points {
            match subjects.last_mut() {
                Some(subject) if point.index() != Some(0) => subject.points.push(point),
                _ => subjects.push(KeyedPose {
                    points: vec![point],
                }),
            }
        }

        Ok(Self {
            frame_index,
            subjects,
        })
    }
}

/// All frame records of one video, in decode order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoDataset {
    pub video_name: String,
    #[serde(rename = "frame_landmarks")]
    pub frames: Vec<FrameRecord>,
}

impl VideoDataset {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

// ========== Tasks and timing ==========

/// One discovered input video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTask {
    pub source_path: PathBuf,
    /// File name including extension (`clip.mp4`).
    pub display_name: String,
    pub output_directory: PathBuf,
}

impl VideoTask {
    pub fn new(source_path: PathBuf, output_directory: PathBuf) -> Self {
        let display_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            source_path,
            display_name,
            output_directory,
        }
    }

    /// File name without extension (`clip`).
    pub fn stem(&self) -> String {
        self.source_path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.display_name.clone())
    }

    pub fn landmarks_path(&self) -> PathBuf {
        self.output_directory
            .join(format!("{}_landmarks.json", self.display_name))
    }

    pub fn output_video_path(&self) -> PathBuf {
        self.output_directory
            .join(format!("{}_output.mp4", self.stem()))
    }
}

/// Presentation time of a frame, in microseconds from the start of the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameTimestamp(u64);

impl FrameTimestamp {
    pub fn from_micros(us: u64) -> Self {
        Self(us)
    }

    pub fn from_millis_f64(ms: f64) -> Self {
        Self((ms.max(0.0) * 1000.0).round() as u64)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Static properties of an opened video. `frame_count` is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: u64,
}
