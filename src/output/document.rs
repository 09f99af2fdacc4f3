/// Landmark document: `[ { "video_name": ..., "frame_landmarks": [...] } ]`, one file per video,
/// pretty-printed with 4-space indentation.
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::types::VideoDataset;

pub fn write_document(path: &Path, dataset: &VideoDataset) -> Result<()> {
    let fault = |source: io::Error| PipelineError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(fault)?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    [dataset]
        .serialize(&mut ser)
        .map_err(|e| fault(e.into()))?;
    writer.flush().map_err(fault)?;
    Ok(())
}

/// Reads a document written by `write_document`. Malformed JSON is `InvalidData`.
pub fn read_document(path: &Path) -> io::Result<Vec<VideoDataset>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameRecord, KeyedKeypoint, KeyedPose, Keypoint};

    fn dataset() -> VideoDataset {
        VideoDataset {
            video_name: "walk.mp4".to_string(),
            frames: vec![
                FrameRecord {
                    frame_index: 0,
                    subjects: vec![KeyedPose {
                        points: vec![
                            KeyedKeypoint {
                                key: "point_0".to_string(),
                                point: Keypoint::new(0.25, 0.5, 0.0),
                            },
                            KeyedKeypoint {
                                key: "point_1".to_string(),
                                point: Keypoint::new(0.75, 0.125, 0.0),
                            },
                        ],
                    }],
                },
                FrameRecord {
                    frame_index: 1,
                    subjects: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn test_document_shape_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walk.mp4_landmarks.json");
        write_document(&path, &dataset()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["video_name"], "walk.mp4");
        assert_eq!(value[0]["frame_landmarks"][0]["frame_0"][1]["point_1"]["y"], 0.125);
        assert_eq!(value[0]["frame_landmarks"][1]["frame_1"], serde_json::json!([]));
        assert!(text.contains("\n    {"));

        let decoded = read_document(&path).unwrap();
        assert_eq!(decoded, vec![dataset()]);
    }

    #[test]
    fn test_read_errors_keep_their_io_kind() {
        let dir = tempfile::tempdir().unwrap();
        let missing = read_document(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);

        let garbled = dir.path().join("garbled.json");
        std::fs::write(&garbled, b"[{\"video_name\": 3}]").unwrap();
        assert_eq!(read_document(&garbled).unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_unwritable_path_is_output_fault() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x_landmarks.json");
        let err = write_document(&path, &dataset()).unwrap_err();
        assert_eq!(err.kind(), "OutputWriteFault");
    }
}
