/// Run configuration
///
/// Everything is static for the whole batch: one model tier, one set of thresholds.
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use image::Rgb;

use crate::ort_backend::OrtEP;

/// Precision/performance tier of the pose model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModelTier {
    #[default]
    Lite,
    Full,
    Heavy,
}

impl ModelTier {
    /// Model file for the tier, looked up inside the model directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            ModelTier::Lite => "yolov8n-pose.onnx",
            ModelTier::Full => "yolov8m-pose.onnx",
            ModelTier::Heavy => "yolov8x-pose.onnx",
        }
    }
}

/// Canvas the skeleton is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AnnotationMode {
    /// Keypoints only, on a solid background
    #[default]
    Blank,
    /// Keypoints drawn over the decoded frame
    Overlay,
}

/// Options recognised by the pose estimator adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkerConfig {
    pub model_path: PathBuf,
    pub ep: OrtEP,
    pub input_size: u32,
    pub num_poses: usize,
    pub min_pose_detection_confidence: f32,
    pub min_pose_presence_confidence: f32,
    pub min_tracking_confidence: f32,
    /// Accepted for completeness; nothing downstream consumes masks.
    pub output_segmentation_masks: bool,
    /// Log per-frame preprocess/inference/postprocess timings at debug level
    pub profile: bool,
}

impl Default for LandmarkerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("pose_models").join(ModelTier::Lite.file_name()),
            ep: OrtEP::CPU,
            input_size: 640,
            num_poses: 1,
            min_pose_detection_confidence: 0.5,
            min_pose_presence_confidence: 0.5,
            min_tracking_confidence: 0.5,
            output_segmentation_masks: false,
            profile: false,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Batch pose landmark extraction from video files",
    long_about = None
)]
pub struct Args {
    /// Folder holding the input videos (.mp4 / .avi)
    #[arg(short, long, default_value = "./videos")]
    pub input: PathBuf,

    /// Folder receiving the landmark documents and annotated videos
    #[arg(short, long, default_value = "./landmarks_output")]
    pub output: PathBuf,

    /// Folder holding the pose model files
    #[arg(long, default_value = "./pose_models")]
    pub model_dir: PathBuf,

    /// Model tier
    #[arg(short, long, value_enum, default_value_t = ModelTier::Lite)]
    pub tier: ModelTier,

    /// Maximum number of subjects reported per frame
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub num_poses: u32,

    /// Minimum confidence for a new subject to be detected
    #[arg(long, default_value_t = 0.5, value_parser = parse_probability)]
    pub min_detection: f32,

    /// Minimum mean keypoint confidence for a subject to be reported
    #[arg(long, default_value_t = 0.5, value_parser = parse_probability)]
    pub min_presence: f32,

    /// Minimum confidence to keep tracking a subject seen in the previous frame
    #[arg(long, default_value_t = 0.5, value_parser = parse_probability)]
    pub min_tracking: f32,

    /// Request segmentation masks (currently unused downstream)
    #[arg(long)]
    pub segmentation_masks: bool,

    /// Annotation canvas
    #[arg(short, long, value_enum, default_value_t = AnnotationMode::Blank)]
    pub annotation: AnnotationMode,

    /// Background colour of the blank canvas, as R,G,B
    #[arg(long, default_value = "0,0,0", value_parser = parse_rgb)]
    pub background: Rgb<u8>,

    /// Process files in sorted name order instead of directory listing order
    #[arg(long)]
    pub sorted: bool,

    /// Treat each subfolder of the input as a class with its own output subfolder
    #[arg(long)]
    pub class_dirs: bool,

    /// Run inference on CUDA (needs the `cuda` feature)
    #[arg(long)]
    pub cuda: bool,

    /// CUDA device id
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// Square model input size
    #[arg(long, default_value_t = 640)]
    pub input_size: u32,

    /// Log model timings per frame (visible with RUST_LOG=pose_landmarks=debug)
    #[arg(long)]
    pub profile: bool,
}

impl Args {
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(self.tier.file_name())
    }

    pub fn landmarker_config(&self) -> LandmarkerConfig {
        LandmarkerConfig {
            model_path: self.model_path(),
            ep: if self.cuda {
                OrtEP::CUDA(self.device_id)
            } else {
                OrtEP::CPU
            },
            input_size: self.input_size,
            num_poses: self.num_poses as usize,
            min_pose_detection_confidence: self.min_detection,
            min_pose_presence_confidence: self.min_presence,
            min_tracking_confidence: self.min_tracking,
            output_segmentation_masks: self.segmentation_masks,
            profile: self.profile,
        }
    }
}

fn parse_probability(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("`{}` is not a number: {}", s, e))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("`{}` is not in [0, 1]", s))
    }
}

fn parse_rgb(s: &str) -> Result<Rgb<u8>, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("`{}` is not R,G,B", s));
    }
    let mut rgb = [0u8; 3];
    for (c, part) in rgb.iter_mut().zip(parts) {
        *c = part
            .parse()
            .map_err(|e| format!("`{}` is not a colour channel: {}", part, e))?;
    }
    Ok(Rgb(rgb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_lite_single_pose() {
        let args = Args::try_parse_from(["pose-landmarks"]).unwrap();
        assert_eq!(args.tier, ModelTier::Lite);
        assert_eq!(args.annotation, AnnotationMode::Blank);
        assert_eq!(args.background, Rgb([0, 0, 0]));

        let config = args.landmarker_config();
        assert_eq!(config.num_poses, 1);
        assert_eq!(config.min_pose_detection_confidence, 0.5);
        assert_eq!(config.ep, OrtEP::CPU);
        assert!(!config.output_segmentation_masks);
        assert!(!config.profile);
        assert_eq!(config.model_path, PathBuf::from("./pose_models/yolov8n-pose.onnx"));
    }

    #[test]
    fn test_tier_and_thresholds() {
        let args = Args::try_parse_from([
            "pose-landmarks",
            "--tier",
            "heavy",
            "--num-poses",
            "3",
            "--min-tracking",
            "0.3",
            "--background",
            "255, 255, 255",
            "--annotation",
            "overlay",
        ])
        .unwrap();
        assert_eq!(args.tier, ModelTier::Heavy);
        assert_eq!(args.annotation, AnnotationMode::Overlay);
        assert_eq!(args.background, Rgb([255, 255, 255]));
        let config = args.landmarker_config();
        assert_eq!(config.num_poses, 3);
        assert_eq!(config.min_tracking_confidence, 0.3);
        assert!(config.model_path.ends_with("yolov8x-pose.onnx"));
    }

    #[test]
    fn test_profile_and_cuda_reach_landmarker_config() {
        let args = Args::try_parse_from([
            "pose-landmarks",
            "--profile",
            "--cuda",
            "--device-id",
            "1",
            "--input-size",
            "320",
        ])
        .unwrap();
        let config = args.landmarker_config();
        assert!(config.profile);
        assert_eq!(config.ep, OrtEP::CUDA(1));
        assert_eq!(config.input_size, 320);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(Args::try_parse_from(["pose-landmarks", "--min-detection", "1.5"]).is_err());
        assert!(Args::try_parse_from(["pose-landmarks", "--num-poses", "0"]).is_err());
        assert!(Args::try_parse_from(["pose-landmarks", "--background", "1,2"]).is_err());
    }
}
