/// OpenCV video decoder
/// Sequential `VideoCapture` reads, BGR → RGB, decode-position timestamps
use std::path::{Path, PathBuf};

use image::RgbImage;
use opencv::{core::Mat, prelude::*, videoio};

use super::{Frame, FrameSource};
use crate::error::{PipelineError, Result};
use crate::types::{FrameTimestamp, VideoProperties};

const FALLBACK_FPS: f64 = 30.0;

pub struct VideoDecoder {
    path: PathBuf,
    capture: Option<videoio::VideoCapture>,
    properties: VideoProperties,
    frames_read: u64,
    last_timestamp: Option<FrameTimestamp>,
}

impl VideoDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| PipelineError::source_unavailable(path, reason);

        let path_str = path
            .to_str()
            .ok_or_else(|| unavailable("path is not valid UTF-8".to_string()))?;
        // CAP_ANY lets OpenCV choose the backend
        let mut capture = videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .map_err(|e| unavailable(e.to_string()))?;
        if !capture.is_opened().map_err(|e| unavailable(e.to_string()))? {
            let _ = capture.release();
            return Err(unavailable("failed to open video file".to_string()));
        }

        let get = |capture: &videoio::VideoCapture, prop: i32| capture.get(prop).unwrap_or(0.0);
        let properties = VideoProperties {
            width: get(&capture, videoio::CAP_PROP_FRAME_WIDTH) as u32,
            height: get(&capture, videoio::CAP_PROP_FRAME_HEIGHT) as u32,
            fps: get(&capture, videoio::CAP_PROP_FPS),
            frame_count: get(&capture, videoio::CAP_PROP_FRAME_COUNT).max(0.0) as u64,
        };
        if properties.width == 0 || properties.height == 0 {
            let _ = capture.release();
            return Err(unavailable("video reports no frame size".to_string()));
        }

        tracing::info!(
            resolution = %format!("{}x{}", properties.width, properties.height),
            fps = properties.fps,
            frame_count = properties.frame_count,
            "video opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            capture: Some(capture),
            properties,
            frames_read: 0,
            last_timestamp: None,
        })
    }
}

impl FrameSource for VideoDecoder {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };

        let mut frame = Mat::default();
        match capture.read(&mut frame) {
            Ok(true) if !frame.empty() => {}
            Ok(_) => {
                tracing::debug!(frames = self.frames_read, "end of stream");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(frames = self.frames_read, error = %e, "read failed, ending stream");
                return Ok(None);
            }
        }
        let pos_msec = capture.get(videoio::CAP_PROP_POS_MSEC).unwrap_or(f64::NAN);

        let image = mat_to_rgb(&frame)
            .map_err(|reason| PipelineError::source_unavailable(&self.path, reason))?;
        let timestamp = next_timestamp(
            self.last_timestamp,
            pos_msec,
            self.frames_read,
            self.properties.fps,
        );
        self.last_timestamp = Some(timestamp);
        self.frames_read += 1;

        Ok(Some(Frame { image, timestamp }))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut capture) = self.capture.take() {
            capture
                .release()
                .map_err(|e| PipelineError::source_unavailable(&self.path, e.to_string()))?;
        }
        Ok(())
    }
}

/// Timestamp of the frame just read.
///
/// Uses the container's decode position when it is finite and advances past `last`.
/// Otherwise falls back to `frames_read / fps` (30 fps when unknown), bumped to
/// `last + 1µs` if that would not advance either.
pub fn next_timestamp(
    last: Option<FrameTimestamp>,
    pos_msec: f64,
    frames_read: u64,
    fps: f64,
) -> FrameTimestamp {
    let from_position = FrameTimestamp::from_millis_f64(pos_msec);
    if pos_msec.is_finite() && last.map_or(true, |last| from_position > last) {
        return from_position;
    }

    let fps = if fps > 0.0 { fps } else { FALLBACK_FPS };
    let from_index =
        FrameTimestamp::from_micros((frames_read as f64 * 1_000_000.0 / fps).round() as u64);
    match last {
        Some(last) if from_index <= last => FrameTimestamp::from_micros(last.as_micros() + 1),
        _ => from_index,
    }
}

/// BGR 8UC3 `Mat` → `RgbImage`
fn mat_to_rgb(frame: &Mat) -> std::result::Result<RgbImage, String> {
    if frame.channels() != 3 {
        return Err(format!("expected 3 channels, got {}", frame.channels()));
    }
    if !frame.is_continuous() {
        return Err("frame is not continuous".to_string());
    }
    let (width, height) = (frame.cols() as u32, frame.rows() as u32);
    let bgr = frame.data_bytes().map_err(|e| e.to_string())?;

    let mut rgb = Vec::with_capacity(bgr.len());
    for px in bgr.chunks_exact(3) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    RgbImage::from_raw(width, height, rgb).ok_or_else(|| "frame buffer size mismatch".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn us(v: u64) -> FrameTimestamp {
        FrameTimestamp::from_micros(v)
    }

    #[test]
    fn test_uses_decode_position_when_it_advances() {
        assert_eq!(next_timestamp(None, 0.0, 0, 25.0), us(0));
        assert_eq!(next_timestamp(Some(us(0)), 40.0, 1, 25.0), us(40_000));
    }

    #[test]
    fn test_nan_position_falls_back_to_index() {
        assert_eq!(next_timestamp(None, f64::NAN, 0, 25.0), us(0));
        assert_eq!(next_timestamp(Some(us(0)), f64::NAN, 1, 25.0), us(40_000));
        assert_eq!(next_timestamp(Some(us(0)), f64::INFINITY, 2, 25.0), us(80_000));
    }

    #[test]
    fn test_repeated_position_falls_back_to_index() {
        // containers that report 0 for every frame
        assert_eq!(next_timestamp(Some(us(0)), 0.0, 1, 50.0), us(20_000));
        assert_eq!(next_timestamp(Some(us(80_000)), 80.0, 3, 25.0), us(120_000));
    }

    #[test]
    fn test_unknown_fps_uses_default_rate() {
        assert_eq!(next_timestamp(Some(us(0)), f64::NAN, 3, 0.0), us(100_000));
        assert_eq!(next_timestamp(Some(us(0)), f64::NAN, 3, -1.0), us(100_000));
    }

    #[test]
    fn test_stale_fallback_is_bumped_past_last() {
        // position jumped ahead earlier, then stopped advancing
        assert_eq!(next_timestamp(Some(us(500_000)), 500.0, 2, 25.0), us(500_001));
        assert_eq!(next_timestamp(Some(us(500_001)), f64::NAN, 3, 25.0), us(500_002));
    }

    #[test]
    fn test_sequence_is_strictly_increasing() {
        let positions = [0.0, 0.0, f64::NAN, 120.0, 120.0, 40.0, 200.0];
        let mut last = None;
        for (i, pos) in positions.iter().enumerate() {
            let ts = next_timestamp(last, *pos, i as u64, 25.0);
            if let Some(last) = last {
                assert!(ts > last, "frame {}: {} does not advance past {}", i, ts, last);
            }
            last = Some(ts);
        }
    }
}
