/// OpenCV video encoder
/// RGB frames → BGR `Mat` → `VideoWriter`
use std::path::{Path, PathBuf};

use image::RgbImage;
use opencv::{
    core::{self, Mat, Size},
    prelude::*,
    videoio,
};

use super::{SinkSpec, VideoSink};
use crate::error::{PipelineError, Result};

pub struct VideoEncoder {
    path: PathBuf,
    spec: SinkSpec,
    writer: Option<videoio::VideoWriter>,
    frame: Mat,
    frames_written: u64,
}

impl VideoEncoder {
    pub fn open(path: &Path, spec: SinkSpec) -> Result<Self> {
        let unavailable = |reason: String| PipelineError::sink_unavailable(path, reason);

        let path_str = path
            .to_str()
            .ok_or_else(|| unavailable("path is not valid UTF-8".to_string()))?;
        let [c1, c2, c3, c4] = spec.fourcc;
        let fourcc =
            videoio::VideoWriter::fourcc(c1, c2, c3, c4).map_err(|e| unavailable(e.to_string()))?;
        let mut writer = videoio::VideoWriter::new(
            path_str,
            fourcc,
            spec.fps,
            Size::new(spec.width as i32, spec.height as i32),
            true,
        )
        .map_err(|e| unavailable(e.to_string()))?;
        if !writer.is_opened().map_err(|e| unavailable(e.to_string()))? {
            let _ = writer.release();
            return Err(unavailable(format!(
                "cannot create {}x{} @ {} fps with codec {}",
                spec.width,
                spec.height,
                spec.fps,
                spec.fourcc.iter().collect::<String>()
            )));
        }

        let frame = Mat::new_rows_cols_with_default(
            spec.height as i32,
            spec.width as i32,
            core::CV_8UC3,
            core::Scalar::all(0.0),
        )
        .map_err(|e| unavailable(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            spec,
            writer: Some(writer),
            frame,
            frames_written: 0,
        })
    }
}

impl VideoSink for VideoEncoder {
    fn spec(&self) -> &SinkSpec {
        &self.spec
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let unavailable = |reason: String| PipelineError::sink_unavailable(&self.path, reason);
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| unavailable("sink already closed".to_string()))?;

        let bgr = self
            .frame
            .data_bytes_mut()
            .map_err(|e| unavailable(e.to_string()))?;
        for (dst, src) in bgr.chunks_exact_mut(3).zip(frame.pixels()) {
            dst[0] = src.0[2];
            dst[1] = src.0[1];
            dst[2] = src.0[0];
        }
        writer
            .write(&self.frame)
            .map_err(|e| unavailable(e.to_string()))?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            tracing::debug!(
                frames = self.frames_written,
                path = %self.path.display(),
                "finalizing video"
            );
            writer
                .release()
                .map_err(|e| PipelineError::sink_unavailable(&self.path, e.to_string()))?;
        }
        Ok(())
    }
}
