/// Output artifacts
///
/// - VideoSink:    annotated frame sink with fixed declared dimensions
/// - VideoEncoder: OpenCV `VideoWriter` implementation
/// - document:     per-video landmark document (JSON)
pub mod document;
pub mod encoder;

use image::RgbImage;

use crate::error::{PipelineError, Result};

pub use document::{read_document, write_document};
pub use encoder::VideoEncoder;

/// Encoder parameters, fixed at open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkSpec {
    pub fourcc: [char; 4],
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl SinkSpec {
    /// MPEG-4 part 2 in an .mp4 container
    pub fn mp4v(fps: f64, width: u32, height: u32) -> Self {
        Self {
            fourcc: ['m', 'p', '4', 'v'],
            fps,
            width,
            height,
        }
    }
}

pub trait VideoSink {
    fn spec(&self) -> &SinkSpec;

    /// Appends a frame whose size already matches `spec`.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Finalizes the container. Safe to call more than once.
    fn close(&mut self) -> Result<()>;

    /// Output location, for error reporting.
    fn path(&self) -> &std::path::Path;

    /// Appends a frame; a size different from the declared one is a fault, never resized.
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        let spec = self.spec();
        if frame.dimensions() != (spec.width, spec.height) {
            return Err(PipelineError::sink_unavailable(
                self.path(),
                format!(
                    "frame is {}x{}, sink was opened for {}x{}",
                    frame.width(),
                    frame.height(),
                    spec.width,
                    spec.height
                ),
            ));
        }
        self.write_frame(frame)
    }
}
