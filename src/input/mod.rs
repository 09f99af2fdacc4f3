/// Video input system (frame source)
///
/// - FrameSource:  sequential frame pulls with presentation timestamps
/// - VideoDecoder: OpenCV `VideoCapture` implementation
pub mod decoder;

use image::RgbImage;

use crate::error::Result;
use crate::types::{FrameTimestamp, VideoProperties};

pub use decoder::VideoDecoder;

/// One decoded frame, RGB, with its decode-position timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub image: RgbImage,
    pub timestamp: FrameTimestamp,
}

pub trait FrameSource {
    /// Resolution, frame rate and (advisory) frame count.
    fn properties(&self) -> VideoProperties;

    /// Next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Releases decoder resources. Safe to call more than once.
    fn close(&mut self) -> Result<()>;
}
