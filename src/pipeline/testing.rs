//! In-memory stand-ins for decoder, encoder, estimator and model.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{Rgb, RgbImage};

use super::VideoIo;
use crate::detection::PoseEstimator;
use crate::error::{EstimatorFault, PipelineError, Result};
use crate::input::{Frame, FrameSource};
use crate::models::{Model, PoseCandidate};
use crate::output::{SinkSpec, VideoSink};
use crate::types::{FrameTimestamp, Keypoint, SubjectPose, VideoProperties};
use crate::{Bbox, Point2, NUM_KEYPOINTS};

#[derive(Debug, Default)]
pub struct IoLog {
    pub sources_closed: usize,
    pub sinks_opened: Vec<PathBuf>,
    pub sinks_closed: usize,
    pub frames_written: usize,
    pub discarded: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FakeVideo {
    pub properties: VideoProperties,
    pub frame_size: (u32, u32),
    pub frozen_clock: bool,
}

impl FakeVideo {
    pub fn new(width: u32, height: u32, frames: usize) -> Self {
        Self {
            properties: VideoProperties {
                width,
                height,
                fps: 25.0,
                frame_count: frames as u64,
            },
            frame_size: (width, height),
            frozen_clock: false,
        }
    }

    /// Decoded frames differ from the declared resolution.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }

    /// Every frame reports the same timestamp.
    pub fn with_frozen_clock(mut self) -> Self {
        self.frozen_clock = true;
        self
    }
}

/// Serves registered videos; any other path fails to open like a corrupt file.
#[derive(Default)]
pub struct FakeIo {
    videos: HashMap<PathBuf, FakeVideo>,
    touch_outputs: bool,
    fail_sink_close: bool,
    pub log: Rc<RefCell<IoLog>>,
}

impl FakeIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, path: impl Into<PathBuf>, video: FakeVideo) -> Self {
        self.videos.insert(path.into(), video);
        self
    }

    /// Create an empty file for every opened sink, like a real encoder would.
    pub fn touching_outputs(mut self) -> Self {
        self.touch_outputs = true;
        self
    }

    /// Every sink reports an error when it is closed.
    pub fn failing_sink_close(mut self) -> Self {
        self.fail_sink_close = true;
        self
    }
}

impl VideoIo for FakeIo {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        let video = self
            .videos
            .get(path)
            .ok_or_else(|| PipelineError::source_unavailable(path, "cannot open video"))?;
        Ok(Box::new(FakeSource {
            video: video.clone(),
            next: 0,
            log: Rc::clone(&self.log),
        }))
    }

    fn open_sink(&self, path: &Path, spec: SinkSpec) -> Result<Box<dyn VideoSink>> {
        if self.touch_outputs {
            std::fs::write(path, b"").map_err(|e| PipelineError::sink_unavailable(path, e))?;
        }
        self.log.borrow_mut().sinks_opened.push(path.to_path_buf());
        Ok(Box::new(FakeSink {
            path: path.to_path_buf(),
            spec,
            fail_close: self.fail_sink_close,
            log: Rc::clone(&self.log),
        }))
    }

    fn discard(&self, path: &Path) {
        self.log.borrow_mut().discarded.push(path.to_path_buf());
        if self.touch_outputs {
            let _ = std::fs::remove_file(path);
        }
    }
}

struct FakeSource {
    video: FakeVideo,
    next: u64,
    log: Rc<RefCell<IoLog>>,
}

impl FrameSource for FakeSource {
    fn properties(&self) -> VideoProperties {
        self.video.properties
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.next >= self.video.properties.frame_count {
            return Ok(None);
        }
        let (w, h) = self.video.frame_size;
        let micros = if self.video.frozen_clock { 0 } else { self.next * 40_000 };
        self.next += 1;
        Ok(Some(Frame {
            image: RgbImage::from_pixel(w, h, Rgb([10, 20, 30])),
            timestamp: FrameTimestamp::from_micros(micros),
        }))
    }

    fn close(&mut self) -> Result<()> {
        self.log.borrow_mut().sources_closed += 1;
        Ok(())
    }
}

struct FakeSink {
    path: PathBuf,
    spec: SinkSpec,
    fail_close: bool,
    log: Rc<RefCell<IoLog>>,
}

impl VideoSink for FakeSink {
    fn spec(&self) -> &SinkSpec {
        &self.spec
    }

    fn write_frame(&mut self, _frame: &RgbImage) -> Result<()> {
        self.log.borrow_mut().frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.log.borrow_mut().sinks_closed += 1;
        if self.fail_close {
            return Err(PipelineError::sink_unavailable(&self.path, "finalize failed"));
        }
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// One centred subject on even calls, nobody on odd ones; optionally faults on call `n`.
#[derive(Debug, Default)]
pub struct ScriptedEstimator {
    calls: usize,
    fail_at: Option<usize>,
}

impl ScriptedEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(call: usize) -> Self {
        Self {
            calls: 0,
            fail_at: Some(call),
        }
    }
}

impl PoseEstimator for ScriptedEstimator {
    fn infer(&mut self, _image: &RgbImage, _timestamp: FrameTimestamp) -> Result<Vec<SubjectPose>> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_at == Some(call) {
            return Err(EstimatorFault::Inference("scripted failure".to_string()).into());
        }
        if call % 2 == 1 {
            return Ok(Vec::new());
        }
        let keypoints = (0..NUM_KEYPOINTS)
            .map(|i| Keypoint::new(0.5, 0.1 + 0.05 * i as f32, 0.0))
            .collect();
        Ok(vec![SubjectPose::new(0.9, keypoints)])
    }
}

/// Model that finds one confident person in the middle of every frame.
pub struct StaticModel;

impl Model for StaticModel {
    fn forward(&mut self, image: &RgbImage) -> anyhow::Result<Vec<PoseCandidate>> {
        let (w, h) = (image.width() as f32, image.height() as f32);
        Ok(vec![PoseCandidate {
            bbox: Bbox::new(w * 0.25, h * 0.1, w * 0.5, h * 0.8, 0.9),
            keypoints: vec![Point2::new_with_conf(w * 0.5, h * 0.5, 0.9); NUM_KEYPOINTS],
        }])
    }

    fn num_keypoints(&self) -> usize {
        NUM_KEYPOINTS
    }
}
