/// Video processing pipeline
///
/// One video at a time, strictly sequential:
/// - VideoPipeline:    decode → estimate → normalize → render → encode, per frame
/// - BatchCoordinator: discovers videos and drives one pipeline per file
/// - VideoIo:          opens sources and sinks, so the pipeline never names a codec
///
/// Lifecycle of a pipeline: Opening → Streaming → Finalizing → Done, or Failed from
/// any of the first two. Source and sink are released on every path; a failed close
/// is logged and never fails the video.
pub mod batch;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

use image::Rgb;
use tracing::{debug, info, info_span, warn};

use crate::config::AnnotationMode;
use crate::detection::PoseEstimator;
use crate::error::{PipelineError, Result};
use crate::input::{FrameSource, VideoDecoder};
use crate::normalizer::frame_record;
use crate::output::{SinkSpec, VideoEncoder, VideoSink};
use crate::renderer;
use crate::types::{FrameRecord, VideoDataset, VideoTask};

pub use batch::{discover_videos, BatchCoordinator, BatchOptions, BatchReport};

/// Opens the media endpoints of one video.
pub trait VideoIo {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>>;

    fn open_sink(&self, path: &Path, spec: SinkSpec) -> Result<Box<dyn VideoSink>>;

    /// Removes an artifact left behind by a failed video.
    fn discard(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial output"),
        }
    }
}

/// OpenCV-backed `VideoIo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvIo;

impl VideoIo for OpenCvIo {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(VideoDecoder::open(path)?))
    }

    fn open_sink(&self, path: &Path, spec: SinkSpec) -> Result<Box<dyn VideoSink>> {
        Ok(Box::new(VideoEncoder::open(path, spec)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Opening,
    Streaming,
    Finalizing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationOptions {
    pub mode: AnnotationMode,
    pub background: Rgb<u8>,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        Self {
            mode: AnnotationMode::Blank,
            background: Rgb([0, 0, 0]),
        }
    }
}

pub struct VideoPipeline<E> {
    task: VideoTask,
    estimator: E,
    annotation: AnnotationOptions,
    state: PipelineState,
    records: Vec<FrameRecord>,
}

impl<E: PoseEstimator> VideoPipeline<E> {
    /// `estimator` must be fresh for this video: timestamps restart at the first frame.
    pub fn new(task: VideoTask, estimator: E, annotation: AnnotationOptions) -> Self {
        Self {
            task,
            estimator,
            annotation,
            state: PipelineState::Opening,
            records: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        self.records.clear();
        self.transition(PipelineState::Failed);
        err
    }

    /// Processes the whole video and returns its dataset.
    ///
    /// On failure nothing is returned for the video and the partially written
    /// annotated video is discarded.
    pub fn run(&mut self, io: &dyn VideoIo) -> Result<VideoDataset> {
        let span = info_span!("video", name = %self.task.display_name);
        let _enter = span.enter();

        if self.state != PipelineState::Opening {
            self.transition(PipelineState::Opening);
        }
        self.records.clear();

        let mut source = match io.open_source(&self.task.source_path) {
            Ok(source) => source,
            Err(e) => return Err(self.fail(e)),
        };
        let properties = source.properties();
        let output_path = self.task.output_video_path();
        let spec = SinkSpec::mp4v(properties.fps, properties.width, properties.height);

        let mut sink = match io.open_sink(&output_path, spec) {
            Ok(sink) => sink,
            Err(e) => {
                release_source(source.as_mut());
                return Err(self.fail(e));
            }
        };

        self.transition(PipelineState::Streaming);
        let streamed = self.stream(source.as_mut(), sink.as_mut(), (spec.width, spec.height));
        if streamed.is_ok() {
            self.transition(PipelineState::Finalizing);
        }

        release_source(source.as_mut());
        if let Err(e) = sink.close() {
            warn!(error = %e, "failed to close sink");
        }

        match streamed {
            Ok(()) => {
                let frames = std::mem::take(&mut self.records);
                info!(frames = frames.len(), output = %output_path.display(), "video done");
                self.transition(PipelineState::Done);
                Ok(VideoDataset {
                    video_name: self.task.display_name.clone(),
                    frames,
                })
            }
            Err(e) => {
                io.discard(&output_path);
                Err(self.fail(e))
            }
        }
    }

    fn stream(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn VideoSink,
        size: (u32, u32),
    ) -> Result<()> {
        while let Some(frame) = source.next_frame()? {
            let frame_index = self.records.len();
            let subjects = self.estimator.infer(&frame.image, frame.timestamp)?;
            self.records.push(frame_record(frame_index, &subjects));

            let canvas = renderer::canvas_for(
                self.annotation.mode,
                &frame.image,
                size,
                self.annotation.background,
            );
            sink.write(&renderer::render(&canvas, &subjects))?;

            if frame_index % 100 == 0 {
                debug!(frame = frame_index, subjects = subjects.len(), "progress");
            }
        }
        Ok(())
    }
}

fn release_source(source: &mut dyn FrameSource) {
    if let Err(e) = source.close() {
        warn!(error = %e, "failed to close source");
    }
}
