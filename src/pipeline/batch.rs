//! Batch coordinator
//! Input folder → one pipeline per video → one landmark document + annotated video each

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::{AnnotationOptions, VideoIo, VideoPipeline};
use crate::detection::PoseLandmarker;
use crate::error::{PipelineError, Result};
use crate::models::Model;
use crate::output::write_document;
use crate::types::VideoTask;

/// Recognised video extensions. Matching is case-sensitive.
pub const VIDEO_EXTENSIONS: [&str; 2] = [".mp4", ".avi"];

pub fn is_video_name(name: &str) -> bool {
    VIDEO_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Video files directly inside `dir`.
///
/// Without `sorted` the order is whatever the directory listing yields, which the
/// platform does not guarantee to be stable between runs.
pub fn discover_videos(dir: &Path, sorted: bool) -> io::Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str() {
            Some(name) if is_video_name(name) => videos.push(entry.path()),
            _ => {}
        }
    }
    if sorted {
        videos.sort();
    }
    Ok(videos)
}

fn class_dirs(dir: &Path, sorted: bool) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    if sorted {
        dirs.sort();
    }
    Ok(dirs)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sorted: bool,
    /// Each subfolder of `input` is a class written to the same-named subfolder of `output`.
    pub class_dirs: bool,
    pub annotation: AnnotationOptions,
}

impl BatchOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            sorted: false,
            class_dirs: false,
            annotation: AnnotationOptions::default(),
        }
    }

    /// Every video to process, with its output folder.
    pub fn tasks(&self) -> io::Result<Vec<VideoTask>> {
        if !self.class_dirs {
            return Ok(discover_videos(&self.input, self.sorted)?
                .into_iter()
                .map(|video| VideoTask::new(video, self.output.clone()))
                .collect());
        }

        let mut tasks = Vec::new();
        for class in class_dirs(&self.input, self.sorted)? {
            let Some(name) = class.file_name() else {
                continue;
            };
            let output = self.output.join(name);
            for video in discover_videos(&class, self.sorted)? {
                tasks.push(VideoTask::new(video, output.clone()));
            }
        }
        Ok(tasks)
    }
}

#[derive(Debug)]
pub struct ProcessedVideo {
    pub task: VideoTask,
    pub frames: usize,
}

#[derive(Debug)]
pub struct FailedVideo {
    pub task: VideoTask,
    pub error: PipelineError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ProcessedVideo>,
    pub failed: Vec<FailedVideo>,
}

pub struct BatchCoordinator<'a, M> {
    io: &'a dyn VideoIo,
    landmarker: &'a mut PoseLandmarker<M>,
    options: BatchOptions,
}

impl<'a, M: Model> BatchCoordinator<'a, M> {
    pub fn new(
        io: &'a dyn VideoIo,
        landmarker: &'a mut PoseLandmarker<M>,
        options: BatchOptions,
    ) -> Self {
        Self {
            io,
            landmarker,
            options,
        }
    }

    /// Processes every discovered video in turn.
    ///
    /// A failing video is logged and recorded in the report; it never stops the batch.
    /// Only an unreadable input folder is an error.
    pub fn run(&mut self) -> io::Result<BatchReport> {
        let tasks = self.options.tasks()?;
        if tasks.is_empty() {
            warn!(input = %self.options.input.display(), "no videos found");
        }
        let count = tasks.len();
        info!(videos = count, "batch started");

        let mut report = BatchReport::default();
        for (i, task) in tasks.into_iter().enumerate() {
            info!(video = %task.display_name, "processing {}/{}", i + 1, count);
            match self.process(&task) {
                Ok(frames) => report.processed.push(ProcessedVideo { task, frames }),
                Err(e) => {
                    error!(
                        video = %task.source_path.display(),
                        kind = e.kind(),
                        error = %e,
                        "video failed, continuing with the next one"
                    );
                    report.failed.push(FailedVideo { task, error: e });
                }
            }
        }

        info!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        Ok(report)
    }

    fn process(&mut self, task: &VideoTask) -> Result<usize> {
        fs::create_dir_all(&task.output_directory).map_err(|source| PipelineError::OutputWrite {
            path: task.output_directory.clone(),
            source,
        })?;

        let session = self.landmarker.session();
        let mut pipeline = VideoPipeline::new(task.clone(), session, self.options.annotation);
        let dataset = pipeline.run(self.io)?;

        let landmarks = task.landmarks_path();
        if let Err(e) = write_document(&landmarks, &dataset) {
            self.io.discard(&landmarks);
            self.io.discard(&task.output_video_path());
            return Err(e);
        }
        info!(landmarks = %landmarks.display(), "landmarks saved");
        Ok(dataset.frame_count())
    }
}
