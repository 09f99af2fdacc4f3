/// Per-video error kinds
///
/// Every kind is fatal for the video it occurs in and never retried; the batch
/// coordinator logs it and moves on to the next file.
use std::path::PathBuf;

use crate::types::FrameTimestamp;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("video source unavailable: {}: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("video sink unavailable: {}: {reason}", path.display())]
    SinkUnavailable { path: PathBuf, reason: String },

    #[error("pose estimator fault: {0}")]
    Estimator(#[from] EstimatorFault),

    #[error("failed to write landmarks to {}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn sink_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SinkUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short name of the kind, for log lines and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "SourceUnavailable",
            Self::SinkUnavailable { .. } => "SinkUnavailable",
            Self::Estimator(_) => "EstimatorFault",
            Self::OutputWrite { .. } => "OutputWriteFault",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EstimatorFault {
    #[error("timestamp {current} does not advance past {previous}")]
    NonIncreasingTimestamp {
        previous: FrameTimestamp,
        current: FrameTimestamp,
    },

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
