/// Pose landmark extraction
///
/// Walks a folder of videos and, for every .mp4 / .avi file, writes:
/// - `<name>_landmarks.json`: per-frame keypoints of every detected subject
/// - `<stem>_output.mp4`:     the skeleton drawn on a blank canvas (or over the video)
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pose_landmarks::pipeline::{AnnotationOptions, BatchOptions, OpenCvIo};
use pose_landmarks::{Args, BatchCoordinator, PoseLandmarker};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pose_landmarks=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!(
        input = %args.input.display(),
        output = %args.output.display(),
        tier = ?args.tier,
        annotation = ?args.annotation,
        "pose landmark extraction"
    );

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create output folder {}", args.output.display()))?;

    let mut landmarker = PoseLandmarker::create(args.tier, args.landmarker_config())
        .with_context(|| format!("failed to load pose model from {}", args.model_dir.display()))?;

    let options = BatchOptions {
        input: args.input.clone(),
        output: args.output.clone(),
        sorted: args.sorted,
        class_dirs: args.class_dirs,
        annotation: AnnotationOptions {
            mode: args.annotation,
            background: args.background,
        },
    };
    let report = BatchCoordinator::new(&OpenCvIo, &mut landmarker, options)
        .run()
        .with_context(|| format!("failed to read input folder {}", args.input.display()))?;

    for failed in &report.failed {
        tracing::warn!(
            video = %failed.task.display_name,
            kind = failed.error.kind(),
            "skipped"
        );
    }
    tracing::info!(
        processed = report.processed.len(),
        failed = report.failed.len(),
        output = %args.output.display(),
        "all videos processed"
    );
    Ok(())
}
