// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command implementations.

use std::time::Instant;

use crate::batch::{BatchOptions, BatchRunner, VideoStatus};
use crate::cli::args::{FrameArgs, RunArgs};
use crate::engine::PoseAssemblyEngine;
use crate::error::{PoseError, Result};
use crate::model::{OnnxPoseModel, PoseNetwork};
use crate::results::FrameRecord;
use crate::{VERSION, info, section, success, verbose, warn};

/// Label every video in a directory.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the model cannot be
/// loaded, or the input directory cannot be listed. Individual video failures
/// are logged and counted instead.
pub fn run_batch(args: &RunArgs) -> Result<()> {
    let config = args.pose.to_config();
    let engine = PoseAssemblyEngine::new(config.clone())?;
    let model = OnnxPoseModel::load(&args.model, config)?;

    info!("paf-pose {VERSION} 🚀 Rust ONNX Runtime");
    verbose!("{model:?}");

    #[cfg(not(feature = "video"))]
    warn!("Built without the 'video' feature; videos cannot be decoded or written.");

    let mut options = BatchOptions::new(&args.input);
    if let Some(dir) = &args.output {
        options = options.with_output_dir(dir);
    }
    if let Some(dir) = &args.copy_to {
        options = options.with_copy_to(dir);
    }
    if let Some(n) = args.max_frames {
        options = options.with_max_frames(n);
    }

    let start = Instant::now();
    let mut runner = BatchRunner::new(model, engine, options);
    let summaries = runner.run()?;

    let count = |wanted: fn(&VideoStatus) -> bool| summaries.iter().filter(|s| wanted(&s.status)).count();
    let processed = count(|s| matches!(s, VideoStatus::Processed));
    let skipped = count(|s| matches!(s, VideoStatus::Skipped));
    let failed = count(|s| matches!(s, VideoStatus::Failed(_)));

    section!("Summary");
    if failed > 0 {
        warn!("{failed} video(s) failed");
    }
    success!(
        "{processed} processed, {skipped} skipped, {failed} failed in {:.1}s",
        start.elapsed().as_secs_f64()
    );
    verbose!(
        "Results saved to {}",
        runner.options().output_dir().display()
    );
    Ok(())
}

/// Estimate poses in one image.
///
/// # Errors
///
/// Returns an error if the model or image cannot be loaded, inference fails,
/// or an output cannot be written.
pub fn run_frame(args: &FrameArgs) -> Result<()> {
    let config = args.pose.to_config();
    let engine = PoseAssemblyEngine::new(config.clone())?;
    let mut model = OnnxPoseModel::load(&args.model, config)?;

    let image = image::open(&args.image)
        .map_err(|e| {
            PoseError::ImageError(format!("Failed to load image {}: {e}", args.image.display()))
        })?
        .to_rgb8();

    let start = Instant::now();
    let maps = model.infer(&image)?;
    let inference_ms = start.elapsed().as_secs_f64() * 1000.0;
    let start = Instant::now();
    let result = engine.process(&maps);
    let assembly_ms = start.elapsed().as_secs_f64() * 1000.0;

    verbose!(
        "image 1/1 {}: {}x{} {}, {inference_ms:.1}ms inference, {assembly_ms:.1}ms assembly",
        args.image.display(),
        image.height(),
        image.width(),
        result.verbose()
    );

    if let Some(path) = &args.output {
        save_annotated(&image, &result, path)?;
    }

    let name = args
        .image
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let record = FrameRecord::new(&name, 0, result);
    if let Some(path) = &args.json {
        crate::io::write_records(path, std::slice::from_ref(&record))?;
        verbose!("Record saved to {}", path.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

#[cfg(feature = "annotate")]
fn save_annotated(
    image: &image::RgbImage,
    result: &crate::results::FramePoseResult,
    path: &std::path::Path,
) -> Result<()> {
    crate::annotate::draw_pose(image, result).save(path)?;
    verbose!("Annotated image saved to {}", path.display());
    Ok(())
}

#[cfg(not(feature = "annotate"))]
fn save_annotated(
    _image: &image::RgbImage,
    _result: &crate::results::FramePoseResult,
    _path: &std::path::Path,
) -> Result<()> {
    warn!("--output requires the 'annotate' feature. Compile with --features annotate to enable saving.");
    Ok(())
}
