// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Batch processing of a directory of videos.
//!
//! Every video gets a labeled copy (`<stem>_openposeLabeled.mp4`) and a record
//! file (`<stem>.json`). Videos whose labeled copy already exists are skipped,
//! so an interrupted batch can simply be run again.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::RgbImage;

use crate::engine::PoseAssemblyEngine;
use crate::error::{PoseError, Result};
use crate::io::{FrameSink, copy_outputs, is_output_file, labeled_video_path, record_path, write_records};
use crate::model::PoseNetwork;
use crate::results::{FramePoseResult, FrameRecord, Speed};
use crate::source::{SourceMeta, list_files};
use crate::{error, info, section, success, verbose, warn};

/// Where to read videos from and where to put the outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Directory whose regular files are processed as videos.
    pub input_dir: PathBuf,
    /// Directory for labeled videos and record files (defaults to `input_dir`).
    pub output_dir: Option<PathBuf>,
    /// Optional directory that receives a copy of every finished video's outputs.
    pub copy_to: Option<PathBuf>,
    /// Process at most this many frames per video.
    pub max_frames: Option<usize>,
}

impl BatchOptions {
    /// Options reading from and writing to `input_dir`.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(input_dir: P) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: None,
            copy_to: None,
            max_frames: None,
        }
    }

    /// Write outputs to `dir` instead of the input directory.
    #[must_use]
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Copy finished outputs to `dir`.
    #[must_use]
    pub fn with_copy_to<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.copy_to = Some(dir.into());
        self
    }

    /// Limit frames per video.
    #[must_use]
    pub const fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Effective output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.input_dir)
    }
}

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// Frame to write: annotated, or the input frame if pose estimation failed.
    pub frame: RgbImage,
    /// Record for the frame.
    pub record: FrameRecord,
    /// Stage timings.
    pub speed: Speed,
}

/// What happened to one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoStatus {
    /// Outputs were written.
    Processed,
    /// Outputs already existed.
    Skipped,
    /// The video could not be processed.
    Failed(String),
}

/// Per-video summary.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSummary {
    /// Video file stem.
    pub video_name: String,
    /// Outcome.
    pub status: VideoStatus,
    /// Frames processed.
    pub frames: usize,
    /// Frames whose pose output was skipped after an error.
    pub failed_frames: usize,
    /// Wall-clock processing time.
    pub elapsed: Duration,
    /// Files written (labeled video and record file).
    pub outputs: Vec<PathBuf>,
}

impl VideoSummary {
    fn without_output(video_name: String, status: VideoStatus) -> Self {
        Self {
            video_name,
            status,
            frames: 0,
            failed_frames: 0,
            elapsed: Duration::ZERO,
            outputs: Vec::new(),
        }
    }
}

/// Runs a network and the assembly engine over videos.
///
/// A frame whose inference or assembly fails is still written (without
/// annotation) and gets a record carrying the error, so the labeled video keeps
/// the source's frame count. Panics inside a frame are caught too unless
/// disabled with [`with_catch_panics`](Self::with_catch_panics); by default they
/// are only caught in release builds.
pub struct BatchRunner<N> {
    network: N,
    engine: PoseAssemblyEngine,
    options: BatchOptions,
    catch_panics: bool,
}

impl<N: PoseNetwork> BatchRunner<N> {
    /// Create a runner.
    pub fn new(network: N, engine: PoseAssemblyEngine, options: BatchOptions) -> Self {
        Self {
            network,
            engine,
            options,
            catch_panics: !cfg!(debug_assertions),
        }
    }

    /// Catch panics raised while processing a frame.
    #[must_use]
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    /// The batch options.
    #[must_use]
    pub const fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Process every video in the input directory.
    ///
    /// Files written by earlier runs (labeled videos, record files) are not
    /// treated as inputs. A video that fails is logged and the batch continues.
    ///
    /// # Errors
    ///
    /// Returns an error only if the input directory cannot be listed.
    pub fn run(&mut self) -> Result<Vec<VideoSummary>> {
        let videos: Vec<PathBuf> = list_files(&self.options.input_dir)?
            .into_iter()
            .filter(|p| !is_output_file(p))
            .collect();
        info!(
            "Found {} video(s) in {}",
            videos.len(),
            self.options.input_dir.display()
        );

        let mut summaries = Vec::with_capacity(videos.len());
        for (i, path) in videos.iter().enumerate() {
            verbose!("video {}/{}: {}", i + 1, videos.len(), path.display());
            match self.process_video(path) {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!("Failed to process {}: {e}", path.display());
                    summaries.push(VideoSummary::without_output(
                        video_stem(path),
                        VideoStatus::Failed(e.to_string()),
                    ));
                }
            }
        }
        Ok(summaries)
    }

    /// Process one video into its labeled copy and record file.
    ///
    /// # Errors
    ///
    /// Returns an error if the video cannot be decoded, the labeled video
    /// cannot be encoded, or the outputs cannot be written. A partially written
    /// labeled video is removed so the next run retries it.
    pub fn process_video(&mut self, path: &Path) -> Result<VideoSummary> {
        let name = video_stem(path);
        let out_dir = self.options.output_dir().to_path_buf();
        let labeled = labeled_video_path(&out_dir, &name);
        if labeled.exists() {
            info!("Skipping {name}: {} already exists", labeled.display());
            return Ok(VideoSummary::without_output(name, VideoStatus::Skipped));
        }

        section!("{name}");
        let start = Instant::now();
        let records = match self.encode_video(path, &name, &labeled) {
            Ok(records) => records,
            Err(e) => {
                if labeled.exists() {
                    let _ = fs::remove_file(&labeled);
                }
                return Err(e);
            }
        };

        let records_file = record_path(&out_dir, &name);
        write_records(&records_file, &records)?;
        let outputs = vec![labeled, records_file];

        if let Some(dest) = &self.options.copy_to {
            let copies = copy_outputs(&outputs, dest)?;
            verbose!("Copied {} file(s) to {}", copies.len(), dest.display());
        }

        let elapsed = start.elapsed();
        let failed_frames = records.iter().filter(|r| r.error.is_some()).count();
        success!(
            "{name}: {} frames ({} failed) in {:.1}s",
            records.len(),
            failed_frames,
            elapsed.as_secs_f64()
        );

        Ok(VideoSummary {
            video_name: name,
            status: VideoStatus::Processed,
            frames: records.len(),
            failed_frames,
            elapsed,
            outputs,
        })
    }

    #[cfg(feature = "video")]
    fn encode_video(&mut self, path: &Path, name: &str, labeled: &Path) -> Result<Vec<FrameRecord>> {
        use crate::io::VideoWriter;
        use crate::source::{FrameSource, Source};

        let mut frames = FrameSource::new(Source::Video(path.to_path_buf()))?.peekable();
        let (width, height, fps) = match frames.peek() {
            Some(Ok((img, meta))) => (img.width(), img.height(), meta.fps.unwrap_or(30.0)),
            Some(Err(e)) => return Err(PoseError::VideoError(e.to_string())),
            None => {
                return Err(PoseError::VideoError(format!(
                    "No frames in {}",
                    path.display()
                )));
            }
        };

        let mut writer = VideoWriter::new(labeled, width, height, fps)?;
        let records = self.run_frames(name, frames, &mut writer)?;
        writer.finish()?;
        Ok(records)
    }

    #[cfg(not(feature = "video"))]
    #[allow(clippy::unused_self)]
    fn encode_video(&mut self, path: &Path, _name: &str, _labeled: &Path) -> Result<Vec<FrameRecord>> {
        Err(PoseError::FeatureNotEnabled(format!(
            "Cannot decode {}: video support requires the 'video' feature",
            path.display()
        )))
    }

    /// Process a frame sequence and write every output frame to `sink`.
    ///
    /// Stops at the first source error (logged) or after `max_frames`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects a frame.
    #[allow(clippy::cast_precision_loss)]
    pub fn run_frames<I, S>(&mut self, video_name: &str, frames: I, sink: &mut S) -> Result<Vec<FrameRecord>>
    where
        I: IntoIterator<Item = Result<(RgbImage, SourceMeta)>>,
        S: FrameSink + ?Sized,
    {
        let limit = self.options.max_frames.unwrap_or(usize::MAX);
        let mut records = Vec::new();
        let mut totals = Speed::default();

        for item in frames.into_iter().take(limit) {
            let (frame, meta) = match item {
                Ok(val) => val,
                Err(e) => {
                    error!("Error reading {video_name}: {e}");
                    break;
                }
            };

            let outcome = self.process_frame(video_name, meta.frame_idx, &frame);
            sink.write_frame(&outcome.frame)?;

            let total_frames = meta
                .total_frames
                .map_or_else(|| "?".to_string(), |n| n.to_string());
            let summary = if let Some(err) = &outcome.record.error {
                format!("skipped ({err})")
            } else {
                format!(
                    "{} person(s), {} candidates",
                    outcome.record.skeletons.len(),
                    outcome.record.candidates.len()
                )
            };
            verbose!(
                "{video_name} (frame {}/{total_frames}): {summary}, {:.1}ms",
                meta.frame_idx + 1,
                outcome.speed.total()
            );

            accumulate(&mut totals, &outcome.speed);
            records.push(outcome.record);
        }

        let n = records.len().max(1) as f64;
        verbose!(
            "Speed: {:.1}ms inference, {:.1}ms assembly, {:.1}ms annotate per frame",
            totals.inference.unwrap_or(0.0) / n,
            totals.assembly.unwrap_or(0.0) / n,
            totals.annotate.unwrap_or(0.0) / n
        );
        Ok(records)
    }

    /// Run the network, the engine and the renderer on one frame.
    pub fn process_frame(&mut self, video_name: &str, frame_index: usize, frame: &RgbImage) -> FrameOutcome {
        let mut speed = Speed::default();
        match self.analyze(frame, &mut speed) {
            Ok(result) => {
                let start = Instant::now();
                let annotated = render(frame, &result);
                speed.annotate = Some(elapsed_ms(start));
                FrameOutcome {
                    frame: annotated,
                    record: FrameRecord::new(video_name, frame_index, result),
                    speed,
                }
            }
            Err(e) => {
                warn!("{video_name} frame {frame_index}: {e}; writing it without pose output");
                FrameOutcome {
                    frame: frame.clone(),
                    record: FrameRecord::failed(video_name, frame_index, e.to_string()),
                    speed,
                }
            }
        }
    }

    fn analyze(&mut self, frame: &RgbImage, speed: &mut Speed) -> Result<FramePoseResult> {
        let network = &mut self.network;
        let engine = &self.engine;
        let mut stages = || -> Result<(FramePoseResult, f64, f64)> {
            let start = Instant::now();
            let maps = network.infer(frame)?;
            let inference = elapsed_ms(start);
            let start = Instant::now();
            let result = engine.process(&maps);
            Ok((result, inference, elapsed_ms(start)))
        };

        let outcome = if self.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(stages)).unwrap_or_else(|payload| {
                Err(PoseError::InferenceError(format!(
                    "panic: {}",
                    panic_message(payload.as_ref())
                )))
            })
        } else {
            stages()
        };

        let (result, inference, assembly) = outcome?;
        speed.inference = Some(inference);
        speed.assembly = Some(assembly);
        Ok(result)
    }
}

impl<N> std::fmt::Debug for BatchRunner<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner")
            .field("engine", &self.engine)
            .field("options", &self.options)
            .field("catch_panics", &self.catch_panics)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "annotate")]
fn render(frame: &RgbImage, result: &FramePoseResult) -> RgbImage {
    crate::annotate::draw_pose(frame, result)
}

#[cfg(not(feature = "annotate"))]
fn render(frame: &RgbImage, _result: &FramePoseResult) -> RgbImage {
    frame.clone()
}

fn video_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn accumulate(totals: &mut Speed, speed: &Speed) {
    let add = |total: Option<f64>, value: Option<f64>| match (total, value) {
        (None, None) => None,
        (t, v) => Some(t.unwrap_or(0.0) + v.unwrap_or(0.0)),
    };
    totals.inference = add(totals.inference, speed.inference);
    totals.assembly = add(totals.assembly, speed.assembly);
    totals.annotate = add(totals.annotate, speed.annotate);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
