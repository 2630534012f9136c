// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Persistence of per-frame records and labeled videos.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;

#[cfg(feature = "video")]
use video_rs::{Encoder, Time, encode::Settings as EncoderSettings};

use crate::error::{PoseError, Result};
use crate::results::FrameRecord;

#[cfg(feature = "video")]
use std::sync::Once;

#[cfg(feature = "video")]
static INIT: Once = Once::new();

/// Suffix appended to a video's stem for its annotated copy.
pub const LABELED_SUFFIX: &str = "_openposeLabeled";

/// Extension of labeled videos.
pub const LABELED_EXTENSION: &str = "mp4";

/// Extension of per-video record files.
pub const RECORD_EXTENSION: &str = "json";

/// Initialize the video backend once and silence `FFmpeg` below errors.
///
/// Safe to call multiple times; a no-op without the `video` feature.
#[allow(clippy::missing_const_for_fn)]
pub fn init_video_backend() {
    #[cfg(feature = "video")]
    INIT.call_once(|| {
        if let Err(e) = video_rs::init() {
            eprintln!("Failed to initialize video-rs: {e}");
        }
    });
}

/// Path of the labeled video for `stem` in `dir`: `<stem>_openposeLabeled.mp4`.
#[must_use]
pub fn labeled_video_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}{LABELED_SUFFIX}.{LABELED_EXTENSION}"))
}

/// Path of the record file for `stem` in `dir`: `<stem>.json`.
#[must_use]
pub fn record_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{RECORD_EXTENSION}"))
}

/// Check if a path is an output written by this crate (labeled video or record file).
#[must_use]
pub fn is_output_file(path: &Path) -> bool {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    ext == RECORD_EXTENSION || (ext == LABELED_EXTENSION && stem.ends_with(LABELED_SUFFIX))
}

/// Write records as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_records<P: AsRef<Path>>(path: P, records: &[FrameRecord]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| {
        PoseError::IoError(format!("Failed to create {}: {e}", path.display()))
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

/// Read records written by [`write_records`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a record array.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<FrameRecord>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| PoseError::IoError(format!("Failed to open {}: {e}", path.display())))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Copy files into `dest`, creating it if needed.
///
/// # Returns
///
/// * The destination paths, in input order.
///
/// # Errors
///
/// Returns an error if a file cannot be copied.
pub fn copy_outputs(files: &[PathBuf], dest: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dest).map_err(|e| {
        PoseError::IoError(format!("Failed to create directory {}: {e}", dest.display()))
    })?;
    files
        .iter()
        .map(|src| {
            let name = src.file_name().ok_or_else(|| {
                PoseError::IoError(format!("Not a file path: {}", src.display()))
            })?;
            let target = dest.join(name);
            fs::copy(src, &target).map_err(|e| {
                PoseError::IoError(format!(
                    "Failed to copy {} to {}: {e}",
                    src.display(),
                    target.display()
                ))
            })?;
            Ok(target)
        })
        .collect()
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            PoseError::IoError(format!("Failed to create directory {}: {e}", parent.display()))
        })?;
    }
    Ok(())
}

/// Destination for processed frames.
pub trait FrameSink {
    /// Append one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
}

/// H.264 MP4 writer built on `video-rs`.
#[cfg(feature = "video")]
pub struct VideoWriter {
    encoder: Encoder,
    frame_duration: Time,
    position: Time,
    width: u32,
    height: u32,
}

#[cfg(feature = "video")]
impl VideoWriter {
    /// Create a writer.
    ///
    /// # Arguments
    ///
    /// * `path` - Output video path.
    /// * `width`, `height` - Frame size; every written frame must match.
    /// * `fps` - Frames per second.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot be initialized.
    pub fn new<P: AsRef<Path>>(path: P, width: u32, height: u32, fps: f32) -> Result<Self> {
        init_video_backend();
        let output_path = path.as_ref();
        ensure_parent(output_path)?;

        let settings =
            EncoderSettings::preset_h264_yuv420p(width as usize, height as usize, false);
        let encoder = Encoder::new(output_path, settings)
            .map_err(|e| PoseError::VideoError(format!("Failed to create video encoder: {e}")))?;

        let fps = if fps > 0.0 { fps } else { 30.0 };
        Ok(Self {
            encoder,
            frame_duration: Time::from_secs_f64(1.0 / f64::from(fps)),
            position: Time::zero(),
            width,
            height,
        })
    }

    /// Finish writing the video.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails to flush.
    pub fn finish(mut self) -> Result<()> {
        self.encoder
            .finish()
            .map_err(|e| PoseError::VideoError(format!("Failed to finish video encoding: {e}")))
    }
}

#[cfg(feature = "video")]
impl FrameSink for VideoWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(PoseError::VideoError(format!(
                "Frame dimensions {}x{} do not match video dimensions {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let frame_array = ndarray::Array3::from_shape_vec(
            (self.height as usize, self.width as usize, 3),
            frame.as_raw().clone(),
        )?;
        self.encoder
            .encode(&frame_array, self.position)
            .map_err(|e| PoseError::VideoError(format!("Failed to encode frame: {e}")))?;

        self.position = self.position.aligned_with(self.frame_duration).add();
        Ok(())
    }
}

impl FrameSink for Vec<RgbImage> {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        self.push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::FramePoseResult;

    #[test]
    fn test_output_paths() {
        let dir = Path::new("/data/videos");
        assert_eq!(
            labeled_video_path(dir, "walk"),
            PathBuf::from("/data/videos/walk_openposeLabeled.mp4")
        );
        assert_eq!(record_path(dir, "walk"), PathBuf::from("/data/videos/walk.json"));
    }

    #[test]
    fn test_is_output_file() {
        assert!(is_output_file(Path::new("a/walk_openposeLabeled.mp4")));
        assert!(is_output_file(Path::new("a/walk.json")));
        assert!(!is_output_file(Path::new("a/walk.mp4")));
        assert!(!is_output_file(Path::new("a/walk_openposeLabeled.avi")));
    }

    #[test]
    fn test_records_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("clip.json");
        let records = vec![
            FrameRecord::new("clip", 0, FramePoseResult::default()),
            FrameRecord::failed("clip", 1, "inference error: boom".to_string()),
        ];
        write_records(&path, &records).unwrap();
        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn test_copy_outputs() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let file = src.path().join("clip.json");
        fs::write(&file, "[]").unwrap();

        let copied = copy_outputs(&[file], &dst.path().join("out")).unwrap();
        assert_eq!(copied.len(), 1);
        assert_eq!(fs::read_to_string(&copied[0]).unwrap(), "[]");
    }

    #[test]
    fn test_vec_sink() {
        let mut sink: Vec<RgbImage> = Vec::new();
        sink.write_frame(&RgbImage::new(2, 2)).unwrap();
        assert_eq!(sink.len(), 1);
    }
}
