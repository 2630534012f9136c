// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame sources: video files, single images and image directories.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::{PoseError, Result};

/// Input that yields frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Path to a video file.
    Video(PathBuf),
    /// Path to an image file.
    Image(PathBuf),
    /// Image files, processed in order as one sequence.
    ImageList(Vec<PathBuf>),
    /// Directory of images, processed in path order.
    Directory(PathBuf),
}

impl Source {
    /// Check if this source is a video.
    #[must_use]
    pub const fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    /// Get the path if this source has a single one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Video(p) | Self::Image(p) | Self::Directory(p) => Some(p),
            Self::ImageList(_) => None,
        }
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        if path.is_dir() {
            Self::Directory(path.to_path_buf())
        } else if is_video_file(path) {
            Self::Video(path.to_path_buf())
        } else {
            Self::Image(path.to_path_buf())
        }
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self::from(Path::new(s))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

/// Check if a path is a video file based on extension.
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    has_extension(
        path,
        &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "mpeg", "mpg"],
    )
}

/// Check if a path is an image file based on extension.
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    has_extension(
        path,
        &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff", "tif"],
    )
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        extensions.contains(&ext.as_str())
    })
}

/// Regular files directly inside `dir`, sorted by path.
///
/// # Errors
///
/// Returns an error if `dir` is not a readable directory.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PoseError::IoError(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

/// Metadata about a source frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMeta {
    /// Frame index within the source.
    pub frame_idx: usize,
    /// Total frames, if known.
    pub total_frames: Option<usize>,
    /// Source path.
    pub path: String,
    /// Frames per second (video sources).
    pub fps: Option<f32>,
}

impl Default for SourceMeta {
    fn default() -> Self {
        Self {
            frame_idx: 0,
            total_frames: Some(1),
            path: String::new(),
            fps: None,
        }
    }
}

/// Iterator over the frames of a [`Source`].
pub struct FrameSource {
    source: Source,
    current_frame: usize,
    image_paths: Vec<PathBuf>,
    #[cfg(feature = "video")]
    decoder: Option<video_rs::decode::Decoder>,
    #[cfg(feature = "video")]
    total_frames: Option<usize>,
}

impl FrameSource {
    /// Open a source.
    ///
    /// Videos are opened here so that an unreadable file fails up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or the video cannot
    /// be opened, and [`PoseError::FeatureNotEnabled`] for videos without the
    /// `video` feature.
    pub fn new(source: Source) -> Result<Self> {
        let image_paths = match &source {
            Source::Directory(dir) => list_files(dir)?
                .into_iter()
                .filter(|p| is_image_file(p))
                .collect(),
            Source::Image(path) => vec![path.clone()],
            Source::ImageList(paths) => paths.clone(),
            Source::Video(_) => Vec::new(),
        };

        #[allow(unused_mut)]
        let mut frames = Self {
            source,
            current_frame: 0,
            image_paths,
            #[cfg(feature = "video")]
            decoder: None,
            #[cfg(feature = "video")]
            total_frames: None,
        };
        if frames.source.is_video() {
            frames.open_video()?;
        }
        Ok(frames)
    }

    /// The source being read.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    #[cfg(feature = "video")]
    fn open_video(&mut self) -> Result<()> {
        let Source::Video(path) = &self.source else {
            return Ok(());
        };
        crate::io::init_video_backend();
        let decoder = video_rs::decode::Decoder::new(path.as_path()).map_err(|e| {
            PoseError::VideoError(format!("Failed to open {}: {e}", path.display()))
        })?;
        if let Ok(duration) = decoder.duration() {
            let frames = duration.as_secs_f64() * f64::from(decoder.frame_rate());
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                self.total_frames = Some(frames.round() as usize);
            }
        }
        self.decoder = Some(decoder);
        Ok(())
    }

    #[cfg(not(feature = "video"))]
    #[allow(clippy::unused_self)]
    fn open_video(&mut self) -> Result<()> {
        Err(PoseError::FeatureNotEnabled(
            "Video support requires the 'video' feature".to_string(),
        ))
    }

    fn next_image(&mut self) -> Option<Result<(RgbImage, SourceMeta)>> {
        let path = self.image_paths.get(self.current_frame)?;
        let meta = SourceMeta {
            frame_idx: self.current_frame,
            total_frames: Some(self.image_paths.len()),
            path: path.to_string_lossy().to_string(),
            fps: None,
        };
        self.current_frame += 1;

        Some(
            image::open(path)
                .map(|img| (img.to_rgb8(), meta))
                .map_err(|e| {
                    PoseError::ImageError(format!("Failed to load {}: {e}", path.display()))
                }),
        )
    }

    #[cfg(feature = "video")]
    fn next_video_frame(&mut self) -> Option<Result<(RgbImage, SourceMeta)>> {
        let decoder = self.decoder.as_mut()?;
        // Decoder errors past the last frame end the stream.
        let (_ts, frame) = decoder.decode().ok()?;
        let meta = SourceMeta {
            frame_idx: self.current_frame,
            total_frames: self.total_frames,
            path: self
                .source
                .path()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            fps: Some(decoder.frame_rate()),
        };
        self.current_frame += 1;
        Some(video_frame_to_image(&frame).map(|img| (img, meta)))
    }

    #[cfg(not(feature = "video"))]
    #[allow(clippy::unused_self)]
    fn next_video_frame(&mut self) -> Option<Result<(RgbImage, SourceMeta)>> {
        None
    }
}

impl Iterator for FrameSource {
    type Item = Result<(RgbImage, SourceMeta)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.source.is_video() {
            self.next_video_frame()
        } else {
            self.next_image()
        }
    }
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("source", &self.source)
            .field("current_frame", &self.current_frame)
            .finish_non_exhaustive()
    }
}

/// Convert a decoded `video-rs` frame (HWC RGB) to an image.
#[cfg(feature = "video")]
fn video_frame_to_image(frame: &video_rs::Frame) -> Result<RgbImage> {
    let (height, width, _) = frame.dim();
    let height = u32::try_from(height)
        .map_err(|_| PoseError::ImageError("Frame height exceeds u32::MAX".to_string()))?;
    let width = u32::try_from(width)
        .map_err(|_| PoseError::ImageError("Frame width exceeds u32::MAX".to_string()))?;
    let data: Vec<u8> = frame.as_standard_layout().iter().copied().collect();
    RgbImage::from_raw(width, height, data)
        .ok_or_else(|| PoseError::ImageError("Failed to create image from video frame".to_string()))
}
