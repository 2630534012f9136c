// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose network loading and multi-scale inference.
//!
//! The assembly engine only needs [`PoseMaps`]; anything that can produce them
//! from a frame implements [`PoseNetwork`]. [`OnnxPoseModel`] runs a two-branch
//! PAF network through ONNX Runtime.

use std::path::Path;

use image::RgbImage;
use ndarray::{Array3, Array4};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;

use crate::config::PoseConfig;
use crate::error::{PoseError, Result};
use crate::maps::PoseMaps;
use crate::preprocessing::{prepare_scale, restore_maps, scale_multipliers};
use crate::topology::{HEATMAP_CHANNELS, PAF_CHANNELS};

/// Model file used when none is given on the command line.
pub const DEFAULT_MODEL: &str = "pose_model.onnx";

/// Produces heatmaps and PAFs for a frame.
pub trait PoseNetwork {
    /// Run the network on an RGB frame.
    ///
    /// The returned maps have the frame's height and width.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn infer(&mut self, image: &RgbImage) -> Result<PoseMaps>;
}

/// Two-branch PAF pose network backed by an ONNX Runtime session.
///
/// The model takes one NHWC `f32` RGB input in `[0, 255]` and returns a PAF
/// volume (38 channels) and a heatmap volume (19 channels) at `1/stride`
/// resolution. Outputs are told apart by channel count.
///
/// # Example
///
/// ```no_run
/// use paf_pose::{OnnxPoseModel, PoseConfig, PoseNetwork};
///
/// let mut model = OnnxPoseModel::load("pose.onnx", PoseConfig::default())?;
/// let frame = image::open("frame.jpg")?.to_rgb8();
/// let maps = model.infer(&frame)?;
/// # Ok::<(), paf_pose::PoseError>(())
/// ```
pub struct OnnxPoseModel {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
    config: PoseConfig,
}

impl OnnxPoseModel {
    /// Load a model from an ONNX file.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ModelLoadError`] if the file is missing or the
    /// session cannot be built, and [`PoseError::ConfigError`] for an invalid
    /// configuration.
    pub fn load<P: AsRef<Path>>(path: P, config: PoseConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;

        if !path.exists() {
            return Err(PoseError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(config.num_threads)
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
            .commit_from_file(path)
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to load model: {e}")))?;

        if session.outputs.len() < 2 {
            return Err(PoseError::ModelLoadError(format!(
                "Expected a PAF and a heatmap output, model has {}",
                session.outputs.len()
            )));
        }

        let input_name = session
            .inputs
            .first()
            .map_or_else(|| "input_1".to_string(), |i| i.name.clone());
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        Ok(Self {
            session,
            input_name,
            output_names,
            config,
        })
    }

    /// The configuration used for scale search and padding.
    #[must_use]
    pub const fn config(&self) -> &PoseConfig {
        &self.config
    }

    /// Run one forward pass.
    ///
    /// # Returns
    ///
    /// * `(pafs, heatmaps)` at network resolution, each `(h, w, C)`.
    fn run(&mut self, input: &Array4<f32>) -> Result<(Array3<f32>, Array3<f32>)> {
        let input_contiguous = input.as_standard_layout();
        let input_tensor = TensorRef::from_array_view(&input_contiguous)
            .map_err(|e| PoseError::InferenceError(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![&self.input_name => input_tensor];
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| PoseError::InferenceError(format!("Inference failed: {e}")))?;

        let mut pafs = None;
        let mut heatmaps = None;
        for name in &self.output_names {
            let value = outputs
                .get(name.as_str())
                .ok_or_else(|| PoseError::InferenceError(format!("Output '{name}' not found")))?;
            let (shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| PoseError::InferenceError(format!("Failed to extract '{name}': {e}")))?;
            let dims: Vec<usize> = shape.iter().map(|&d| usize::try_from(d).unwrap_or(0)).collect();
            let [1, h, w, c] = dims[..] else {
                return Err(PoseError::ShapeError(format!(
                    "Output '{name}' has shape {dims:?}, expected [1, H, W, C]"
                )));
            };
            let volume = Array3::from_shape_vec((h, w, c), data.to_vec())?;
            match c {
                PAF_CHANNELS => pafs = Some(volume),
                HEATMAP_CHANNELS => heatmaps = Some(volume),
                _ => {}
            }
        }

        match (pafs, heatmaps) {
            (Some(p), Some(h)) => Ok((p, h)),
            _ => Err(PoseError::InferenceError(format!(
                "Model outputs lack a {PAF_CHANNELS}-channel PAF or a {HEATMAP_CHANNELS}-channel heatmap"
            ))),
        }
    }
}

impl PoseNetwork for OnnxPoseModel {
    /// Average the network outputs over every search scale.
    fn infer(&mut self, image: &RgbImage) -> Result<PoseMaps> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PoseError::ImageError("Empty frame".to_string()));
        }
        let orig_shape = (height, width);
        let (h, w) = (height as usize, width as usize);

        let multipliers = scale_multipliers(height, &self.config);
        #[allow(clippy::cast_precision_loss)]
        let weight = 1.0 / multipliers.len() as f32;
        let mut heat_avg = Array3::<f32>::zeros((h, w, HEATMAP_CHANNELS));
        let mut paf_avg = Array3::<f32>::zeros((h, w, PAF_CHANNELS));

        for multiplier in multipliers {
            let input = prepare_scale(image, multiplier, &self.config)?;
            let (pafs, heatmaps) = self.run(&input.tensor)?;
            let stride = self.config.stride;

            let heatmaps = restore_maps(heatmaps.view(), &input, stride, orig_shape)?;
            heat_avg.scaled_add(weight, &heatmaps);
            let pafs = restore_maps(pafs.view(), &input, stride, orig_shape)?;
            paf_avg.scaled_add(weight, &pafs);
        }

        PoseMaps::new(heat_avg, paf_avg)
    }
}

impl std::fmt::Debug for OnnxPoseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxPoseModel")
            .field("input_name", &self.input_name)
            .field("output_names", &self.output_names)
            .field("scale_search", &self.config.scale_search)
            .field("box_size", &self.config.box_size)
            .field("stride", &self.config.stride)
            .finish_non_exhaustive()
    }
}
