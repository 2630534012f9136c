// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose assembly configuration.
//!
//! This module defines the [`PoseConfig`] struct, which carries every tunable the
//! assembly engine and the multi-scale inference collaborator need: peak and PAF
//! thresholds, smoothing, limb sampling density, pruning limits and the network
//! input geometry.

use crate::error::{PoseError, Result};

/// Configuration for pose assembly.
///
/// Uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use paf_pose::PoseConfig;
///
/// let config = PoseConfig::new()
///     .with_peak_threshold(0.15)
///     .with_paf_threshold(0.05)
///     .with_sigma(3.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PoseConfig {
    /// Heatmap peak threshold (θ1). A peak must be strictly above this value.
    pub peak_threshold: f32,
    /// PAF alignment threshold (θ2) applied to each sampled dot product.
    pub paf_threshold: f32,
    /// Standard deviation of the Gaussian used to smooth each heatmap channel.
    pub sigma: f32,
    /// Number of samples taken along each candidate limb (M).
    pub mid_num: usize,
    /// Fraction of samples that must exceed `paf_threshold` for a pair to be kept.
    pub min_aligned_ratio: f32,
    /// Minimum number of joints for a skeleton to survive pruning.
    pub min_parts: usize,
    /// Minimum mean score (`total_score / part_count`) for a skeleton to survive pruning.
    pub min_mean_score: f32,
    /// Resize multipliers used by the multi-scale inference collaborator.
    pub scale_search: Vec<f32>,
    /// Reference box size the scale multipliers are relative to.
    pub box_size: u32,
    /// Network output stride.
    pub stride: u32,
    /// Pixel value used to pad network inputs up to a multiple of `stride`.
    pub pad_value: u8,
    /// Number of intra-op threads for ONNX Runtime (`0` lets the runtime decide).
    pub num_threads: usize,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            peak_threshold: 0.1,
            paf_threshold: 0.05,
            sigma: 3.0,
            mid_num: 10,
            min_aligned_ratio: 0.8,
            min_parts: 4,
            min_mean_score: 0.4,
            scale_search: vec![0.5, 1.0, 1.5, 2.0],
            box_size: 368,
            stride: 8,
            pad_value: 128,
            num_threads: 0,
        }
    }
}

impl PoseConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the heatmap peak threshold (θ1).
    #[must_use]
    pub const fn with_peak_threshold(mut self, threshold: f32) -> Self {
        self.peak_threshold = threshold;
        self
    }

    /// Set the PAF alignment threshold (θ2).
    #[must_use]
    pub const fn with_paf_threshold(mut self, threshold: f32) -> Self {
        self.paf_threshold = threshold;
        self
    }

    /// Set the heatmap smoothing sigma.
    #[must_use]
    pub const fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the number of PAF samples per candidate limb.
    #[must_use]
    pub const fn with_mid_num(mut self, mid_num: usize) -> Self {
        self.mid_num = mid_num;
        self
    }

    /// Set the skeleton pruning limits.
    ///
    /// # Arguments
    ///
    /// * `min_parts` - Minimum number of joints a skeleton needs.
    /// * `min_mean_score` - Minimum average score per joint.
    #[must_use]
    pub const fn with_pruning(mut self, min_parts: usize, min_mean_score: f32) -> Self {
        self.min_parts = min_parts;
        self.min_mean_score = min_mean_score;
        self
    }

    /// Set the multi-scale search multipliers.
    #[must_use]
    pub fn with_scale_search(mut self, scales: Vec<f32>) -> Self {
        self.scale_search = scales;
        self
    }

    /// Set the network input geometry.
    ///
    /// # Arguments
    ///
    /// * `box_size` - Reference height the scale multipliers are relative to.
    /// * `stride` - Network output stride.
    /// * `pad_value` - Padding pixel value.
    #[must_use]
    pub const fn with_network_geometry(mut self, box_size: u32, stride: u32, pad_value: u8) -> Self {
        self.box_size = box_size;
        self.stride = stride;
        self.pad_value = pad_value;
        self
    }

    /// Set the number of threads for inference.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Check that every value is in a usable range.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(PoseError::ConfigError(format!(
                "sigma must be a positive finite number, got {}",
                self.sigma
            )));
        }
        if self.mid_num < 2 {
            return Err(PoseError::ConfigError(format!(
                "mid_num must be at least 2, got {}",
                self.mid_num
            )));
        }
        if !(0.0..=1.0).contains(&self.min_aligned_ratio) {
            return Err(PoseError::ConfigError(format!(
                "min_aligned_ratio must be within [0, 1], got {}",
                self.min_aligned_ratio
            )));
        }
        if self.scale_search.is_empty() || self.scale_search.iter().any(|s| *s <= 0.0) {
            return Err(PoseError::ConfigError(
                "scale_search must contain at least one positive multiplier".to_string(),
            ));
        }
        if self.stride == 0 || self.box_size == 0 {
            return Err(PoseError::ConfigError(
                "stride and box_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PoseConfig::default();
        assert!((config.peak_threshold - 0.1).abs() < f32::EPSILON);
        assert!((config.paf_threshold - 0.05).abs() < f32::EPSILON);
        assert!((config.sigma - 3.0).abs() < f32::EPSILON);
        assert_eq!(config.mid_num, 10);
        assert_eq!(config.min_parts, 4);
        assert_eq!(config.scale_search, vec![0.5, 1.0, 1.5, 2.0]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = PoseConfig::new()
            .with_peak_threshold(0.2)
            .with_paf_threshold(0.1)
            .with_sigma(2.0)
            .with_mid_num(12)
            .with_pruning(6, 0.5)
            .with_scale_search(vec![1.0])
            .with_network_geometry(256, 4, 0)
            .with_threads(2);

        assert!((config.peak_threshold - 0.2).abs() < f32::EPSILON);
        assert!((config.paf_threshold - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.mid_num, 12);
        assert_eq!(config.min_parts, 6);
        assert_eq!(config.scale_search, vec![1.0]);
        assert_eq!((config.box_size, config.stride, config.pad_value), (256, 4, 0));
        assert_eq!(config.num_threads, 2);
    }

    #[test]
    fn test_config_validate_rejects_bad_values() {
        assert!(matches!(
            PoseConfig::new().with_sigma(0.0).validate(),
            Err(PoseError::ConfigError(_))
        ));
        assert!(PoseConfig::new().with_mid_num(1).validate().is_err());
        assert!(PoseConfig::new().with_scale_search(vec![]).validate().is_err());
        assert!(
            PoseConfig::new()
                .with_network_geometry(368, 0, 128)
                .validate()
                .is_err()
        );
    }
}
