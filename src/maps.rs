// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Dense network outputs consumed by the assembly engine.

use ndarray::{Array3, ArrayView2, s};

use crate::error::{PoseError, Result};
use crate::topology::{HEATMAP_CHANNELS, JOINT_COUNT, PAF_CHANNELS};

/// Heatmap and PAF volumes for one frame, at original image resolution.
///
/// Both volumes are HWC: `heatmaps` is `(H, W, 19)` (18 joints + background)
/// and `pafs` is `(H, W, 38)` (x/y component per limb type). A heatmap volume
/// with exactly 18 channels (background dropped) is also accepted.
#[derive(Debug, Clone)]
pub struct PoseMaps {
    heatmaps: Array3<f32>,
    pafs: Array3<f32>,
}

impl PoseMaps {
    /// Wrap network outputs after checking their shapes.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ShapeError`] if the spatial sizes differ, a volume is
    /// empty, or the channel counts do not match the body topology.
    pub fn new(heatmaps: Array3<f32>, pafs: Array3<f32>) -> Result<Self> {
        let (h, w, hc) = heatmaps.dim();
        let (ph, pw, pc) = pafs.dim();

        if h == 0 || w == 0 {
            return Err(PoseError::ShapeError(format!(
                "heatmap volume has empty spatial size {h}x{w}"
            )));
        }
        if (h, w) != (ph, pw) {
            return Err(PoseError::ShapeError(format!(
                "heatmap size {h}x{w} does not match PAF size {ph}x{pw}"
            )));
        }
        if hc != HEATMAP_CHANNELS && hc != JOINT_COUNT {
            return Err(PoseError::ShapeError(format!(
                "expected {HEATMAP_CHANNELS} heatmap channels, got {hc}"
            )));
        }
        if pc != PAF_CHANNELS {
            return Err(PoseError::ShapeError(format!(
                "expected {PAF_CHANNELS} PAF channels, got {pc}"
            )));
        }

        Ok(Self { heatmaps, pafs })
    }

    /// All-zero maps of the given size.
    #[must_use]
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            heatmaps: Array3::zeros((height, width, HEATMAP_CHANNELS)),
            pafs: Array3::zeros((height, width, PAF_CHANNELS)),
        }
    }

    /// Map height in pixels (original image height).
    #[must_use]
    pub fn height(&self) -> usize {
        self.heatmaps.dim().0
    }

    /// Map width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.heatmaps.dim().1
    }

    /// One heatmap channel as a `(H, W)` view.
    ///
    /// # Panics
    ///
    /// Panics if `joint >= 18`.
    #[must_use]
    pub fn heatmap(&self, joint: usize) -> ArrayView2<'_, f32> {
        assert!(joint < JOINT_COUNT, "joint index {joint} out of range");
        self.heatmaps.slice(s![.., .., joint])
    }

    /// One PAF channel as a `(H, W)` view.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= 38`.
    #[must_use]
    pub fn paf(&self, channel: usize) -> ArrayView2<'_, f32> {
        assert!(channel < PAF_CHANNELS, "PAF channel {channel} out of range");
        self.pafs.slice(s![.., .., channel])
    }

    /// Full heatmap volume.
    #[must_use]
    pub const fn heatmaps(&self) -> &Array3<f32> {
        &self.heatmaps
    }

    /// Full PAF volume.
    #[must_use]
    pub const fn pafs(&self) -> &Array3<f32> {
        &self.pafs
    }

    /// Mutable access for building synthetic maps.
    pub const fn heatmaps_mut(&mut self) -> &mut Array3<f32> {
        &mut self.heatmaps
    }

    /// Mutable access for building synthetic maps.
    pub const fn pafs_mut(&mut self) -> &mut Array3<f32> {
        &mut self.pafs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_accept_valid_shapes() {
        let maps = PoseMaps::new(Array3::zeros((4, 6, 19)), Array3::zeros((4, 6, 38))).unwrap();
        assert_eq!(maps.height(), 4);
        assert_eq!(maps.width(), 6);
        assert_eq!(maps.heatmap(17).dim(), (4, 6));
        assert_eq!(maps.paf(37).dim(), (4, 6));

        assert!(PoseMaps::new(Array3::zeros((4, 6, 18)), Array3::zeros((4, 6, 38))).is_ok());
    }

    #[test]
    fn test_maps_reject_bad_shapes() {
        let err = PoseMaps::new(Array3::zeros((4, 6, 19)), Array3::zeros((4, 5, 38))).unwrap_err();
        assert!(matches!(err, PoseError::ShapeError(_)));
        assert!(PoseMaps::new(Array3::zeros((4, 6, 3)), Array3::zeros((4, 6, 38))).is_err());
        assert!(PoseMaps::new(Array3::zeros((4, 6, 19)), Array3::zeros((4, 6, 19))).is_err());
        assert!(PoseMaps::new(Array3::zeros((0, 6, 19)), Array3::zeros((0, 6, 38))).is_err());
    }

    #[test]
    fn test_maps_views_follow_channels() {
        let mut maps = PoseMaps::zeros(3, 3);
        maps.heatmaps_mut()[[1, 2, 5]] = 0.7;
        maps.pafs_mut()[[2, 0, 30]] = -0.5;
        assert!((maps.heatmap(5)[[1, 2]] - 0.7).abs() < 1e-6);
        assert!((maps.paf(30)[[2, 0]] + 0.5).abs() < 1e-6);
    }
}
