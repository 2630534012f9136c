// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Joint candidate extraction from heatmap channels.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::config::PoseConfig;
use crate::filter::gaussian_filter;
use crate::maps::PoseMaps;
use crate::results::Candidate;
use crate::topology::JointType;

/// Finds local maxima in heatmap channels and turns them into [`Candidate`]s.
///
/// Each channel is smoothed first to suppress single-pixel noise. A cell is a
/// peak when its smoothed value is `>=` each of its four axis-aligned neighbors
/// (neighbors outside the map count as `0.0`) and strictly above the threshold.
/// Plateaus may therefore produce several adjacent peaks; they are kept as is.
#[derive(Debug, Clone, Copy)]
pub struct PeakExtractor {
    threshold: f32,
    sigma: f32,
}

impl PeakExtractor {
    /// Create an extractor with an explicit threshold (θ1) and smoothing sigma.
    #[must_use]
    pub const fn new(threshold: f32, sigma: f32) -> Self {
        Self { threshold, sigma }
    }

    /// Create an extractor from the engine configuration.
    #[must_use]
    pub const fn from_config(config: &PoseConfig) -> Self {
        Self::new(config.peak_threshold, config.sigma)
    }

    /// Find peaks in one channel.
    ///
    /// # Arguments
    ///
    /// * `channel` - `(H, W)` heatmap channel.
    ///
    /// # Returns
    ///
    /// * `(x, y, score)` per peak in row-major scan order, where `score` is the
    ///   unsmoothed channel value at the peak cell.
    #[must_use]
    pub fn find_peaks(&self, channel: ArrayView2<'_, f32>) -> Vec<(usize, usize, f32)> {
        let smoothed = gaussian_filter(channel, self.sigma);
        let mut peaks = Vec::new();

        let (height, width) = smoothed.dim();
        for y in 0..height {
            for x in 0..width {
                let score = channel[[y, x]];
                if is_local_max(&smoothed, y, x, self.threshold) && score > self.threshold {
                    peaks.push((x, y, score));
                }
            }
        }
        peaks
    }

    /// Extract candidates for all 18 joint types.
    ///
    /// Channels are searched in parallel. Ids are then assigned from a single
    /// running counter in joint-type order, so they are unique within the frame
    /// and equal to the candidate's position in the flattened list.
    ///
    /// # Returns
    ///
    /// * One candidate list per joint type, indexed by [`JointType::index`].
    #[must_use]
    pub fn extract(&self, maps: &PoseMaps) -> Vec<Vec<Candidate>> {
        let peaks: Vec<Vec<(usize, usize, f32)>> = JointType::ALL
            .par_iter()
            .map(|joint| self.find_peaks(maps.heatmap(joint.index())))
            .collect();

        let mut next_id = 0;
        JointType::ALL
            .iter()
            .zip(peaks)
            .map(|(&joint, found)| {
                found
                    .into_iter()
                    .map(|(x, y, score)| {
                        #[allow(clippy::cast_precision_loss)]
                        let candidate = Candidate {
                            joint,
                            x: x as f32,
                            y: y as f32,
                            score,
                            id: next_id,
                        };
                        next_id += 1;
                        candidate
                    })
                    .collect()
            })
            .collect()
    }
}

/// Check the four-neighbor maximum and threshold conditions on the smoothed map.
fn is_local_max(smoothed: &Array2<f32>, y: usize, x: usize, threshold: f32) -> bool {
    let (height, width) = smoothed.dim();
    let value = smoothed[[y, x]];
    if value <= threshold {
        return false;
    }

    let up = if y > 0 { smoothed[[y - 1, x]] } else { 0.0 };
    let down = if y + 1 < height { smoothed[[y + 1, x]] } else { 0.0 };
    let left = if x > 0 { smoothed[[y, x - 1]] } else { 0.0 };
    let right = if x + 1 < width { smoothed[[y, x + 1]] } else { 0.0 };

    value >= up && value >= down && value >= left && value >= right
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn blob(height: usize, width: usize, cx: usize, cy: usize, peak: f32) -> Array2<f32> {
        #[allow(clippy::cast_precision_loss)]
        Array2::from_shape_fn((height, width), |(y, x)| {
            let dx = x as f32 - cx as f32;
            let dy = y as f32 - cy as f32;
            peak * (-(dx * dx + dy * dy) / 8.0).exp()
        })
    }

    #[test]
    fn test_single_blob_yields_single_peak() {
        let map = blob(40, 50, 20, 12, 0.9);
        let peaks = PeakExtractor::new(0.1, 3.0).find_peaks(map.view());
        assert_eq!(peaks.len(), 1);
        let (x, y, score) = peaks[0];
        assert_eq!((x, y), (20, 12));
        // Score is taken from the unsmoothed map.
        assert!((score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_zero_map_has_no_peaks() {
        let map = Array2::<f32>::zeros((16, 16));
        assert!(PeakExtractor::new(0.1, 3.0).find_peaks(map.view()).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        // No smoothing: a flat plateau exactly at the threshold is rejected.
        let map = Array2::from_elem((5, 5), 0.1_f32);
        assert!(PeakExtractor::new(0.1, 0.0).find_peaks(map.view()).is_empty());
    }

    #[test]
    fn test_plateau_keeps_adjacent_peaks() {
        let mut map = Array2::<f32>::zeros((5, 6));
        map[[2, 2]] = 0.5;
        map[[2, 3]] = 0.5;
        let peaks = PeakExtractor::new(0.1, 0.0).find_peaks(map.view());
        assert_eq!(peaks, vec![(2, 2, 0.5), (3, 2, 0.5)]);
    }

    #[test]
    fn test_peaks_follow_row_major_order() {
        let mut map = blob(60, 60, 45, 10, 0.8);
        map += &blob(60, 60, 10, 40, 0.6);
        map += &blob(60, 60, 40, 40, 0.7);
        let peaks = PeakExtractor::new(0.1, 3.0).find_peaks(map.view());
        let coords: Vec<_> = peaks.iter().map(|(x, y, _)| (*x, *y)).collect();
        assert_eq!(coords, vec![(45, 10), (10, 40), (40, 40)]);
    }

    #[test]
    fn test_ids_run_across_joint_types() {
        let mut maps = PoseMaps::zeros(30, 30);
        for (joint, (cx, cy)) in [(0, (8, 8)), (0, (21, 21)), (3, (10, 15)), (17, (20, 8))] {
            let b = blob(30, 30, cx, cy, 0.8);
            let mut channel = maps.heatmaps_mut().index_axis_mut(ndarray::Axis(2), joint);
            channel += &b;
        }

        let per_joint = PeakExtractor::new(0.1, 3.0).extract(&maps);
        assert_eq!(per_joint.len(), 18);
        assert_eq!(per_joint[0].len(), 2);
        assert_eq!(per_joint[3].len(), 1);
        assert_eq!(per_joint[17].len(), 1);

        let ids: Vec<usize> = per_joint.iter().flatten().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(per_joint[3][0].joint, JointType::RightElbow);
        assert!((per_joint[3][0].x - 10.0).abs() < 1e-6);
        assert!((per_joint[3][0].y - 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_border_neighbors_count_as_zero() {
        let mut map = Array2::<f32>::zeros((4, 4));
        map[[0, 0]] = 0.6;
        let peaks = PeakExtractor::new(0.1, 0.0).find_peaks(map.view());
        assert_eq!(peaks, vec![(0, 0, 0.6)]);
    }
}
