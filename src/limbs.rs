// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Limb scoring and one-to-one limb matching.
//!
//! For one limb type, [`LimbScorer`] rates every (A, B) candidate pair by
//! integrating the part affinity field along the segment between them, and
//! [`LimbMatcher`] greedily keeps the best-scoring pairs such that no candidate
//! is used twice.

use ndarray::ArrayView2;

use crate::config::PoseConfig;
use crate::results::{Candidate, LimbEdge};

/// A candidate pair that passed both acceptance criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPair {
    /// Index into the A candidate list of the limb type.
    pub index_a: usize,
    /// Index into the B candidate list of the limb type.
    pub index_b: usize,
    /// Mean PAF alignment over the samples.
    pub midpoint_score: f32,
    /// `midpoint_score` plus the limb-length penalty.
    pub total_score: f32,
}

/// Scores candidate pairs of one limb type against its PAF channels.
#[derive(Debug, Clone, Copy)]
pub struct LimbScorer {
    paf_threshold: f32,
    mid_num: usize,
    min_aligned_ratio: f32,
}

impl LimbScorer {
    /// Create a scorer.
    ///
    /// # Arguments
    ///
    /// * `paf_threshold` - Per-sample alignment threshold (θ2).
    /// * `mid_num` - Samples per segment (M), at least 2.
    /// * `min_aligned_ratio` - Fraction of samples that must exceed θ2.
    #[must_use]
    pub const fn new(paf_threshold: f32, mid_num: usize, min_aligned_ratio: f32) -> Self {
        Self {
            paf_threshold,
            mid_num,
            min_aligned_ratio,
        }
    }

    /// Create a scorer from the engine configuration.
    #[must_use]
    pub const fn from_config(config: &PoseConfig) -> Self {
        Self::new(config.paf_threshold, config.mid_num, config.min_aligned_ratio)
    }

    /// Score every (A, B) pair and keep those passing both criteria.
    ///
    /// Pairs are enumerated A-major (`for a { for b }`), which is also the
    /// tie-break order used by the matcher.
    ///
    /// # Arguments
    ///
    /// * `paf_x`, `paf_y` - The limb type's two PAF channels, `(H, W)`.
    /// * `cands_a`, `cands_b` - Candidates of the limb's endpoint joint types.
    /// * `image_height` - Original image height used by the length penalty.
    #[must_use]
    pub fn score(
        &self,
        paf_x: ArrayView2<'_, f32>,
        paf_y: ArrayView2<'_, f32>,
        cands_a: &[Candidate],
        cands_b: &[Candidate],
        image_height: usize,
    ) -> Vec<ScoredPair> {
        let mut accepted = Vec::new();
        for (index_a, a) in cands_a.iter().enumerate() {
            for (index_b, b) in cands_b.iter().enumerate() {
                if let Some((midpoint_score, total_score)) =
                    self.score_pair(paf_x, paf_y, a, b, image_height)
                {
                    accepted.push(ScoredPair {
                        index_a,
                        index_b,
                        midpoint_score,
                        total_score,
                    });
                }
            }
        }
        accepted
    }

    /// Score a single pair.
    ///
    /// # Returns
    ///
    /// * `Some((midpoint_score, total_score))` if the pair is accepted, `None` if
    ///   the endpoints coincide or either criterion fails.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn score_pair(
        &self,
        paf_x: ArrayView2<'_, f32>,
        paf_y: ArrayView2<'_, f32>,
        a: &Candidate,
        b: &Candidate,
        image_height: usize,
    ) -> Option<(f32, f32)> {
        let (ax, ay) = (f64::from(a.x), f64::from(a.y));
        let (bx, by) = (f64::from(b.x), f64::from(b.y));
        let (dx, dy) = (bx - ax, by - ay);
        let norm = dx.hypot(dy);
        // Overlapping joints carry no direction.
        if norm == 0.0 {
            return None;
        }
        let (ux, uy) = (dx / norm, dy / norm);

        let (height, width) = paf_x.dim();
        if height == 0 || width == 0 || self.mid_num == 0 {
            return None;
        }

        let threshold = f64::from(self.paf_threshold);
        let mut sum = 0.0;
        let mut aligned = 0usize;
        for (sx, sy) in linspace_segment(ax, ay, bx, by, self.mid_num) {
            let col = grid_index(sx, width);
            let row = grid_index(sy, height);
            let dot = f64::from(paf_x[[row, col]]) * ux + f64::from(paf_y[[row, col]]) * uy;
            sum += dot;
            if dot > threshold {
                aligned += 1;
            }
        }

        let samples = self.mid_num as f64;
        let midpoint_score = sum / samples;
        let penalty = (0.5 * image_height as f64 / norm - 1.0).min(0.0);
        let total_score = midpoint_score + penalty;

        let enough_aligned = aligned as f64 > f64::from(self.min_aligned_ratio) * samples;
        if enough_aligned && total_score > 0.0 {
            Some((midpoint_score as f32, total_score as f32))
        } else {
            None
        }
    }
}

/// `num` evenly spaced points from `(ax, ay)` to `(bx, by)`, both ends included.
fn linspace_segment(
    ax: f64,
    ay: f64,
    bx: f64,
    by: f64,
    num: usize,
) -> impl Iterator<Item = (f64, f64)> {
    #[allow(clippy::cast_precision_loss)]
    let div = num.saturating_sub(1).max(1) as f64;
    let (step_x, step_y) = ((bx - ax) / div, (by - ay) / div);
    (0..num).map(move |i| {
        if i + 1 == num && num > 1 {
            (bx, by)
        } else {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64;
            (ax + t * step_x, ay + t * step_y)
        }
    })
}

/// Round a continuous coordinate to the nearest cell (ties to even), clamped to the grid.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grid_index(v: f64, len: usize) -> usize {
    let rounded = v.round_ties_even().max(0.0) as usize;
    rounded.min(len - 1)
}

/// Accepted edges of one limb type.
#[derive(Debug, Clone, PartialEq)]
pub enum LimbConnections {
    /// One of the endpoint joint types has no candidates in this frame; the
    /// assembler skips the limb type entirely.
    NoCandidates,
    /// Accepted edges in acceptance order (best first). May be empty.
    Edges(Vec<LimbEdge>),
}

impl LimbConnections {
    /// Accepted edges, empty for [`LimbConnections::NoCandidates`].
    #[must_use]
    pub fn edges(&self) -> &[LimbEdge] {
        match self {
            Self::NoCandidates => &[],
            Self::Edges(edges) => edges,
        }
    }

    /// Whether the limb type had candidates on both ends.
    #[must_use]
    pub const fn has_candidates(&self) -> bool {
        matches!(self, Self::Edges(_))
    }
}

/// Greedy one-to-one assignment over scored pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimbMatcher;

impl LimbMatcher {
    /// Select edges for one limb type.
    ///
    /// Pairs are ranked by `total_score` (descending, stable so equal scores keep
    /// enumeration order) and accepted top-down when neither endpoint is taken,
    /// stopping after `min(nA, nB)` edges.
    ///
    /// # Arguments
    ///
    /// * `limb` - Limb type index recorded on the produced edges.
    /// * `pairs` - Scorer output for the limb type.
    /// * `cands_a`, `cands_b` - The candidate lists `pairs` indexes into.
    #[must_use]
    pub fn select(
        limb: usize,
        mut pairs: Vec<ScoredPair>,
        cands_a: &[Candidate],
        cands_b: &[Candidate],
    ) -> LimbConnections {
        let (n_a, n_b) = (cands_a.len(), cands_b.len());
        if n_a == 0 || n_b == 0 {
            return LimbConnections::NoCandidates;
        }

        pairs.sort_by(|p, q| q.total_score.total_cmp(&p.total_score));

        let limit = n_a.min(n_b);
        let mut used_a = vec![false; n_a];
        let mut used_b = vec![false; n_b];
        let mut edges = Vec::with_capacity(limit);

        for pair in pairs {
            let (Some(a), Some(b)) = (cands_a.get(pair.index_a), cands_b.get(pair.index_b)) else {
                continue;
            };
            if used_a[pair.index_a] || used_b[pair.index_b] {
                continue;
            }
            used_a[pair.index_a] = true;
            used_b[pair.index_b] = true;
            edges.push(LimbEdge {
                limb,
                candidate_a: a.id,
                candidate_b: b.id,
                midpoint_score: pair.midpoint_score,
                total_score: pair.total_score,
            });
            if edges.len() >= limit {
                break;
            }
        }

        LimbConnections::Edges(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::JointType;
    use ndarray::Array2;

    fn cand(joint: JointType, id: usize, x: f32, y: f32) -> Candidate {
        Candidate {
            joint,
            x,
            y,
            score: 0.8,
            id,
        }
    }

    fn uniform_field(h: usize, w: usize, vx: f32, vy: f32) -> (Array2<f32>, Array2<f32>) {
        (Array2::from_elem((h, w), vx), Array2::from_elem((h, w), vy))
    }

    fn scorer() -> LimbScorer {
        LimbScorer::new(0.05, 10, 0.8)
    }

    #[test]
    fn test_linspace_includes_endpoints() {
        let points: Vec<_> = linspace_segment(0.0, 0.0, 9.0, 18.0, 10).collect();
        assert_eq!(points.len(), 10);
        assert_eq!(points[0], (0.0, 0.0));
        assert_eq!(points[9], (9.0, 18.0));
        assert!((points[1].0 - 1.0).abs() < 1e-12);
        assert!((points[1].1 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_index_rounds_half_to_even() {
        assert_eq!(grid_index(2.5, 10), 2);
        assert_eq!(grid_index(3.5, 10), 4);
        assert_eq!(grid_index(2.4, 10), 2);
        assert_eq!(grid_index(-0.7, 10), 0);
        assert_eq!(grid_index(12.0, 10), 9);
    }

    #[test]
    fn test_aligned_pair_is_accepted() {
        let (px, py) = uniform_field(40, 40, 1.0, 0.0);
        let a = cand(JointType::Neck, 0, 5.0, 10.0);
        let b = cand(JointType::RightShoulder, 1, 15.0, 10.0);
        let (mid, total) = scorer()
            .score_pair(px.view(), py.view(), &a, &b, 40)
            .unwrap();
        assert!((mid - 1.0).abs() < 1e-6);
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_opposite_direction_is_rejected() {
        let (px, py) = uniform_field(40, 40, -1.0, 0.0);
        let a = cand(JointType::Neck, 0, 5.0, 10.0);
        let b = cand(JointType::RightShoulder, 1, 15.0, 10.0);
        assert!(scorer().score_pair(px.view(), py.view(), &a, &b, 40).is_none());
    }

    #[test]
    fn test_coincident_endpoints_are_skipped() {
        let (px, py) = uniform_field(20, 20, 1.0, 1.0);
        let a = cand(JointType::Neck, 0, 7.0, 7.0);
        let b = cand(JointType::RightShoulder, 1, 7.0, 7.0);
        assert!(scorer().score_pair(px.view(), py.view(), &a, &b, 20).is_none());
        assert!(scorer().score(px.view(), py.view(), &[a], &[b], 20).is_empty());
    }

    #[test]
    fn test_long_limbs_are_penalized() {
        // Limb of length 30 in an image of height 20: penalty = 0.5*20/30 - 1 = -2/3.
        let (px, py) = uniform_field(20, 40, 1.0, 0.0);
        let a = cand(JointType::Neck, 0, 2.0, 5.0);
        let b = cand(JointType::RightShoulder, 1, 32.0, 5.0);
        let (mid, total) = scorer()
            .score_pair(px.view(), py.view(), &a, &b, 20)
            .unwrap();
        assert!((mid - 1.0).abs() < 1e-6);
        assert!((total - (1.0 - 2.0 / 3.0)).abs() < 1e-5);

        // Length 60 with a weaker field: 0.5 + (10/60 - 1) < 0, so the pair is rejected.
        let (wx, wy) = uniform_field(20, 70, 0.5, 0.0);
        let c = cand(JointType::RightShoulder, 2, 62.0, 5.0);
        assert!(scorer().score_pair(wx.view(), wy.view(), &a, &c, 20).is_none());
    }

    #[test]
    fn test_partial_alignment_needs_more_than_eighty_percent() {
        // Horizontal limb sampled at x = 0..=9; the field is aligned only on x < 8,
        // giving exactly 8 of 10 aligned samples, which is not enough.
        let mut px = Array2::<f32>::zeros((5, 10));
        for x in 0..8 {
            px[[2, x]] = 1.0;
        }
        let py = Array2::<f32>::zeros((5, 10));
        let a = cand(JointType::Neck, 0, 0.0, 2.0);
        let b = cand(JointType::RightShoulder, 1, 9.0, 2.0);
        assert!(scorer().score_pair(px.view(), py.view(), &a, &b, 100).is_none());

        px[[2, 8]] = 1.0;
        assert!(scorer().score_pair(px.view(), py.view(), &a, &b, 100).is_some());
    }

    fn pair(index_a: usize, index_b: usize, total: f32) -> ScoredPair {
        ScoredPair {
            index_a,
            index_b,
            midpoint_score: total,
            total_score: total,
        }
    }

    #[test]
    fn test_matcher_is_one_to_one() {
        let cands_a = [
            cand(JointType::Neck, 0, 0.0, 0.0),
            cand(JointType::Neck, 1, 5.0, 0.0),
        ];
        let cands_b = [
            cand(JointType::Nose, 2, 0.0, 5.0),
            cand(JointType::Nose, 3, 5.0, 5.0),
            cand(JointType::Nose, 4, 9.0, 5.0),
        ];
        let pairs = vec![
            pair(0, 0, 0.5),
            pair(0, 1, 0.9),
            pair(1, 1, 0.8),
            pair(1, 2, 0.3),
        ];
        let connections = LimbMatcher::select(12, pairs, &cands_a, &cands_b);
        let edges = connections.edges();
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].candidate_a, edges[0].candidate_b), (0, 3));
        assert_eq!((edges[1].candidate_a, edges[1].candidate_b), (1, 4));
        assert!(edges.iter().all(|e| e.limb == 12));
    }

    #[test]
    fn test_matcher_ties_keep_enumeration_order() {
        let cands_a = [cand(JointType::Neck, 0, 0.0, 0.0)];
        let cands_b = [
            cand(JointType::Nose, 1, 0.0, 5.0),
            cand(JointType::Nose, 2, 5.0, 5.0),
        ];
        let connections =
            LimbMatcher::select(0, vec![pair(0, 0, 0.7), pair(0, 1, 0.7)], &cands_a, &cands_b);
        assert_eq!(connections.edges().len(), 1);
        assert_eq!(connections.edges()[0].candidate_b, 1);
    }

    #[test]
    fn test_matcher_marks_missing_side() {
        let cands_a = [cand(JointType::Neck, 0, 0.0, 0.0)];
        let connections = LimbMatcher::select(3, Vec::new(), &cands_a, &[]);
        assert_eq!(connections, LimbConnections::NoCandidates);
        assert!(!connections.has_candidates());
        assert!(connections.edges().is_empty());

        let connections = LimbMatcher::select(3, Vec::new(), &cands_a, &cands_a);
        assert!(connections.has_candidates());
        assert!(connections.edges().is_empty());
    }
}
