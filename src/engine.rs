// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-frame pose assembly.

use crate::assembly::SkeletonAssembler;
use crate::config::PoseConfig;
use crate::error::Result;
use crate::limbs::{LimbConnections, LimbMatcher, LimbScorer};
use crate::maps::PoseMaps;
use crate::peaks::PeakExtractor;
use crate::results::{Candidate, FramePoseResult};
use crate::topology::LIMBS;

/// Turns one frame's heatmaps and PAFs into a set of skeletons.
///
/// The engine holds only its configuration; every call to [`process`] is
/// independent, so a single engine can be shared across frames and threads.
///
/// [`process`]: PoseAssemblyEngine::process
///
/// # Example
///
/// ```
/// use paf_pose::{PoseAssemblyEngine, PoseConfig, PoseMaps};
///
/// let engine = PoseAssemblyEngine::new(PoseConfig::default())?;
/// let result = engine.process(&PoseMaps::zeros(32, 32));
/// assert!(result.is_empty());
/// # Ok::<(), paf_pose::PoseError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PoseAssemblyEngine {
    config: PoseConfig,
    peaks: PeakExtractor,
    scorer: LimbScorer,
}

impl PoseAssemblyEngine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`](crate::PoseError::ConfigError) if the
    /// configuration is out of range.
    pub fn new(config: PoseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            peaks: PeakExtractor::from_config(&config),
            scorer: LimbScorer::from_config(&config),
            config,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &PoseConfig {
        &self.config
    }

    /// Assemble skeletons for one frame.
    ///
    /// Limb types are processed strictly in topology order.
    #[must_use]
    pub fn process(&self, maps: &PoseMaps) -> FramePoseResult {
        let per_joint = self.peaks.extract(maps);
        let connections = self.connect(maps, &per_joint);

        let candidates: Vec<_> = per_joint.into_iter().flatten().collect();
        let mut assembler = SkeletonAssembler::new();
        for (limb_index, limb_connections) in connections.iter().enumerate() {
            assembler.add_limb(limb_index, limb_connections, &candidates);
        }
        let skeletons = assembler.finish(self.config.min_parts, self.config.min_mean_score);

        FramePoseResult {
            candidates,
            skeletons,
        }
    }

    /// Score and match every limb type.
    ///
    /// Each limb type only reads the maps and its own candidate lists.
    #[must_use]
    pub fn connect(
        &self,
        maps: &PoseMaps,
        per_joint: &[Vec<Candidate>],
    ) -> Vec<LimbConnections> {
        LIMBS
            .iter()
            .enumerate()
            .map(|(limb_index, limb)| {
                let empty = Vec::new();
                let cands_a = per_joint.get(limb.joint_a.index()).unwrap_or(&empty);
                let cands_b = per_joint.get(limb.joint_b.index()).unwrap_or(&empty);
                let pairs = self.scorer.score(
                    maps.paf(limb.paf_x),
                    maps.paf(limb.paf_y),
                    cands_a,
                    cands_b,
                    maps.height(),
                );
                LimbMatcher::select(limb_index, pairs, cands_a, cands_b)
            })
            .collect()
    }
}
