// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton assembly across limb types.
//!
//! Skeletons live in an arena indexed by [`SkeletonId`] (creation order). A
//! reverse index from candidate id to the skeletons holding it replaces the
//! full rescan per edge, and merges mark the absorbed skeleton dead in place so
//! ids stay stable until [`SkeletonAssembler::finish`] compacts the arena.
//!
//! Limb types must be fed strictly in topology order: whether an edge extends,
//! merges or seeds a skeleton depends on what earlier limb types built.

use std::collections::HashMap;

use crate::limbs::LimbConnections;
use crate::results::{Candidate, LimbEdge, Skeleton};
use crate::topology::{LIMBS, Limb, SEED_LIMB_COUNT};

/// Stable index of a skeleton in the assembler arena.
pub type SkeletonId = usize;

/// What happened to one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The B endpoint was attached to an existing skeleton.
    Extended(SkeletonId),
    /// The matching skeleton already held the B endpoint.
    Unchanged(SkeletonId),
    /// Two disjoint skeletons were merged; the second one was absorbed.
    Merged {
        /// Surviving skeleton.
        kept: SkeletonId,
        /// Skeleton folded into `kept` and removed.
        absorbed: SkeletonId,
    },
    /// Two overlapping skeletons matched; the first was extended and the
    /// second left untouched.
    OverlapFallback {
        /// Skeleton that received the B endpoint.
        extended: SkeletonId,
        /// Skeleton whose claim was ignored.
        ignored: SkeletonId,
    },
    /// No skeleton matched; a new two-joint skeleton was created.
    Seeded(SkeletonId),
    /// No skeleton matched and the limb type may not seed skeletons.
    Dropped,
}

/// Incrementally merges accepted limb edges into disjoint skeletons.
#[derive(Debug, Clone, Default)]
pub struct SkeletonAssembler {
    arena: Vec<Option<Skeleton>>,
    owners: HashMap<usize, Vec<SkeletonId>>,
}

impl SkeletonAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every accepted edge of one limb type.
    ///
    /// Limb types without candidates on one side are skipped.
    ///
    /// # Arguments
    ///
    /// * `limb_index` - Index of the limb type in [`LIMBS`].
    /// * `connections` - Matcher output for the limb type.
    /// * `candidates` - The frame's flat candidate list (indexed by id).
    pub fn add_limb(
        &mut self,
        limb_index: usize,
        connections: &LimbConnections,
        candidates: &[Candidate],
    ) {
        let LimbConnections::Edges(edges) = connections else {
            return;
        };
        let Some(limb) = LIMBS.get(limb_index) else {
            return;
        };
        for edge in edges {
            self.add_edge(limb_index, limb, edge, candidates);
        }
    }

    /// Add one edge of limb type `limb_index`.
    pub fn add_edge(
        &mut self,
        limb_index: usize,
        limb: &Limb,
        edge: &LimbEdge,
        candidates: &[Candidate],
    ) -> EdgeOutcome {
        let ta = limb.joint_a.index();
        let tb = limb.joint_b.index();
        let found = self.matching(ta, edge.candidate_a, tb, edge.candidate_b);
        let score_b = candidate_score(candidates, edge.candidate_b);

        match found.as_slice() {
            [] => {
                if limb_index >= SEED_LIMB_COUNT {
                    return EdgeOutcome::Dropped;
                }
                let score_a = candidate_score(candidates, edge.candidate_a);
                let mut skeleton = Skeleton::empty();
                skeleton.slots[ta] = Some(edge.candidate_a);
                skeleton.slots[tb] = Some(edge.candidate_b);
                skeleton.part_count = 2;
                skeleton.total_score = score_a + score_b + edge.midpoint_score;
                EdgeOutcome::Seeded(self.insert(skeleton))
            }
            [only] => self.extend(*only, tb, edge.candidate_b, score_b + edge.midpoint_score),
            // More than two matches is only reachable after an overlap fallback
            // left one candidate in two skeletons; the first two are used.
            [first, second, ..] => {
                if self.merge(*first, *second, edge.midpoint_score) {
                    EdgeOutcome::Merged {
                        kept: *first,
                        absorbed: *second,
                    }
                } else {
                    let extended = *first;
                    self.extend(extended, tb, edge.candidate_b, score_b + edge.midpoint_score);
                    EdgeOutcome::OverlapFallback {
                        extended,
                        ignored: *second,
                    }
                }
            }
        }
    }

    /// Live skeletons matching an edge, in creation order.
    fn matching(&self, ta: usize, id_a: usize, tb: usize, id_b: usize) -> Vec<SkeletonId> {
        let mut found: Vec<SkeletonId> = [id_a, id_b]
            .iter()
            .filter_map(|id| self.owners.get(id))
            .flatten()
            .copied()
            .filter(|&sid| {
                self.get(sid)
                    .is_some_and(|s| s.slots[ta] == Some(id_a) || s.slots[tb] == Some(id_b))
            })
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Attach `id_b` at slot `tb` unless it is already there.
    fn extend(&mut self, sid: SkeletonId, tb: usize, id_b: usize, gain: f32) -> EdgeOutcome {
        let Some(skeleton) = self.arena.get_mut(sid).and_then(Option::as_mut) else {
            return EdgeOutcome::Dropped;
        };
        if skeleton.slots[tb] == Some(id_b) {
            return EdgeOutcome::Unchanged(sid);
        }
        let previous = skeleton.slots[tb].replace(id_b);
        skeleton.part_count += 1;
        skeleton.total_score += gain;

        if let Some(old) = previous {
            self.release(old, sid);
        }
        self.claim(id_b, sid);
        EdgeOutcome::Extended(sid)
    }

    /// Fold `absorb` into `keep` if their joint slots are disjoint.
    ///
    /// # Returns
    ///
    /// * `false` (and no change) if any joint type is filled in both.
    fn merge(&mut self, keep: SkeletonId, absorb: SkeletonId, edge_score: f32) -> bool {
        let (Some(kept), Some(absorbed)) = (self.get(keep), self.get(absorb)) else {
            return false;
        };
        let overlap = kept
            .slots
            .iter()
            .zip(absorbed.slots.iter())
            .any(|(a, b)| a.is_some() && b.is_some());
        if overlap {
            return false;
        }

        let Some(absorbed) = self.arena.get_mut(absorb).and_then(Option::take) else {
            return false;
        };
        let Some(kept) = self.arena.get_mut(keep).and_then(Option::as_mut) else {
            return false;
        };
        for (slot, moved) in kept.slots.iter_mut().zip(absorbed.slots.iter()) {
            if slot.is_none() {
                *slot = *moved;
            }
        }
        kept.part_count += absorbed.part_count;
        kept.total_score += absorbed.total_score + edge_score;

        for id in absorbed.slots.iter().flatten() {
            self.release(*id, absorb);
            self.claim(*id, keep);
        }
        true
    }

    fn insert(&mut self, skeleton: Skeleton) -> SkeletonId {
        let sid = self.arena.len();
        for id in skeleton.slots.iter().flatten() {
            self.claim(*id, sid);
        }
        self.arena.push(Some(skeleton));
        sid
    }

    fn claim(&mut self, id: usize, sid: SkeletonId) {
        let holders = self.owners.entry(id).or_default();
        if !holders.contains(&sid) {
            holders.push(sid);
        }
    }

    fn release(&mut self, id: usize, sid: SkeletonId) {
        if let Some(holders) = self.owners.get_mut(&id) {
            holders.retain(|&h| h != sid);
        }
    }

    /// A live skeleton by id.
    #[must_use]
    pub fn get(&self, sid: SkeletonId) -> Option<&Skeleton> {
        self.arena.get(sid).and_then(Option::as_ref)
    }

    /// Live skeletons in creation order.
    pub fn skeletons(&self) -> impl Iterator<Item = &Skeleton> {
        self.arena.iter().flatten()
    }

    /// Number of live skeletons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skeletons().count()
    }

    /// Check if no skeleton is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prune and return the finished skeletons in creation order.
    ///
    /// A skeleton is kept only if `part_count >= min_parts` and
    /// `total_score / part_count >= min_mean_score`.
    #[must_use]
    pub fn finish(self, min_parts: usize, min_mean_score: f32) -> Vec<Skeleton> {
        self.arena
            .into_iter()
            .flatten()
            .filter(|s| s.part_count >= min_parts && s.mean_score() >= min_mean_score)
            .collect()
    }
}

fn candidate_score(candidates: &[Candidate], id: usize) -> f32 {
    candidates.get(id).map_or(0.0, |c| c.score)
}
