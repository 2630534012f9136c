// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Result types produced by the assembly engine.
//!
//! A frame yields a flat list of [`Candidate`] joints and a list of [`Skeleton`]
//! records that reference candidates by id. Everything here is serializable so
//! the same values can be handed to renderers and written to record files.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::topology::{JOINT_COUNT, JointType};

/// Timing information for one frame (in milliseconds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    /// Time spent in the network collaborator (all scales).
    pub inference: Option<f64>,
    /// Time spent in peak extraction, limb matching and assembly.
    pub assembly: Option<f64>,
    /// Time spent rendering the annotated frame.
    pub annotate: Option<f64>,
}

impl Speed {
    /// Get total time.
    ///
    /// # Returns
    ///
    /// * Sum of the recorded stages in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.inference.unwrap_or(0.0) + self.assembly.unwrap_or(0.0) + self.annotate.unwrap_or(0.0)
    }
}

/// A single detected joint instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Joint type (heatmap channel) of this detection.
    pub joint: JointType,
    /// Column of the peak cell.
    pub x: f32,
    /// Row of the peak cell.
    pub y: f32,
    /// Unsmoothed heatmap value at the peak cell.
    pub score: f32,
    /// Frame-unique id, equal to the candidate's index in the frame's candidate list.
    pub id: usize,
}

/// One accepted pairing between a joint of type A and a joint of type B.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimbEdge {
    /// Limb type index.
    pub limb: usize,
    /// Candidate id of the A endpoint.
    pub candidate_a: usize,
    /// Candidate id of the B endpoint.
    pub candidate_b: usize,
    /// Mean PAF alignment over the sampled points.
    pub midpoint_score: f32,
    /// Alignment with the limb-length penalty applied; the ranking key.
    pub total_score: f32,
}

/// A person's skeleton: one optional candidate id per joint type plus aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    /// Candidate id per joint type, indexed by [`JointType::index`].
    pub slots: [Option<usize>; JOINT_COUNT],
    /// Number of joints attached.
    pub part_count: usize,
    /// Sum of joint scores and limb scores accumulated during assembly.
    pub total_score: f32,
}

impl Skeleton {
    /// An empty skeleton with no joints.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            slots: [None; JOINT_COUNT],
            part_count: 0,
            total_score: 0.0,
        }
    }

    /// Candidate id in the slot of `joint`, if any.
    #[must_use]
    pub const fn get(&self, joint: JointType) -> Option<usize> {
        self.slots[joint.index()]
    }

    /// Iterate over filled slots as `(joint, candidate id)`.
    pub fn joints(&self) -> impl Iterator<Item = (JointType, usize)> + '_ {
        JointType::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(joint, slot)| slot.map(|id| (*joint, id)))
    }

    /// Average score per joint (`total_score / part_count`), zero for empty skeletons.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_score(&self) -> f32 {
        if self.part_count == 0 {
            0.0
        } else {
            self.total_score / self.part_count as f32
        }
    }
}

/// Assembly output for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FramePoseResult {
    /// All joint candidates in id order.
    pub candidates: Vec<Candidate>,
    /// Retained skeletons in creation order.
    pub skeletons: Vec<Skeleton>,
}

impl FramePoseResult {
    /// Number of skeletons (people) found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skeletons.len()
    }

    /// Check if no skeleton was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skeletons.is_empty()
    }

    /// Look up a candidate by id.
    #[must_use]
    pub fn candidate(&self, id: usize) -> Option<&Candidate> {
        self.candidates.get(id).filter(|c| c.id == id)
    }

    /// Dense keypoints with shape `(N, 18, 3)` holding `[x, y, score]` per joint.
    ///
    /// Absent joints are all zeros.
    #[must_use]
    pub fn keypoints(&self) -> Array3<f32> {
        let mut data = Array3::zeros((self.skeletons.len(), JOINT_COUNT, 3));
        for (n, skeleton) in self.skeletons.iter().enumerate() {
            for (joint, id) in skeleton.joints() {
                if let Some(c) = self.candidate(id) {
                    let k = joint.index();
                    data[[n, k, 0]] = c.x;
                    data[[n, k, 1]] = c.y;
                    data[[n, k, 2]] = c.score;
                }
            }
        }
        data
    }

    /// Short log string describing the frame (e.g. "2 persons, 31 candidates").
    #[must_use]
    pub fn verbose(&self) -> String {
        let people = self.skeletons.len();
        let suffix = if people == 1 { "" } else { "s" };
        format!(
            "{people} person{suffix}, {} candidates",
            self.candidates.len()
        )
    }
}

/// Per-frame record written by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Video file stem the frame belongs to.
    pub video_name: String,
    /// Zero-based frame index within the video.
    pub frame_index: usize,
    /// All joint candidates of the frame.
    pub candidates: Vec<Candidate>,
    /// Retained skeletons of the frame.
    pub skeletons: Vec<Skeleton>,
    /// Failure message when the frame could not be pose-estimated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameRecord {
    /// Record for a successfully processed frame.
    #[must_use]
    pub fn new(video_name: &str, frame_index: usize, result: FramePoseResult) -> Self {
        Self {
            video_name: video_name.to_string(),
            frame_index,
            candidates: result.candidates,
            skeletons: result.skeletons,
            error: None,
        }
    }

    /// Empty record for a frame whose pose output was skipped.
    #[must_use]
    pub fn failed(video_name: &str, frame_index: usize, error: String) -> Self {
        Self {
            video_name: video_name.to_string(),
            frame_index,
            candidates: Vec::new(),
            skeletons: Vec::new(),
            error: Some(error),
        }
    }
}
