// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Fixed joint and limb topology of the 18-keypoint body model.
//!
//! Joint types index heatmap channels; limb types index pairs of PAF channels.
//! These tables are configuration data shared with the network that produced the
//! maps and must not be reordered: limb order is also the order in which
//! skeletons are assembled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of joint types (heatmap channels excluding background).
pub const JOINT_COUNT: usize = 18;

/// Number of heatmap channels produced by the network (joints + background).
pub const HEATMAP_CHANNELS: usize = JOINT_COUNT + 1;

/// Number of limb types.
pub const LIMB_COUNT: usize = 19;

/// Number of PAF channels produced by the network (x and y per limb).
pub const PAF_CHANNELS: usize = LIMB_COUNT * 2;

/// Limb types below this index may start a new skeleton. The remaining two
/// (shoulder to ear) only extend skeletons that already exist.
pub const SEED_LIMB_COUNT: usize = 17;

/// Limb types below this index are rendered.
pub const DRAWN_LIMB_COUNT: usize = 17;

/// Body joint types in heatmap channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    Nose,
    Neck,
    RightShoulder,
    RightElbow,
    RightWrist,
    LeftShoulder,
    LeftElbow,
    LeftWrist,
    RightHip,
    RightKnee,
    RightAnkle,
    LeftHip,
    LeftKnee,
    LeftAnkle,
    RightEye,
    LeftEye,
    RightEar,
    LeftEar,
}

impl JointType {
    /// All joint types in channel order.
    pub const ALL: [Self; JOINT_COUNT] = [
        Self::Nose,
        Self::Neck,
        Self::RightShoulder,
        Self::RightElbow,
        Self::RightWrist,
        Self::LeftShoulder,
        Self::LeftElbow,
        Self::LeftWrist,
        Self::RightHip,
        Self::RightKnee,
        Self::RightAnkle,
        Self::LeftHip,
        Self::LeftKnee,
        Self::LeftAnkle,
        Self::RightEye,
        Self::LeftEye,
        Self::RightEar,
        Self::LeftEar,
    ];

    /// Heatmap channel / skeleton slot index of this joint type.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Joint type for a heatmap channel index, if in range.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Snake-case name used in serialized records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::Neck => "neck",
            Self::RightShoulder => "right_shoulder",
            Self::RightElbow => "right_elbow",
            Self::RightWrist => "right_wrist",
            Self::LeftShoulder => "left_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightHip => "right_hip",
            Self::RightKnee => "right_knee",
            Self::RightAnkle => "right_ankle",
            Self::LeftHip => "left_hip",
            Self::LeftKnee => "left_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightEye => "right_eye",
            Self::LeftEye => "left_eye",
            Self::RightEar => "right_ear",
            Self::LeftEar => "left_ear",
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JointType {
    type Err = JointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|joint| joint.as_str() == normalized)
            .ok_or_else(|| JointParseError(s.to_string()))
    }
}

/// Error returned when parsing an unknown joint name.
#[derive(Debug, Clone)]
pub struct JointParseError(String);

impl fmt::Display for JointParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid joint type '{}'", self.0)
    }
}

impl std::error::Error for JointParseError {}

/// One limb type: an ordered joint pair and the PAF channels encoding its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limb {
    /// Joint type at the start of the limb.
    pub joint_a: JointType,
    /// Joint type at the end of the limb.
    pub joint_b: JointType,
    /// PAF channel holding the x component.
    pub paf_x: usize,
    /// PAF channel holding the y component.
    pub paf_y: usize,
}

impl Limb {
    const fn new(joint_a: JointType, joint_b: JointType, paf_x: usize, paf_y: usize) -> Self {
        Self {
            joint_a,
            joint_b,
            paf_x,
            paf_y,
        }
    }
}

/// Limb types in assembly order.
pub const LIMBS: [Limb; LIMB_COUNT] = {
    use JointType::{
        LeftAnkle, LeftEar, LeftElbow, LeftEye, LeftHip, LeftKnee, LeftShoulder, LeftWrist, Neck,
        Nose, RightAnkle, RightEar, RightElbow, RightEye, RightHip, RightKnee, RightShoulder,
        RightWrist,
    };
    [
        Limb::new(Neck, RightShoulder, 12, 13),
        Limb::new(Neck, LeftShoulder, 20, 21),
        Limb::new(RightShoulder, RightElbow, 14, 15),
        Limb::new(RightElbow, RightWrist, 16, 17),
        Limb::new(LeftShoulder, LeftElbow, 22, 23),
        Limb::new(LeftElbow, LeftWrist, 24, 25),
        Limb::new(Neck, RightHip, 0, 1),
        Limb::new(RightHip, RightKnee, 2, 3),
        Limb::new(RightKnee, RightAnkle, 4, 5),
        Limb::new(Neck, LeftHip, 6, 7),
        Limb::new(LeftHip, LeftKnee, 8, 9),
        Limb::new(LeftKnee, LeftAnkle, 10, 11),
        Limb::new(Neck, Nose, 28, 29),
        Limb::new(Nose, RightEye, 30, 31),
        Limb::new(RightEye, RightEar, 34, 35),
        Limb::new(Nose, LeftEye, 32, 33),
        Limb::new(LeftEye, LeftEar, 36, 37),
        Limb::new(RightShoulder, RightEar, 18, 19),
        Limb::new(LeftShoulder, LeftEar, 26, 27),
    ]
};
