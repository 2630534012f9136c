// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use image::Rgb;

use crate::topology::{JOINT_COUNT, JointType};

/// Color type for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Create a new color from RGB values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Get a color from the joint palette by index (wraps around).
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        let color = JOINT_COLORS[index % JOINT_COLORS.len()];
        Self(color[0], color[1], color[2])
    }

    /// Color of a joint type's candidates.
    #[must_use]
    pub const fn from_joint(joint: JointType) -> Self {
        Self::from_index(joint.index())
    }

    /// As an `image` pixel.
    #[must_use]
    pub const fn to_rgb(self) -> Rgb<u8> {
        Rgb([self.0, self.1, self.2])
    }
}

/// Joint and limb palette: a hue sweep from red through green and blue to magenta.
///
/// Candidates of joint type `k` and limbs of type `k` share entry `k`.
pub const JOINT_COLORS: [[u8; 3]; JOINT_COUNT] = [
    [255, 0, 0],   // #ff0000
    [255, 85, 0],  // #ff5500
    [255, 170, 0], // #ffaa00
    [255, 255, 0], // #ffff00
    [170, 255, 0], // #aaff00
    [85, 255, 0],  // #55ff00
    [0, 255, 0],   // #00ff00
    [0, 255, 85],  // #00ff55
    [0, 255, 170], // #00ffaa
    [0, 255, 255], // #00ffff
    [0, 170, 255], // #00aaff
    [0, 85, 255],  // #0055ff
    [0, 0, 255],   // #0000ff
    [85, 0, 255],  // #5500ff
    [170, 0, 255], // #aa00ff
    [255, 0, 255], // #ff00ff
    [255, 0, 170], // #ff00aa
    [255, 0, 85],  // #ff0055
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_lookup() {
        assert_eq!(Color::from_joint(JointType::Nose), Color(255, 0, 0));
        assert_eq!(Color::from_joint(JointType::LeftEar), Color(255, 0, 85));
        assert_eq!(Color::from_index(JOINT_COUNT), Color::from_index(0));
        assert_eq!(Color::new(1, 2, 3).to_rgb(), Rgb([1, 2, 3]));
    }
}
