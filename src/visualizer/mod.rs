// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Visualization palettes and skeleton geometry.

/// Color definitions and palettes.
pub mod color;

/// Limb ellipse geometry and drawing constants.
pub mod skeleton;

pub use color::{Color, JOINT_COLORS};
