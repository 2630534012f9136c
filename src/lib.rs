// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # PAF Pose
//!
//! Multi-person 2D skeleton assembly for part-affinity-field pose networks.
//!
//! A two-branch network predicts, for every pixel, a confidence heatmap per
//! joint type and a 2D vector field per limb type. This crate turns those maps
//! into whole-body skeletons: it finds joint candidates, scores candidate limbs
//! by integrating the vector field along them, matches them greedily per limb
//! type, and merges the matches into disjoint skeletons.
//!
//! ## Features
//!
//! - **Deterministic assembly** - Same maps in, bit-identical skeletons out
//! - **Pure Rust core** - The assembly engine needs only `ndarray`
//! - **ONNX Runtime** - Multi-scale inference for two-branch PAF models
//! - **Batch CLI** - Label a directory of videos and write per-frame JSON records
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use paf_pose::{OnnxPoseModel, PoseAssemblyEngine, PoseConfig, PoseNetwork};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PoseConfig::default();
//!     let mut model = OnnxPoseModel::load("pose_model.onnx", config.clone())?;
//!     let engine = PoseAssemblyEngine::new(config)?;
//!
//!     let frame = image::open("people.jpg")?.to_rgb8();
//!     let maps = model.infer(&frame)?;
//!     let result = engine.process(&maps);
//!
//!     println!("{}", result.verbose());
//!     for skeleton in &result.skeletons {
//!         for (joint, id) in skeleton.joints() {
//!             let c = &result.candidates[id];
//!             println!("{joint}: ({}, {}) {:.2}", c.x, c.y, c.score);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Quick Start (CLI)
//!
//! ```bash
//! # Label every video in a directory (requires the `video` feature)
//! paf-pose run --model pose_model.onnx --input videos/
//!
//! # One image, annotated
//! paf-pose frame --model pose_model.onnx --image people.jpg --output people_pose.png
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`engine`] | Per-frame assembly ([`PoseAssemblyEngine`]) |
//! | [`peaks`] | Joint candidate extraction ([`PeakExtractor`]) |
//! | [`limbs`] | Limb scoring and matching ([`LimbScorer`], [`LimbMatcher`]) |
//! | [`assembly`] | Skeleton merging ([`SkeletonAssembler`]) |
//! | [`topology`] | Joint and limb tables ([`JointType`], [`LIMBS`]) |
//! | [`maps`] | Heatmap and PAF volumes ([`PoseMaps`]) |
//! | [`results`] | Output types ([`FramePoseResult`], [`Skeleton`], [`Candidate`]) |
//! | [`model`] | Network collaborator ([`PoseNetwork`], [`OnnxPoseModel`]) |
//! | [`batch`] | Directory-of-videos processing ([`BatchRunner`]) |
//! | [`config`] | Parameters ([`PoseConfig`]) |
//! | [`error`] | Error types ([`PoseError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `annotate` | Skeleton rendering (default) |
//! | `video` | Video decoding and encoding |

// Modules
#[cfg(feature = "annotate")]
pub mod annotate;
pub mod assembly;
pub mod batch;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod io;
pub mod limbs;
pub mod maps;
pub mod model;
pub mod peaks;
pub mod preprocessing;
pub mod results;
pub mod source;
pub mod topology;
pub mod visualizer;

// Re-export main types for convenience
pub use assembly::{EdgeOutcome, SkeletonAssembler, SkeletonId};
pub use batch::{BatchOptions, BatchRunner, VideoStatus, VideoSummary};
pub use config::PoseConfig;
pub use engine::PoseAssemblyEngine;
pub use error::{PoseError, Result};
pub use limbs::{LimbConnections, LimbMatcher, LimbScorer, ScoredPair};
pub use maps::PoseMaps;
pub use model::{OnnxPoseModel, PoseNetwork};
pub use peaks::PeakExtractor;
pub use results::{Candidate, FramePoseResult, FrameRecord, LimbEdge, Skeleton, Speed};
pub use source::{FrameSource, Source, SourceMeta};
pub use topology::{JointType, LIMBS, Limb};

#[cfg(feature = "annotate")]
pub use annotate::draw_pose;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
