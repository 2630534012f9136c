// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Integration tests for the pose assembly library

use std::collections::HashSet;

use image::RgbImage;
use paf_pose::io::FrameSink;
use paf_pose::{
    BatchOptions, BatchRunner, FramePoseResult, JointType, LIMBS, PoseAssemblyEngine, PoseConfig,
    PoseMaps, PoseNetwork, SourceMeta,
};

const HEIGHT: usize = 150;
const WIDTH: usize = 180;

/// Joint layout of one upright person, relative to its top-left corner.
const BODY: [(JointType, usize, usize); 18] = [
    (JointType::Nose, 30, 26),
    (JointType::Neck, 30, 40),
    (JointType::RightShoulder, 15, 40),
    (JointType::RightElbow, 10, 60),
    (JointType::RightWrist, 8, 80),
    (JointType::LeftShoulder, 45, 40),
    (JointType::LeftElbow, 50, 60),
    (JointType::LeftWrist, 52, 80),
    (JointType::RightHip, 22, 80),
    (JointType::RightKnee, 22, 105),
    (JointType::RightAnkle, 22, 130),
    (JointType::LeftHip, 38, 80),
    (JointType::LeftKnee, 38, 105),
    (JointType::LeftAnkle, 38, 130),
    (JointType::RightEye, 22, 16),
    (JointType::LeftEye, 38, 16),
    (JointType::RightEar, 10, 20),
    (JointType::LeftEar, 50, 20),
];

fn position(joint: JointType, origin: usize) -> (usize, usize) {
    BODY.iter()
        .find(|(j, _, _)| *j == joint)
        .map(|&(_, x, y)| (origin + x, y))
        .unwrap()
}

/// Paint an isotropic bump of height `peak` centered on `(x, y)`.
#[allow(clippy::cast_precision_loss)]
fn paint_joint(maps: &mut PoseMaps, joint: JointType, x: usize, y: usize, peak: f32) {
    let heat = maps.heatmaps_mut();
    for yy in y.saturating_sub(6)..=(y + 6).min(HEIGHT - 1) {
        for xx in x.saturating_sub(6)..=(x + 6).min(WIDTH - 1) {
            let d2 = (xx as f32 - x as f32).powi(2) + (yy as f32 - y as f32).powi(2);
            let v = peak * (-d2 / 8.0).exp();
            let cell = &mut heat[[yy, xx, joint.index()]];
            *cell = cell.max(v);
        }
    }
}

/// Paint a unit vector field along the segment `a -> b` on the limb's PAF channels.
#[allow(clippy::cast_precision_loss)]
fn paint_limb(maps: &mut PoseMaps, limb: usize, a: (usize, usize), b: (usize, usize)) {
    let (ax, ay) = (a.0 as f32, a.1 as f32);
    let (bx, by) = (b.0 as f32, b.1 as f32);
    let (dx, dy) = (bx - ax, by - ay);
    let len = dx.hypot(dy);
    let (ux, uy) = (dx / len, dy / len);

    let (x0, x1) = (a.0.min(b.0).saturating_sub(2), a.0.max(b.0) + 2);
    let (y0, y1) = (a.1.min(b.1).saturating_sub(2), a.1.max(b.1) + 2);
    let pafs = maps.pafs_mut();
    for y in y0..=y1.min(HEIGHT - 1) {
        for x in x0..=x1.min(WIDTH - 1) {
            let (px, py) = (x as f32 - ax, y as f32 - ay);
            let t = ((px * ux + py * uy) / len).clamp(0.0, 1.0);
            let (cx, cy) = (ax + t * dx, ay + t * dy);
            if (x as f32 - cx).hypot(y as f32 - cy) <= 1.5 {
                pafs[[y, x, LIMBS[limb].paf_x]] = ux;
                pafs[[y, x, LIMBS[limb].paf_y]] = uy;
            }
        }
    }
}

/// Paint a person whose layout starts at column `origin`, restricted to `joints`.
fn paint_person(maps: &mut PoseMaps, origin: usize, joints: &[JointType]) {
    for &joint in joints {
        let (x, y) = position(joint, origin);
        paint_joint(maps, joint, x, y, 1.0);
    }
    for (index, limb) in LIMBS.iter().enumerate() {
        if joints.contains(&limb.joint_a) && joints.contains(&limb.joint_b) {
            paint_limb(
                maps,
                index,
                position(limb.joint_a, origin),
                position(limb.joint_b, origin),
            );
        }
    }
}

fn full_person(maps: &mut PoseMaps, origin: usize) {
    paint_person(maps, origin, &JointType::ALL);
}

fn engine() -> PoseAssemblyEngine {
    PoseAssemblyEngine::new(PoseConfig::default()).unwrap()
}

/// Every skeleton slot points at a candidate of that slot's joint type.
fn assert_consistent(result: &FramePoseResult) {
    for (index, candidate) in result.candidates.iter().enumerate() {
        assert_eq!(candidate.id, index);
    }
    for skeleton in &result.skeletons {
        assert_eq!(skeleton.part_count, skeleton.joints().count());
        for (joint, id) in skeleton.joints() {
            assert_eq!(result.candidates[id].joint, joint);
        }
    }
}

#[test]
fn test_all_zero_maps() {
    let result = engine().process(&PoseMaps::zeros(HEIGHT, WIDTH));
    assert!(result.candidates.is_empty());
    assert!(result.is_empty());
}

#[test]
fn test_single_person() {
    let mut maps = PoseMaps::zeros(HEIGHT, WIDTH);
    full_person(&mut maps, 10);

    let result = engine().process(&maps);
    assert_consistent(&result);
    assert_eq!(result.candidates.len(), 18);
    assert_eq!(result.len(), 1);

    let skeleton = &result.skeletons[0];
    assert!(skeleton.part_count >= 16);
    assert!(skeleton.mean_score() >= 0.4);

    let neck = result.candidates[skeleton.get(JointType::Neck).unwrap()];
    assert!((neck.x - 40.0).abs() < 1e-6 && (neck.y - 40.0).abs() < 1e-6);
    let ankle = result.candidates[skeleton.get(JointType::LeftAnkle).unwrap()];
    assert!((ankle.x - 48.0).abs() < 1e-6 && (ankle.y - 130.0).abs() < 1e-6);
}

#[test]
fn test_two_separated_people() {
    let mut maps = PoseMaps::zeros(HEIGHT, WIDTH);
    full_person(&mut maps, 10);
    full_person(&mut maps, 110);

    let result = engine().process(&maps);
    assert_consistent(&result);
    assert_eq!(result.candidates.len(), 36);
    assert_eq!(result.len(), 2);

    // Each skeleton stays on one side of the frame.
    for skeleton in &result.skeletons {
        let left = skeleton
            .joints()
            .all(|(_, id)| result.candidates[id].x < 90.0);
        let right = skeleton
            .joints()
            .all(|(_, id)| result.candidates[id].x >= 90.0);
        assert!(left ^ right);
        assert!(skeleton.part_count >= 16);
    }
}

#[test]
fn test_skeletons_are_disjoint() {
    let mut maps = PoseMaps::zeros(HEIGHT, WIDTH);
    full_person(&mut maps, 10);
    full_person(&mut maps, 110);

    let result = engine().process(&maps);
    let mut seen = HashSet::new();
    for skeleton in &result.skeletons {
        for (_, id) in skeleton.joints() {
            assert!(seen.insert(id), "candidate {id} shared between skeletons");
        }
    }
}

#[test]
fn test_fragment_is_pruned() {
    let mut maps = PoseMaps::zeros(HEIGHT, WIDTH);
    full_person(&mut maps, 10);
    paint_person(
        &mut maps,
        110,
        &[JointType::Neck, JointType::RightShoulder, JointType::RightElbow],
    );

    let result = engine().process(&maps);
    assert_consistent(&result);
    assert_eq!(result.candidates.len(), 21);
    assert_eq!(result.len(), 1);
    for skeleton in &result.skeletons {
        assert!(skeleton.part_count >= 4);
        assert!(skeleton.mean_score() >= 0.4);
    }

    // Relaxed pruning keeps the three-joint fragment.
    let relaxed = PoseAssemblyEngine::new(PoseConfig::default().with_pruning(3, 0.0)).unwrap();
    let result = relaxed.process(&maps);
    assert_eq!(result.len(), 2);
    assert!(result.skeletons.iter().any(|s| s.part_count == 3));
}

#[test]
fn test_process_is_idempotent() {
    let mut maps = PoseMaps::zeros(HEIGHT, WIDTH);
    full_person(&mut maps, 10);
    full_person(&mut maps, 110);

    let engine = engine();
    let first = engine.process(&maps);
    let second = engine.process(&maps);
    assert_eq!(first, second);
}

#[test]
fn test_keypoints_shape() {
    let mut maps = PoseMaps::zeros(HEIGHT, WIDTH);
    full_person(&mut maps, 10);

    let result = engine().process(&maps);
    let keypoints = result.keypoints();
    assert_eq!(keypoints.dim(), (1, 18, 3));
    let neck = JointType::Neck.index();
    assert!((keypoints[[0, neck, 0]] - 40.0).abs() < 1e-6);
    assert!((keypoints[[0, neck, 1]] - 40.0).abs() < 1e-6);
    assert!((keypoints[[0, neck, 2]] - 1.0).abs() < 1e-6);
}

/// Network stand-in that returns the same painted maps for every frame.
struct PaintedNetwork {
    maps: PoseMaps,
}

impl PoseNetwork for PaintedNetwork {
    fn infer(&mut self, _image: &RgbImage) -> paf_pose::Result<PoseMaps> {
        Ok(self.maps.clone())
    }
}

#[test]
#[allow(clippy::cast_possible_truncation)]
fn test_batch_frames_with_stub_network() {
    let mut maps = PoseMaps::zeros(HEIGHT, WIDTH);
    full_person(&mut maps, 10);

    let dir = tempfile::tempdir().unwrap();
    let mut runner = BatchRunner::new(
        PaintedNetwork { maps },
        engine(),
        BatchOptions::new(dir.path()),
    );

    let frames = (0..3).map(|i| {
        let meta = SourceMeta {
            frame_idx: i,
            total_frames: Some(3),
            ..SourceMeta::default()
        };
        Ok((RgbImage::new(WIDTH as u32, HEIGHT as u32), meta))
    });

    let mut sink: Vec<RgbImage> = Vec::new();
    let records = runner.run_frames("clip", frames, &mut sink).unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(sink.len(), 3);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.video_name, "clip");
        assert_eq!(record.frame_index, i);
        assert!(record.error.is_none());
        assert_eq!(record.skeletons.len(), 1);
    }
    assert_eq!(sink[0].dimensions(), (WIDTH as u32, HEIGHT as u32));

    let mut other_sink: Vec<RgbImage> = Vec::new();
    other_sink.write_frame(&sink[0]).unwrap();
    assert_eq!(other_sink.len(), 1);
}
