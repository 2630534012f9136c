// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton rendering onto frames.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point;

use crate::results::{Candidate, FramePoseResult};
use crate::visualizer::Color;
use crate::visualizer::skeleton::{
    CANVAS_WEIGHT, JOINT_RADIUS, OVERLAY_WEIGHT, STICK_WIDTH, drawn_limbs, ellipse_polygon,
};

/// Draw every candidate and every retained skeleton's limbs onto a copy of `image`.
///
/// Candidates are filled circles in their joint type's color, including ones
/// that ended up in no skeleton. Limbs are filled ellipses blended into the
/// canvas one at a time, so overlapping limbs mix.
#[must_use]
pub fn draw_pose(image: &RgbImage, result: &FramePoseResult) -> RgbImage {
    let mut canvas = image.clone();

    for c in &result.candidates {
        let color = Color::from_joint(c.joint).to_rgb();
        draw_filled_circle_mut(&mut canvas, (c.x as i32, c.y as i32), JOINT_RADIUS, color);
    }

    for (limb_index, limb) in drawn_limbs().iter().enumerate() {
        let color = Color::from_index(limb_index).to_rgb();
        for skeleton in &result.skeletons {
            let (Some(a), Some(b)) = (skeleton.get(limb.joint_a), skeleton.get(limb.joint_b)) else {
                continue;
            };
            if let (Some(a), Some(b)) = (result.candidate(a), result.candidate(b)) {
                draw_limb(&mut canvas, a, b, color);
            }
        }
    }
    canvas
}

/// Blend one limb ellipse between two candidates into the canvas.
fn draw_limb(canvas: &mut RgbImage, a: &Candidate, b: &Candidate, color: Rgb<u8>) {
    let (dx, dy) = (f64::from(a.x - b.x), f64::from(a.y - b.y));
    let length = dx.hypot(dy);
    let angle = dy.atan2(dx).to_degrees();
    let center = (
        (f64::from(a.x + b.x) / 2.0) as i32,
        (f64::from(a.y + b.y) / 2.0) as i32,
    );

    let polygon = ellipse_polygon(center, (length / 2.0) as i32, STICK_WIDTH, angle as i32);
    if polygon.len() < 3 {
        return;
    }

    let (width, height) = canvas.dimensions();
    let clamp_x = |x: i32| x.clamp(0, width as i32 - 1);
    let clamp_y = |y: i32| y.clamp(0, height as i32 - 1);
    let (min_x, max_x) = polygon
        .iter()
        .fold((i32::MAX, i32::MIN), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    let (min_y, max_y) = polygon
        .iter()
        .fold((i32::MAX, i32::MIN), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    if width == 0 || height == 0 || max_x < 0 || max_y < 0 {
        return;
    }
    let (x0, x1, y0, y1) = (clamp_x(min_x), clamp_x(max_x), clamp_y(min_y), clamp_y(max_y));
    if x0 > x1 || y0 > y1 {
        return;
    }

    let shifted: Vec<Point<i32>> = polygon
        .iter()
        .map(|&(x, y)| Point::new(x - x0, y - y0))
        .collect();
    let mut mask = GrayImage::new((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
    draw_polygon_mut(&mut mask, &shifted, Luma([255]));

    for (mx, my, m) in mask.enumerate_pixels() {
        if m[0] == 0 {
            continue;
        }
        let pixel = canvas.get_pixel_mut(mx + x0 as u32, my + y0 as u32);
        for (channel, &overlay) in pixel.0.iter_mut().zip(color.0.iter()) {
            *channel = blend(*channel, overlay);
        }
    }
}

/// `CANVAS_WEIGHT * base + OVERLAY_WEIGHT * overlay`, rounded and saturated.
fn blend(base: u8, overlay: u8) -> u8 {
    let value = CANVAS_WEIGHT * f32::from(base) + OVERLAY_WEIGHT * f32::from(overlay);
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Skeleton;
    use crate::topology::JointType;

    fn candidate(joint: JointType, x: f32, y: f32, id: usize) -> Candidate {
        Candidate {
            joint,
            x,
            y,
            score: 0.9,
            id,
        }
    }

    fn two_joint_result(a: JointType, b: JointType) -> FramePoseResult {
        let candidates = vec![candidate(a, 10.0, 30.0, 0), candidate(b, 50.0, 30.0, 1)];
        let mut skeleton = Skeleton::empty();
        skeleton.slots[a.index()] = Some(0);
        skeleton.slots[b.index()] = Some(1);
        skeleton.part_count = 2;
        skeleton.total_score = 2.0;
        FramePoseResult {
            candidates,
            skeletons: vec![skeleton],
        }
    }

    #[test]
    fn test_blend() {
        assert_eq!(blend(0, 255), 153);
        assert_eq!(blend(100, 100), 100);
        assert_eq!(blend(255, 255), 255);
    }

    #[test]
    fn test_empty_result_leaves_image() {
        let image = RgbImage::from_pixel(20, 20, Rgb([7, 8, 9]));
        assert_eq!(draw_pose(&image, &FramePoseResult::default()), image);
    }

    #[test]
    fn test_candidates_drawn_as_circles() {
        let image = RgbImage::new(64, 64);
        let result = FramePoseResult {
            candidates: vec![candidate(JointType::Nose, 20.0, 20.0, 0)],
            skeletons: Vec::new(),
        };
        let out = draw_pose(&image, &result);
        assert_eq!(out.get_pixel(20, 20), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(23, 20), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(30, 20), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_limb_blended_between_joints() {
        let image = RgbImage::new(64, 64);
        let result = two_joint_result(JointType::Neck, JointType::RightShoulder);
        let out = draw_pose(&image, &result);
        // Limb 0 is red, blended at 60% over black.
        assert_eq!(out.get_pixel(30, 30), &Rgb([153, 0, 0]));
        assert_eq!(out.get_pixel(30, 32), &Rgb([153, 0, 0]));
        // Well outside the stick width.
        assert_eq!(out.get_pixel(30, 40), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_ear_limbs_not_drawn() {
        let image = RgbImage::new(64, 64);
        let result = two_joint_result(JointType::RightShoulder, JointType::RightEar);
        let out = draw_pose(&image, &result);
        assert_eq!(out.get_pixel(30, 30), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_limb_off_canvas_is_clipped() {
        let image = RgbImage::new(16, 16);
        let mut result = two_joint_result(JointType::Neck, JointType::RightShoulder);
        result.candidates[1].x = -40.0;
        result.candidates[0].x = 4.0;
        let out = draw_pose(&image, &result);
        assert_eq!(out.dimensions(), (16, 16));
    }
}
