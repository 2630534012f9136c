// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image and map resizing around the pose network.
//!
//! The network sees the frame at several scales, each padded right and down to
//! a multiple of its stride. Its outputs come back at `1/stride` resolution and
//! are brought to the original frame size by [`restore_maps`].

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use fast_image_resize::images::{Image, ImageRef};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{Rgb, RgbImage};
use ndarray::{Array2, Array3, Array4, ArrayView3, Axis, s};

use crate::config::PoseConfig;
use crate::error::{PoseError, Result};

/// Scaled and padded network input for one scale.
#[derive(Debug, Clone)]
pub struct ScaledInput {
    /// Input tensor, NHWC `f32` in `[0, 255]`.
    pub tensor: Array4<f32>,
    /// Size of the scaled image before padding `(height, width)`.
    pub scaled_shape: (u32, u32),
    /// Padding added `(down, right)`.
    pub padding: (u32, u32),
}

impl ScaledInput {
    /// Padded input size `(height, width)`.
    #[must_use]
    pub const fn padded_shape(&self) -> (u32, u32) {
        (
            self.scaled_shape.0 + self.padding.0,
            self.scaled_shape.1 + self.padding.1,
        )
    }
}

fn bicubic() -> ResizeOptions {
    ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::CatmullRom))
}

/// Image multipliers for each search scale: `scale * box_size / height`.
#[must_use]
pub fn scale_multipliers(image_height: u32, config: &PoseConfig) -> Vec<f32> {
    let height = image_height.max(1) as f32;
    config
        .scale_search
        .iter()
        .map(|&s| s * config.box_size as f32 / height)
        .collect()
}

/// Resize an RGB image with bicubic interpolation.
///
/// # Errors
///
/// Returns [`PoseError::ImageError`] if the target size is empty or the
/// resizer rejects the buffers.
pub fn resize_rgb(image: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
    if (image.width(), image.height()) == (width, height) {
        return Ok(image.clone());
    }
    let src = ImageRef::new(image.width(), image.height(), image.as_raw(), PixelType::U8x3)
        .map_err(|e| PoseError::ImageError(format!("Invalid source image: {e}")))?;
    let mut dst = Image::new(width, height, PixelType::U8x3);
    Resizer::new()
        .resize(&src, &mut dst, &bicubic())
        .map_err(|e| PoseError::ImageError(format!("Failed to resize image: {e}")))?;
    RgbImage::from_raw(width, height, dst.into_vec())
        .ok_or_else(|| PoseError::ImageError("Resized buffer has the wrong size".to_string()))
}

/// Pad an image right and down with `pad_value` so both sides are multiples of `stride`.
///
/// # Returns
///
/// * The padded image and the padding `(down, right)`.
#[must_use]
pub fn pad_right_down(image: &RgbImage, stride: u32, pad_value: u8) -> (RgbImage, (u32, u32)) {
    let remainder = |len: u32| {
        if stride == 0 || len % stride == 0 {
            0
        } else {
            stride - len % stride
        }
    };
    let (width, height) = image.dimensions();
    let padding = (remainder(height), remainder(width));
    if padding == (0, 0) {
        return (image.clone(), padding);
    }

    let mut padded =
        RgbImage::from_pixel(width + padding.1, height + padding.0, Rgb([pad_value; 3]));
    image::imageops::replace(&mut padded, image, 0, 0);
    (padded, padding)
}

/// Convert an RGB image to an NHWC `f32` tensor without normalization.
#[must_use]
pub fn image_to_tensor(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    Array4::from_shape_fn((1, height as usize, width as usize, 3), |(_, y, x, c)| {
        f32::from(image.get_pixel(x as u32, y as u32)[c])
    })
}

/// Build the network input for one multiplier.
///
/// # Errors
///
/// Returns an error if resizing fails.
pub fn prepare_scale(image: &RgbImage, multiplier: f32, config: &PoseConfig) -> Result<ScaledInput> {
    let width = ((image.width() as f32 * multiplier).round() as u32).max(1);
    let height = ((image.height() as f32 * multiplier).round() as u32).max(1);
    let scaled = resize_rgb(image, width, height)?;
    let (padded, padding) = pad_right_down(&scaled, config.stride, config.pad_value);

    Ok(ScaledInput {
        tensor: image_to_tensor(&padded),
        scaled_shape: (height, width),
        padding,
    })
}

/// Resize every channel of an `(H, W, C)` volume to `(height, width)`.
///
/// # Errors
///
/// Returns [`PoseError::ImageError`] if a channel cannot be resized.
pub fn resize_channels(volume: ArrayView3<'_, f32>, width: u32, height: u32) -> Result<Array3<f32>> {
    let (src_h, src_w, channels) = volume.dim();
    if (src_h, src_w) == (height as usize, width as usize) {
        return Ok(volume.to_owned());
    }

    let mut out = Array3::zeros((height as usize, width as usize, channels));
    let mut resizer = Resizer::new();
    let options = bicubic();

    for (c, channel) in volume.axis_iter(Axis(2)).enumerate() {
        let data: Vec<f32> = channel.iter().copied().collect();
        let src = ImageRef::new(
            src_w as u32,
            src_h as u32,
            bytemuck::cast_slice(&data),
            PixelType::F32,
        )
        .map_err(|e| PoseError::ImageError(format!("Invalid map channel {c}: {e}")))?;
        let mut dst = Image::new(width, height, PixelType::F32);
        resizer
            .resize(&src, &mut dst, &options)
            .map_err(|e| PoseError::ImageError(format!("Failed to resize map channel {c}: {e}")))?;

        // The byte buffer is not guaranteed to be f32-aligned.
        let values: Vec<f32> = bytemuck::pod_collect_to_vec(dst.buffer());
        let plane = Array2::from_shape_vec((height as usize, width as usize), values)?;
        out.index_axis_mut(Axis(2), c).assign(&plane);
    }
    Ok(out)
}

/// Bring a network output volume back to the original frame size.
///
/// Upsamples by `stride`, crops the padding away, then resizes to
/// `(orig_height, orig_width)`.
///
/// # Errors
///
/// Returns an error if resizing fails.
pub fn restore_maps(
    output: ArrayView3<'_, f32>,
    input: &ScaledInput,
    stride: u32,
    orig_shape: (u32, u32),
) -> Result<Array3<f32>> {
    let (out_h, out_w, _) = output.dim();
    let upsampled = resize_channels(output, out_w as u32 * stride, out_h as u32 * stride)?;

    let (padded_h, padded_w) = input.padded_shape();
    let keep_h = (padded_h - input.padding.0).min(upsampled.dim().0 as u32) as usize;
    let keep_w = (padded_w - input.padding.1).min(upsampled.dim().1 as u32) as usize;
    let cropped = upsampled.slice(s![..keep_h, ..keep_w, ..]);

    resize_channels(cropped, orig_shape.1, orig_shape.0)
}
