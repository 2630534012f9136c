// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Separable Gaussian smoothing for heatmap channels.
//!
//! The kernel is truncated at four standard deviations and borders are handled by
//! half-sample symmetric reflection (`d c b a | a b c d`), so that peak positions
//! match the reference smoothing the body model was tuned with.

use ndarray::{Array2, ArrayView2, Axis};

/// Kernel extent in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Build a normalized 1D Gaussian kernel of radius `round(4σ)`.
#[must_use]
pub fn gaussian_kernel(sigma: f32) -> Vec<f64> {
    let sigma = f64::from(sigma);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let denom = -0.5 / (sigma * sigma);

    #[allow(clippy::cast_precision_loss)]
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (denom * (x * x) as f64).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Map an out-of-range index back into `0..len` by half-sample reflection.
fn reflect(index: i64, len: i64) -> usize {
    let period = 2 * len;
    let m = index.rem_euclid(period);
    let folded = if m >= len { period - 1 - m } else { m };
    usize::try_from(folded).unwrap_or_default()
}

/// Correlate every lane along `axis` with `kernel`.
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
fn correlate_axis(input: &Array2<f64>, kernel: &[f64], axis: Axis) -> Array2<f64> {
    let radius = (kernel.len() / 2) as i64;
    let mut output = Array2::<f64>::zeros(input.raw_dim());

    for (lane_in, mut lane_out) in input.lanes(axis).into_iter().zip(output.lanes_mut(axis)) {
        let len = lane_in.len() as i64;
        for i in 0..len {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let src = reflect(i + k as i64 - radius, len);
                acc += w * lane_in[src];
            }
            lane_out[i as usize] = acc;
        }
    }
    output
}

/// Smooth a single channel with a Gaussian of standard deviation `sigma`.
///
/// # Arguments
///
/// * `channel` - `(H, W)` map to smooth.
/// * `sigma` - Standard deviation in pixels. Values `<= 0` return an unmodified copy.
///
/// # Returns
///
/// * A new `(H, W)` array holding the smoothed values.
#[must_use]
pub fn gaussian_filter(channel: ArrayView2<'_, f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 || channel.is_empty() {
        return channel.to_owned();
    }

    let kernel = gaussian_kernel(sigma);
    let data = channel.mapv(f64::from);
    let rows = correlate_axis(&data, &kernel, Axis(0));
    let smoothed = correlate_axis(&rows, &kernel, Axis(1));

    #[allow(clippy::cast_possible_truncation)]
    smoothed.mapv(|v| v as f32)
}
