//! Whole-image undistortion through a correction map and bilinear remap.

use crate::camera::{CameraIntrinsics, PlumbBobDistortion};
use crate::error::CalibError;
use camber_image::{Image, ImageSize};

/// Compute a new intrinsics matrix balancing retained field of view against
/// black borders after undistortion.
///
/// `balance = 0` crops to the largest all-valid region, `balance = 1` keeps
/// every source pixel visible (introducing black borders); values in between
/// interpolate. With zero distortion the input intrinsics come back
/// unchanged.
pub fn optimal_new_intrinsics(
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
    size: ImageSize,
    balance: f64,
) -> CameraIntrinsics {
    let balance = balance.clamp(0.0, 1.0);
    let w = (size.width - 1) as f64;
    let h = (size.height - 1) as f64;

    // undistorted normalized coordinates of the image border
    const SAMPLES: usize = 9;
    let mut top = Vec::with_capacity(SAMPLES);
    let mut bottom = Vec::with_capacity(SAMPLES);
    let mut left = Vec::with_capacity(SAMPLES);
    let mut right = Vec::with_capacity(SAMPLES);
    for i in 0..SAMPLES {
        let s = i as f64 / (SAMPLES - 1) as f64;
        top.push(undistort_normalized(s * w, 0.0, intrinsics, distortion));
        bottom.push(undistort_normalized(s * w, h, intrinsics, distortion));
        left.push(undistort_normalized(0.0, s * h, intrinsics, distortion));
        right.push(undistort_normalized(w, s * h, intrinsics, distortion));
    }
    let all: Vec<(f64, f64)> = top
        .iter()
        .chain(bottom.iter())
        .chain(left.iter())
        .chain(right.iter())
        .cloned()
        .collect();

    // outer rectangle: every source pixel stays visible
    let outer_x0 = all.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let outer_x1 = all.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let outer_y0 = all.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let outer_y1 = all.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    // inner rectangle: no invalid pixels remain
    let inner_x0 = left.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let inner_x1 = right.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let inner_y0 = top.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let inner_y1 = bottom.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);

    let fit = |x0: f64, x1: f64, y0: f64, y1: f64| -> CameraIntrinsics {
        let fx = w / (x1 - x0);
        let fy = h / (y1 - y0);
        CameraIntrinsics::new(fx, fy, -x0 * fx, -y0 * fy)
    };

    let k_inner = fit(inner_x0, inner_x1, inner_y0, inner_y1);
    let k_outer = fit(outer_x0, outer_x1, outer_y0, outer_y1);

    CameraIntrinsics::new(
        (1.0 - balance) * k_inner.fx + balance * k_outer.fx,
        (1.0 - balance) * k_inner.fy + balance * k_outer.fy,
        (1.0 - balance) * k_inner.cx + balance * k_outer.cx,
        (1.0 - balance) * k_inner.cy + balance * k_outer.cy,
    )
}

fn undistort_normalized(
    u: f64,
    v: f64,
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
) -> (f64, f64) {
    let (xd, yd) = intrinsics.normalize(u, v);
    distortion.undistort(xd, yd)
}

/// Generate the sampling map that undistorts an image.
///
/// For every destination pixel the map holds the source position to sample:
/// the pixel is normalized with `new_intrinsics`, pushed through the
/// distortion model and projected back with the original intrinsics.
///
/// # Returns
///
/// Row-major `(map_x, map_y)` source coordinates.
pub fn generate_correction_map(
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
    new_intrinsics: &CameraIntrinsics,
    size: ImageSize,
) -> (Vec<f32>, Vec<f32>) {
    let mut map_x = Vec::with_capacity(size.width * size.height);
    let mut map_y = Vec::with_capacity(size.width * size.height);
    for v in 0..size.height {
        for u in 0..size.width {
            let (x, y) = new_intrinsics.normalize(u as f64, v as f64);
            let (xd, yd) = distortion.distort(x, y);
            let (us, vs) = intrinsics.denormalize(xd, yd);
            map_x.push(us as f32);
            map_y.push(vs as f32);
        }
    }
    (map_x, map_y)
}

/// Resample an RGB image through a sampling map with bilinear interpolation.
///
/// Samples falling outside the source image produce black pixels.
pub fn remap_bilinear(
    src: &Image<u8, 3>,
    map_x: &[f32],
    map_y: &[f32],
    size: ImageSize,
) -> Result<Image<u8, 3>, CalibError> {
    let (src_w, src_h) = (src.width(), src.height());
    let data = src.as_slice();
    let mut out = Vec::with_capacity(size.width * size.height * 3);

    for (xs, ys) in map_x.iter().zip(map_y.iter()) {
        let (xs, ys) = (*xs as f64, *ys as f64);
        if xs < 0.0 || ys < 0.0 || xs > (src_w - 1) as f64 || ys > (src_h - 1) as f64 {
            out.extend_from_slice(&[0, 0, 0]);
            continue;
        }
        let x0 = xs.floor() as usize;
        let y0 = ys.floor() as usize;
        let x1 = (x0 + 1).min(src_w - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let ax = xs - x0 as f64;
        let ay = ys - y0 as f64;

        for c in 0..3 {
            let p00 = data[(y0 * src_w + x0) * 3 + c] as f64;
            let p01 = data[(y0 * src_w + x1) * 3 + c] as f64;
            let p10 = data[(y1 * src_w + x0) * 3 + c] as f64;
            let p11 = data[(y1 * src_w + x1) * 3 + c] as f64;
            let value = p00 * (1.0 - ax) * (1.0 - ay)
                + p01 * ax * (1.0 - ay)
                + p10 * (1.0 - ax) * ay
                + p11 * ax * ay;
            out.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }

    Ok(Image::new(size, out)?)
}

/// Undistort an RGB image with the camera model, resampling into the new
/// intrinsics frame.
pub fn undistort_image(
    src: &Image<u8, 3>,
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
    new_intrinsics: &CameraIntrinsics,
) -> Result<Image<u8, 3>, CalibError> {
    let (map_x, map_y) = generate_correction_map(intrinsics, distortion, new_intrinsics, src.size());
    remap_bilinear(src, &map_x, &map_y, src.size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SIZE: ImageSize = ImageSize {
        width: 64,
        height: 48,
    };

    #[test]
    fn zero_distortion_keeps_intrinsics() {
        let intrinsics = CameraIntrinsics::new(60.0, 60.0, 32.0, 24.0);
        let new_k = optimal_new_intrinsics(&intrinsics, &PlumbBobDistortion::none(), SIZE, 0.5);
        assert_relative_eq!(new_k.fx, intrinsics.fx, epsilon = 1e-9);
        assert_relative_eq!(new_k.fy, intrinsics.fy, epsilon = 1e-9);
        assert_relative_eq!(new_k.cx, intrinsics.cx, epsilon = 1e-9);
        assert_relative_eq!(new_k.cy, intrinsics.cy, epsilon = 1e-9);
    }

    #[test]
    fn identity_map_reproduces_image() -> Result<(), CalibError> {
        let intrinsics = CameraIntrinsics::new(60.0, 60.0, 32.0, 24.0);
        let distortion = PlumbBobDistortion::none();

        let mut data = Vec::with_capacity(SIZE.width * SIZE.height * 3);
        for i in 0..SIZE.width * SIZE.height {
            data.extend_from_slice(&[(i % 251) as u8, (i % 17) as u8, (i % 83) as u8]);
        }
        let src = Image::new(SIZE, data)?;

        let out = undistort_image(&src, &intrinsics, &distortion, &intrinsics)?;
        assert_eq!(out.as_slice(), src.as_slice());
        Ok(())
    }

    #[test]
    fn barrel_distortion_moves_border_samples_inward() {
        let intrinsics = CameraIntrinsics::new(60.0, 60.0, 32.0, 24.0);
        let distortion = PlumbBobDistortion::from_vec([-0.2, 0.0, 0.0, 0.0, 0.0]);
        let (map_x, map_y) = generate_correction_map(&intrinsics, &distortion, &intrinsics, SIZE);

        // the principal point is a fixed point of the model
        let center_idx = 24 * SIZE.width + 32;
        assert_relative_eq!(map_x[center_idx] as f64, 32.0, epsilon = 1e-4);
        assert_relative_eq!(map_y[center_idx] as f64, 24.0, epsilon = 1e-4);

        // barrel distortion samples towards the center at the border
        assert!(map_x[24 * SIZE.width] > 0.0);
    }
}
