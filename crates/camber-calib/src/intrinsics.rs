//! Intrinsic camera calibration from planar-target views.
//!
//! The pipeline follows the classic recipe: per-view DLT homographies,
//! Zhang's closed-form intrinsics initialization, homography-decomposition
//! pose initialization, then a full-bundle Levenberg–Marquardt refinement of
//! intrinsics, plumb-bob distortion and all per-view poses against the pixel
//! reprojection error.

use crate::camera::{CameraIntrinsics, PlumbBobDistortion};
use crate::error::CalibError;
use crate::homography::dlt_homography;
use crate::lm::{minimize, LmParams};
use crate::pose::{axis_angle_to_rotation_matrix, rotation_matrix_to_axis_angle};
use camber_image::ImageSize;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

/// Result of an intrinsic calibration run.
#[derive(Debug, Clone)]
pub struct IntrinsicCalibration {
    /// Root-mean-square pixel reprojection error over all views.
    pub rms: f64,
    /// Estimated camera intrinsics.
    pub intrinsics: CameraIntrinsics,
    /// Estimated plumb-bob distortion coefficients.
    pub distortion: PlumbBobDistortion,
    /// Per-view Rodrigues rotation vectors (target→camera).
    pub rvecs: Vec<[f64; 3]>,
    /// Per-view translation vectors (target→camera).
    pub tvecs: Vec<[f64; 3]>,
}

/// Minimum number of target views for the closed-form initialization.
pub const MIN_VIEWS: usize = 3;

/// Calibrate a pinhole camera from planar-target correspondences.
///
/// # Arguments
/// * `object_points` – Per view, the target points on the board plane
///   (`z = 0` for the linear initialization to hold).
/// * `image_points` – Per view, the observed pixel coordinates, same order.
/// * `image_size` – Size of the images the observations came from; used to
///   sanity-check the estimated principal point.
///
/// # Returns
/// The refined intrinsics, distortion, per-view extrinsics and the final RMS
/// reprojection error.
pub fn calibrate_camera(
    object_points: &[Vec<[f64; 3]>],
    image_points: &[Vec<[f64; 2]>],
    image_size: ImageSize,
) -> Result<IntrinsicCalibration, CalibError> {
    let num_views = object_points.len();
    if image_points.len() != num_views {
        return Err(CalibError::MismatchedArrayLengths {
            left_name: "object point views",
            left_len: num_views,
            right_name: "image point views",
            right_len: image_points.len(),
        });
    }
    if num_views < MIN_VIEWS {
        return Err(CalibError::InsufficientViews {
            required: MIN_VIEWS,
            actual: num_views,
        });
    }

    // per-view plane-to-image homographies
    let mut homographies = Vec::with_capacity(num_views);
    for (obj, img) in object_points.iter().zip(image_points.iter()) {
        if obj.len() != img.len() {
            return Err(CalibError::MismatchedArrayLengths {
                left_name: "object points",
                left_len: obj.len(),
                right_name: "image points",
                right_len: img.len(),
            });
        }
        let board_xy: Vec<[f64; 2]> = obj.iter().map(|p| [p[0], p[1]]).collect();
        homographies.push(dlt_homography(&board_xy, img)?);
    }

    let intrinsics0 = zhang_intrinsics(&homographies)?;
    if intrinsics0.cx < 0.0
        || intrinsics0.cx >= image_size.width as f64
        || intrinsics0.cy < 0.0
        || intrinsics0.cy >= image_size.height as f64
    {
        return Err(CalibError::InvalidIntrinsics(format!(
            "estimated principal point ({:.1}, {:.1}) outside the {} image",
            intrinsics0.cx, intrinsics0.cy, image_size
        )));
    }

    // per-view pose initialization from the homographies
    let mut poses0 = Vec::with_capacity(num_views);
    for h in &homographies {
        poses0.push(pose_from_homography(&intrinsics0, h)?);
    }

    // bundle parameter layout: [fx, fy, cx, cy, k1, k2, p1, p2, k3, (rvec, tvec) x views]
    let mut x0 = Vec::with_capacity(9 + 6 * num_views);
    x0.extend_from_slice(&[
        intrinsics0.fx,
        intrinsics0.fy,
        intrinsics0.cx,
        intrinsics0.cy,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
    ]);
    for (rvec, tvec) in &poses0 {
        x0.extend_from_slice(rvec);
        x0.extend_from_slice(tvec);
    }

    let total_points: usize = object_points.iter().map(|v| v.len()).sum();
    let result = minimize(
        DVector::from_vec(x0),
        2 * total_points,
        |x, out| {
            let intrinsics = CameraIntrinsics::new(x[0], x[1], x[2], x[3]);
            let distortion = PlumbBobDistortion::from_vec([x[4], x[5], x[6], x[7], x[8]]);
            let mut row = 0;
            for (view, (obj, img)) in object_points.iter().zip(image_points.iter()).enumerate() {
                let base = 9 + 6 * view;
                let rvec = [x[base], x[base + 1], x[base + 2]];
                let tvec = [x[base + 3], x[base + 4], x[base + 5]];
                let rotation = axis_angle_to_rotation_matrix(&rvec);
                for (p, uv) in obj.iter().zip(img.iter()) {
                    let (u, v) = project_point(p, &rotation, &tvec, &intrinsics, &distortion);
                    out[row] = u - uv[0];
                    out[row + 1] = v - uv[1];
                    row += 2;
                }
            }
        },
        &LmParams {
            max_iters: 120,
            ..LmParams::default()
        },
    );

    let x = &result.x;
    let intrinsics = CameraIntrinsics::new(x[0], x[1], x[2], x[3]);
    let distortion = PlumbBobDistortion::from_vec([x[4], x[5], x[6], x[7], x[8]]);
    let mut rvecs = Vec::with_capacity(num_views);
    let mut tvecs = Vec::with_capacity(num_views);
    for view in 0..num_views {
        let base = 9 + 6 * view;
        rvecs.push([x[base], x[base + 1], x[base + 2]]);
        tvecs.push([x[base + 3], x[base + 4], x[base + 5]]);
    }

    Ok(IntrinsicCalibration {
        rms: (result.sum_sq / total_points as f64).sqrt(),
        intrinsics,
        distortion,
        rvecs,
        tvecs,
    })
}

/// Project a target point through a pose and the full camera model.
pub(crate) fn project_point(
    p: &[f64; 3],
    rotation: &[[f64; 3]; 3],
    tvec: &[f64; 3],
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
) -> (f64, f64) {
    let xc = rotation[0][0] * p[0] + rotation[0][1] * p[1] + rotation[0][2] * p[2] + tvec[0];
    let yc = rotation[1][0] * p[0] + rotation[1][1] * p[1] + rotation[1][2] * p[2] + tvec[1];
    let zc = rotation[2][0] * p[0] + rotation[2][1] * p[1] + rotation[2][2] * p[2] + tvec[2];
    let (xd, yd) = distortion.distort(xc / zc, yc / zc);
    intrinsics.denormalize(xd, yd)
}

/// Build the 6-vector v_ij(H) of Zhang's method.
fn v_ij(h: &[[f64; 3]; 3], i: usize, j: usize) -> [f64; 6] {
    // columns of H
    let hi = [h[0][i], h[1][i], h[2][i]];
    let hj = [h[0][j], h[1][j], h[2][j]];
    [
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ]
}

/// Estimate intrinsics from plane homographies using Zhang's closed form.
///
/// The skew term the closed form produces is discarded; the camera model is
/// zero-skew throughout.
fn zhang_intrinsics(homographies: &[[[f64; 3]; 3]]) -> Result<CameraIntrinsics, CalibError> {
    let m = homographies.len();
    let mut vmtx = DMatrix::<f64>::zeros(2 * m, 6);

    for (k, h) in homographies.iter().enumerate() {
        let v11 = v_ij(h, 0, 0);
        let v22 = v_ij(h, 1, 1);
        let v12 = v_ij(h, 0, 1);
        for c in 0..6 {
            vmtx[(2 * k, c)] = v12[c];
            vmtx[(2 * k + 1, c)] = v11[c] - v22[c];
        }
    }

    // V b = 0: singular vector of the smallest singular value
    let svd = vmtx.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibError::SvdFailed("V^T unavailable in Zhang init".to_string()))?;
    let b_row = v_t.row(v_t.nrows() - 1);

    // B is defined up to sign; force B11 > 0
    let sign = if b_row[0] < 0.0 { -1.0 } else { 1.0 };
    let b11 = sign * b_row[0];
    let b12 = sign * b_row[1];
    let b22 = sign * b_row[2];
    let b13 = sign * b_row[3];
    let b23 = sign * b_row[4];
    let b33 = sign * b_row[5];

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    if denom_norm <= 0.0 || denom.abs() / denom_norm < 1e-9 {
        return Err(CalibError::InvalidIntrinsics(
            "degenerate view configuration in intrinsics initialization".to_string(),
        ));
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    if lambda / b11 <= 0.0 {
        return Err(CalibError::InvalidIntrinsics(
            "inconsistent sign in intrinsics initialization; check the homographies".to_string(),
        ));
    }

    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    Ok(CameraIntrinsics::new(alpha, beta, u0, v0))
}

/// Decompose a plane-to-image homography into a target→camera pose.
///
/// Classic decomposition for a target on its own `z = 0` plane, with the
/// rotation projected back onto SO(3) and the cheirality fixed so that the
/// target sits in front of the camera.
pub(crate) fn pose_from_homography(
    intrinsics: &CameraIntrinsics,
    h: &[[f64; 3]; 3],
) -> Result<([f64; 3], [f64; 3]), CalibError> {
    let k = Matrix3::new(
        intrinsics.fx,
        0.0,
        intrinsics.cx,
        0.0,
        intrinsics.fy,
        intrinsics.cy,
        0.0,
        0.0,
        1.0,
    );
    let k_inv = k
        .try_inverse()
        .ok_or_else(|| CalibError::InvalidIntrinsics("K is not invertible".to_string()))?;

    let h1 = Vector3::new(h[0][0], h[1][0], h[2][0]);
    let h2 = Vector3::new(h[0][1], h[1][1], h[2][1]);
    let h3 = Vector3::new(h[0][2], h[1][2], h[2][2]);

    let k_inv_h1 = k_inv * h1;
    let k_inv_h2 = k_inv * h2;

    let norm1 = k_inv_h1.norm();
    let norm2 = k_inv_h2.norm();
    if norm1 < f64::EPSILON || norm2 < f64::EPSILON {
        return Err(CalibError::SvdFailed(
            "degenerate homography in pose initialization".to_string(),
        ));
    }
    let mut lambda = 1.0 / ((norm1 + norm2) * 0.5);

    // cheirality: the target origin must project in front of the camera
    let t_probe = lambda * (k_inv * h3);
    if t_probe.z < 0.0 {
        lambda = -lambda;
    }

    let r1 = lambda * k_inv_h1;
    let r2 = lambda * k_inv_h2;
    let r3 = r1.cross(&r2);

    let mut r_mat = Matrix3::<f64>::zeros();
    r_mat.set_column(0, &r1);
    r_mat.set_column(1, &r2);
    r_mat.set_column(2, &r3);

    // project onto SO(3) (polar decomposition via SVD)
    let svd = r_mat.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| CalibError::SvdFailed("U unavailable in pose init".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibError::SvdFailed("V^T unavailable in pose init".to_string()))?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let t = lambda * (k_inv * h3);

    let mut rotation = [[0.0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            rotation[r][c] = r_orth[(r, c)];
        }
    }
    Ok((
        rotation_matrix_to_axis_angle(&rotation),
        [t.x, t.y, t.z],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn board_points(cols: usize, rows: usize, square: f64) -> Vec<[f64; 3]> {
        let mut points = Vec::with_capacity(cols * rows);
        for r in 0..rows {
            for c in 0..cols {
                points.push([c as f64 * square, r as f64 * square, 0.0]);
            }
        }
        points
    }

    fn render_view(
        obj: &[[f64; 3]],
        rvec: &[f64; 3],
        tvec: &[f64; 3],
        intrinsics: &CameraIntrinsics,
        distortion: &PlumbBobDistortion,
    ) -> Vec<[f64; 2]> {
        let rotation = axis_angle_to_rotation_matrix(rvec);
        obj.iter()
            .map(|p| {
                let (u, v) = project_point(p, &rotation, tvec, intrinsics, distortion);
                [u, v]
            })
            .collect()
    }

    fn synthetic_views(
        distortion: &PlumbBobDistortion,
    ) -> (
        CameraIntrinsics,
        Vec<Vec<[f64; 3]>>,
        Vec<Vec<[f64; 2]>>,
    ) {
        let intrinsics = CameraIntrinsics::new(534.16, 534.25, 341.71, 232.05);
        let obj = board_points(7, 6, 0.03);

        let poses: [([f64; 3], [f64; 3]); 6] = [
            ([0.10, 0.00, 0.05], [-0.09, -0.07, 0.60]),
            ([-0.05, 0.15, -0.10], [-0.12, -0.05, 0.75]),
            ([0.20, -0.10, 0.00], [-0.08, -0.10, 0.55]),
            ([-0.15, -0.12, 0.08], [-0.10, -0.06, 0.80]),
            ([0.05, 0.22, 0.12], [-0.14, -0.08, 0.65]),
            ([0.18, 0.08, -0.15], [-0.07, -0.09, 0.70]),
        ];

        let mut object_points = Vec::new();
        let mut image_points = Vec::new();
        for (rvec, tvec) in &poses {
            object_points.push(obj.clone());
            image_points.push(render_view(&obj, rvec, tvec, &intrinsics, distortion));
        }
        (intrinsics, object_points, image_points)
    }

    const IMAGE_SIZE: ImageSize = ImageSize {
        width: 640,
        height: 480,
    };

    #[test]
    fn recovers_intrinsics_without_distortion() -> Result<(), CalibError> {
        let (gt, object_points, image_points) = synthetic_views(&PlumbBobDistortion::none());
        let calib = calibrate_camera(&object_points, &image_points, IMAGE_SIZE)?;

        assert!(calib.rms < 1e-4, "rms too large: {}", calib.rms);
        assert_relative_eq!(calib.intrinsics.fx, gt.fx, epsilon = 1e-2);
        assert_relative_eq!(calib.intrinsics.fy, gt.fy, epsilon = 1e-2);
        assert_relative_eq!(calib.intrinsics.cx, gt.cx, epsilon = 1e-2);
        assert_relative_eq!(calib.intrinsics.cy, gt.cy, epsilon = 1e-2);
        for d in calib.distortion.to_vec() {
            assert!(d.abs() < 1e-4, "distortion should be near zero: {d}");
        }
        Ok(())
    }

    #[test]
    fn recovers_intrinsics_with_distortion() -> Result<(), CalibError> {
        let gt_distortion = PlumbBobDistortion::from_vec([-0.10, 0.05, 0.001, -0.001, 0.0]);
        let (gt, object_points, image_points) = synthetic_views(&gt_distortion);
        let calib = calibrate_camera(&object_points, &image_points, IMAGE_SIZE)?;

        assert!(calib.rms < 1e-3, "rms too large: {}", calib.rms);
        assert_relative_eq!(calib.intrinsics.fx, gt.fx, epsilon = 0.5);
        assert_relative_eq!(calib.intrinsics.fy, gt.fy, epsilon = 0.5);
        assert_relative_eq!(calib.intrinsics.cx, gt.cx, epsilon = 0.5);
        assert_relative_eq!(calib.intrinsics.cy, gt.cy, epsilon = 0.5);

        let d = calib.distortion.to_vec();
        let d_gt = gt_distortion.to_vec();
        for i in 0..5 {
            assert!(
                (d[i] - d_gt[i]).abs() < 1e-3,
                "coefficient {i}: {} vs {}",
                d[i],
                d_gt[i]
            );
        }

        // per-view poses come back too
        assert_eq!(calib.rvecs.len(), 6);
        assert_eq!(calib.tvecs.len(), 6);
        Ok(())
    }

    #[test]
    fn too_few_views_is_an_error() {
        let (_, object_points, image_points) = synthetic_views(&PlumbBobDistortion::none());
        let result = calibrate_camera(
            &object_points[..2].to_vec(),
            &image_points[..2].to_vec(),
            IMAGE_SIZE,
        );
        assert!(matches!(result, Err(CalibError::InsufficientViews { .. })));
    }
}
