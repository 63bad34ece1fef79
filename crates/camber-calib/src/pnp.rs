//! Perspective-n-Point pose estimation for undistorted observations.
//!
//! The solver assumes the pixel observations were undistorted beforehand, so
//! no distortion model enters the cost function. Initialization is linear
//! (planar homography decomposition, or a DLT on normalized rays for
//! non-coplanar points) and the pose is polished with Levenberg–Marquardt.

use crate::camera::{CameraIntrinsics, PlumbBobDistortion};
use crate::error::CalibError;
use crate::homography::dlt_homography;
use crate::intrinsics::project_point;
use crate::lm::{minimize, LmParams};
use crate::pose::{axis_angle_to_rotation_matrix, rotation_matrix_to_axis_angle};
use nalgebra::{DMatrix, Matrix3, Vector3};

/// Result returned by the PnP solver.
///
/// The rotation maps coordinates from the **world** frame to the **camera**
/// frame.
#[derive(Debug, Clone)]
pub struct ExtrinsicCalibration {
    /// Root-mean-square pixel reprojection error.
    pub rms: f64,
    /// Rodrigues rotation vector (world→camera).
    pub rvec: [f64; 3],
    /// Translation vector (world→camera).
    pub tvec: [f64; 3],
}

/// Relative threshold on the smallest covariance singular value under which
/// the object points are treated as coplanar.
const PLANARITY_EPS: f64 = 1e-6;

/// Solve for the camera pose from 2D-3D correspondences.
///
/// # Arguments
/// * `object_points` – 3-D coordinates in the world frame.
/// * `image_points` – Corresponding pixel coordinates, already undistorted.
/// * `intrinsics` – Camera intrinsics.
///
/// # Returns
/// `Ok(None)` when the iterative refinement does not converge; otherwise the
/// pose with its RMS reprojection error.
pub fn solve_pnp(
    object_points: &[[f64; 3]],
    image_points: &[[f64; 2]],
    intrinsics: &CameraIntrinsics,
) -> Result<Option<ExtrinsicCalibration>, CalibError> {
    let n = object_points.len();
    if n != image_points.len() {
        return Err(CalibError::MismatchedArrayLengths {
            left_name: "object points",
            left_len: n,
            right_name: "image points",
            right_len: image_points.len(),
        });
    }
    if n < 4 {
        return Err(CalibError::InsufficientCorrespondences {
            required: 4,
            actual: n,
        });
    }

    let (rvec0, tvec0) = if let Some(plane) = fit_plane(object_points) {
        init_planar(object_points, image_points, intrinsics, &plane)?
    } else {
        if n < 6 {
            return Err(CalibError::InsufficientCorrespondences {
                required: 6,
                actual: n,
            });
        }
        init_dlt(object_points, image_points, intrinsics)?
    };

    // iterative pose refinement on (rvec, tvec)
    let no_distortion = PlumbBobDistortion::none();
    let result = minimize(
        nalgebra::DVector::from_vec(vec![
            rvec0[0], rvec0[1], rvec0[2], tvec0[0], tvec0[1], tvec0[2],
        ]),
        2 * n,
        |x, out| {
            let rvec = [x[0], x[1], x[2]];
            let tvec = [x[3], x[4], x[5]];
            let rotation = axis_angle_to_rotation_matrix(&rvec);
            for (i, (p, uv)) in object_points.iter().zip(image_points.iter()).enumerate() {
                let (u, v) = project_point(p, &rotation, &tvec, intrinsics, &no_distortion);
                out[2 * i] = u - uv[0];
                out[2 * i + 1] = v - uv[1];
            }
        },
        &LmParams {
            max_iters: 50,
            ..LmParams::default()
        },
    );

    if !result.converged {
        log::warn!("PnP refinement did not converge after {} iterations", result.iterations);
        return Ok(None);
    }

    Ok(Some(ExtrinsicCalibration {
        rms: (result.sum_sq / n as f64).sqrt(),
        rvec: [result.x[0], result.x[1], result.x[2]],
        tvec: [result.x[3], result.x[4], result.x[5]],
    }))
}

/// An orthonormal in-plane frame for a coplanar point set.
struct PlaneFrame {
    centroid: Vector3<f64>,
    e1: Vector3<f64>,
    e2: Vector3<f64>,
}

/// Fit a plane through the points; `None` when they span three dimensions.
fn fit_plane(points: &[[f64; 3]]) -> Option<PlaneFrame> {
    let n = points.len() as f64;
    let mut centroid = Vector3::zeros();
    for p in points {
        centroid += Vector3::new(p[0], p[1], p[2]);
    }
    centroid /= n;

    let mut cov = Matrix3::<f64>::zeros();
    for p in points {
        let d = Vector3::new(p[0], p[1], p[2]) - centroid;
        cov += d * d.transpose();
    }
    cov /= n;

    let svd = cov.svd(true, false);
    let u = svd.u?;
    let s = svd.singular_values;

    if s[0] <= 0.0 || s[2] / s[0] > PLANARITY_EPS {
        return None;
    }

    Some(PlaneFrame {
        centroid,
        e1: u.column(0).into_owned(),
        e2: u.column(1).into_owned(),
    })
}

/// Pose initialization for coplanar points via homography decomposition.
fn init_planar(
    object_points: &[[f64; 3]],
    image_points: &[[f64; 2]],
    intrinsics: &CameraIntrinsics,
    plane: &PlaneFrame,
) -> Result<([f64; 3], [f64; 3]), CalibError> {
    // in-plane 2D coordinates of every object point
    let board: Vec<[f64; 2]> = object_points
        .iter()
        .map(|p| {
            let d = Vector3::new(p[0], p[1], p[2]) - plane.centroid;
            [plane.e1.dot(&d), plane.e2.dot(&d)]
        })
        .collect();

    let h = dlt_homography(&board, image_points)?;
    let (rvec_plane, t_plane) = crate::intrinsics::pose_from_homography(intrinsics, &h)?;
    let r_plane = axis_angle_to_rotation_matrix(&rvec_plane);

    // compose the plane frame back in: X_cam = R_p · Bᵀ (X - c) + t_p
    let e3 = plane.e1.cross(&plane.e2);
    let b = Matrix3::from_columns(&[plane.e1, plane.e2, e3]);
    let r_p = Matrix3::from_fn(|r, c| r_plane[r][c]);
    let r_wc = r_p * b.transpose();
    let t_wc = Vector3::new(t_plane[0], t_plane[1], t_plane[2]) - r_wc * plane.centroid;

    let mut rotation = [[0.0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            rotation[r][c] = r_wc[(r, c)];
        }
    }
    Ok((
        rotation_matrix_to_axis_angle(&rotation),
        [t_wc.x, t_wc.y, t_wc.z],
    ))
}

/// Pose initialization for non-coplanar points: DLT on normalized rays.
fn init_dlt(
    object_points: &[[f64; 3]],
    image_points: &[[f64; 2]],
    intrinsics: &CameraIntrinsics,
) -> Result<([f64; 3], [f64; 3]), CalibError> {
    let n = object_points.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 12);

    for (i, (p, uv)) in object_points.iter().zip(image_points.iter()).enumerate() {
        let (x, y) = intrinsics.normalize(uv[0], uv[1]);
        let row_x = 2 * i;
        let row_y = row_x + 1;
        // (r1·p + t1) - x (r3·p + t3) = 0 and the y analogue
        for c in 0..3 {
            a[(row_x, c)] = p[c];
            a[(row_x, 8 + c)] = -x * p[c];
            a[(row_y, 4 + c)] = p[c];
            a[(row_y, 8 + c)] = -y * p[c];
        }
        a[(row_x, 3)] = 1.0;
        a[(row_x, 11)] = -x;
        a[(row_y, 7)] = 1.0;
        a[(row_y, 11)] = -y;
    }

    let svd = a.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibError::SvdFailed("V^T unavailable in DLT pose init".to_string()))?;
    let sol = v_t.row(v_t.nrows() - 1);

    let mut r_raw = Matrix3::new(
        sol[0], sol[1], sol[2], sol[4], sol[5], sol[6], sol[8], sol[9], sol[10],
    );
    let mut t_raw = Vector3::new(sol[3], sol[7], sol[11]);

    // fix the projective scale so the rotation rows are unit length
    let scale = (r_raw.row(2).norm() * r_raw.row(0).norm() * r_raw.row(1).norm()).cbrt();
    if scale < f64::EPSILON {
        return Err(CalibError::SvdFailed(
            "degenerate DLT pose solution".to_string(),
        ));
    }
    r_raw /= scale;
    t_raw /= scale;

    // fix the sign so that points sit in front of the camera
    let centroid: Vector3<f64> = object_points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + Vector3::new(p[0], p[1], p[2]))
        / n as f64;
    if (r_raw * centroid + t_raw).z < 0.0 {
        r_raw = -r_raw;
        t_raw = -t_raw;
    }

    // project onto SO(3)
    let svd_r = r_raw.svd(true, true);
    let u = svd_r
        .u
        .ok_or_else(|| CalibError::SvdFailed("U unavailable in DLT pose init".to_string()))?;
    let v_t_r = svd_r
        .v_t
        .ok_or_else(|| CalibError::SvdFailed("V^T unavailable in DLT pose init".to_string()))?;
    let mut r_orth = u * v_t_r;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t_r;
    }

    let mut rotation = [[0.0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            rotation[r][c] = r_orth[(r, c)];
        }
    }
    Ok((
        rotation_matrix_to_axis_angle(&rotation),
        [t_raw.x, t_raw.y, t_raw.z],
    ))
}
