//! Plane-to-image homography estimation via the normalized DLT.

use crate::error::CalibError;
use nalgebra::{DMatrix, Matrix3};

/// Estimate `H` such that `x' ~ H x` using the direct linear transform.
///
/// Both point sets are Hartley-normalized (centroid at the origin, mean
/// distance √2) before building the design matrix, which keeps the SVD well
/// conditioned for pixel-scale inputs. The result is scaled so that
/// `H[2][2] = 1`.
pub fn dlt_homography(
    world: &[[f64; 2]],
    image: &[[f64; 2]],
) -> Result<[[f64; 3]; 3], CalibError> {
    let n = world.len();
    if image.len() != n {
        return Err(CalibError::MismatchedArrayLengths {
            left_name: "world points",
            left_len: n,
            right_name: "image points",
            right_len: image.len(),
        });
    }
    if n < 4 {
        return Err(CalibError::InsufficientCorrespondences {
            required: 4,
            actual: n,
        });
    }

    let (world_n, t_world) = normalize_points(world);
    let (image_n, t_image) = normalize_points(image);

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for (i, (pw, pi)) in world_n.iter().zip(image_n.iter()).enumerate() {
        let x = pw[0];
        let y = pw[1];
        let u = pi[0];
        let v = pi[1];

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    // Solve A h = 0 via SVD (singular vector of the smallest singular value)
    let svd = a.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibError::SvdFailed("V^T unavailable in DLT".to_string()))?;
    let h = v_t.row(v_t.nrows() - 1);

    let mut h_norm = Matrix3::<f64>::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h_norm[(r, c)] = h[3 * r + c];
        }
    }

    // undo the normalization: H = T_image^-1 * Hn * T_world
    let t_image_inv = t_image
        .try_inverse()
        .ok_or_else(|| CalibError::SvdFailed("normalization not invertible".to_string()))?;
    let mut h_mat = t_image_inv * h_norm * t_world;

    let scale = h_mat[(2, 2)];
    if scale.abs() > f64::EPSILON {
        h_mat /= scale;
    }

    let mut out = [[0.0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            out[r][c] = h_mat[(r, c)];
        }
    }
    Ok(out)
}

/// Apply a homography to a 2D point.
pub fn apply_homography(h: &[[f64; 3]; 3], p: &[f64; 2]) -> [f64; 2] {
    let w = h[2][0] * p[0] + h[2][1] * p[1] + h[2][2];
    [
        (h[0][0] * p[0] + h[0][1] * p[1] + h[0][2]) / w,
        (h[1][0] * p[0] + h[1][1] * p[1] + h[1][2]) / w,
    ]
}

fn normalize_points(points: &[[f64; 2]]) -> (Vec<[f64; 2]>, Matrix3<f64>) {
    let n = points.len() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for p in points {
        mx += p[0];
        my += p[1];
    }
    mx /= n;
    my /= n;

    let mut mean_dist = 0.0;
    for p in points {
        mean_dist += ((p[0] - mx).powi(2) + (p[1] - my).powi(2)).sqrt();
    }
    mean_dist /= n;

    let scale = if mean_dist > f64::EPSILON {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let normalized = points
        .iter()
        .map(|p| [(p[0] - mx) * scale, (p[1] - my) * scale])
        .collect();

    let t = Matrix3::new(scale, 0.0, -scale * mx, 0.0, scale, -scale * my, 0.0, 0.0, 1.0);
    (normalized, t)
}
