//! Rigid-transform helpers: Rodrigues conversions and pose inversion.

/// Compute the rotation matrix for a Rodrigues rotation vector.
///
/// The direction of `rvec` is the rotation axis and its magnitude the
/// rotation angle in radians. A zero vector yields the identity.
pub fn axis_angle_to_rotation_matrix(rvec: &[f64; 3]) -> [[f64; 3]; 3] {
    let angle = (rvec[0] * rvec[0] + rvec[1] * rvec[1] + rvec[2] * rvec[2]).sqrt();
    if angle < 1e-12 {
        return [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    }

    let x = rvec[0] / angle;
    let y = rvec[1] / angle;
    let z = rvec[2] / angle;

    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;

    let m00 = c + x * x * t;
    let m11 = c + y * y * t;
    let m22 = c + z * z * t;

    let tmp1 = x * y * t;
    let tmp2 = z * s;

    let m10 = tmp1 + tmp2;
    let m01 = tmp1 - tmp2;

    let tmp3 = x * z * t;
    let tmp4 = y * s;

    let m20 = tmp3 - tmp4;
    let m02 = tmp3 + tmp4;

    let tmp5 = y * z * t;
    let tmp6 = x * s;

    let m12 = tmp5 - tmp6;
    let m21 = tmp5 + tmp6;

    [[m00, m01, m02], [m10, m11, m12], [m20, m21, m22]]
}

/// Compute the Rodrigues rotation vector for a rotation matrix.
///
/// PRECONDITION: `r` is orthonormal with determinant +1.
pub fn rotation_matrix_to_axis_angle(r: &[[f64; 3]; 3]) -> [f64; 3] {
    let trace = r[0][0] + r[1][1] + r[2][2];
    let cos = ((trace - 1.0) * 0.5).clamp(-1.0, 1.0);
    let angle = cos.acos();

    if angle < 1e-12 {
        return [0.0, 0.0, 0.0];
    }

    let sin = angle.sin();
    if sin.abs() > 1e-7 {
        let scale = angle / (2.0 * sin);
        return [
            scale * (r[2][1] - r[1][2]),
            scale * (r[0][2] - r[2][0]),
            scale * (r[1][0] - r[0][1]),
        ];
    }

    // angle close to pi: recover the axis from the symmetric part
    let bx = (r[0][0] + 1.0) * 0.5;
    let by = (r[1][1] + 1.0) * 0.5;
    let bz = (r[2][2] + 1.0) * 0.5;
    let mut axis = if bx >= by && bx >= bz {
        let x = bx.max(0.0).sqrt();
        [x, r[0][1] / (2.0 * x), r[0][2] / (2.0 * x)]
    } else if by >= bz {
        let y = by.max(0.0).sqrt();
        [r[0][1] / (2.0 * y), y, r[1][2] / (2.0 * y)]
    } else {
        let z = bz.max(0.0).sqrt();
        [r[0][2] / (2.0 * z), r[1][2] / (2.0 * z), z]
    };
    let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    for a in &mut axis {
        *a *= angle / norm;
    }
    axis
}

/// Return the inverse rigid transform.
///
/// Swaps the camera-to-world and world-to-camera conventions:
/// `R' = Rᵀ` and `t' = -Rᵀ t`. Pure function, no side effects.
pub fn invert_pose_transform(
    r: &[[f64; 3]; 3],
    t: &[f64; 3],
) -> ([[f64; 3]; 3], [f64; 3]) {
    let r_inv = [
        [r[0][0], r[1][0], r[2][0]],
        [r[0][1], r[1][1], r[2][1]],
        [r[0][2], r[1][2], r[2][2]],
    ];
    let t_inv = [
        -(r_inv[0][0] * t[0] + r_inv[0][1] * t[1] + r_inv[0][2] * t[2]),
        -(r_inv[1][0] * t[0] + r_inv[1][1] * t[1] + r_inv[1][2] * t[2]),
        -(r_inv[2][0] * t[0] + r_inv[2][1] * t[1] + r_inv[2][2] * t[2]),
    ];
    (r_inv, t_inv)
}

/// A rigid transform between the world and camera frames.
///
/// The stored rotation and translation map points from the source frame to
/// the destination frame; which convention applies (world→camera or
/// camera→world) is up to the producer, and [`PoseTransform::invert`] swaps
/// between the two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseTransform {
    /// Rotation matrix.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl PoseTransform {
    /// Build a pose from a Rodrigues rotation vector and a translation.
    pub fn from_rvec(rvec: &[f64; 3], translation: [f64; 3]) -> Self {
        Self {
            rotation: axis_angle_to_rotation_matrix(rvec),
            translation,
        }
    }

    /// The Rodrigues rotation vector of the stored rotation.
    pub fn rvec(&self) -> [f64; 3] {
        rotation_matrix_to_axis_angle(&self.rotation)
    }

    /// The inverse transform (swaps frame conventions).
    pub fn invert(&self) -> Self {
        let (rotation, translation) = invert_pose_transform(&self.rotation, &self.translation);
        Self {
            rotation,
            translation,
        }
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, p: &[f64; 3]) -> [f64; 3] {
        let r = &self.rotation;
        [
            r[0][0] * p[0] + r[0][1] * p[1] + r[0][2] * p[2] + self.translation[0],
            r[1][0] * p[0] + r[1][1] * p[1] + r[1][2] * p[2] + self.translation[1],
            r[2][0] * p[0] + r[2][1] * p[1] + r[2][2] * p[2] + self.translation[2],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    #[test]
    fn quarter_turn_about_x() {
        let rvec = [std::f64::consts::FRAC_PI_2, 0.0, 0.0];
        let rotation = axis_angle_to_rotation_matrix(&rvec);
        let expected = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(rotation[i][j], expected[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn rodrigues_roundtrip() {
        let rvec = [1.490_206_44, -1.443_848_33, 1.007_002_35];
        let rotation = axis_angle_to_rotation_matrix(&rvec);
        let rvec_back = rotation_matrix_to_axis_angle(&rotation);
        for i in 0..3 {
            assert_relative_eq!(rvec_back[i], rvec[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn rodrigues_near_pi() {
        let rvec = [0.0, std::f64::consts::PI - 1e-9, 0.0];
        let rotation = axis_angle_to_rotation_matrix(&rvec);
        let rvec_back = rotation_matrix_to_axis_angle(&rotation);
        let angle =
            (rvec_back[0] * rvec_back[0] + rvec_back[1] * rvec_back[1] + rvec_back[2] * rvec_back[2])
                .sqrt();
        assert_relative_eq!(angle, std::f64::consts::PI, epsilon = 1e-6);
    }

    #[test]
    fn invert_twice_is_identity() {
        let rvec = [0.3, -0.8, 0.25];
        let pose = PoseTransform::from_rvec(&rvec, [0.5, -1.2, 2.0]);
        let back = pose.invert().invert();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(back.rotation[i][j], pose.rotation[i][j], epsilon = 1e-12);
            }
            assert_relative_eq!(back.translation[i], pose.translation[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn invert_twice_is_identity_for_random_poses() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let rvec = [
                (rng.random::<f64>() - 0.5) * 4.0,
                (rng.random::<f64>() - 0.5) * 4.0,
                (rng.random::<f64>() - 0.5) * 4.0,
            ];
            let t = [
                (rng.random::<f64>() - 0.5) * 10.0,
                (rng.random::<f64>() - 0.5) * 10.0,
                (rng.random::<f64>() - 0.5) * 10.0,
            ];
            let pose = PoseTransform::from_rvec(&rvec, t);
            let back = pose.invert().invert();
            for i in 0..3 {
                for j in 0..3 {
                    assert_relative_eq!(back.rotation[i][j], pose.rotation[i][j], epsilon = 1e-10);
                }
                assert_relative_eq!(back.translation[i], pose.translation[i], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn inverse_undoes_transform() {
        let pose = PoseTransform::from_rvec(&[0.1, 0.2, -0.3], [1.0, 2.0, 3.0]);
        let p = [0.4, -0.6, 1.5];
        let q = pose.invert().transform_point(&pose.transform_point(&p));
        for i in 0..3 {
            assert_relative_eq!(q[i], p[i], epsilon = 1e-12);
        }
    }
}
