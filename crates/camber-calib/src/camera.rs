//! Pinhole camera model and plumb-bob lens distortion.

use crate::error::CalibError;
use serde::{Deserialize, Serialize};

/// Represents the intrinsic parameters of a pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in x direction
    pub fx: f64,
    /// Focal length in y direction
    pub fy: f64,
    /// Principal point x coordinate
    pub cx: f64,
    /// Principal point y coordinate
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create camera intrinsics from focal lengths and principal point.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Create camera intrinsics from a 3x3 intrinsics matrix.
    ///
    /// The matrix must have the zero-skew pinhole form
    /// `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]` with non-zero focal lengths,
    /// so that it stays invertible.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Result<Self, CalibError> {
        if k[0][1] != 0.0 || k[1][0] != 0.0 || k[2][0] != 0.0 || k[2][1] != 0.0 || k[2][2] != 1.0 {
            return Err(CalibError::InvalidIntrinsics(
                "intrinsics matrix must have form [[fx, 0, cx], [0, fy, cy], [0, 0, 1]]"
                    .to_string(),
            ));
        }
        if k[0][0] == 0.0 || k[1][1] == 0.0 {
            return Err(CalibError::InvalidIntrinsics(
                "focal lengths must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
        })
    }

    /// Convert to a 3x3 intrinsics matrix.
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Project a normalized image-plane coordinate to pixels.
    #[inline]
    pub fn denormalize(&self, x: f64, y: f64) -> (f64, f64) {
        (self.fx * x + self.cx, self.fy * y + self.cy)
    }

    /// Convert a pixel coordinate to the normalized image plane.
    #[inline]
    pub fn normalize(&self, u: f64, v: f64) -> (f64, f64) {
        ((u - self.cx) / self.fx, (v - self.cy) / self.fy)
    }
}

/// Represents the 5-element plumb-bob distortion model.
///
/// Coefficients follow the usual `[k1, k2, p1, p2, k3]` order: three radial
/// terms and two tangential terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlumbBobDistortion {
    /// First radial distortion coefficient
    pub k1: f64,
    /// Second radial distortion coefficient
    pub k2: f64,
    /// First tangential distortion coefficient
    pub p1: f64,
    /// Second tangential distortion coefficient
    pub p2: f64,
    /// Third radial distortion coefficient
    pub k3: f64,
}

impl PlumbBobDistortion {
    /// Create distortion parameters with all coefficients set to zero (no distortion).
    pub fn none() -> Self {
        Self {
            k1: 0.0,
            k2: 0.0,
            p1: 0.0,
            p2: 0.0,
            k3: 0.0,
        }
    }

    /// Create distortion parameters from a `[k1, k2, p1, p2, k3]` vector.
    pub fn from_vec(d: [f64; 5]) -> Self {
        Self {
            k1: d[0],
            k2: d[1],
            p1: d[2],
            p2: d[3],
            k3: d[4],
        }
    }

    /// Return the coefficients as a `[k1, k2, p1, p2, k3]` vector.
    pub fn to_vec(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// Check if there is any distortion.
    pub fn has_distortion(&self) -> bool {
        self.k1 != 0.0 || self.k2 != 0.0 || self.p1 != 0.0 || self.p2 != 0.0 || self.k3 != 0.0
    }

    /// Apply the distortion model to a normalized image-plane coordinate.
    #[inline]
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let kr = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let xd = x * kr + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * kr + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (xd, yd)
    }

    /// Invert the distortion model for a normalized image-plane coordinate.
    ///
    /// Uses the fixed-point iteration dividing out the radial factor and
    /// subtracting the tangential terms, which converges quickly for
    /// moderate distortion.
    pub fn undistort(&self, xd: f64, yd: f64) -> (f64, f64) {
        let mut x = xd;
        let mut y = yd;
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let kr = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            x = (xd - dx) / kr;
            y = (yd - dy) / kr;
        }
        (x, y)
    }
}

const UNDISTORT_ITERATIONS: usize = 8;

/// Distort a pixel coordinate through the full camera model.
///
/// The pixel is normalized with the intrinsics, pushed through the
/// distortion model and projected back to pixels.
pub fn distort_pixel(
    u: f64,
    v: f64,
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
) -> (f64, f64) {
    let (x, y) = intrinsics.normalize(u, v);
    let (xd, yd) = distortion.distort(x, y);
    intrinsics.denormalize(xd, yd)
}

/// Undistort a pixel coordinate, returning a pixel coordinate.
pub fn undistort_pixel(
    u: f64,
    v: f64,
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
) -> (f64, f64) {
    let (xd, yd) = intrinsics.normalize(u, v);
    let (x, y) = distortion.undistort(xd, yd);
    intrinsics.denormalize(x, y)
}

/// Undistort a batch of pixel coordinates, returning pixel coordinates.
pub fn undistort_pixels(
    points: &[[f64; 2]],
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
) -> Vec<[f64; 2]> {
    points
        .iter()
        .map(|&[u, v]| {
            let (x, y) = undistort_pixel(u, v, intrinsics, distortion);
            [x, y]
        })
        .collect()
}

/// Undistort a batch of pixel coordinates into normalized image-plane rays.
///
/// Each output is the `(x, y)` of a unit-depth ray `(x, y, 1)` in the camera
/// frame.
pub fn undistort_pixels_normalized(
    points: &[[f64; 2]],
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
) -> Vec<[f64; 2]> {
    points
        .iter()
        .map(|&[u, v]| {
            let (xd, yd) = intrinsics.normalize(u, v);
            let (x, y) = distortion.undistort(xd, yd);
            [x, y]
        })
        .collect()
}
