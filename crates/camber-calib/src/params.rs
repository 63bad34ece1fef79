//! Calibration parameter persistence.
//!
//! Parameters are stored as a JSON document with two named matrix entries,
//! `"camera_matrix"` (3x3) and `"dist_coeffs"` (the 5-element plumb-bob
//! vector).

use crate::camera::{CameraIntrinsics, PlumbBobDistortion};
use crate::error::CalibError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// On-disk calibration parameter document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// 3x3 camera matrix.
    pub camera_matrix: [[f64; 3]; 3],
    /// Plumb-bob distortion coefficients `[k1, k2, p1, p2, k3]`.
    pub dist_coeffs: [f64; 5],
}

/// Persist intrinsics and distortion to a parameter file.
pub fn save_params(
    path: impl AsRef<Path>,
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
) -> Result<(), CalibError> {
    let params = CalibrationParams {
        camera_matrix: intrinsics.to_matrix(),
        dist_coeffs: distortion.to_vec(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &params)?;
    Ok(())
}

/// Load intrinsics and distortion from a parameter file.
pub fn load_params(
    path: impl AsRef<Path>,
) -> Result<(CameraIntrinsics, PlumbBobDistortion), CalibError> {
    let file = File::open(path)?;
    let params: CalibrationParams = serde_json::from_reader(BufReader::new(file))?;
    let intrinsics = CameraIntrinsics::from_matrix(&params.camera_matrix)?;
    let distortion = PlumbBobDistortion::from_vec(params.dist_coeffs);
    Ok((intrinsics, distortion))
}
