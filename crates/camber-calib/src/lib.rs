#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Camber calibration
//!
//! Intrinsic and extrinsic calibration of pinhole cameras from planar
//! targets, in the shape the rest of the workspace consumes it:
//!
//! - **Detection**: [`ChessboardDetector`] finds the inner corners of a
//!   chessboard target and pairs them with board-frame reference points.
//! - **Intrinsics**: [`calibrate_camera`] solves for the camera matrix,
//!   plumb-bob distortion and per-view poses from several target views.
//! - **Extrinsics**: [`solve_pnp`] estimates the world→camera pose from a
//!   single correspondence set of undistorted observations.
//! - **Orchestration**: [`PinholeCalibrator`] runs the above over image
//!   files, stores the resulting parameters and persists them.
//!
//! ## Example: pose from surveyed markers
//!
//! ```rust
//! use camber_calib::{CameraCalibration, CameraIntrinsics, PinholeCalibrator, PlumbBobDistortion};
//!
//! let mut calibrator = PinholeCalibrator::new();
//! calibrator.set_intrinsics(CameraIntrinsics::new(571.0, 571.0, 329.87, 239.08));
//! calibrator.set_distortion(PlumbBobDistortion::none());
//!
//! let image_points = [[270.0, 290.0], [507.0, 295.0], [607.0, 465.0], [224.0, 456.0]];
//! let object_points = [
//!     [2.50, 0.288, -0.07],
//!     [2.50, -0.612, -0.07],
//!     [1.60, -0.612, -0.07],
//!     [1.60, 0.288, -0.07],
//! ];
//!
//! let pose = calibrator
//!     .calibrate_extrinsic(&image_points, &object_points)?
//!     .expect("solver should converge");
//! println!("rms = {:.3} px", pose.rms);
//! # Ok::<(), camber_calib::CalibError>(())
//! ```

/// Pinhole camera model and plumb-bob distortion.
pub mod camera;

/// The calibratable-camera capability set and its pinhole implementation.
pub mod calibrator;

/// Calibration target detection.
pub mod detector;

/// Error types for the calibration crate.
pub mod error;

/// Plane-to-image homography estimation.
pub mod homography;

/// Intrinsic calibration from planar-target views.
pub mod intrinsics;

/// Perspective-n-Point pose estimation.
pub mod pnp;

/// Rigid-transform helpers and pose inversion.
pub mod pose;

/// Calibration parameter persistence.
pub mod params;

/// Whole-image undistortion.
pub mod undistort;

mod lm;

pub use crate::camera::{
    distort_pixel, undistort_pixel, undistort_pixels, undistort_pixels_normalized,
    CameraIntrinsics, PlumbBobDistortion,
};
pub use crate::calibrator::{CameraCalibration, IntrinsicOptions, PinholeCalibrator};
pub use crate::detector::{ChessboardDetector, Detection, TargetDetector};
pub use crate::error::CalibError;
pub use crate::intrinsics::{calibrate_camera, IntrinsicCalibration};
pub use crate::params::{load_params, save_params, CalibrationParams};
pub use crate::pnp::{solve_pnp, ExtrinsicCalibration};
pub use crate::pose::{
    axis_angle_to_rotation_matrix, invert_pose_transform, rotation_matrix_to_axis_angle,
    PoseTransform,
};
pub use crate::undistort::{generate_correction_map, optimal_new_intrinsics, undistort_image};
