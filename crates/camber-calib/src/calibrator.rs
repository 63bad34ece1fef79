//! The calibratable camera: one capability set, one pinhole implementation.

use crate::camera::{undistort_pixels, CameraIntrinsics, PlumbBobDistortion};
use crate::detector::TargetDetector;
use crate::error::CalibError;
use crate::intrinsics::{calibrate_camera, IntrinsicCalibration};
use crate::params;
use crate::pnp::{solve_pnp, ExtrinsicCalibration};
use crate::pose::{axis_angle_to_rotation_matrix, PoseTransform};
use crate::undistort::{optimal_new_intrinsics, undistort_image};
use camber_image::ops::rgb_to_gray;
use camber_image::ImageSize;
use camber_io::functional::{read_image_any_rgb8, write_image_any_rgb8};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for a detection-driven intrinsic calibration run.
#[derive(Debug, Clone)]
pub struct IntrinsicOptions {
    /// Delete image files in which the target was not detected.
    pub remove_invalid: bool,
    /// Write annotated detection overlays into this directory.
    pub annotated_dir: Option<PathBuf>,
}

impl Default for IntrinsicOptions {
    fn default() -> Self {
        Self {
            remove_invalid: true,
            annotated_dir: None,
        }
    }
}

/// The capability set of a calibratable camera model.
///
/// Intrinsic calibrate/apply/validate plus extrinsic calibrate/apply/validate
/// over one stored parameter set.
pub trait CameraCalibration {
    /// Calibrate intrinsics from target images on disk.
    ///
    /// Returns `Ok(None)` when no image yields a detection.
    fn calibrate_intrinsic(
        &mut self,
        images: &[PathBuf],
        options: &IntrinsicOptions,
    ) -> Result<Option<IntrinsicCalibration>, CalibError>;

    /// Undistort images with the stored intrinsics and write them to `out_dir`.
    fn apply_intrinsic(
        &self,
        images: &[PathBuf],
        out_dir: &Path,
        balance: f64,
    ) -> Result<Vec<PathBuf>, CalibError>;

    /// Reprojection RMS of a correspondence set under the stored intrinsics.
    ///
    /// Returns `Ok(None)` when the per-view pose cannot be recovered.
    fn validate_intrinsic(
        &self,
        image_points: &[[f64; 2]],
        object_points: &[[f64; 3]],
    ) -> Result<Option<f64>, CalibError>;

    /// Solve the camera pose from a correspondence set.
    ///
    /// Returns `Ok(None)` when the solver does not converge.
    fn calibrate_extrinsic(
        &mut self,
        image_points: &[[f64; 2]],
        object_points: &[[f64; 3]],
    ) -> Result<Option<ExtrinsicCalibration>, CalibError>;

    /// Transform world points into the camera frame with the stored pose.
    fn apply_extrinsic(&self, points: &[[f64; 3]]) -> Result<Vec<[f64; 3]>, CalibError>;

    /// Reprojection RMS of a correspondence set under the stored pose.
    fn validate_extrinsic(
        &self,
        image_points: &[[f64; 2]],
        object_points: &[[f64; 3]],
    ) -> Result<f64, CalibError>;
}

/// A pinhole camera with plumb-bob distortion and a pluggable target detector.
///
/// The calibrator holds the most recently computed parameters; the intrinsic
/// and extrinsic stages read and write them through the setters so a mapper
/// can consume them afterwards.
#[derive(Default)]
pub struct PinholeCalibrator {
    detector: Option<Box<dyn TargetDetector>>,
    intrinsics: Option<CameraIntrinsics>,
    distortion: Option<PlumbBobDistortion>,
    extrinsic: Option<PoseTransform>,
}

impl PinholeCalibrator {
    /// Create a calibrator with no detector and no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calibrator around a target detector.
    pub fn with_detector(detector: Box<dyn TargetDetector>) -> Self {
        Self {
            detector: Some(detector),
            ..Self::default()
        }
    }

    /// Set the intrinsic camera matrix.
    pub fn set_intrinsics(&mut self, intrinsics: CameraIntrinsics) {
        self.intrinsics = Some(intrinsics);
    }

    /// Set the distortion coefficients.
    pub fn set_distortion(&mut self, distortion: PlumbBobDistortion) {
        self.distortion = Some(distortion);
    }

    /// Set the extrinsic pose (world→camera).
    pub fn set_extrinsic(&mut self, pose: PoseTransform) {
        self.extrinsic = Some(pose);
    }

    /// The stored intrinsics, if any.
    pub fn intrinsics(&self) -> Option<&CameraIntrinsics> {
        self.intrinsics.as_ref()
    }

    /// The stored distortion coefficients, if any.
    pub fn distortion(&self) -> Option<&PlumbBobDistortion> {
        self.distortion.as_ref()
    }

    /// The stored extrinsic pose (world→camera), if any.
    pub fn extrinsic(&self) -> Option<&PoseTransform> {
        self.extrinsic.as_ref()
    }

    /// Persist the stored intrinsics and distortion to a parameter file.
    pub fn save_params(&self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        let intrinsics = self.intrinsics.as_ref().ok_or(CalibError::MissingIntrinsics)?;
        let distortion = self.distortion.unwrap_or_else(PlumbBobDistortion::none);
        params::save_params(path, intrinsics, &distortion)
    }

    /// Load intrinsics and distortion from a parameter file into the calibrator.
    pub fn load_params(&mut self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        let (intrinsics, distortion) = params::load_params(path)?;
        self.intrinsics = Some(intrinsics);
        self.distortion = Some(distortion);
        Ok(())
    }

    fn stored_model(&self) -> Result<(&CameraIntrinsics, PlumbBobDistortion), CalibError> {
        let intrinsics = self.intrinsics.as_ref().ok_or(CalibError::MissingIntrinsics)?;
        let distortion = self.distortion.unwrap_or_else(PlumbBobDistortion::none);
        Ok((intrinsics, distortion))
    }
}

impl CameraCalibration for PinholeCalibrator {
    fn calibrate_intrinsic(
        &mut self,
        images: &[PathBuf],
        options: &IntrinsicOptions,
    ) -> Result<Option<IntrinsicCalibration>, CalibError> {
        let detector = self.detector.as_ref().ok_or(CalibError::MissingDetector)?;

        if let Some(dir) = &options.annotated_dir {
            fs::create_dir_all(dir)?;
        }

        let mut object_points: Vec<Vec<[f64; 3]>> = Vec::new();
        let mut image_points: Vec<Vec<[f64; 2]>> = Vec::new();
        let mut invalid: Vec<&PathBuf> = Vec::new();
        let mut image_size: Option<ImageSize> = None;

        for path in images {
            let rgb = match read_image_any_rgb8(path) {
                Ok(img) => img,
                Err(e) => {
                    log::warn!("skipping {}: {}", path.display(), e);
                    invalid.push(path);
                    continue;
                }
            };

            match image_size {
                None => image_size = Some(rgb.size()),
                Some(size) if size != rgb.size() => {
                    log::warn!(
                        "skipping {}: size {} does not match {}",
                        path.display(),
                        rgb.size(),
                        size
                    );
                    invalid.push(path);
                    continue;
                }
                Some(_) => {}
            }

            let gray = rgb_to_gray(&rgb)?;
            let Some(detection) = detector.detect(&gray) else {
                log::warn!("no target detected in {}", path.display());
                invalid.push(path);
                continue;
            };

            if let Some(dir) = &options.annotated_dir {
                if let Some(name) = path.file_name() {
                    write_image_any_rgb8(dir.join(name), &detection.annotated)?;
                }
            }

            object_points.push(detection.object_points);
            image_points.push(detection.corners);
        }

        log::info!(
            "target detected in {}/{} images",
            image_points.len(),
            images.len()
        );

        if options.remove_invalid {
            for path in &invalid {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("could not remove {}: {}", path.display(), e);
                }
            }
        }

        let Some(size) = image_size else {
            return Ok(None);
        };
        if image_points.is_empty() {
            return Ok(None);
        }

        let calibration = calibrate_camera(&object_points, &image_points, size)?;
        self.intrinsics = Some(calibration.intrinsics);
        self.distortion = Some(calibration.distortion);
        Ok(Some(calibration))
    }

    fn apply_intrinsic(
        &self,
        images: &[PathBuf],
        out_dir: &Path,
        balance: f64,
    ) -> Result<Vec<PathBuf>, CalibError> {
        let (intrinsics, distortion) = self.stored_model()?;
        fs::create_dir_all(out_dir)?;

        let mut written = Vec::new();
        for path in images {
            let rgb = match read_image_any_rgb8(path) {
                Ok(img) => img,
                Err(e) => {
                    log::warn!("skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let new_intrinsics =
                optimal_new_intrinsics(intrinsics, &distortion, rgb.size(), balance);
            let undistorted = undistort_image(&rgb, intrinsics, &distortion, &new_intrinsics)?;

            let Some(name) = path.file_name() else {
                continue;
            };
            let out_path = out_dir.join(name);
            write_image_any_rgb8(&out_path, &undistorted)?;
            written.push(out_path);
        }
        Ok(written)
    }

    fn validate_intrinsic(
        &self,
        image_points: &[[f64; 2]],
        object_points: &[[f64; 3]],
    ) -> Result<Option<f64>, CalibError> {
        let (intrinsics, distortion) = self.stored_model()?;
        let undistorted = undistort_pixels(image_points, intrinsics, &distortion);
        Ok(solve_pnp(object_points, &undistorted, intrinsics)?.map(|solution| solution.rms))
    }

    fn calibrate_extrinsic(
        &mut self,
        image_points: &[[f64; 2]],
        object_points: &[[f64; 3]],
    ) -> Result<Option<ExtrinsicCalibration>, CalibError> {
        let (intrinsics, distortion) = self.stored_model()?;

        // undistort first; the solver then runs distortion-free
        let undistorted = undistort_pixels(image_points, intrinsics, &distortion);
        let Some(solution) = solve_pnp(object_points, &undistorted, intrinsics)? else {
            return Ok(None);
        };

        self.extrinsic = Some(PoseTransform::from_rvec(&solution.rvec, solution.tvec));
        Ok(Some(solution))
    }

    fn apply_extrinsic(&self, points: &[[f64; 3]]) -> Result<Vec<[f64; 3]>, CalibError> {
        let pose = self.extrinsic.as_ref().ok_or(CalibError::MissingExtrinsics)?;
        Ok(points.iter().map(|p| pose.transform_point(p)).collect())
    }

    fn validate_extrinsic(
        &self,
        image_points: &[[f64; 2]],
        object_points: &[[f64; 3]],
    ) -> Result<f64, CalibError> {
        let n = object_points.len();
        if n != image_points.len() {
            return Err(CalibError::MismatchedArrayLengths {
                left_name: "image points",
                left_len: image_points.len(),
                right_name: "object points",
                right_len: n,
            });
        }
        let (intrinsics, distortion) = self.stored_model()?;
        let pose = self.extrinsic.as_ref().ok_or(CalibError::MissingExtrinsics)?;

        let undistorted = undistort_pixels(image_points, intrinsics, &distortion);
        let rotation = axis_angle_to_rotation_matrix(&pose.rvec());
        let none = PlumbBobDistortion::none();

        let mut sum_sq = 0.0;
        for (p, uv) in object_points.iter().zip(undistorted.iter()) {
            let (u, v) = crate::intrinsics::project_point(
                p,
                &rotation,
                &pose.translation,
                intrinsics,
                &none,
            );
            sum_sq += (u - uv[0]).powi(2) + (v - uv[1]).powi(2);
        }
        Ok((sum_sq / n as f64).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn extrinsic_calibration_against_surveyed_markers() -> Result<(), CalibError> {
        let mut calibrator = PinholeCalibrator::new();
        calibrator.set_intrinsics(CameraIntrinsics::new(
            571.0,
            571.0,
            329.866_882_32,
            239.082_824_71,
        ));
        calibrator.set_distortion(PlumbBobDistortion::none());

        let image_points = [
            [270.0, 290.0],
            [507.0, 295.0],
            [607.0, 465.0],
            [224.0, 456.0],
        ];
        let object_points = [
            [2.50, 0.288, -0.07],
            [2.50, -0.612, -0.07],
            [1.60, -0.612, -0.07],
            [1.60, 0.288, -0.07],
        ];

        let solution = calibrator
            .calibrate_extrinsic(&image_points, &object_points)?
            .expect("pose should converge");

        assert_relative_eq!(solution.rvec[0], 1.490_206_44, epsilon = 1e-3);
        assert_relative_eq!(solution.rvec[1], -1.443_848_33, epsilon = 1e-3);
        assert_relative_eq!(solution.rvec[2], 1.007_002_35, epsilon = 1e-3);
        assert_relative_eq!(solution.tvec[0], -0.005_662_46, epsilon = 1e-3);
        assert_relative_eq!(solution.tvec[1], 1.016_583_13, epsilon = 1e-3);
        assert_relative_eq!(solution.tvec[2], -0.173_841_56, epsilon = 1e-3);

        // stored pose feeds the other capabilities
        let rms = calibrator.validate_extrinsic(&image_points, &object_points)?;
        assert_relative_eq!(rms, solution.rms, epsilon = 1e-9);
        assert_eq!(calibrator.apply_extrinsic(&object_points)?.len(), 4);
        Ok(())
    }

    #[test]
    fn missing_parameters_are_reported() {
        let mut calibrator = PinholeCalibrator::new();
        assert!(matches!(
            calibrator.calibrate_extrinsic(&[[0.0, 0.0]], &[[0.0, 0.0, 0.0]]),
            Err(CalibError::MissingIntrinsics)
        ));
        assert!(matches!(
            calibrator.apply_extrinsic(&[[0.0, 0.0, 0.0]]),
            Err(CalibError::MissingExtrinsics)
        ));
        assert!(matches!(
            calibrator.calibrate_intrinsic(&[], &IntrinsicOptions::default()),
            Err(CalibError::MissingDetector)
        ));
    }
}
