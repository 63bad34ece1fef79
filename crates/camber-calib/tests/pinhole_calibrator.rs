//! End-to-end intrinsic calibration over rendered chessboard images.

use camber_calib::{
    CameraCalibration, CameraIntrinsics, ChessboardDetector, IntrinsicOptions, PinholeCalibrator,
};
use camber_image::ops::gray_to_rgb;
use camber_image::{Image, ImageSize};
use camber_io::functional::write_image_any_rgb8;
use nalgebra::Matrix3;
use std::path::PathBuf;

const COLS: usize = 6;
const ROWS: usize = 5;
const SQUARE: f64 = 0.03;
const WIDTH: usize = 640;
const HEIGHT: usize = 480;

fn intrinsics_gt() -> CameraIntrinsics {
    CameraIntrinsics::new(534.16, 534.25, 341.71, 232.05)
}

/// Plane-to-image homography `H = K [r1 r2 t]` for a board on `z = 0`.
fn board_homography(rvec: &[f64; 3], tvec: &[f64; 3]) -> Matrix3<f64> {
    let k_gt = intrinsics_gt();
    let r = camber_calib::axis_angle_to_rotation_matrix(rvec);
    let k = Matrix3::new(k_gt.fx, 0.0, k_gt.cx, 0.0, k_gt.fy, k_gt.cy, 0.0, 0.0, 1.0);
    let rt = Matrix3::new(
        r[0][0], r[0][1], tvec[0], r[1][0], r[1][1], tvec[1], r[2][0], r[2][1], tvec[2],
    );
    k * rt
}

/// Render the board seen through a pose by inverse-mapping every pixel onto
/// the board plane and sampling the checker pattern analytically.
fn render_board_view(rvec: &[f64; 3], tvec: &[f64; 3]) -> Image<u8, 1> {
    let h = board_homography(rvec, tvec);
    let h_inv = h.try_inverse().expect("homography must be invertible");

    let board_w = (COLS + 1) as f64 * SQUARE;
    let board_h = (ROWS + 1) as f64 * SQUARE;

    let mut image = Image::from_size_val(
        ImageSize {
            width: WIDTH,
            height: HEIGHT,
        },
        255u8,
    )
    .unwrap();
    let data = image.as_slice_mut();

    for v in 0..HEIGHT {
        for u in 0..WIDTH {
            let p = h_inv * nalgebra::Vector3::new(u as f64, v as f64, 1.0);
            if p.z.abs() < 1e-12 {
                continue;
            }
            let bx = p.x / p.z;
            let by = p.y / p.z;
            if bx < 0.0 || by < 0.0 || bx >= board_w || by >= board_h {
                continue;
            }
            let cell = (bx / SQUARE).floor() as i64 + (by / SQUARE).floor() as i64;
            if cell % 2 == 0 {
                data[v * WIDTH + u] = 0;
            }
        }
    }
    image
}

fn board_poses() -> Vec<([f64; 3], [f64; 3])> {
    vec![
        ([0.10, 0.00, 0.04], [-0.10, -0.09, 0.60]),
        ([-0.06, 0.16, -0.05], [-0.12, -0.08, 0.70]),
        ([0.18, -0.10, 0.00], [-0.09, -0.10, 0.58]),
        ([-0.14, -0.10, 0.06], [-0.11, -0.07, 0.72]),
        ([0.04, 0.20, 0.08], [-0.13, -0.09, 0.64]),
        ([0.16, 0.08, -0.07], [-0.08, -0.09, 0.66]),
    ]
}

fn write_dataset(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for (i, (rvec, tvec)) in board_poses().iter().enumerate() {
        let image = render_board_view(rvec, tvec);
        let path = dir.join(format!("intrinsic_{i:02}.png"));
        write_image_any_rgb8(&path, &gray_to_rgb(&image).unwrap()).expect("write board image");
        paths.push(path);
    }
    paths
}

fn write_blank(path: &std::path::Path) {
    let blank = Image::<u8, 1>::from_size_val(
        ImageSize {
            width: WIDTH,
            height: HEIGHT,
        },
        255,
    )
    .unwrap();
    write_image_any_rgb8(path, &gray_to_rgb(&blank).unwrap()).unwrap();
}

#[test]
fn calibrates_from_rendered_boards() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut paths = write_dataset(tmp_dir.path());

    // one blank frame that must be skipped without failing the batch
    let blank_path = tmp_dir.path().join("blank.png");
    write_blank(&blank_path);
    paths.push(blank_path.clone());

    let annotated_dir = tmp_dir.path().join("annotated");
    let mut calibrator = PinholeCalibrator::with_detector(Box::new(ChessboardDetector::new(
        (COLS, ROWS),
        SQUARE,
    )));
    let options = IntrinsicOptions {
        remove_invalid: false,
        annotated_dir: Some(annotated_dir.clone()),
    };

    let calibration = calibrator
        .calibrate_intrinsic(&paths, &options)
        .expect("calibration should run")
        .expect("boards should be detected");

    let gt = intrinsics_gt();
    assert!(calibration.rms < 1.0, "rms too large: {}", calibration.rms);
    assert!(
        (calibration.intrinsics.fx - gt.fx).abs() < 8.0,
        "fx off: {} vs {}",
        calibration.intrinsics.fx,
        gt.fx
    );
    assert!(
        (calibration.intrinsics.fy - gt.fy).abs() < 8.0,
        "fy off: {} vs {}",
        calibration.intrinsics.fy,
        gt.fy
    );
    assert!((calibration.intrinsics.cx - gt.cx).abs() < 8.0);
    assert!((calibration.intrinsics.cy - gt.cy).abs() < 8.0);
    assert_eq!(calibration.rvecs.len(), board_poses().len());

    // the blank frame was skipped, not deleted
    assert!(blank_path.exists());
    // annotated overlays exist for every detected view
    assert_eq!(
        std::fs::read_dir(&annotated_dir).unwrap().count(),
        board_poses().len()
    );

    // parameters are stored on the calibrator for later stages
    assert!(calibrator.intrinsics().is_some());
    assert!(calibrator.distortion().is_some());

    // persistence roundtrip through the parameter file
    let params_path = tmp_dir.path().join("camera.json");
    calibrator.save_params(&params_path).unwrap();
    let mut restored = PinholeCalibrator::new();
    restored.load_params(&params_path).unwrap();
    assert_eq!(restored.intrinsics(), calibrator.intrinsics());
}

#[test]
fn remove_invalid_deletes_undetected_images() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut paths = write_dataset(tmp_dir.path());

    let blank_path = tmp_dir.path().join("blank.png");
    write_blank(&blank_path);
    paths.push(blank_path.clone());

    let mut calibrator = PinholeCalibrator::with_detector(Box::new(ChessboardDetector::new(
        (COLS, ROWS),
        SQUARE,
    )));
    let options = IntrinsicOptions {
        remove_invalid: true,
        annotated_dir: None,
    };

    let calibration = calibrator.calibrate_intrinsic(&paths, &options).unwrap();
    assert!(calibration.is_some());
    assert!(!blank_path.exists(), "undetected image should be removed");
}

#[test]
fn apply_intrinsic_writes_undistorted_images() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let paths = write_dataset(tmp_dir.path());

    let mut calibrator = PinholeCalibrator::new();
    calibrator.set_intrinsics(intrinsics_gt());
    calibrator.set_distortion(camber_calib::PlumbBobDistortion::from_vec([
        -0.05, 0.01, 0.0, 0.0, 0.0,
    ]));

    let out_dir = tmp_dir.path().join("undistorted");
    let written = calibrator
        .apply_intrinsic(&paths, &out_dir, 0.0)
        .expect("undistortion should run");

    assert_eq!(written.len(), paths.len());
    for path in &written {
        assert!(path.exists());
        assert!(path.starts_with(&out_dir));
    }
}

#[test]
fn all_invalid_images_yield_no_result() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let blank_path = tmp_dir.path().join("blank.png");
    write_blank(&blank_path);

    let mut calibrator = PinholeCalibrator::with_detector(Box::new(ChessboardDetector::new(
        (COLS, ROWS),
        SQUARE,
    )));
    let options = IntrinsicOptions {
        remove_invalid: false,
        annotated_dir: None,
    };

    let result = calibrator
        .calibrate_intrinsic(&[blank_path, tmp_dir.path().join("missing.png")], &options)
        .expect("skipping invalid images is not an error");
    assert!(result.is_none());
}
