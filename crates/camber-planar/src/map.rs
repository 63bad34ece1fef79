//! Per-pixel ground-plane lookup maps.

use crate::error::PlanarError;
use camber_calib::{undistort_pixels_normalized, CameraIntrinsics, PlumbBobDistortion};
use camber_image::ImageSize;
use glam::{DMat3, DVec3};

/// A dense lookup table mapping every pixel of an image to a world point on
/// a fixed horizontal plane.
///
/// Cells are stored row-major. Cells can hold non-finite values where the
/// camera ray runs parallel to the plane; such entries are valid data, not
/// errors.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelWorldMap {
    size: ImageSize,
    cells: Vec<[f32; 3]>,
}

impl PixelWorldMap {
    /// Create a map from row-major cells.
    pub fn new(size: ImageSize, cells: Vec<[f32; 3]>) -> Result<Self, PlanarError> {
        if cells.len() != size.width * size.height {
            return Err(PlanarError::InvalidCellCount {
                cells: cells.len(),
                width: size.width,
                height: size.height,
            });
        }
        Ok(Self { size, cells })
    }

    /// The pixel grid shape of the map.
    #[inline]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// The row-major cells of the map.
    #[inline]
    pub fn cells(&self) -> &[[f32; 3]] {
        &self.cells
    }

    /// Look up the world point for pixel `(u, v)`.
    ///
    /// Returns `None` outside the map bounds.
    pub fn at(&self, u: usize, v: usize) -> Option<[f32; 3]> {
        if u >= self.size.width || v >= self.size.height {
            return None;
        }
        Some(self.cells[v * self.size.width + u])
    }
}

/// Precompute the world point every pixel sees on the plane `z = plane_z`.
///
/// Every pixel of the `(width, height)` grid is undistorted into a
/// normalized camera ray `(x, y, 1)`, rotated into the world frame and
/// intersected with the horizontal plane:
///
/// `t = (plane_z - center.z) / ray.z`, `world = center + t * ray`.
///
/// Rays parallel to the plane divide by zero and produce non-finite cells;
/// negative `t` (plane behind the camera) is preserved as-is. Output is cast
/// to `f32` for storage compactness.
///
/// # Arguments
/// * `intrinsics` – Camera matrix of the undistorted model.
/// * `distortion` – Plumb-bob distortion of the raw pixels.
/// * `rotation_cam_to_world` – Camera→world rotation.
/// * `camera_center` – Camera center in world coordinates (the camera→world
///   translation).
/// * `size` – Pixel grid to cover.
/// * `plane_z` – World height of the ground plane.
pub fn generate_pixel_to_world_map(
    intrinsics: &CameraIntrinsics,
    distortion: &PlumbBobDistortion,
    rotation_cam_to_world: &[[f64; 3]; 3],
    camera_center: &[f64; 3],
    size: ImageSize,
    plane_z: f64,
) -> PixelWorldMap {
    // full pixel coordinate grid, row-major
    let mut pixels = Vec::with_capacity(size.width * size.height);
    for v in 0..size.height {
        for u in 0..size.width {
            pixels.push([u as f64, v as f64]);
        }
    }

    // batch-undistort into normalized camera rays
    let rays = undistort_pixels_normalized(&pixels, intrinsics, distortion);

    let r = rotation_cam_to_world;
    let rotation = DMat3::from_cols(
        DVec3::new(r[0][0], r[1][0], r[2][0]),
        DVec3::new(r[0][1], r[1][1], r[2][1]),
        DVec3::new(r[0][2], r[1][2], r[2][2]),
    );
    let center = DVec3::new(camera_center[0], camera_center[1], camera_center[2]);

    let cells = rays
        .iter()
        .map(|ray| {
            let ray_world = rotation * DVec3::new(ray[0], ray[1], 1.0);
            let t = (plane_z - center.z) / ray_world.z;
            let world = center + t * ray_world;
            [world.x as f32, world.y as f32, world.z as f32]
        })
        .collect();

    PixelWorldMap { size, cells }
}
