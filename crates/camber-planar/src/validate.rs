//! Ground-truth validation of pixel-to-world maps.

use crate::error::PlanarError;
use crate::map::PixelWorldMap;

/// Per-point and aggregate error of a map against surveyed world points.
#[derive(Debug, Clone)]
pub struct MapValidation {
    /// Euclidean distance per correspondence; `NaN` where the pixel fell
    /// outside the map or the cell was degenerate.
    pub distances: Vec<f64>,
    /// Mean over the finite distances only. `NaN` when no distance is finite.
    pub mean_error: f64,
}

/// Compare map entries at observed pixels against ground-truth world points.
///
/// Each pixel is rounded to its nearest integer coordinate; out-of-bounds
/// pixels are recorded as fully invalid (`NaN`) rather than clamped or
/// interpolated, and non-finite distances are excluded from the mean.
pub fn validate_map(
    image_points: &[[f64; 2]],
    object_points: &[[f64; 3]],
    map: &PixelWorldMap,
) -> Result<MapValidation, PlanarError> {
    if image_points.len() != object_points.len() {
        return Err(PlanarError::MismatchedArrayLengths {
            left_name: "image points",
            left_len: image_points.len(),
            right_name: "object points",
            right_len: object_points.len(),
        });
    }

    let mut distances = Vec::with_capacity(image_points.len());
    for (pixel, truth) in image_points.iter().zip(object_points.iter()) {
        let u = pixel[0].round();
        let v = pixel[1].round();
        let entry = if u >= 0.0 && v >= 0.0 {
            map.at(u as usize, v as usize)
        } else {
            None
        };
        let distance = match entry {
            Some(world) => {
                let dx = truth[0] - world[0] as f64;
                let dy = truth[1] - world[1] as f64;
                let dz = truth[2] - world[2] as f64;
                (dx * dx + dy * dy + dz * dz).sqrt()
            }
            None => f64::NAN,
        };
        distances.push(distance);
    }

    let finite: Vec<f64> = distances.iter().cloned().filter(|d| d.is_finite()).collect();
    let mean_error = if finite.is_empty() {
        f64::NAN
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };

    Ok(MapValidation {
        distances,
        mean_error,
    })
}
