//! Calibration-target detection.
//!
//! The chessboard detector runs an X-junction response over the grayscale
//! image, suppresses non-maxima, orders the surviving corners into the board
//! grid and refines each to sub-pixel precision from the local gradients.

use camber_image::draw::{draw_cross, draw_line};
use camber_image::ops::gray_to_rgb;
use camber_image::Image;
use glam::{DMat2, DVec2};

/// A successful target detection.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Detected corner pixel coordinates, row-major in board order.
    pub corners: Vec<[f64; 2]>,
    /// Board-frame reference points (`z = 0`), same order as `corners`.
    pub object_points: Vec<[f64; 3]>,
    /// Debug overlay with the detected corners drawn in.
    pub annotated: Image<u8, 3>,
}

/// A detector locating a known calibration target in an image.
///
/// Returning `None` means the pattern was not found; partial detections are
/// not reported.
pub trait TargetDetector {
    /// Detect the target in a grayscale image.
    fn detect(&self, image: &Image<u8, 1>) -> Option<Detection>;
}

/// Detects the inner corners of a chessboard calibration target.
#[derive(Debug, Clone)]
pub struct ChessboardDetector {
    /// Inner corner grid as (columns, rows).
    pub board_size: (usize, usize),
    /// Physical side length of one square, in world units.
    pub square_size: f64,
    /// Half-size of the quadrant window for the corner response.
    pub response_radius: usize,
    /// Minimum pixel distance between two detected corners.
    pub nms_radius: usize,
    /// Half-size of the sub-pixel refinement window.
    pub subpix_radius: usize,
}

impl ChessboardDetector {
    /// Create a detector for a board with the given inner corner grid.
    pub fn new(board_size: (usize, usize), square_size: f64) -> Self {
        Self {
            board_size,
            square_size,
            response_radius: 5,
            nms_radius: 8,
            subpix_radius: 5,
        }
    }

    /// Board-frame reference points for the configured grid.
    pub fn object_points(&self) -> Vec<[f64; 3]> {
        let (cols, rows) = self.board_size;
        let mut points = Vec::with_capacity(cols * rows);
        for r in 0..rows {
            for c in 0..cols {
                points.push([
                    c as f64 * self.square_size,
                    r as f64 * self.square_size,
                    0.0,
                ]);
            }
        }
        points
    }

    /// X-junction response at every pixel.
    ///
    /// Compares the mean intensity of opposing quadrant windows and subtracts
    /// the within-diagonal asymmetry, so chessboard inner corners respond
    /// strongly while straight edges and L-junctions cancel out.
    fn corner_response(&self, image: &Image<u8, 1>) -> Vec<f64> {
        let (width, height) = (image.width(), image.height());
        let data = image.as_slice();
        let r = self.response_radius as i64;
        let mut response = vec![0.0f64; width * height];

        for y in r..height as i64 - r {
            for x in r..width as i64 - r {
                let mut nw = 0.0;
                let mut ne = 0.0;
                let mut sw = 0.0;
                let mut se = 0.0;
                for dy in 1..=r {
                    for dx in 1..=r {
                        let row_n = ((y - dy) as usize) * width;
                        let row_s = ((y + dy) as usize) * width;
                        nw += data[row_n + (x - dx) as usize] as f64;
                        ne += data[row_n + (x + dx) as usize] as f64;
                        sw += data[row_s + (x - dx) as usize] as f64;
                        se += data[row_s + (x + dx) as usize] as f64;
                    }
                }
                let area = (r * r) as f64;
                let (nw, ne, sw, se) = (nw / area, ne / area, sw / area, se / area);
                let value = ((nw + se) - (ne + sw)).abs() - (nw - se).abs() - (ne - sw).abs();
                response[y as usize * width + x as usize] = value.max(0.0);
            }
        }
        response
    }

    /// Greedy non-maximum suppression over the thresholded response.
    fn suppress(&self, response: &[f64], width: usize) -> Vec<(usize, usize)> {
        let max_response = response.iter().cloned().fold(0.0f64, f64::max);
        if max_response < MIN_RESPONSE {
            return Vec::new();
        }
        let threshold = (RELATIVE_THRESHOLD * max_response).max(MIN_RESPONSE);

        let mut candidates: Vec<(usize, f64)> = response
            .iter()
            .enumerate()
            .filter(|(_, &v)| v >= threshold)
            .map(|(i, &v)| (i, v))
            .collect();
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let min_dist_sq = (self.nms_radius * self.nms_radius) as i64;
        let mut kept: Vec<(usize, usize)> = Vec::new();
        for (idx, _) in candidates {
            let (x, y) = (idx % width, idx / width);
            let far_enough = kept.iter().all(|&(kx, ky)| {
                let dx = kx as i64 - x as i64;
                let dy = ky as i64 - y as i64;
                dx * dx + dy * dy >= min_dist_sq
            });
            if far_enough {
                kept.push((x, y));
            }
        }
        kept
    }

    /// Order corners row-major to match [`ChessboardDetector::object_points`].
    ///
    /// Corners are sorted by y, split into board rows, and each row sorted by
    /// x. Boards rotated far enough for rows to interleave vertically fail
    /// the split and report as not detected.
    fn order_grid(&self, mut corners: Vec<[f64; 2]>) -> Option<Vec<[f64; 2]>> {
        let (cols, rows) = self.board_size;
        corners.sort_by(|a, b| a[1].partial_cmp(&b[1]).unwrap_or(std::cmp::Ordering::Equal));

        let mut ordered = Vec::with_capacity(cols * rows);
        for row in corners.chunks(cols) {
            let mut row = row.to_vec();
            // rows must be vertically separated from their neighbours
            let y_spread = row
                .iter()
                .map(|p| p[1])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
                    (lo.min(y), hi.max(y))
                });
            if rows > 1 && (y_spread.1 - y_spread.0) > self.row_split_limit(&ordered, &row) {
                return None;
            }
            row.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap_or(std::cmp::Ordering::Equal));
            ordered.extend(row);
        }
        Some(ordered)
    }

    /// Maximum in-row y spread allowed before the row split is rejected.
    fn row_split_limit(&self, ordered: &[[f64; 2]], row: &[[f64; 2]]) -> f64 {
        let (cols, _) = self.board_size;
        if ordered.len() < cols {
            return f64::INFINITY;
        }
        // distance between this row's mean y and the previous row's mean y
        let prev = &ordered[ordered.len() - cols..];
        let prev_y = prev.iter().map(|p| p[1]).sum::<f64>() / cols as f64;
        let row_y = row.iter().map(|p| p[1]).sum::<f64>() / cols as f64;
        (row_y - prev_y).abs()
    }

    /// Gradient-driven sub-pixel refinement of one corner.
    fn refine_subpixel(&self, image: &Image<u8, 1>, corner: [f64; 2]) -> [f64; 2] {
        let (width, height) = (image.width() as i64, image.height() as i64);
        let data = image.as_slice();
        let r = self.subpix_radius as i64;
        let mut q = DVec2::new(corner[0], corner[1]);

        for _ in 0..SUBPIX_ITERATIONS {
            let cx = q.x.round() as i64;
            let cy = q.y.round() as i64;
            if cx < r + 1 || cy < r + 1 || cx >= width - r - 1 || cy >= height - r - 1 {
                break;
            }

            let mut g = DMat2::ZERO;
            let mut b = DVec2::ZERO;
            for dy in -r..=r {
                for dx in -r..=r {
                    let px = cx + dx;
                    let py = cy + dy;
                    let idx = |x: i64, y: i64| data[(y * width + x) as usize] as f64;
                    let gx = (idx(px + 1, py) - idx(px - 1, py)) * 0.5;
                    let gy = (idx(px, py + 1) - idx(px, py - 1)) * 0.5;

                    let gxx = gx * gx;
                    let gxy = gx * gy;
                    let gyy = gy * gy;
                    let p = DVec2::new(px as f64, py as f64);
                    g += DMat2::from_cols(DVec2::new(gxx, gxy), DVec2::new(gxy, gyy));
                    b += DVec2::new(gxx * p.x + gxy * p.y, gxy * p.x + gyy * p.y);
                }
            }

            if g.determinant().abs() < 1e-9 {
                break;
            }
            let q_next = g.inverse() * b;
            let step = (q_next - q).length();
            q = q_next;
            if step < SUBPIX_EPS {
                break;
            }
        }
        [q.x, q.y]
    }

    fn annotate(&self, image: &Image<u8, 1>, corners: &[[f64; 2]]) -> Option<Image<u8, 3>> {
        let mut annotated = gray_to_rgb(image).ok()?;
        for pair in corners.windows(2) {
            draw_line(
                &mut annotated,
                pair[0][0].round() as i64,
                pair[0][1].round() as i64,
                pair[1][0].round() as i64,
                pair[1][1].round() as i64,
                [255, 160, 0],
            );
        }
        for corner in corners {
            draw_cross(
                &mut annotated,
                corner[0].round() as i64,
                corner[1].round() as i64,
                4,
                [255, 0, 0],
            );
        }
        Some(annotated)
    }
}

const MIN_RESPONSE: f64 = 10.0;
const RELATIVE_THRESHOLD: f64 = 0.3;
const SUBPIX_ITERATIONS: usize = 30;
const SUBPIX_EPS: f64 = 1e-3;

impl TargetDetector for ChessboardDetector {
    fn detect(&self, image: &Image<u8, 1>) -> Option<Detection> {
        let (cols, rows) = self.board_size;
        let expected = cols * rows;

        let response = self.corner_response(image);
        let peaks = self.suppress(&response, image.width());
        if peaks.len() != expected {
            log::debug!(
                "chessboard {}x{} not found: {} corner candidates",
                cols,
                rows,
                peaks.len()
            );
            return None;
        }

        let rough: Vec<[f64; 2]> = peaks.iter().map(|&(x, y)| [x as f64, y as f64]).collect();
        let ordered = self.order_grid(rough)?;

        let corners: Vec<[f64; 2]> = ordered
            .into_iter()
            .map(|c| self.refine_subpixel(image, c))
            .collect();

        let annotated = self.annotate(image, &corners)?;

        Some(Detection {
            corners,
            object_points: self.object_points(),
            annotated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camber_image::ImageSize;

    /// Render a fronto-parallel chessboard with the grid's top-left inner
    /// corner at `(start_x + square, start_y + square)`.
    fn render_board(
        width: usize,
        height: usize,
        cols: usize,
        rows: usize,
        square: usize,
    ) -> (Image<u8, 1>, usize, usize) {
        let grid_cols = cols + 1;
        let grid_rows = rows + 1;
        let start_x = (width - grid_cols * square) / 2;
        let start_y = (height - grid_rows * square) / 2;

        let mut image = Image::from_size_val(ImageSize { width, height }, 255u8).unwrap();
        let data = image.as_slice_mut();
        for y in 0..height {
            for x in 0..width {
                let in_board = x >= start_x
                    && x < start_x + grid_cols * square
                    && y >= start_y
                    && y < start_y + grid_rows * square;
                if in_board {
                    let cell = (x - start_x) / square + (y - start_y) / square;
                    if cell % 2 == 0 {
                        data[y * width + x] = 0;
                    }
                }
            }
        }
        (image, start_x, start_y)
    }

    #[test]
    fn detects_all_inner_corners() {
        let (cols, rows, square) = (6, 5, 40);
        let (image, start_x, start_y) = render_board(640, 480, cols, rows, square);

        let detector = ChessboardDetector::new((cols, rows), 0.04);
        let detection = detector.detect(&image).expect("board should be detected");

        assert_eq!(detection.corners.len(), cols * rows);
        assert_eq!(detection.object_points.len(), cols * rows);
        assert_eq!(detection.annotated.size(), image.size());

        // corners must land on the rendered grid intersections (the sampled
        // edge sits half a pixel before the analytic one)
        for r in 0..rows {
            for c in 0..cols {
                let expected_x = (start_x + (c + 1) * square) as f64 - 0.5;
                let expected_y = (start_y + (r + 1) * square) as f64 - 0.5;
                let got = detection.corners[r * cols + c];
                assert!(
                    (got[0] - expected_x).abs() < 1.0 && (got[1] - expected_y).abs() < 1.0,
                    "corner ({c}, {r}): got ({:.2}, {:.2}), expected ({expected_x}, {expected_y})",
                    got[0],
                    got[1]
                );
            }
        }
    }

    #[test]
    fn object_points_follow_the_grid() {
        let detector = ChessboardDetector::new((3, 2), 0.5);
        let points = detector.object_points();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], [0.0, 0.0, 0.0]);
        assert_eq!(points[2], [1.0, 0.0, 0.0]);
        assert_eq!(points[3], [0.0, 0.5, 0.0]);
        assert!(points.iter().all(|p| p[2] == 0.0));
    }

    #[test]
    fn blank_image_is_not_a_board() {
        let image =
            Image::from_size_val(ImageSize { width: 640, height: 480 }, 255u8).unwrap();
        let detector = ChessboardDetector::new((6, 5), 0.04);
        assert!(detector.detect(&image).is_none());
    }

    #[test]
    fn wrong_corner_count_is_rejected() {
        // a 4x3 board cannot satisfy a 6x5 detector
        let (image, _, _) = render_board(640, 480, 4, 3, 40);
        let detector = ChessboardDetector::new((6, 5), 0.04);
        assert!(detector.detect(&image).is_none());
    }
}
