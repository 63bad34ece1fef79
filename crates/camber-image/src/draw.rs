use crate::image::Image;

/// Draw a cross marker centered at `(x, y)`.
///
/// Pixels falling outside the image are silently clipped.
///
/// # Arguments
///
/// * `image` - The RGB image to draw on.
/// * `x` - The x coordinate of the cross center.
/// * `y` - The y coordinate of the cross center.
/// * `half_len` - Half length of the cross arms in pixels.
/// * `color` - The RGB color of the marker.
pub fn draw_cross(image: &mut Image<u8, 3>, x: i64, y: i64, half_len: i64, color: [u8; 3]) {
    for d in -half_len..=half_len {
        put_pixel(image, x + d, y, color);
        put_pixel(image, x, y + d, color);
    }
}

/// Draw a straight line segment between two points using Bresenham stepping.
pub fn draw_line(image: &mut Image<u8, 3>, x0: i64, y0: i64, x1: i64, y1: i64, color: [u8; 3]) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        put_pixel(image, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[inline]
fn put_pixel(image: &mut Image<u8, 3>, x: i64, y: i64, color: [u8; 3]) {
    if x < 0 || y < 0 || x as usize >= image.width() || y as usize >= image.height() {
        return;
    }
    // clipped above, cannot fail
    let _ = image.set_pixel(x as usize, y as usize, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageSize;

    #[test]
    fn cross_is_clipped() {
        let mut image = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 5,
                height: 5,
            },
            0,
        )
        .unwrap();
        draw_cross(&mut image, 0, 0, 3, [255, 0, 0]);
        assert_eq!(image.get_pixel(0, 0).unwrap(), [255, 0, 0]);
        assert_eq!(image.get_pixel(3, 0).unwrap(), [255, 0, 0]);
        assert_eq!(image.get_pixel(4, 4).unwrap(), [0, 0, 0]);
    }

    #[test]
    fn line_endpoints() {
        let mut image = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 8,
                height: 8,
            },
            0,
        )
        .unwrap();
        draw_line(&mut image, 1, 1, 6, 4, [0, 255, 0]);
        assert_eq!(image.get_pixel(1, 1).unwrap(), [0, 255, 0]);
        assert_eq!(image.get_pixel(6, 4).unwrap(), [0, 255, 0]);
    }
}
