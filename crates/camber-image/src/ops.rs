use crate::error::ImageError;
use crate::image::Image;

/// Convert an RGB image to a single channel grayscale image.
///
/// Uses the ITU-R BT.601 luma weights (0.299, 0.587, 0.114).
///
/// # Arguments
///
/// * `src` - The RGB image to convert.
///
/// # Returns
///
/// A grayscale image with the same size as the input.
pub fn rgb_to_gray(src: &Image<u8, 3>) -> Result<Image<u8, 1>, ImageError> {
    let mut data = Vec::with_capacity(src.width() * src.height());
    for px in src.as_slice().chunks_exact(3) {
        let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
        data.push(luma.round().clamp(0.0, 255.0) as u8);
    }
    Image::new(src.size(), data)
}

/// Replicate a grayscale image into a three channel RGB image.
pub fn gray_to_rgb(src: &Image<u8, 1>) -> Result<Image<u8, 3>, ImageError> {
    let mut data = Vec::with_capacity(src.width() * src.height() * 3);
    for &v in src.as_slice() {
        data.extend_from_slice(&[v, v, v]);
    }
    Image::new(src.size(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageSize;

    #[test]
    fn gray_conversion() -> Result<(), ImageError> {
        let rgb = Image::<u8, 3>::new(
            ImageSize {
                width: 2,
                height: 1,
            },
            vec![255, 255, 255, 0, 0, 0],
        )?;
        let gray = rgb_to_gray(&rgb)?;
        assert_eq!(gray.as_slice(), &[255, 0]);
        Ok(())
    }

    #[test]
    fn gray_to_rgb_roundtrip() -> Result<(), ImageError> {
        let gray = Image::<u8, 1>::new(
            ImageSize {
                width: 2,
                height: 1,
            },
            vec![7, 42],
        )?;
        let rgb = gray_to_rgb(&gray)?;
        assert_eq!(rgb.as_slice(), &[7, 7, 7, 42, 42, 42]);
        Ok(())
    }
}
