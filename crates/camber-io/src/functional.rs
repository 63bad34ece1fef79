use std::path::Path;

use camber_image::Image;

use crate::error::IoError;
use crate::jpeg::{read_image_jpeg_rgb8, write_image_jpeg_rgb8};
use crate::png::{read_image_png_rgb8, write_image_png_rgb8};

/// Reads an image from the given file path and returns it as an RGB image.
///
/// The format is selected from the file extension; `jpg`, `jpeg` and `png`
/// are supported.
///
/// # Arguments
///
/// * `file_path` - The path to the image file.
pub fn read_image_any_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    match file_path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            read_image_jpeg_rgb8(file_path)
        }
        Some(ext) if ext.eq_ignore_ascii_case("png") => read_image_png_rgb8(file_path),
        _ => Err(IoError::InvalidFileExtension(file_path.to_path_buf())),
    }
}

/// Writes an RGB image to the given file path, selecting the format from the
/// file extension; `jpg`, `jpeg` and `png` are supported. JPEG is written at
/// maximum quality.
pub fn write_image_any_rgb8(
    file_path: impl AsRef<Path>,
    image: &Image<u8, 3>,
) -> Result<(), IoError> {
    let file_path = file_path.as_ref();
    match file_path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            write_image_jpeg_rgb8(file_path, image, 100)
        }
        Some(ext) if ext.eq_ignore_ascii_case("png") => write_image_png_rgb8(file_path, image),
        _ => Err(IoError::InvalidFileExtension(file_path.to_path_buf())),
    }
}
