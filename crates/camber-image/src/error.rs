/// An error type for the image module.
#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    /// The pixel data length does not match the image shape.
    #[error("Data length ({data_len}) does not match {width}x{height} with {channels} channels")]
    InvalidDataLength {
        /// Length of the provided pixel buffer.
        data_len: usize,
        /// Requested image width.
        width: usize,
        /// Requested image height.
        height: usize,
        /// Requested number of channels.
        channels: usize,
    },

    /// A pixel coordinate fell outside the image bounds.
    #[error("Pixel ({x}, {y}) is out of bounds for image {width}x{height}")]
    PixelOutOfBounds {
        /// Requested x coordinate.
        x: usize,
        /// Requested y coordinate.
        y: usize,
        /// Image width.
        width: usize,
        /// Image height.
        height: usize,
    },
}
