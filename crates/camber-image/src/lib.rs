#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Image representation for calibration and mapping purposes.
pub mod image;

/// Error types for the image module.
pub mod error;

/// Pixel-level operations on images.
pub mod ops;

/// Simple drawing primitives for debug overlays.
pub mod draw;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
