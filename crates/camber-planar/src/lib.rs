#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Given calibrated intrinsics and a camera→world pose, this crate
//! precomputes, for every pixel, the 3D world coordinate where the
//! undistorted camera ray meets a horizontal plane of configured height. The
//! table round-trips through a raw binary format and can be checked against
//! surveyed ground-truth points.

/// Error types for the planar mapping crate.
pub mod error;

/// Raw binary persistence for maps.
pub mod io;

/// Map generation.
pub mod map;

/// Ground-truth validation.
pub mod validate;

pub use crate::error::PlanarError;
pub use crate::io::{load_map, save_map};
pub use crate::map::{generate_pixel_to_world_map, PixelWorldMap};
pub use crate::validate::{validate_map, MapValidation};
