//! Raw binary persistence for pixel-to-world maps.
//!
//! The format is headerless: `height * width * 3` little-endian `f32`
//! values, row-major. The shape travels out-of-band; the reader validates
//! only that the byte count matches the shape the caller supplies.

use crate::error::PlanarError;
use crate::map::PixelWorldMap;
use camber_image::ImageSize;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Write a map as raw little-endian `f32` triples.
pub fn save_map(path: impl AsRef<Path>, map: &PixelWorldMap) -> Result<(), PlanarError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for cell in map.cells() {
        for component in cell {
            writer.write_all(&component.to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read a map written by [`save_map`].
///
/// # Arguments
/// * `path` - The map file.
/// * `size` - The exact `(width, height)` used at write time. A file whose
///   byte count does not match this shape is rejected.
pub fn load_map(path: impl AsRef<Path>, size: ImageSize) -> Result<PixelWorldMap, PlanarError> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let expected = size.width * size.height * 3 * 4;
    if bytes.len() != expected {
        return Err(PlanarError::SizeMismatch {
            expected,
            actual: bytes.len(),
        });
    }

    let mut cells = Vec::with_capacity(size.width * size.height);
    for triple in bytes.chunks_exact(12) {
        let mut cell = [0.0f32; 3];
        for (c, comp) in triple.chunks_exact(4).enumerate() {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(comp);
            cell[c] = f32::from_le_bytes(buf);
        }
        cells.push(cell);
    }

    PixelWorldMap::new(size, cells)
}
