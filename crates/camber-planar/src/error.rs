/// Error types for the planar mapping crate.
#[derive(Debug, thiserror::Error)]
pub enum PlanarError {
    /// Failed to read or write a map file.
    #[error("Failed to manipulate the map file. {0}")]
    Io(#[from] std::io::Error),

    /// The file size does not match the caller-supplied map shape.
    #[error("map file holds {actual} bytes but the given shape needs {expected}")]
    SizeMismatch {
        /// Byte count implied by the requested shape.
        expected: usize,
        /// Byte count found in the file.
        actual: usize,
    },

    /// The cell buffer does not match the map shape.
    #[error("cell count ({cells}) does not match {width}x{height}")]
    InvalidCellCount {
        /// Number of cells provided.
        cells: usize,
        /// Requested map width.
        width: usize,
        /// Requested map height.
        height: usize,
    },

    /// Invalid input data - mismatched array lengths with descriptive labels.
    #[error("Mismatched array lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    MismatchedArrayLengths {
        /// Label for the left-hand slice.
        left_name: &'static str,
        /// Length of the left-hand slice.
        left_len: usize,
        /// Label for the right-hand slice.
        right_name: &'static str,
        /// Length of the right-hand slice.
        right_len: usize,
    },
}
