/// Error types for the calibration crate.
#[derive(Debug, thiserror::Error)]
pub enum CalibError {
    /// Invalid input data - insufficient correspondences for the solver.
    #[error("solver requires at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences required.
        required: usize,
        /// Actual number of correspondences provided.
        actual: usize,
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

    /// Fewer calibration views than the linear initialization needs.
    #[error("intrinsic calibration requires at least {required} views, got {actual}")]
    InsufficientViews {
        /// Minimum number of views required.
        required: usize,
        /// Actual number of views provided.
        actual: usize,
    },

    /// Invalid camera intrinsics matrix.
    #[error("Invalid camera intrinsics matrix: {0}")]
    InvalidIntrinsics(String),

    /// Singular value decomposition failed.
    #[error("SVD computation failed: {0}")]
    SvdFailed(String),

    /// A detection-driven operation was called on a calibrator without a detector.
    #[error("no target detector configured for this calibrator")]
    MissingDetector,

    /// An operation needed intrinsic parameters that have not been set.
    #[error("camera intrinsics are not available; calibrate or set them first")]
    MissingIntrinsics,

    /// An operation needed an extrinsic pose that has not been set.
    #[error("camera extrinsics are not available; calibrate or set them first")]
    MissingExtrinsics,

    /// Image container error.
    #[error(transparent)]
    Image(#[from] camber_image::ImageError),

    /// Image file I/O error.
    #[error(transparent)]
    ImageIo(#[from] camber_io::IoError),

    /// Filesystem error.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Parameter file (de)serialization error.
    #[error("Failed to (de)serialize calibration parameters. {0}")]
    ParamsError(#[from] serde_json::Error),
}
