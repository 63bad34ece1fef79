/// Error types for the message sink crate.
#[derive(Debug, thiserror::Error)]
pub enum MsgError {
    /// Filesystem error while writing a message.
    #[error("Failed to manipulate the file. {0}")]
    Io(#[from] std::io::Error),

    /// Image container error.
    #[error(transparent)]
    Image(#[from] camber_image::ImageError),

    /// Image codec error.
    #[error(transparent)]
    ImageIo(#[from] camber_io::IoError),

    /// JSON serialization error.
    #[error("Failed to serialize the message. {0}")]
    Json(#[from] serde_json::Error),

    /// The payload byte count does not match the declared image shape.
    #[error("image payload holds {actual} bytes but {width}x{height} {encoding} needs {expected}")]
    ImagePayloadMismatch {
        /// Byte count implied by the declared shape and encoding.
        expected: usize,
        /// Byte count found in the payload.
        actual: usize,
        /// Declared image width.
        width: usize,
        /// Declared image height.
        height: usize,
        /// Declared encoding name.
        encoding: &'static str,
    },

    /// Color count does not match the point count in a cloud.
    #[error("point cloud has {points} points but {colors} colors")]
    ColorCountMismatch {
        /// Number of points in the cloud.
        points: usize,
        /// Number of colors in the cloud.
        colors: usize,
    },

    /// No registered sink accepted the message.
    #[error("no sink can handle a message on topic {0}")]
    NoSink(String),

    /// Invalid PCD file extension.
    #[error("Invalid PCD file extension. Got: {0}")]
    InvalidFileExtension(String),

    /// Malformed PCD header.
    #[error("Malformed PCD header")]
    MalformedHeader,

    /// Unsupported PCD field layout.
    #[error("Unsupported PCD header")]
    UnsupportedProperty,
}
