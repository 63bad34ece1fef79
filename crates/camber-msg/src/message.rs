//! Decoded message types handed to the sinks.
//!
//! The recording container and its deserialization live outside this crate;
//! what arrives here is already decoded into one of the tagged payload
//! variants below.

use crate::error::MsgError;
use camber_image::{Image, ImageSize};

/// Message timestamp, seconds and nanoseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    /// Whole seconds.
    pub sec: u64,
    /// Nanosecond remainder.
    pub nanosec: u32,
}

/// Pixel encoding of an image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// 8-bit RGB, interleaved.
    Rgb8,
    /// 8-bit BGR, interleaved.
    Bgr8,
    /// 8-bit grayscale.
    Mono8,
}

impl ImageEncoding {
    /// Bytes per pixel for this encoding.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ImageEncoding::Rgb8 | ImageEncoding::Bgr8 => 3,
            ImageEncoding::Mono8 => 1,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ImageEncoding::Rgb8 => "rgb8",
            ImageEncoding::Bgr8 => "bgr8",
            ImageEncoding::Mono8 => "mono8",
        }
    }
}

/// A decoded image message.
#[derive(Debug, Clone)]
pub struct ImageMessage {
    /// Image height in pixels.
    pub height: usize,
    /// Image width in pixels.
    pub width: usize,
    /// Pixel encoding of `data`.
    pub encoding: ImageEncoding,
    /// Interleaved pixel bytes, row-major.
    pub data: Vec<u8>,
}

impl ImageMessage {
    /// Convert the payload into an RGB image regardless of source encoding.
    pub fn to_rgb8(&self) -> Result<Image<u8, 3>, MsgError> {
        let expected = self.width * self.height * self.encoding.bytes_per_pixel();
        if self.data.len() != expected {
            return Err(MsgError::ImagePayloadMismatch {
                expected,
                actual: self.data.len(),
                width: self.width,
                height: self.height,
                encoding: self.encoding.name(),
            });
        }

        let size = ImageSize {
            width: self.width,
            height: self.height,
        };
        let rgb = match self.encoding {
            ImageEncoding::Rgb8 => self.data.clone(),
            ImageEncoding::Bgr8 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
            ImageEncoding::Mono8 => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
        };
        Ok(Image::new(size, rgb)?)
    }
}

/// A decoded point cloud message.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudMessage {
    /// Cartesian points.
    pub points: Vec<[f32; 3]>,
    /// Optional per-point RGB colors.
    pub colors: Option<Vec<[u8; 3]>>,
}

/// The tagged payload variants a sink can receive.
#[derive(Debug, Clone)]
pub enum Payload {
    /// An image frame.
    Image(ImageMessage),
    /// A point cloud.
    PointCloud(PointCloudMessage),
    /// Anything else, pre-rendered as a JSON value.
    Generic(serde_json::Value),
}

impl Payload {
    /// Short label used in output file names.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Image(_) => "image",
            Payload::PointCloud(_) => "pointcloud",
            Payload::Generic(_) => "msg",
        }
    }
}

/// A decoded message with its origin topic and timestamp.
#[derive(Debug, Clone)]
pub struct Message {
    /// Topic the message was recorded on.
    pub topic: String,
    /// Message timestamp.
    pub stamp: Stamp,
    /// Decoded payload.
    pub payload: Payload,
}
