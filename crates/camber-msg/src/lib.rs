#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Decoded recorder messages arrive as tagged payloads — image, point cloud
//! or generic — and an ordered chain of sinks writes each one to disk:
//! images as JPEG, point clouds as binary PCD, everything else as JSON.
//! The first sink whose predicate accepts a payload wins; user-registered
//! sinks take priority over the built-in chain.

/// Error types for the message sink crate.
pub mod error;

/// Decoded message types.
pub mod message;

/// Binary PCD reading and writing.
pub mod pcd;

/// Sink trait, built-in sinks and the dispatching writer.
pub mod sink;

pub use crate::error::MsgError;
pub use crate::message::{
    ImageEncoding, ImageMessage, Message, Payload, PointCloudMessage, Stamp,
};
pub use crate::pcd::{read_pcd_binary, write_pcd_binary};
pub use crate::sink::{ImageSink, JsonSink, MessageSink, MessageWriter, PointCloudSink};
