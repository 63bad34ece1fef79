//! Ordered first-match dispatch of messages to on-disk sinks.

use crate::error::MsgError;
use crate::message::{Message, Payload};
use crate::pcd::write_pcd_binary;
use camber_io::jpeg::write_image_jpeg_rgb8;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A strategy that persists one family of message payloads.
pub trait MessageSink {
    /// Whether this sink accepts the payload.
    fn can_handle(&self, payload: &Payload) -> bool;

    /// Write the message below `topic_dir` and return the written path.
    fn save(&self, message: &Message, topic_dir: &Path) -> Result<PathBuf, MsgError>;
}

/// Writes image payloads as JPEG files.
#[derive(Debug, Clone)]
pub struct ImageSink {
    /// JPEG quality, 0 (lowest) to 100 (highest).
    pub quality: u8,
}

impl Default for ImageSink {
    fn default() -> Self {
        Self { quality: 95 }
    }
}

impl MessageSink for ImageSink {
    fn can_handle(&self, payload: &Payload) -> bool {
        matches!(payload, Payload::Image(_))
    }

    fn save(&self, message: &Message, topic_dir: &Path) -> Result<PathBuf, MsgError> {
        let Payload::Image(image) = &message.payload else {
            return Err(MsgError::NoSink(message.topic.clone()));
        };
        let path = topic_dir.join(file_name(message, "jpg"));
        write_image_jpeg_rgb8(&path, &image.to_rgb8()?, self.quality)?;
        Ok(path)
    }
}

/// Writes point cloud payloads as binary PCD files.
#[derive(Debug, Clone, Default)]
pub struct PointCloudSink;

impl MessageSink for PointCloudSink {
    fn can_handle(&self, payload: &Payload) -> bool {
        matches!(payload, Payload::PointCloud(_))
    }

    fn save(&self, message: &Message, topic_dir: &Path) -> Result<PathBuf, MsgError> {
        let Payload::PointCloud(cloud) = &message.payload else {
            return Err(MsgError::NoSink(message.topic.clone()));
        };
        let path = topic_dir.join(file_name(message, "pcd"));
        write_pcd_binary(&path, cloud)?;
        Ok(path)
    }
}

/// Writes every remaining payload as pretty-printed JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonSink;

impl MessageSink for JsonSink {
    fn can_handle(&self, payload: &Payload) -> bool {
        matches!(payload, Payload::Generic(_))
    }

    fn save(&self, message: &Message, topic_dir: &Path) -> Result<PathBuf, MsgError> {
        let Payload::Generic(value) = &message.payload else {
            return Err(MsgError::NoSink(message.topic.clone()));
        };
        let path = topic_dir.join(file_name(message, "json"));
        let file = fs::File::create(&path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        Ok(path)
    }
}

fn file_name(message: &Message, ext: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        message.stamp.sec,
        message.stamp.nanosec,
        message.payload.kind(),
        ext
    )
}

/// Dispatches messages to the first sink whose predicate accepts them.
pub struct MessageWriter {
    sinks: Vec<Box<dyn MessageSink>>,
}

impl Default for MessageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageWriter {
    /// A writer with the default sink chain: images as JPEG, point clouds as
    /// binary PCD, everything else as JSON.
    pub fn new() -> Self {
        Self {
            sinks: vec![
                Box::new(ImageSink::default()),
                Box::new(PointCloudSink),
                Box::new(JsonSink),
            ],
        }
    }

    /// A writer with an explicit sink chain, tried in order.
    pub fn with_sinks(sinks: Vec<Box<dyn MessageSink>>) -> Self {
        Self { sinks }
    }

    /// Register a sink with priority over the existing chain.
    pub fn register_sink(&mut self, sink: Box<dyn MessageSink>) {
        self.sinks.insert(0, sink);
    }

    /// Persist a message below `out_dir`, grouped by topic.
    ///
    /// The topic directory (`/` replaced by `_`) is created as needed; a
    /// directory that cannot be created is a fatal error.
    pub fn save(&self, message: &Message, out_dir: &Path) -> Result<PathBuf, MsgError> {
        let sink = self
            .sinks
            .iter()
            .find(|s| s.can_handle(&message.payload))
            .ok_or_else(|| MsgError::NoSink(message.topic.clone()))?;

        let topic_dir = out_dir.join(topic_dir_name(&message.topic));
        fs::create_dir_all(&topic_dir)?;

        let path = sink.save(message, &topic_dir)?;
        log::debug!("saved {} message to {}", message.topic, path.display());
        Ok(path)
    }
}

fn topic_dir_name(topic: &str) -> String {
    topic.trim_matches('/').replace('/', "_")
}
