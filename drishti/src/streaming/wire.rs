//! Wire format serialization and framing
//!
//! # Frame Layout
//!
//! Every message on a TCP bus connection is framed the same way:
//!
//! ```text
//! ┌──────────────────┬──────────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Topic (UTF-8 + \0)   │ Payload (variable)       │
//! │ Big-endian u32   │ "frame", "object"... │ JSON or Postcard binary  │
//! └──────────────────┴──────────────────────┴──────────────────────────┘
//! ```
//!
//! - **Length field**: size of topic + terminator + payload
//! - **Maximum frame size**: 1MB (1,048,576 bytes)
//!
//! ## Wire Formats
//!
//! - **JSON** (default): human-readable, for debugging and cross-language clients
//! - **Postcard**: compact binary, for production links
//!
//! ## Error Handling
//!
//! - **Oversized frame**: connection closed
//! - **Missing topic terminator / bad UTF-8**: frame discarded
//! - **Deserialization failure**: frame logged and discarded, connection stays open

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Largest frame accepted from a peer
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Supported wire formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Binary format using postcard - fast and compact
    Postcard,
    /// JSON format - human-readable for debugging
    #[default]
    Json,
}

/// Serializer for the configured wire format
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    format: WireFormat,
}

impl Serializer {
    /// Create a new serializer for the given format
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    /// Serialize a value to bytes
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        match self.format {
            WireFormat::Postcard => {
                postcard::to_allocvec(value).map_err(|e| Error::Serialization(e.to_string()))
            }
            WireFormat::Json => {
                serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    }

    /// Deserialize bytes to a value
    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self.format {
            WireFormat::Postcard => {
                postcard::from_bytes(bytes).map_err(|e| Error::Serialization(e.to_string()))
            }
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    }
}

/// Create a serializer for the given wire format
pub fn create_serializer(format: WireFormat) -> Serializer {
    Serializer::new(format)
}

/// Write one length-prefixed, topic-tagged frame into `buffer` (cleared first)
pub fn encode_frame(topic: &str, payload: &[u8], buffer: &mut Vec<u8>) -> Result<()> {
    let body_len = topic.len() + 1 + payload.len();
    if body_len > MAX_FRAME_SIZE {
        return Err(Error::Serialization(format!(
            "frame too large: {} bytes",
            body_len
        )));
    }

    buffer.clear();
    buffer.reserve(4 + body_len);
    buffer.extend_from_slice(&(body_len as u32).to_be_bytes());
    buffer.extend_from_slice(topic.as_bytes());
    buffer.push(0);
    buffer.extend_from_slice(payload);
    Ok(())
}

/// Split a frame body (everything after the length prefix) into topic and payload
pub fn split_frame(body: &[u8]) -> Result<(&str, &[u8])> {
    let nul = body
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::Serialization("frame has no topic terminator".to_string()))?;
    let topic = std::str::from_utf8(&body[..nul])
        .map_err(|e| Error::Serialization(format!("topic is not UTF-8: {}", e)))?;
    Ok((topic, &body[nul + 1..]))
}
