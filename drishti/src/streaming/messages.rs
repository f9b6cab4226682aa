//! Message types carried on the perception bus.
//!
//! - Frame notifications (inbound): a camera wrote a frame into shared memory
//! - Detection sets (inbound): an upstream detector found boxes in a frame
//! - Detected objects (outbound): canonical records for the fusion layer

use crate::core::types::{DetectionBox, Direction};
use serde::{Deserialize, Serialize};

/// Topic for frame-ready notifications
pub const TOPIC_FRAME: &str = "frame";
/// Topic for upstream detection sets
pub const TOPIC_DETECTIONS: &str = "detections";
/// Topic for published objects
pub const TOPIC_OBJECT: &str = "object";

/// Identifier carried by every object; no cross-frame identity is assigned
pub const UNASSIGNED_OBJECT_ID: u16 = u16::MAX;

/// A camera announces that a new frame is in its shared-memory segment
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameNotification {
    /// Shared-memory segment handle
    pub segment: String,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    /// Camera name
    pub source: String,
    /// Capture time in microseconds since epoch
    pub timestamp_us: u64,
}

impl FrameNotification {
    /// Number of bytes the frame occupies, `None` if empty or overflowing
    pub fn byte_len(&self) -> Option<usize> {
        let len = (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.bytes_per_pixel as usize)?;
        (len > 0).then_some(len)
    }
}

/// Boxes an upstream detector found in one camera frame
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DetectionSet {
    /// Camera name
    pub source: String,
    /// Frame capture time; stamps any box whose own timestamp is 0
    pub timestamp_us: u64,
    pub boxes: Vec<DetectionBox>,
}

/// Canonical object record published to the fusion layer
///
/// Confidences are in [-1, 1]; -1 marks an attribute that was not computed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DetectedObject {
    /// Time the underlying measurement was taken (µs since epoch)
    pub timestamp_us: u64,
    pub object_type: String,
    pub object_type_confidence: f64,
    pub direction: Direction,
    pub direction_confidence: f64,
    pub direction_rate: Direction,
    pub direction_rate_confidence: f64,
    /// Meters
    pub distance: f64,
    pub distance_confidence: f64,
    /// Radians
    pub angular_size: f64,
    pub angular_size_confidence: f64,
    pub angular_size_rate: f64,
    pub angular_size_rate_confidence: f64,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub properties: Vec<String>,
    pub object_id: u16,
}

impl DetectedObject {
    /// All numeric fields finite and all confidences within [-1, 1]
    pub fn is_valid(&self) -> bool {
        let values = [
            self.direction.azimuth,
            self.direction.zenith,
            self.direction_rate.azimuth,
            self.direction_rate.zenith,
            self.distance,
            self.angular_size,
            self.angular_size_rate,
        ];
        let confidences = [
            self.object_type_confidence,
            self.direction_confidence,
            self.direction_rate_confidence,
            self.distance_confidence,
            self.angular_size_confidence,
            self.angular_size_rate_confidence,
            self.confidence,
        ];
        values.iter().all(|v| v.is_finite())
            && confidences.iter().all(|c| (-1.0..=1.0).contains(c))
    }
}

/// Everything that travels on the bus
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BusMessage {
    FrameReady(FrameNotification),
    Detections(DetectionSet),
    Object(DetectedObject),
}

impl BusMessage {
    /// Topic the message is framed under
    pub fn topic(&self) -> &'static str {
        match self {
            BusMessage::FrameReady(_) => TOPIC_FRAME,
            BusMessage::Detections(_) => TOPIC_DETECTIONS,
            BusMessage::Object(_) => TOPIC_OBJECT,
        }
    }
}
