//! Bus messages, wire format and TCP transport

pub mod messages;
pub mod tcp_publisher;
pub mod tcp_receiver;
pub mod wire;

pub use messages::{BusMessage, DetectedObject, DetectionSet, FrameNotification};
pub use tcp_publisher::TcpPublisher;
pub use tcp_receiver::TcpReceiver;
pub use wire::{Serializer, WireFormat, create_serializer};
