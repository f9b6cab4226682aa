//! Drishti - sensor-to-world object estimation
//!
//! Turns camera detections and ultrasonic ranging echoes into canonical
//! [`DetectedObject`](streaming::DetectedObject) records in the ego vehicle's
//! frame and publishes them on a TCP bus.
//!
//! ## Pipeline
//!
//! - [`acquisition`]: shared-memory frame copies and ranging-array polling
//! - [`projection`]: sensor-local points to ego-frame points
//! - [`sources`]: per-sensor reduction to bottom-left / bottom-right / bottom-mid triples
//! - [`estimation`]: bearing, angular size, distance and plausibility checks
//! - [`publish`]: record assembly and hand-off to a sink
//! - [`pipeline`]: lifecycle and per-cycle orchestration
//!
//! ## Wire Protocol
//!
//! Frames are `[u32 BE length][topic\0][payload]` with JSON or Postcard
//! payloads. See [`streaming::wire`].

pub mod acquisition;
pub mod config;
pub mod core;
pub mod error;
pub mod estimation;
pub mod pipeline;
pub mod projection;
pub mod publish;
pub mod sources;
pub mod streaming;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use pipeline::{CycleReport, Lifecycle, Pipeline};
