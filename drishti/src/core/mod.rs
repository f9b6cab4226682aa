//! Core abstractions for sensor sources.
//!
//! - [`source::ObservationSource`]: Trait to implement for new sensor kinds
//! - [`types`]: Frames, samples, projected points and observations

pub mod source;
pub mod types;
