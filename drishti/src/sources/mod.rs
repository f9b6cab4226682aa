//! Observation sources for each supported sensor kind

pub mod camera;
pub mod ranging;

pub use camera::CameraSource;
pub use ranging::{RangeArraySource, RangeSweep};
