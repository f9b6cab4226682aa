//! Core data types shared by every stage of the estimation pipeline.
//!
//! Key types:
//! - [`SensorFrame`]: Private copy of a camera frame, owned for one cycle
//! - [`RangeSample`]: One scaled reading from a ranging channel
//! - [`DetectionBox`]: Image-plane rectangle handed over by the detector
//! - [`ProjectedPoint`]: Point in the ego frame
//! - [`Observation`]: Sensor-agnostic estimator input (three points plus a source tag)

use serde::{Deserialize, Serialize};

/// Current wall-clock time in microseconds since the Unix epoch
#[inline]
pub fn now_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Cartesian offset in the ego frame (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cartesian3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Angular direction: azimuth around the vertical axis, zenith above the ground plane (radians)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Direction {
    pub azimuth: f64,
    pub zenith: f64,
}

impl Direction {
    pub const fn new(azimuth: f64, zenith: f64) -> Self {
        Self { azimuth, zenith }
    }
}

/// Pixel buffer copied out of a shared-memory segment
///
/// Immutable once captured; dropped at the end of the estimation cycle.
#[derive(Debug, Clone)]
pub struct SensorFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub source: String,
    pub timestamp_us: u64,
}

impl SensorFrame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u32,
        source: impl Into<String>,
        timestamp_us: u64,
    ) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            source: source.into(),
            timestamp_us,
        }
    }

    /// Raw pixel bytes, row-major, `channels` bytes per pixel
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One ranging channel reading together with its mounting geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSample {
    pub channel: u16,
    pub raw: u16,
    pub scale: f64,
    pub position: Cartesian3,
    pub direction: Direction,
}

impl RangeSample {
    /// Physical distance in meters (`raw × scale`)
    #[inline]
    pub fn distance(&self) -> f64 {
        f64::from(self.raw) * self.scale
    }
}

/// Axis-aligned image rectangle in pixels; `y` grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub timestamp_us: u64,
}

impl DetectionBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64, timestamp_us: u64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            timestamp_us,
        }
    }

    pub fn bottom_left(&self) -> (f64, f64) {
        (self.x, self.y + self.height)
    }

    pub fn bottom_right(&self) -> (f64, f64) {
        (self.x + self.width, self.y + self.height)
    }

    pub fn bottom_mid(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height)
    }
}

/// Point in the ego frame (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ProjectedPoint {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Bearing from the ego reference axis
    #[inline]
    pub fn heading(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Distance from the ego origin in the ground plane
    #[inline]
    pub fn ground_norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Ground-plane distance to another point
    #[inline]
    pub fn ground_distance(&self, other: &ProjectedPoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// The three ground points that bound an object seen by a sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeTriple {
    pub bottom_left: ProjectedPoint,
    pub bottom_right: ProjectedPoint,
    pub bottom_mid: ProjectedPoint,
}

impl EdgeTriple {
    pub const fn new(
        bottom_left: ProjectedPoint,
        bottom_right: ProjectedPoint,
        bottom_mid: ProjectedPoint,
    ) -> Self {
        Self {
            bottom_left,
            bottom_right,
            bottom_mid,
        }
    }
}

/// Kind of sensor an observation came from; selects the confidence profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Camera,
    Ranging,
}

/// Sensor-agnostic estimator input
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub source: String,
    pub kind: SourceKind,
    pub timestamp_us: u64,
    pub edges: EdgeTriple,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_corners() {
        let b = DetectionBox::new(10.0, 20.0, 40.0, 30.0, 0);
        assert_eq!(b.bottom_left(), (10.0, 50.0));
        assert_eq!(b.bottom_right(), (50.0, 50.0));
        assert_eq!(b.bottom_mid(), (30.0, 50.0));
    }

    #[test]
    fn test_range_sample_distance() {
        let sample = RangeSample {
            channel: 3,
            raw: 512,
            scale: 0.01,
            position: Cartesian3::default(),
            direction: Direction::default(),
        };
        assert!((sample.distance() - 5.12).abs() < 1e-9);
    }

    #[test]
    fn test_projected_point_geometry() {
        let p = ProjectedPoint::new(3.0, 4.0, 1.5);
        assert!((p.ground_norm() - 5.0).abs() < 1e-12);
        assert!((p.heading() - 4.0f64.atan2(3.0)).abs() < 1e-12);
        let q = ProjectedPoint::new(0.0, 0.0, 0.0);
        assert!((p.ground_distance(&q) - 5.0).abs() < 1e-12);
        assert!(!ProjectedPoint::new(f64::NAN, 0.0, 0.0).is_finite());
    }
}
