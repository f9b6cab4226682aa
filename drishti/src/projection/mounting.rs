//! Fixed mounting transform for ranging sensors

use super::GeometricProjector;
use crate::core::types::{Cartesian3, Direction, ProjectedPoint};

/// Places a range measurement along a sensor's mounted beam
///
/// Input is `[range, beam_offset]`: the measured distance in meters and an
/// azimuth offset from the beam axis in radians (0 for the axis itself).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountingProjector {
    position: Cartesian3,
    direction: Direction,
}

impl MountingProjector {
    pub const fn new(position: Cartesian3, direction: Direction) -> Self {
        Self {
            position,
            direction,
        }
    }
}

impl GeometricProjector for MountingProjector {
    fn project(&self, point: [f64; 2]) -> Option<ProjectedPoint> {
        let [range, offset] = point;
        let azimuth = self.direction.azimuth + offset;
        let (sin_zen, cos_zen) = self.direction.zenith.sin_cos();
        let projected = ProjectedPoint::new(
            self.position.x + range * cos_zen * azimuth.cos(),
            self.position.y + range * cos_zen * azimuth.sin(),
            self.position.z + range * sin_zen,
        );
        projected.is_finite().then_some(projected)
    }
}
