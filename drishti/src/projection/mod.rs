//! Projection of sensor-local points into the ego frame.
//!
//! Both camera and ranging sensors go through [`GeometricProjector`]; only the
//! meaning of the 2D input differs:
//!
//! | Projector | Input `[a, b]` | Output |
//! |-----------|----------------|--------|
//! | [`HomographyProjector`] | pixel `(u, v)` | ground-plane point, `z = 0` |
//! | [`MountingProjector`] | `(range, beam offset)` | point along the mounted beam |

mod homography;
mod mounting;

pub use homography::HomographyProjector;
pub use mounting::MountingProjector;

use crate::core::types::ProjectedPoint;

/// Maps a 2D sensor-local point into the ego frame
pub trait GeometricProjector: Send + Sync {
    /// Returns `None` when the point has no finite image in the ego frame
    fn project(&self, point: [f64; 2]) -> Option<ProjectedPoint>;
}
