//! Object estimation from projected edge points
//!
//! Every sensor hands the estimator three ground points: the bottom-left (BL),
//! bottom-right (BR) and bottom-mid (BM) of the object. From these:
//!
//! ```text
//! heading_left  = atan2(BL.y, BL.x)
//! heading_right = atan2(BR.y, BR.x)
//! angular_size  = wrap(heading_left - heading_right)   (must be > 0)
//! azimuth       = wrap(heading_right + angular_size / 2)
//! distance      = |BM|                              (ground plane)
//! width         = |BR - BL|                         (ground plane)
//! ```
//!
//! `wrap` folds an angle into (-π, π], so an object straight behind the
//! vehicle (edges on both sides of ±π) keeps a small positive angular size.
//! The left edge has the larger heading in the ego frame, so a non-positive
//! angular size means the edges came out swapped or collapsed.
//!
//! Estimates that fail the plausibility limits of their sensor profile are
//! returned as a [`Rejection`] and never published.

pub mod config;

pub use config::{
    Confidences, EstimatorConfig, NOT_COMPUTED, PlausibilityLimits, SourceProfile,
};

use crate::core::types::{EdgeTriple, Observation, SourceKind};
use std::f64::consts::{PI, TAU};
use std::fmt;

/// Fold an angle into (-π, π]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI { PI } else { wrapped }
}

/// Geometry derived from one edge triple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeGeometry {
    pub heading_left: f64,
    pub heading_right: f64,
    pub angular_size: f64,
    pub azimuth: f64,
    pub distance: f64,
    pub width: f64,
}

impl EdgeGeometry {
    pub fn measure(edges: &EdgeTriple) -> Self {
        let heading_left = edges.bottom_left.heading();
        let heading_right = edges.bottom_right.heading();
        let angular_size = wrap_angle(heading_left - heading_right);
        Self {
            heading_left,
            heading_right,
            angular_size,
            azimuth: wrap_angle(heading_right + angular_size / 2.0),
            distance: edges.bottom_mid.ground_norm(),
            width: edges.bottom_left.ground_distance(&edges.bottom_right),
        }
    }
}

/// An accepted estimate, ready to be packaged for publication
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub source: String,
    pub kind: SourceKind,
    pub timestamp_us: u64,
    pub object_type: String,
    pub geometry: EdgeGeometry,
    pub confidences: Confidences,
}

/// Why an observation was not turned into an estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// A projected coordinate was NaN or infinite
    NonFinite,
    /// Edges swapped or collapsed
    NonPositiveAngularSize { angular_size: f64 },
    TooClose { distance: f64, min: f64 },
    TooFar { distance: f64, max: f64 },
    TooNarrow { width: f64, min: f64 },
    TooWide { width: f64, max: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NonFinite => write!(f, "non-finite projection"),
            Rejection::NonPositiveAngularSize { angular_size } => {
                write!(f, "angular size {:.4} rad is not positive", angular_size)
            }
            Rejection::TooClose { distance, min } => {
                write!(f, "distance {:.2} m below {:.2} m", distance, min)
            }
            Rejection::TooFar { distance, max } => {
                write!(f, "distance {:.2} m beyond {:.2} m", distance, max)
            }
            Rejection::TooNarrow { width, min } => {
                write!(f, "width {:.2} m below {:.2} m", width, min)
            }
            Rejection::TooWide { width, max } => {
                write!(f, "width {:.2} m above {:.2} m", width, max)
            }
        }
    }
}

/// Sensor-agnostic bearing/distance/size estimator
pub struct ObjectEstimator {
    config: EstimatorConfig,
}

impl ObjectEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn profile(&self, kind: SourceKind) -> &SourceProfile {
        match kind {
            SourceKind::Camera => &self.config.camera,
            SourceKind::Ranging => &self.config.ranging,
        }
    }

    /// Estimate one observation, or explain why it is implausible
    pub fn estimate(&self, observation: &Observation) -> Result<Estimate, Rejection> {
        let edges = &observation.edges;
        if !(edges.bottom_left.is_finite()
            && edges.bottom_right.is_finite()
            && edges.bottom_mid.is_finite())
        {
            return Err(Rejection::NonFinite);
        }

        let profile = self.profile(observation.kind);
        let geometry = EdgeGeometry::measure(edges);
        check_plausible(&geometry, &profile.limits)?;

        Ok(Estimate {
            source: observation.source.clone(),
            kind: observation.kind,
            timestamp_us: observation.timestamp_us,
            object_type: profile.object_type.clone(),
            geometry,
            confidences: profile.confidences,
        })
    }
}

impl Default for ObjectEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

fn check_plausible(g: &EdgeGeometry, limits: &PlausibilityLimits) -> Result<(), Rejection> {
    if g.angular_size <= 0.0 {
        return Err(Rejection::NonPositiveAngularSize {
            angular_size: g.angular_size,
        });
    }
    if g.distance < limits.min_distance {
        return Err(Rejection::TooClose {
            distance: g.distance,
            min: limits.min_distance,
        });
    }
    if g.distance > limits.max_distance {
        return Err(Rejection::TooFar {
            distance: g.distance,
            max: limits.max_distance,
        });
    }
    if g.width < limits.min_width {
        return Err(Rejection::TooNarrow {
            width: g.width,
            min: limits.min_width,
        });
    }
    if g.width > limits.max_width {
        return Err(Rejection::TooWide {
            width: g.width,
            max: limits.max_width,
        });
    }
    Ok(())
}
