//! Ground-plane homography for calibrated cameras

use super::GeometricProjector;
use crate::core::types::ProjectedPoint;
use crate::error::{Error, Result};
use nalgebra::{Matrix3, Vector3};

/// Smallest homogeneous scale accepted before a pixel is considered at infinity
const EPS: f64 = 1e-9;

/// Projects image pixels onto the ground plane with a 3×3 homography
///
/// The calibration maps `(u, v, 1)` to homogeneous ego-frame ground
/// coordinates `(X, Y, W)`; the projected point is `(X/W, Y/W, 0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HomographyProjector {
    h: Matrix3<f64>,
}

impl HomographyProjector {
    pub fn new(h: Matrix3<f64>) -> Result<Self> {
        if h.iter().any(|v| !v.is_finite()) {
            return Err(Error::Config(
                "camera homography contains non-finite values".to_string(),
            ));
        }
        Ok(Self { h })
    }

    /// Build from nine row-major coefficients (as stored in the config file)
    pub fn from_row_major(coefficients: &[f64]) -> Result<Self> {
        if coefficients.len() != 9 {
            return Err(Error::Config(format!(
                "camera homography needs 9 coefficients, got {}",
                coefficients.len()
            )));
        }
        Self::new(Matrix3::from_row_slice(coefficients))
    }

    pub fn identity() -> Self {
        Self {
            h: Matrix3::identity(),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.h
    }
}

impl GeometricProjector for HomographyProjector {
    fn project(&self, point: [f64; 2]) -> Option<ProjectedPoint> {
        let v = self.h * Vector3::new(point[0], point[1], 1.0);
        let w = v[2];
        if !w.is_finite() || w.abs() <= EPS || !v[0].is_finite() || !v[1].is_finite() {
            return None;
        }
        Some(ProjectedPoint::new(v[0] / w, v[1] / w, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_projection() {
        let projector = HomographyProjector::identity();
        let p = projector.project([-2.0, 20.0]).unwrap();
        assert_relative_eq!(p.x, -2.0);
        assert_relative_eq!(p.y, 20.0);
        assert_relative_eq!(p.z, 0.0);
    }

    #[test]
    fn test_dehomogenizes() {
        // Uniform scale of 2 in W must cancel out
        let projector = HomographyProjector::from_row_major(&[
            2.0, 0.0, 0.0, //
            0.0, 2.0, 0.0, //
            0.0, 0.0, 2.0,
        ])
        .unwrap();
        let p = projector.project([3.0, 7.0]).unwrap();
        assert_relative_eq!(p.x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point_at_infinity() {
        // Pixels on the horizon line v = 100 have W = 0
        let projector = HomographyProjector::from_row_major(&[
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 1.0, -100.0,
        ])
        .unwrap();
        assert!(projector.project([50.0, 100.0]).is_none());
        assert!(projector.project([50.0, 150.0]).is_some());
    }

    #[test]
    fn test_rejects_bad_calibration() {
        assert!(matches!(
            HomographyProjector::from_row_major(&[1.0; 8]),
            Err(Error::Config(_))
        ));
        let mut coeffs = [0.0; 9];
        coeffs[4] = f64::NAN;
        assert!(HomographyProjector::from_row_major(&coeffs).is_err());
    }
}
