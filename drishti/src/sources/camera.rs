//! Camera observations from detection boxes

use crate::core::source::ObservationSource;
use crate::core::types::{DetectionBox, EdgeTriple, Observation, SourceKind};
use crate::projection::GeometricProjector;

/// Projects the bottom edge of each detection box onto the ground
///
/// The bottom edge is where the object touches the road, so its left, right and
/// middle points are the ones with a meaningful ground-plane position.
pub struct CameraSource<P> {
    tag: String,
    projector: P,
}

impl<P: GeometricProjector> CameraSource<P> {
    pub fn new(tag: impl Into<String>, projector: P) -> Self {
        Self {
            tag: tag.into(),
            projector,
        }
    }

    fn project_box(&self, b: &DetectionBox) -> Option<EdgeTriple> {
        let (lx, ly) = b.bottom_left();
        let (rx, ry) = b.bottom_right();
        let (mx, my) = b.bottom_mid();
        Some(EdgeTriple::new(
            self.projector.project([lx, ly])?,
            self.projector.project([rx, ry])?,
            self.projector.project([mx, my])?,
        ))
    }
}

impl<P: GeometricProjector> ObservationSource for CameraSource<P> {
    type Input = [DetectionBox];

    fn source_tag(&self) -> &str {
        &self.tag
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Camera
    }

    fn observe(&self, boxes: &[DetectionBox]) -> Vec<Observation> {
        boxes
            .iter()
            .filter_map(|b| {
                let Some(edges) = self.project_box(b) else {
                    log::debug!("Camera '{}': box {:?} does not project to the ground", self.tag, b);
                    return None;
                };
                Some(Observation {
                    source: self.tag.clone(),
                    kind: SourceKind::Camera,
                    timestamp_us: b.timestamp_us,
                    edges,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::HomographyProjector;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_calibration_bottom_edge() {
        let source = CameraSource::new("front-camera", HomographyProjector::identity());
        let observations = source.observe(&[DetectionBox::new(-2.0, 0.0, 4.0, 20.0, 42)]);

        assert_eq!(observations.len(), 1);
        let obs = &observations[0];
        assert_eq!(obs.source, "front-camera");
        assert_eq!(obs.kind, SourceKind::Camera);
        assert_eq!(obs.timestamp_us, 42);
        assert_relative_eq!(obs.edges.bottom_left.x, -2.0);
        assert_relative_eq!(obs.edges.bottom_left.y, 20.0);
        assert_relative_eq!(obs.edges.bottom_right.x, 2.0);
        assert_relative_eq!(obs.edges.bottom_mid.x, 0.0);
        assert_relative_eq!(obs.edges.bottom_mid.y, 20.0);
    }

    #[test]
    fn test_unprojectable_box_skipped() {
        // Bottom edge on the horizon (v = 100) has no ground position
        let projector = HomographyProjector::from_row_major(&[
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 1.0, -100.0,
        ])
        .unwrap();
        let source = CameraSource::new("front-camera", projector);
        let observations = source.observe(&[
            DetectionBox::new(0.0, 50.0, 10.0, 50.0, 0),
            DetectionBox::new(0.0, 100.0, 10.0, 50.0, 0),
        ]);
        assert_eq!(observations.len(), 1);
    }
}
