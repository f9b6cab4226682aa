//! Ranging-array observations from scaled channel readings

use crate::core::source::ObservationSource;
use crate::core::types::{EdgeTriple, Observation, RangeSample, SourceKind};
use crate::projection::{GeometricProjector, MountingProjector};

/// One polling cycle of a ranging array
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSweep {
    pub timestamp_us: u64,
    pub samples: Vec<RangeSample>,
}

/// Turns each echo into an arc across the sensor's beam
///
/// A sonar only reports how far the nearest echo is, not where inside the beam
/// it came from. The object is placed on the beam axis (bottom-mid) and its
/// edges on the two beam boundaries, all at the measured distance.
pub struct RangeArraySource {
    tag: String,
    half_beam: f64,
}

impl RangeArraySource {
    /// `beam_width` is the full cone angle in radians
    pub fn new(tag: impl Into<String>, beam_width: f64) -> Self {
        Self {
            tag: tag.into(),
            half_beam: beam_width / 2.0,
        }
    }

    fn project_sample(&self, sample: &RangeSample) -> Option<EdgeTriple> {
        let projector = MountingProjector::new(sample.position, sample.direction);
        let range = sample.distance();
        Some(EdgeTriple::new(
            projector.project([range, self.half_beam])?,
            projector.project([range, -self.half_beam])?,
            projector.project([range, 0.0])?,
        ))
    }
}

impl ObservationSource for RangeArraySource {
    type Input = RangeSweep;

    fn source_tag(&self) -> &str {
        &self.tag
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Ranging
    }

    fn observe(&self, sweep: &RangeSweep) -> Vec<Observation> {
        sweep
            .samples
            .iter()
            .filter_map(|sample| {
                let edges = self.project_sample(sample)?;
                Some(Observation {
                    source: format!("{}/{}", self.tag, sample.channel),
                    kind: SourceKind::Ranging,
                    timestamp_us: sweep.timestamp_us,
                    edges,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Cartesian3, Direction};
    use approx::assert_relative_eq;

    fn sample(channel: u16, raw: u16, position: Cartesian3, direction: Direction) -> RangeSample {
        RangeSample {
            channel,
            raw,
            scale: 0.01,
            position,
            direction,
        }
    }

    #[test]
    fn test_beam_edges_straddle_axis() {
        let source = RangeArraySource::new("sonar", 0.4);
        let sweep = RangeSweep {
            timestamp_us: 7,
            samples: vec![sample(2, 300, Cartesian3::new(3.7, 0.0, 0.5), Direction::default())],
        };
        let observations = source.observe(&sweep);

        assert_eq!(observations.len(), 1);
        let obs = &observations[0];
        assert_eq!(obs.source, "sonar/2");
        assert_eq!(obs.kind, SourceKind::Ranging);
        assert_eq!(obs.timestamp_us, 7);

        let edges = obs.edges;
        assert_relative_eq!(edges.bottom_mid.x, 6.7, epsilon = 1e-12);
        assert_relative_eq!(edges.bottom_mid.y, 0.0, epsilon = 1e-12);
        // Left edge has the larger heading
        assert!(edges.bottom_left.heading() > edges.bottom_right.heading());
        assert_relative_eq!(edges.bottom_left.y, -edges.bottom_right.y, epsilon = 1e-12);
        assert_relative_eq!(
            edges.bottom_left.ground_distance(&edges.bottom_right),
            2.0 * 3.0 * 0.2f64.sin(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_one_observation_per_channel() {
        let source = RangeArraySource::new("sonar", 0.3);
        let sweep = RangeSweep {
            timestamp_us: 0,
            samples: (0..4)
                .map(|c| sample(c, 100, Cartesian3::default(), Direction::default()))
                .collect(),
        };
        let tags: Vec<String> = source.observe(&sweep).into_iter().map(|o| o.source).collect();
        assert_eq!(tags, vec!["sonar/0", "sonar/1", "sonar/2", "sonar/3"]);
    }
}
