//! Packaging estimates into bus records and handing them to a sink

use crate::core::types::Direction;
use crate::estimation::{Estimate, NOT_COMPUTED};
use crate::streaming::messages::{DetectedObject, UNASSIGNED_OBJECT_ID};
use crossbeam_channel::Sender;
use std::sync::Arc;

/// Destination for published objects
///
/// Sending never blocks and never reports failure to the caller.
pub trait ObjectSink {
    fn send(&self, object: DetectedObject);
}

impl ObjectSink for Sender<DetectedObject> {
    fn send(&self, object: DetectedObject) {
        if let Err(e) = Sender::send(self, object) {
            log::debug!("Object receiver gone, dropping object: {}", e);
        }
    }
}

impl<T: ObjectSink + ?Sized> ObjectSink for Arc<T> {
    fn send(&self, object: DetectedObject) {
        (**self).send(object)
    }
}

/// Build the canonical record for an accepted estimate
///
/// Rates are not tracked, so both rate attributes are zero and marked
/// not computed. Zenith is always zero.
pub fn build_object(estimate: &Estimate) -> DetectedObject {
    let g = &estimate.geometry;
    let c = &estimate.confidences;
    DetectedObject {
        timestamp_us: estimate.timestamp_us,
        object_type: estimate.object_type.clone(),
        object_type_confidence: c.object_type,
        direction: Direction::new(g.azimuth, 0.0),
        direction_confidence: c.direction,
        direction_rate: Direction::new(0.0, 0.0),
        direction_rate_confidence: NOT_COMPUTED,
        distance: g.distance,
        distance_confidence: c.distance,
        angular_size: g.angular_size,
        angular_size_confidence: c.angular_size,
        angular_size_rate: 0.0,
        angular_size_rate_confidence: NOT_COMPUTED,
        confidence: c.overall,
        sources: vec![estimate.source.clone()],
        properties: Vec::new(),
        object_id: UNASSIGNED_OBJECT_ID,
    }
}

/// Validates records and forwards them to the sink
pub struct ObjectPublisher<S: ObjectSink> {
    sink: S,
    /// Log every published object
    debug: bool,
    published: u64,
    dropped: u64,
}

impl<S: ObjectSink> ObjectPublisher<S> {
    pub fn new(sink: S, debug: bool) -> Self {
        Self {
            sink,
            debug,
            published: 0,
            dropped: 0,
        }
    }

    /// Publish one estimate; returns false if the record was dropped
    pub fn publish(&mut self, estimate: &Estimate) -> bool {
        let object = build_object(estimate);
        if !object.is_valid() {
            self.dropped += 1;
            log::warn!(
                "Dropping non-conforming object from {}: {:?}",
                estimate.source,
                object
            );
            return false;
        }

        if self.debug {
            let g = &estimate.geometry;
            log::debug!(
                "Sending DetectedObject from {}: azimuth {:.4} rad ({:.2} deg), \
                 angular size {:.4} rad ({:.2} deg), distance {:.2} m, width {:.2} m",
                estimate.source,
                g.azimuth,
                g.azimuth.to_degrees(),
                g.angular_size,
                g.angular_size.to_degrees(),
                g.distance,
                g.width
            );
        }

        self.sink.send(object);
        self.published += 1;
        true
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns (published, dropped)
    pub fn get_stats(&self) -> (u64, u64) {
        (self.published, self.dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceKind;
    use crate::estimation::{Confidences, EdgeGeometry};
    use approx::assert_relative_eq;

    fn estimate() -> Estimate {
        Estimate {
            source: "front-camera".to_string(),
            kind: SourceKind::Camera,
            timestamp_us: 42,
            object_type: "vehicle".to_string(),
            geometry: EdgeGeometry {
                heading_left: 1.6705,
                heading_right: 1.4711,
                angular_size: 0.1994,
                azimuth: 1.5708,
                distance: 20.0,
                width: 4.0,
            },
            confidences: Confidences::camera(),
        }
    }

    #[test]
    fn test_object_fields() {
        let object = build_object(&estimate());

        assert_eq!(object.timestamp_us, 42);
        assert_eq!(object.object_type, "vehicle");
        assert_relative_eq!(object.direction.azimuth, 1.5708);
        assert_eq!(object.direction.zenith, 0.0);
        assert_eq!(object.direction_confidence, 0.1);
        assert_eq!(object.direction_rate_confidence, -1.0);
        assert_eq!(object.distance, 20.0);
        assert_eq!(object.distance_confidence, 0.5);
        assert_eq!(object.angular_size_confidence, -1.0);
        assert_eq!(object.angular_size_rate_confidence, -1.0);
        assert_eq!(object.confidence, 0.2);
        assert_eq!(object.sources, vec!["front-camera".to_string()]);
        assert!(object.properties.is_empty());
        assert_eq!(object.object_id, u16::MAX);
        assert!(object.is_valid());
    }

    #[test]
    fn test_publish_through_channel() {
        let (tx, rx) = crossbeam_channel::unbounded::<DetectedObject>();
        let mut publisher = ObjectPublisher::new(tx, true);

        assert!(publisher.publish(&estimate()));
        assert_eq!(rx.try_recv().unwrap().distance, 20.0);
        assert_eq!(publisher.get_stats(), (1, 0));
    }

    #[test]
    fn test_invalid_record_dropped() {
        let (tx, rx) = crossbeam_channel::unbounded::<DetectedObject>();
        let mut publisher = ObjectPublisher::new(tx, false);

        let mut bad = estimate();
        bad.confidences.overall = 2.0;
        assert!(!publisher.publish(&bad));
        assert!(rx.try_recv().is_err());
        assert_eq!(publisher.get_stats(), (0, 1));
    }

    #[test]
    fn test_disconnected_channel_is_silent() {
        let (tx, rx) = crossbeam_channel::unbounded::<DetectedObject>();
        drop(rx);
        let mut publisher = ObjectPublisher::new(tx, false);
        assert!(publisher.publish(&estimate()));
    }
}
