//! Top-level estimation pipeline
//!
//! Owns every stage and runs one synchronous cycle per bus message or poll tick:
//!
//! ```text
//! FrameReady ─► FrameBufferAcquirer ─► VehicleDetector ─┐
//! Detections ───────────────────────────────────────────┼─► CameraSource ─┐
//! poll tick  ─► RangeArrayReader ─► RangeArraySource ───────────────────────┼─► ObjectEstimator ─► ObjectPublisher
//! ```
//!
//! Nothing is processed until [`Pipeline::set_up`] has moved the lifecycle to
//! [`Lifecycle::Ready`].

use crate::acquisition::{FrameBufferAcquirer, IioAdcReader, RangeArrayReader, SharedMemoryFactory};
use crate::config::AppConfig;
use crate::core::source::ObservationSource;
use crate::core::types::{DetectionBox, Observation, SensorFrame, now_us};
use crate::error::{Error, Result};
use crate::estimation::{EstimatorConfig, ObjectEstimator, SourceProfile};
use crate::projection::HomographyProjector;
use crate::publish::{ObjectPublisher, ObjectSink};
use crate::sources::{CameraSource, RangeArraySource, RangeSweep};
use crate::streaming::messages::{BusMessage, DetectionSet, FrameNotification};
use std::sync::Arc;

/// Pipeline lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed but not set up; all input is ignored
    Uninitialized,
    /// Processing input
    Ready,
}

/// Finds vehicles in a camera frame
///
/// Returned boxes should carry the frame's timestamp. Without a detector the
/// pipeline skips `FrameReady` and relies on upstream `Detections` messages.
pub trait VehicleDetector: Send {
    fn detect(&mut self, frame: &SensorFrame) -> Vec<DetectionBox>;
}

/// Outcome of one estimation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Observations handed to the estimator
    pub observations: usize,
    pub published: usize,
    /// Observations that failed the plausibility checks
    pub rejected: usize,
}

impl CycleReport {
    fn merge(&mut self, other: CycleReport) {
        self.observations += other.observations;
        self.published += other.published;
        self.rejected += other.rejected;
    }
}

/// Range reader paired with the source that projects its samples
struct RangeStage {
    reader: RangeArrayReader,
    source: RangeArraySource,
}

pub struct Pipeline<S: ObjectSink> {
    lifecycle: Lifecycle,
    acquirer: FrameBufferAcquirer,
    detector: Option<Box<dyn VehicleDetector>>,
    camera: CameraSource<HomographyProjector>,
    ranges: Option<RangeStage>,
    estimator: ObjectEstimator,
    publisher: ObjectPublisher<S>,
    totals: CycleReport,
}

impl<S: ObjectSink> Pipeline<S> {
    pub fn new(
        acquirer: FrameBufferAcquirer,
        camera: CameraSource<HomographyProjector>,
        estimator: ObjectEstimator,
        publisher: ObjectPublisher<S>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            acquirer,
            detector: None,
            camera,
            ranges: None,
            estimator,
            publisher,
            totals: CycleReport::default(),
        }
    }

    /// Build every stage from the application config
    ///
    /// The range array, when configured, reads from the IIO device named in
    /// the config. The pipeline is returned uninitialized.
    pub fn from_config(
        config: &AppConfig,
        factory: Arc<dyn SharedMemoryFactory>,
        sink: S,
    ) -> Result<Self> {
        let projector = HomographyProjector::from_row_major(&config.camera.homography)?;
        let mut pipeline = Self::new(
            FrameBufferAcquirer::new(factory),
            CameraSource::new(config.camera.source.clone(), projector),
            ObjectEstimator::new(config.estimator.clone()),
            ObjectPublisher::new(sink, config.debug),
        );

        if let Some(ranges) = &config.range_array {
            let reader = RangeArrayReader::new(
                ranges.positions.clone(),
                ranges.directions.clone(),
                ranges.channels.clone(),
                ranges.scale,
                IioAdcReader::new(ranges.adc_device.clone()),
            )?;
            pipeline = pipeline.with_range_array(
                reader,
                RangeArraySource::new(ranges.tag.clone(), ranges.beam_width),
            );
        }

        Ok(pipeline)
    }

    pub fn with_detector(mut self, detector: Box<dyn VehicleDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_range_array(mut self, reader: RangeArrayReader, source: RangeArraySource) -> Self {
        self.ranges = Some(RangeStage { reader, source });
        self
    }

    /// Validate the estimator profiles and start accepting input
    pub fn set_up(&mut self) -> Result<()> {
        validate_estimator(self.estimator_config())?;
        self.lifecycle = Lifecycle::Ready;
        log::info!(
            "Pipeline ready: camera '{}', detector: {}, range array: {}",
            self.camera.source_tag(),
            if self.detector.is_some() { "installed" } else { "none" },
            match &self.ranges {
                Some(stage) => format!("{} channels", stage.reader.len()),
                None => "none".to_string(),
            }
        );
        if self.detector.is_none() {
            log::info!("No vehicle detector: frame notifications are skipped");
        }
        Ok(())
    }

    /// Stop accepting input
    pub fn tear_down(&mut self) {
        if self.lifecycle == Lifecycle::Ready {
            let (acquired, dropped) = self.acquirer.get_stats();
            let (published, invalid) = self.publisher.get_stats();
            log::info!(
                "Pipeline stopped: {} frames acquired, {} dropped, {} objects published, \
                 {} rejected, {} invalid",
                acquired,
                dropped,
                published,
                self.totals.rejected,
                invalid
            );
        }
        self.lifecycle = Lifecycle::Uninitialized;
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    pub fn has_range_array(&self) -> bool {
        self.ranges.is_some()
    }

    fn estimator_config(&self) -> &EstimatorConfig {
        self.estimator.config()
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Ready => Ok(()),
            Lifecycle::Uninitialized => Err(Error::NotInitialized),
        }
    }

    /// Run one cycle for an inbound bus message
    pub fn handle(&mut self, message: BusMessage) -> CycleReport {
        if let Err(e) = self.ensure_ready() {
            log::debug!("Ignoring '{}' message: {}", message.topic(), e);
            return CycleReport::default();
        }

        let observations = match message {
            BusMessage::FrameReady(notification) => self.observe_frame(&notification),
            BusMessage::Detections(set) => self.observe_detections(&set),
            BusMessage::Object(_) => {
                log::debug!("Ignoring object message on inbound bus");
                Vec::new()
            }
        };
        self.process(observations)
    }

    /// Run one polling cycle of the range array
    pub fn poll_ranges(&mut self) -> CycleReport {
        if let Err(e) = self.ensure_ready() {
            log::debug!("Skipping range poll: {}", e);
            return CycleReport::default();
        }
        let Some(stage) = self.ranges.as_mut() else {
            return CycleReport::default();
        };

        let samples = match stage.reader.poll() {
            Ok(samples) => samples,
            Err(e) => {
                log::warn!("Range poll skipped: {}", e);
                return CycleReport::default();
            }
        };
        let sweep = RangeSweep {
            timestamp_us: now_us(),
            samples,
        };
        let observations = stage.source.observe(&sweep);
        self.process(observations)
    }

    fn observe_frame(&mut self, notification: &FrameNotification) -> Vec<Observation> {
        if notification.source != self.camera.source_tag() {
            log::debug!("Ignoring frame from unknown camera '{}'", notification.source);
            return Vec::new();
        }
        let Some(detector) = self.detector.as_mut() else {
            log::debug!("Skipping frame '{}': no detector", notification.segment);
            return Vec::new();
        };
        let Some(frame) = self.acquirer.acquire(notification) else {
            return Vec::new();
        };
        let boxes = detector.detect(&frame);
        self.camera.observe(&boxes)
    }

    fn observe_detections(&self, set: &DetectionSet) -> Vec<Observation> {
        if set.source != self.camera.source_tag() {
            log::debug!("Ignoring detections from unknown camera '{}'", set.source);
            return Vec::new();
        }
        if set.boxes.iter().all(|b| b.timestamp_us != 0) {
            return self.camera.observe(&set.boxes);
        }
        // Unstamped boxes take the set's timestamp
        let boxes: Vec<DetectionBox> = set
            .boxes
            .iter()
            .map(|b| DetectionBox {
                timestamp_us: if b.timestamp_us == 0 {
                    set.timestamp_us
                } else {
                    b.timestamp_us
                },
                ..*b
            })
            .collect();
        self.camera.observe(&boxes)
    }

    fn process(&mut self, observations: Vec<Observation>) -> CycleReport {
        let mut report = CycleReport {
            observations: observations.len(),
            ..CycleReport::default()
        };

        for observation in &observations {
            match self.estimator.estimate(observation) {
                Ok(estimate) => {
                    if self.publisher.publish(&estimate) {
                        report.published += 1;
                    }
                }
                Err(rejection) => {
                    report.rejected += 1;
                    log::debug!("Rejected detection from {}: {}", observation.source, rejection);
                }
            }
        }

        self.totals.merge(report);
        report
    }

    /// Cumulative report since construction
    pub fn totals(&self) -> CycleReport {
        self.totals
    }

    pub fn publisher(&self) -> &ObjectPublisher<S> {
        &self.publisher
    }

    /// Returns (acquired, dropped) frame counts
    pub fn frame_stats(&self) -> (u64, u64) {
        self.acquirer.get_stats()
    }
}

fn validate_estimator(config: &EstimatorConfig) -> Result<()> {
    for (name, profile) in [("camera", &config.camera), ("ranging", &config.ranging)] {
        validate_profile(name, profile)?;
    }
    Ok(())
}

fn validate_profile(name: &str, profile: &SourceProfile) -> Result<()> {
    if !profile.confidences.is_valid() {
        return Err(Error::Config(format!(
            "{} profile: confidences must lie in [-1, 1]",
            name
        )));
    }
    let l = &profile.limits;
    let bounds = [l.min_distance, l.max_distance, l.min_width, l.max_width];
    if bounds.iter().any(|b| !b.is_finite() || *b < 0.0)
        || l.min_distance > l.max_distance
        || l.min_width > l.max_width
    {
        return Err(Error::Config(format!(
            "{} profile: invalid plausibility limits {:?}",
            name, l
        )));
    }
    Ok(())
}
