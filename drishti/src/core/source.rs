//! ObservationSource trait definition

use crate::core::types::{Observation, SourceKind};

/// A sensor that turns its raw input into observations for the estimator
///
/// Every source reduces whatever it measures to the same shape: three ground
/// points (bottom-left, bottom-right, bottom-mid) plus the source tag. The
/// estimator only ever sees [`Observation`]s, so adding a sensor kind means
/// implementing this trait and nothing else.
pub trait ObservationSource {
    /// Raw per-cycle input (detection boxes, range samples, ...)
    type Input: ?Sized;

    /// Identifier carried into the published object's source list
    fn source_tag(&self) -> &str;

    /// Sensor kind, used to pick the confidence profile
    fn kind(&self) -> SourceKind;

    /// Project one cycle of input into observations
    ///
    /// Inputs that cannot be projected are skipped; a source never fails a cycle.
    fn observe(&self, input: &Self::Input) -> Vec<Observation>;
}
