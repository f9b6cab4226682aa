//! Per-sensor confidence profiles and plausibility limits.

use serde::{Deserialize, Serialize};

/// Object type tag for camera detections
pub const CAMERA_OBJECT_TYPE: &str = "vehicle";
/// Type confidence for camera detections
pub const CAMERA_TYPE_CONFIDENCE: f64 = 0.5;
/// Direction confidence for camera detections
pub const CAMERA_DIRECTION_CONFIDENCE: f64 = 0.1;
/// Distance confidence for camera detections
pub const CAMERA_DISTANCE_CONFIDENCE: f64 = 0.5;
/// Overall confidence for camera detections
pub const CAMERA_OVERALL_CONFIDENCE: f64 = 0.2;

/// Object type tag for ranging echoes (a sonar cannot classify)
pub const RANGING_OBJECT_TYPE: &str = "unknown";
pub const RANGING_TYPE_CONFIDENCE: f64 = 0.1;
pub const RANGING_DIRECTION_CONFIDENCE: f64 = 0.3;
pub const RANGING_DISTANCE_CONFIDENCE: f64 = 0.8;
pub const RANGING_OVERALL_CONFIDENCE: f64 = 0.3;

/// Confidence of an attribute that was not computed this cycle
pub const NOT_COMPUTED: f64 = -1.0;

/// Fixed confidences attached to every estimate from one sensor kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidences {
    /// Confidence in the object type tag
    pub object_type: f64,
    pub direction: f64,
    pub distance: f64,
    /// Angular size is measured but never scored.
    /// Default: -1 (not computed)
    pub angular_size: f64,
    pub overall: f64,
}

impl Confidences {
    pub const fn camera() -> Self {
        Self {
            object_type: CAMERA_TYPE_CONFIDENCE,
            direction: CAMERA_DIRECTION_CONFIDENCE,
            distance: CAMERA_DISTANCE_CONFIDENCE,
            angular_size: NOT_COMPUTED,
            overall: CAMERA_OVERALL_CONFIDENCE,
        }
    }

    pub const fn ranging() -> Self {
        Self {
            object_type: RANGING_TYPE_CONFIDENCE,
            direction: RANGING_DIRECTION_CONFIDENCE,
            distance: RANGING_DISTANCE_CONFIDENCE,
            angular_size: NOT_COMPUTED,
            overall: RANGING_OVERALL_CONFIDENCE,
        }
    }

    /// Every confidence lies in [-1, 1]
    pub fn is_valid(&self) -> bool {
        [
            self.object_type,
            self.direction,
            self.distance,
            self.angular_size,
            self.overall,
        ]
        .iter()
        .all(|c| (-1.0..=1.0).contains(c))
    }
}

impl Default for Confidences {
    fn default() -> Self {
        Self::camera()
    }
}

/// Bounds outside of which an estimate is treated as projection error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityLimits {
    /// Minimum distance to the object (meters).
    /// Default: 0.0 (camera), 0.2 (ranging)
    pub min_distance: f64,

    /// Maximum distance to the object (meters).
    /// Default: 150.0 (camera), 7.65 (ranging, sonar full scale)
    pub max_distance: f64,

    /// Minimum ground width of the object (meters).
    /// Default: 0.5 (camera), 0.0 (ranging)
    pub min_width: f64,

    /// Maximum ground width of the object (meters).
    /// Default: 10.0
    pub max_width: f64,
}

impl PlausibilityLimits {
    pub const fn camera() -> Self {
        Self {
            min_distance: 0.0,
            max_distance: 150.0,
            min_width: 0.5,
            max_width: 10.0,
        }
    }

    pub const fn ranging() -> Self {
        Self {
            min_distance: 0.2,
            max_distance: 7.65,
            min_width: 0.0,
            max_width: 10.0,
        }
    }
}

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self::camera()
    }
}

/// Everything the estimator needs to know about one sensor kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Type tag written into published objects
    pub object_type: String,
    pub confidences: Confidences,
    pub limits: PlausibilityLimits,
}

impl SourceProfile {
    pub fn camera() -> Self {
        Self {
            object_type: CAMERA_OBJECT_TYPE.to_string(),
            confidences: Confidences::camera(),
            limits: PlausibilityLimits::camera(),
        }
    }

    pub fn ranging() -> Self {
        Self {
            object_type: RANGING_OBJECT_TYPE.to_string(),
            confidences: Confidences::ranging(),
            limits: PlausibilityLimits::ranging(),
        }
    }
}

/// Estimator configuration: one profile per sensor kind
///
/// A profile table left out of the config file keeps its built-in defaults;
/// a profile that is given must be complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default = "SourceProfile::camera")]
    pub camera: SourceProfile,
    #[serde(default = "SourceProfile::ranging")]
    pub ranging: SourceProfile,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            camera: SourceProfile::camera(),
            ranging: SourceProfile::ranging(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles_valid() {
        let config = EstimatorConfig::default();
        assert!(config.camera.confidences.is_valid());
        assert!(config.ranging.confidences.is_valid());
        assert_eq!(config.camera.object_type, "vehicle");
        assert_eq!(config.camera.limits.max_distance, 150.0);
    }

    #[test]
    fn test_out_of_range_confidence() {
        let mut confidences = Confidences::camera();
        confidences.overall = 1.5;
        assert!(!confidences.is_valid());
    }

    #[test]
    fn test_toml_profile_override() {
        let config: EstimatorConfig = toml::from_str(
            r#"
[ranging]
object_type = "obstacle"

[ranging.confidences]
object_type = 0.1
direction = 0.2
distance = 0.9
angular_size = -1.0
overall = 0.4

[ranging.limits]
min_distance = 0.3
max_distance = 5.0
min_width = 0.0
max_width = 2.0
"#,
        )
        .unwrap();
        assert_eq!(config.camera, SourceProfile::camera());
        assert_eq!(config.ranging.object_type, "obstacle");
        assert_eq!(config.ranging.confidences.overall, 0.4);
        assert_eq!(config.ranging.limits.max_distance, 5.0);
    }

    #[test]
    fn test_incomplete_profile_rejected() {
        let result: Result<EstimatorConfig, _> = toml::from_str(
            r#"
[ranging]
object_type = "obstacle"
"#,
        );
        assert!(result.is_err());
    }
}
