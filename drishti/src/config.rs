//! Configuration for the drishti daemon
//!
//! Loads camera calibration, range array geometry, estimator profiles and
//! network endpoints from a TOML file. Only `[camera]` is required; every other
//! table falls back to its defaults.

use crate::core::types::{Cartesian3, Direction};
use crate::error::Result;
use crate::estimation::EstimatorConfig;
use crate::streaming::wire::WireFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Row-major identity homography (image coordinates are already ground coordinates)
const IDENTITY_HOMOGRAPHY: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Log every published object. Read once at startup.
    #[serde(default)]
    pub debug: bool,
    pub camera: CameraConfig,
    /// Optional ultrasonic ranging array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_array: Option<RangeArrayConfig>,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Camera identity and calibration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CameraConfig {
    /// Camera name, matched against the `source` of inbound frames and
    /// detection sets and written into published objects
    pub source: String,

    /// Image-to-ground homography, 9 values in row-major order
    ///
    /// Maps pixel `(u, v, 1)` to ego-frame ground `(x, y, w)`.
    pub homography: Vec<f64>,

    /// Directory holding frame segments named by `FrameReady` notifications.
    /// Default: /dev/shm
    #[serde(default = "default_shm_dir")]
    pub shm_dir: PathBuf,
}

fn default_shm_dir() -> PathBuf {
    PathBuf::from(crate::acquisition::DEFAULT_SHM_DIR)
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: "front-camera".to_string(),
            homography: IDENTITY_HOMOGRAPHY.to_vec(),
            shm_dir: default_shm_dir(),
        }
    }
}

/// Ranging array wiring and mounting geometry
///
/// Entry `i` of `positions`, `directions` and `channels` describes one sensor.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RangeArrayConfig {
    /// Source tag prefix; each sensor publishes as `"{tag}/{channel}"`
    #[serde(default = "default_range_tag")]
    pub tag: String,

    /// Mounting offsets in the ego frame (meters)
    pub positions: Vec<Cartesian3>,

    /// Mounting directions (radians)
    pub directions: Vec<Direction>,

    /// ADC channel for each sensor
    pub channels: Vec<u16>,

    /// Meters per raw ADC unit
    ///
    /// MaxBotix analog output with a 10-bit ADC reads about 0.0075 m per unit.
    pub scale: f64,

    /// Full beam cone angle (radians).
    /// Default: 0.35 (about 20 degrees)
    #[serde(default = "default_beam_width")]
    pub beam_width: f64,

    /// Linux IIO device directory with `in_voltage{N}_raw` files
    #[serde(default = "default_adc_device")]
    pub adc_device: PathBuf,

    /// Polling period (milliseconds).
    /// Default: 100
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_range_tag() -> String {
    "sonar".to_string()
}

fn default_beam_width() -> f64 {
    0.35
}

fn default_adc_device() -> PathBuf {
    PathBuf::from("/sys/bus/iio/devices/iio:device0")
}

fn default_poll_interval_ms() -> u64 {
    100
}

/// TCP endpoints
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// TCP bind address for inbound frame notifications and detection sets
    ///
    /// Examples:
    /// - `0.0.0.0:5559` - Bind to all interfaces on port 5559
    /// - `127.0.0.1:5559` - Localhost only
    pub inbound_address: String,

    /// TCP bind address for published objects
    pub outbound_address: String,

    /// Payload encoding for both directions
    #[serde(default)]
    pub wire_format: WireFormat,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            inbound_address: "0.0.0.0:5559".to_string(),
            outbound_address: "0.0.0.0:5560".to_string(),
            wire_format: WireFormat::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use drishti::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("drishti.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Filter string for env_logger; the debug flag forces `debug`
    pub fn log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            self.logging.level.as_str()
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            camera: CameraConfig::default(),
            range_array: None,
            estimator: EstimatorConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(!config.debug);
        assert_eq!(config.camera.source, "front-camera");
        assert_eq!(config.camera.homography.len(), 9);
        assert!(config.range_array.is_none());
        assert_eq!(config.network.outbound_address, "0.0.0.0:5560");
        assert_eq!(config.network.wire_format, WireFormat::Json);
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_minimal_file() {
        let config: AppConfig = toml::from_str(
            r#"
debug = true

[camera]
source = "cam-left"
homography = [0.02, 0.0, -6.4, 0.0, 0.0, 1.0, 0.0, 0.001, 0.0]
"#,
        )
        .unwrap();
        assert_eq!(config.camera.source, "cam-left");
        assert_eq!(config.camera.shm_dir, PathBuf::from("/dev/shm"));
        assert_eq!(config.estimator, EstimatorConfig::default());
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_range_array_section() {
        let config: AppConfig = toml::from_str(
            r#"
[camera]
source = "front-camera"
homography = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]

[range_array]
positions = [{ x = 3.8, y = 0.4, z = 0.5 }, { x = 3.8, y = -0.4, z = 0.5 }]
directions = [{ azimuth = 0.2, zenith = 0.0 }, { azimuth = -0.2, zenith = 0.0 }]
channels = [0, 1]
scale = 0.0075

[network]
inbound_address = "127.0.0.1:6000"
outbound_address = "127.0.0.1:6001"
wire_format = "postcard"
"#,
        )
        .unwrap();
        let ranges = config.range_array.unwrap();
        assert_eq!(ranges.tag, "sonar");
        assert_eq!(ranges.channels, vec![0, 1]);
        assert_eq!(ranges.positions[1].y, -0.4);
        assert_eq!(ranges.poll_interval_ms, 100);
        assert_eq!(config.network.wire_format, WireFormat::Postcard);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drishti.toml");

        let mut config = AppConfig::default();
        config.range_array = Some(RangeArrayConfig {
            tag: "rear".to_string(),
            positions: vec![Cartesian3::new(-0.5, 0.0, 0.4)],
            directions: vec![Direction::new(std::f64::consts::PI, 0.0)],
            channels: vec![3],
            scale: 0.0075,
            beam_width: 0.35,
            adc_device: default_adc_device(),
            poll_interval_ms: 50,
        });
        config.to_file(&path).unwrap();

        assert_eq!(AppConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_shipped_sample_parses() {
        let config: AppConfig = toml::from_str(include_str!("../config/drishti.toml")).unwrap();
        assert_eq!(config.camera.homography.len(), 9);
        assert_eq!(config.range_array.unwrap().channels.len(), 2);
        assert_eq!(config.estimator, EstimatorConfig::default());
    }

    #[test]
    fn test_shipped_homography_looks_ahead() {
        use crate::projection::{GeometricProjector, HomographyProjector};
        use approx::assert_relative_eq;

        let config: AppConfig = toml::from_str(include_str!("../config/drishti.toml")).unwrap();
        let projector = HomographyProjector::from_row_major(&config.camera.homography).unwrap();

        // Bottom image row is just ahead of the bumper
        for u in [0.0, 320.0, 639.0] {
            let p = projector.project([u, 480.0]).unwrap();
            assert!(p.x > 0.0 && p.x < 5.0, "pixel ({}, 480) -> {:?}", u, p);
        }
        let left = projector.project([0.0, 480.0]).unwrap();
        let right = projector.project([639.0, 480.0]).unwrap();
        assert!(left.y > 0.0 && right.y < 0.0);

        // A 90 px wide box bottoming out at row 300 is a car 10 m ahead
        let bl = projector.project([275.0, 300.0]).unwrap();
        let br = projector.project([365.0, 300.0]).unwrap();
        assert_relative_eq!(bl.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(bl.ground_distance(&br), 1.8, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AppConfig::from_file("/nonexistent/drishti.toml"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_camera_section_required() {
        assert!(matches!(
            toml::from_str::<AppConfig>("debug = true").map_err(Error::from),
            Err(Error::Config(_))
        ));
    }
}
