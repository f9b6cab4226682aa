//! Ranging sensor array (MaxBotix-style analog sonars on ADC channels)

use crate::core::types::{Cartesian3, Direction, RangeSample};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Raw access to the channels a ranging array is wired to
pub trait ChannelReader: Send {
    /// Read the current raw value of one channel
    fn read_raw(&mut self, channel: u16) -> Result<u16>;
}

/// Linux IIO ADC reader (`<device>/in_voltage<N>_raw`)
pub struct IioAdcReader {
    device_dir: PathBuf,
}

impl IioAdcReader {
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }
}

impl ChannelReader for IioAdcReader {
    fn read_raw(&mut self, channel: u16) -> Result<u16> {
        let path = self.device_dir.join(format!("in_voltage{}_raw", channel));
        let text = fs::read_to_string(&path).map_err(|e| {
            Error::TransientInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        text.trim().parse::<u16>().map_err(|e| {
            Error::TransientInput(format!("bad value '{}' in {}: {}", text.trim(), path.display(), e))
        })
    }
}

/// In-memory channel values, shareable between a test and the reader it feeds
#[derive(Clone, Default)]
pub struct StaticChannels {
    values: Arc<Mutex<HashMap<u16, u16>>>,
}

impl StaticChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value returned for `channel`
    pub fn set(&self, channel: u16, raw: u16) {
        self.values.lock().insert(channel, raw);
    }

    /// Make `channel` unreadable
    pub fn clear(&self, channel: u16) {
        self.values.lock().remove(&channel);
    }
}

impl ChannelReader for StaticChannels {
    fn read_raw(&mut self, channel: u16) -> Result<u16> {
        self.values
            .lock()
            .get(&channel)
            .copied()
            .ok_or_else(|| Error::TransientInput(format!("channel {} not readable", channel)))
    }
}

/// Polls every configured channel and scales raw values to meters
///
/// Geometry is fixed at construction: entry `i` of each list describes the
/// sensor wired to `channels[i]`.
pub struct RangeArrayReader {
    positions: Vec<Cartesian3>,
    directions: Vec<Direction>,
    channels: Vec<u16>,
    scale: f64,
    reader: Box<dyn ChannelReader>,
}

impl RangeArrayReader {
    /// Create a reader; fails when the geometry lists disagree in length
    pub fn new<R: ChannelReader + 'static>(
        positions: Vec<Cartesian3>,
        directions: Vec<Direction>,
        channels: Vec<u16>,
        scale: f64,
        reader: R,
    ) -> Result<Self> {
        if positions.len() != directions.len() || positions.len() != channels.len() {
            return Err(Error::Config(format!(
                "range array geometry mismatch: {} positions, {} directions, {} channels",
                positions.len(),
                directions.len(),
                channels.len()
            )));
        }
        if !scale.is_finite() {
            return Err(Error::Config(format!(
                "range array scale must be finite, got {}",
                scale
            )));
        }

        log::info!(
            "RangeArray: {} channels, scale {} m/unit",
            channels.len(),
            scale
        );

        Ok(Self {
            positions,
            directions,
            channels,
            scale,
            reader: Box::new(reader),
        })
    }

    /// Number of sensors in the array
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Read every channel once
    ///
    /// A single unreadable channel fails the whole poll.
    pub fn poll(&mut self) -> Result<Vec<RangeSample>> {
        let mut samples = Vec::with_capacity(self.channels.len());
        for (i, &channel) in self.channels.iter().enumerate() {
            let raw = self.reader.read_raw(channel)?;
            samples.push(RangeSample {
                channel,
                raw,
                scale: self.scale,
                position: self.positions[i],
                direction: self.directions[i],
            });
        }
        Ok(samples)
    }

    /// Scaled distances in channel order
    pub fn readings(&mut self) -> Result<Vec<f64>> {
        Ok(self.poll()?.iter().map(RangeSample::distance).collect())
    }
}
