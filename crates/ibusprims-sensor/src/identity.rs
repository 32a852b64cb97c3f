use std::time::Duration;

use bytes::Bytes;
use ibusprims_frame::SensorType;
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::reading::{BatteryPercent, FixedReading, ReadingSource};

/// Highest address a sensor can use.
pub const MAX_SENSOR_ADDRESS: u8 = 15;

/// Widest reading the bus carries.
pub const MAX_BYTE_WIDTH: u8 = 4;

/// Who the local sensor is and how it produces readings.
///
/// Fixed for the life of a session; only the reading source's value moves.
pub struct SensorIdentity {
    address: u8,
    sensor_type: SensorType,
    byte_width: u8,
    source: Box<dyn ReadingSource + Send>,
}

impl SensorIdentity {
    /// Create an identity using the type's default reading width.
    pub fn new(
        address: u8,
        sensor_type: SensorType,
        source: impl ReadingSource + Send + 'static,
    ) -> Result<Self, IdentityError> {
        if address == 0 || address > MAX_SENSOR_ADDRESS {
            return Err(IdentityError::InvalidAddress(address));
        }
        Ok(Self {
            address,
            sensor_type,
            byte_width: sensor_type.default_byte_width(),
            source: Box::new(source),
        })
    }

    /// Override the reading width reported in `SENSOR_TYPE` replies.
    pub fn with_byte_width(mut self, byte_width: u8) -> Result<Self, IdentityError> {
        if byte_width == 0 || byte_width > MAX_BYTE_WIDTH {
            return Err(IdentityError::InvalidByteWidth(byte_width));
        }
        self.byte_width = byte_width;
        Ok(self)
    }

    /// Build an identity from its JSON description.
    pub fn from_json(json: &str) -> Result<Self, IdentityError> {
        let config: IdentityConfig = serde_json::from_str(json)?;
        config.build()
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn byte_width(&self) -> u8 {
        self.byte_width
    }

    /// Sample the source and encode it as `byte_width` bytes, low byte first.
    pub fn produce_reading(&self) -> Bytes {
        let value = self.source.read().to_le_bytes();
        Bytes::copy_from_slice(&value[..usize::from(self.byte_width)])
    }
}

impl std::fmt::Debug for SensorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorIdentity")
            .field("address", &self.address)
            .field("sensor_type", &self.sensor_type)
            .field("byte_width", &self.byte_width)
            .finish_non_exhaustive()
    }
}

/// Serialized form of a [`SensorIdentity`].
///
/// ```json
/// { "address": 1, "sensor_type": 3, "reading": { "fixed": 228 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityConfig {
    pub address: u8,
    /// Wire code of the sensor type.
    pub sensor_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_width: Option<u8>,
    pub reading: ReadingConfig,
}

/// Serialized reading source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadingConfig {
    /// Always report this value.
    Fixed(u32),
    /// Report remaining percent for a pack at `centivolts`.
    BatteryPercent {
        centivolts: u32,
        #[serde(default = "default_settle_ms")]
        settle_ms: u64,
    },
}

fn default_settle_ms() -> u64 {
    crate::reading::DEFAULT_SETTLE.as_millis() as u64
}

impl IdentityConfig {
    pub fn build(&self) -> Result<SensorIdentity, IdentityError> {
        let sensor_type = SensorType::from_code(self.sensor_type);
        let identity = match self.reading {
            ReadingConfig::Fixed(value) => {
                SensorIdentity::new(self.address, sensor_type, FixedReading(value))?
            }
            ReadingConfig::BatteryPercent {
                centivolts,
                settle_ms,
            } => SensorIdentity::new(
                self.address,
                sensor_type,
                BatteryPercent::with_settle(
                    FixedReading(centivolts),
                    Duration::from_millis(settle_ms),
                ),
            )?,
        };

        match self.byte_width {
            Some(width) => identity.with_byte_width(width),
            None => Ok(identity),
        }
    }
}
