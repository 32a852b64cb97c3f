//! Emulate an IBUS telemetry sensor.
//!
//! A [`SensorSession`] answers the receiver's polls for one
//! [`SensorIdentity`]: `DISCOVER` is acknowledged, `SENSOR_TYPE` reports the
//! type code and reading width, and `SENSOR_READ` samples the identity's
//! [`ReadingSource`]. Polls for other addresses are ignored. A bad checksum or
//! an unknown command ends the session unless [`SessionConfig`] says
//! otherwise.
//!
//! ```no_run
//! use ibusprims_frame::SensorType;
//! use ibusprims_sensor::{FixedReading, SensorIdentity, SensorSession, SessionConfig};
//! use ibusprims_transport::BusConfig;
//!
//! let identity = SensorIdentity::new(1, SensorType::ExternalVoltage, FixedReading(228))?;
//! let bus = BusConfig::new("/dev/ttyUSB0");
//! let mut session = SensorSession::open(&bus, identity, SessionConfig::default())?;
//! let summary = session.run()?;
//! println!("stopped: {}", summary.stop_reason);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod reading;
pub mod session;

pub use dispatcher::{handle, DispatchOutcome, Dispatcher};
pub use error::{IdentityError, Result, SessionError};
pub use identity::{
    IdentityConfig, ReadingConfig, SensorIdentity, MAX_BYTE_WIDTH, MAX_SENSOR_ADDRESS,
};
pub use reading::{
    battery_percent, centivolts_from_adc, AdcVoltage, BatteryPercent, FixedReading,
    ReadingSource, SharedReading, BATTERY_FULL, DEFAULT_SETTLE,
};
pub use session::{
    SensorSession, SessionConfig, SessionEvent, SessionStats, SessionSummary, StopReason,
};
