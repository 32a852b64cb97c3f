//! IBUS telemetry sensor emulation over a half-duplex serial line.
//!
//! ibusprims lets a host answer an RC receiver's IBUS sensor polls as if it
//! were a hardware telemetry sensor.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial bus setup and the half-duplex stream
//! - [`frame`]: packet framing, checksum and sensor type codes
//! - [`sensor`]: command dispatch, reading sources and the poll loop
//!
//! # Quick start
//!
//! ```no_run
//! use ibusprims::frame::SensorType;
//! use ibusprims::sensor::{FixedReading, SensorIdentity, SensorSession, SessionConfig};
//! use ibusprims::transport::BusConfig;
//!
//! // Answer as an external voltage sensor on address 1 with a fixed reading.
//! let identity = SensorIdentity::new(1, SensorType::ExternalVoltage, FixedReading(228))?;
//! let mut session = SensorSession::open(
//!     &BusConfig::new("/dev/ttyUSB0"),
//!     identity,
//!     SessionConfig::default(),
//! )?;
//! session.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use ibusprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ibusprims_frame::*;
}

/// Re-export sensor types.
pub mod sensor {
    pub use ibusprims_sensor::*;
}
