//! Serial transport for the IBUS telemetry bus.
//!
//! The receiver and its sensors share one wire. This crate opens and
//! configures the serial device and hands out a [`BusStream`] that the
//! framing layer reads and writes. Whether the wiring loops transmitted
//! bytes back into the receive buffer is recorded on the stream
//! ([`BusStream::self_echo`]) so callers know to drain their own echo.
//!
//! This is the lowest layer of ibusprims.

pub mod config;
pub mod error;
pub mod serial;
pub mod traits;

pub use config::{BusConfig, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
pub use error::{Result, TransportError};
pub use serial::{available_ports, PortInfo, SerialBus};
pub use traits::BusStream;
