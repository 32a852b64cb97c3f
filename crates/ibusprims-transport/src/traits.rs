use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

use crate::error::Result;

/// A connected bus stream. Implements `Read` and `Write`.
///
/// This is the I/O type returned by [`crate::SerialBus::open`]. Reads block
/// for at most the configured timeout and return fewer bytes (or a
/// `TimedOut` error) when the bus goes quiet.
pub struct BusStream {
    inner: BusStreamInner,
    self_echo: bool,
}

enum BusStreamInner {
    Serial(Box<dyn SerialPort>),
}

impl Read for BusStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            BusStreamInner::Serial(port) => port.read(buf),
        }
    }
}

impl Write for BusStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            BusStreamInner::Serial(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            BusStreamInner::Serial(port) => port.flush(),
        }
    }
}

impl BusStream {
    pub(crate) fn from_serial(port: Box<dyn SerialPort>, self_echo: bool) -> Self {
        Self {
            inner: BusStreamInner::Serial(port),
            self_echo,
        }
    }

    /// Whether bytes written to this stream come back on its read side.
    pub fn self_echo(&self) -> bool {
        self.self_echo
    }

    /// Set the blocking timeout for reads and writes.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        match &mut self.inner {
            BusStreamInner::Serial(port) => port.set_timeout(timeout).map_err(Into::into),
        }
    }

    /// Current blocking timeout.
    pub fn timeout(&self) -> Duration {
        match &self.inner {
            BusStreamInner::Serial(port) => port.timeout(),
        }
    }

    /// Discard anything sitting in the driver's receive buffer.
    ///
    /// Used before the first poll so a half-received frame does not
    /// desynchronize the reader.
    pub fn discard_input(&self) -> Result<()> {
        match &self.inner {
            BusStreamInner::Serial(port) => port.clear(ClearBuffer::Input).map_err(Into::into),
        }
    }

    /// Try to clone this stream (a second handle on the same device).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            BusStreamInner::Serial(port) => {
                let cloned = port.try_clone()?;
                Ok(Self::from_serial(cloned, self.self_echo))
            }
        }
    }

    /// Device name as reported by the driver.
    pub fn name(&self) -> Option<String> {
        match &self.inner {
            BusStreamInner::Serial(port) => port.name(),
        }
    }
}

impl std::fmt::Debug for BusStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            BusStreamInner::Serial(_) => "serial",
        };
        f.debug_struct("BusStream")
            .field("type", &kind)
            .field("name", &self.name())
            .field("timeout", &self.timeout())
            .field("self_echo", &self.self_echo)
            .finish()
    }
}
