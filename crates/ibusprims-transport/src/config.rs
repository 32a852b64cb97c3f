use std::path::PathBuf;
use std::time::Duration;

/// IBUS runs at 115200 baud, 8N1.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default blocking read/write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Serial bus settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Serial device path (e.g. `/dev/ttyUSB0`).
    pub path: PathBuf,
    /// Line speed. Default: 115200.
    pub baud_rate: u32,
    /// Timeout for blocking reads and writes. A read that times out returns
    /// fewer bytes than requested.
    pub timeout: Duration,
    /// Whether transmitted bytes reappear on our own receive line.
    ///
    /// True for the usual half-duplex hookup where TX and RX are tied
    /// together through a diode or resistor.
    pub self_echo: bool,
}

impl BusConfig {
    /// Settings for `path` with IBUS defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            self_echo: true,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the echo behavior of the wiring.
    pub fn with_self_echo(mut self, self_echo: bool) -> Self {
        self.self_echo = self_echo;
        self
    }
}
