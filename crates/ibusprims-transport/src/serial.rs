use serialport::{DataBits, FlowControl, Parity, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::config::BusConfig;
use crate::error::{Result, TransportError};
use crate::traits::BusStream;

/// Serial-device transport.
///
/// Opens a UART (usually a USB adapter wired to the receiver's sensor port)
/// with the line settings IBUS uses: 8 data bits, no parity, one stop bit,
/// no flow control.
pub struct SerialBus;

impl SerialBus {
    /// Open and configure the device named in `config`.
    pub fn open(config: &BusConfig) -> Result<BusStream> {
        let path = config.path.to_string_lossy().into_owned();
        let port = serialport::new(path, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|e| TransportError::Open {
                path: config.path.clone(),
                source: e,
            })?;

        let stream = BusStream::from_serial(port, config.self_echo);
        info!(
            device = stream.name().as_deref().unwrap_or("unnamed"),
            baud_rate = config.baud_rate,
            timeout_ms = stream.timeout().as_millis() as u64,
            self_echo = stream.self_echo(),
            "opened serial bus"
        );

        stream.discard_input()?;
        debug!(path = ?config.path, "discarded stale input");
        Ok(stream)
    }

    /// Transport name for diagnostics.
    pub fn transport_name() -> &'static str {
        "serial-half-duplex"
    }
}

/// A serial device visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub kind: &'static str,
    pub description: Option<String>,
}

/// Enumerate serial ports.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|port| {
            let (kind, description) = match port.port_type {
                SerialPortType::UsbPort(usb) => (
                    "usb",
                    Some(format!(
                        "{:04x}:{:04x} {}",
                        usb.vid,
                        usb.pid,
                        usb.product.unwrap_or_default()
                    )),
                ),
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                _ => ("unknown", None),
            };
            PortInfo {
                name: port.port_name,
                kind,
                description: description.map(|d| d.trim().to_string()),
            }
        })
        .collect())
}
