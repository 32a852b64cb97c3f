//! Battery sensor that reports a slowly draining 3S pack.
//!
//! Run with:
//!   cargo run --example voltage-sensor -- /dev/ttyUSB0
//!
//! Wire the adapter's TX and RX together through a diode to the receiver's
//! sensor port; the receiver shows the pack percentage on sensor address 1.

use std::thread;
use std::time::Duration;

use ibusprims::frame::SensorType;
use ibusprims::sensor::{
    BatteryPercent, SensorIdentity, SensorSession, SessionConfig, SharedReading,
};
use ibusprims::transport::BusConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    // Pack voltage in 0.01 V, starting fully charged.
    let voltage = SharedReading::new(1260);
    let drain = voltage.clone();
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(1));
        let next = drain.get().saturating_sub(2).max(1083);
        drain.set(next);
    });

    let identity = SensorIdentity::new(1, SensorType::Fuel, BatteryPercent::new(voltage))?;
    let config = SessionConfig {
        stop_on_checksum_error: false,
        ..SessionConfig::default()
    };
    let mut session = SensorSession::open(&BusConfig::new(&port), identity, config)?;
    eprintln!("Answering polls on {port}");

    let summary = session.run()?;
    eprintln!("Stopped: {}", summary.stop_reason);
    eprintln!(
        "{} packets, {} responses, {} checksum errors",
        summary.stats.packets, summary.stats.responses, summary.stats.checksum_errors
    );
    Ok(())
}
