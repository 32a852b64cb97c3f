use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ibusprims_frame::{SensorType, DISCOVER, SENSOR_READ, SENSOR_TYPE};
use ibusprims_transport::DEFAULT_BAUD_RATE;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod monitor;
pub mod ports;
pub mod sense;
pub mod sensor_types;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Emulate one sensor and answer the receiver's polls.
    Sense(SenseArgs),
    /// Print every packet seen on the bus.
    Monitor(MonitorArgs),
    /// Decode one frame given as hex.
    Decode(DecodeArgs),
    /// Encode one frame and print it as hex.
    Encode(EncodeArgs),
    /// List known sensor type codes.
    SensorTypes(SensorTypesArgs),
    /// List serial ports visible to this host.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Sense(args) => sense::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::SensorTypes(args) => sensor_types::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SenseArgs {
    /// Serial device wired to the receiver's sensor port.
    pub port: PathBuf,
    /// Sensor address to answer for (1-15).
    #[arg(long, short = 'a', default_value = "1", value_parser = clap::value_parser!(u8).range(1..=15))]
    pub address: u8,
    /// Sensor type name or code (see `sensor-types`).
    #[arg(long, short = 't', default_value = "external-voltage")]
    pub sensor_type: String,
    /// Fixed reading reported on every SENSOR_READ.
    #[arg(long, short = 'v', default_value = "0")]
    pub value: u32,
    /// Reading width in bytes. Default: the sensor type's width.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub byte_width: Option<u8>,
    /// Load the sensor identity from a JSON file.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["address", "sensor_type", "value", "byte_width"])]
    pub identity: Option<PathBuf>,
    /// Baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Read timeout per poll (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub timeout: String,
    /// The wiring does not echo our own transmissions back.
    #[arg(long)]
    pub no_echo: bool,
    /// Exit after N decoded packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Keep polling after checksum errors and unknown commands.
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial device to listen on.
    pub port: PathBuf,
    /// Exit after N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Read timeout per packet (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex (spaces and colons allowed).
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command code or name (discover, sensor-type, sensor-read).
    #[arg(long, short = 'c')]
    pub command: String,
    /// Sensor address (0-15).
    #[arg(long, short = 'a', value_parser = clap::value_parser!(u8).range(0..=15))]
    pub address: u8,
    /// Payload as hex.
    #[arg(long, short = 'p')]
    pub payload: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct SensorTypesArgs {}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Clear `running` on Ctrl-C.
pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "s" => Ok(Duration::from_secs(value)),
        _ => Ok(Duration::from_millis(value)),
    }
}

/// Decimal or `0x` hex.
fn parse_number(input: &str) -> Option<u8> {
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => input.parse().ok(),
    }
}

pub(crate) fn parse_sensor_type(input: &str) -> CliResult<SensorType> {
    let input = input.trim();
    if let Some(ty) = SensorType::from_name(input) {
        return Ok(ty);
    }
    parse_number(input)
        .map(SensorType::from_code)
        .ok_or_else(|| CliError::new(USAGE, format!("unknown sensor type: {input}")))
}

pub(crate) fn parse_command(input: &str) -> CliResult<u8> {
    let input = input.trim();
    let command = match input.to_ascii_lowercase().replace('_', "-").as_str() {
        "discover" => Some(DISCOVER),
        "sensor-type" => Some(SENSOR_TYPE),
        "sensor-read" => Some(SENSOR_READ),
        _ => parse_number(input),
    };
    match command {
        Some(command) if command <= 0x0F => Ok(command),
        _ => Err(CliError::new(
            USAGE,
            format!("invalid command: {input} (expected 0-15 or a command name)"),
        )),
    }
}

pub(crate) fn parse_hex(what: &str, input: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let cleaned = cleaned
        .strip_prefix("0x")
        .unwrap_or(cleaned.as_str())
        .to_string();
    hex::decode(&cleaned)
        .map_err(|err| CliError::new(USAGE, format!("{what} is not valid hex: {err}")))
}
