use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ibusprims_frame::{command_name, Packet, Response, SensorType};
use ibusprims_sensor::SessionSummary;
use ibusprims_transport::PortInfo;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    schema_id: &'a str,
    length: u8,
    command: u8,
    command_name: &'a str,
    sensor_address: u8,
    payload: String,
    checksum_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u64>,
}

/// Print one decoded packet. `elapsed_ms` is the gap since the previous one.
pub fn print_packet(packet: &Packet, elapsed_ms: Option<u64>, format: OutputFormat) {
    let payload = hex::encode(packet.payload());
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                schema_id: "ibusprims/cli/v1/packet",
                length: packet.length(),
                command: packet.command(),
                command_name: command_name(packet.command()),
                sensor_address: packet.sensor_address(),
                payload,
                checksum_valid: packet.checksum_valid(),
                elapsed_ms,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["LEN", "COMMAND", "ADDR", "PAYLOAD", "CHECKSUM", "ELAPSED"])
                .add_row(vec![
                    packet.length().to_string(),
                    command_name(packet.command()).to_string(),
                    packet.sensor_address().to_string(),
                    payload,
                    checksum_label(packet.checksum_valid()).to_string(),
                    elapsed_label(elapsed_ms),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "len={} cmd={} ({}) addr={} payload={} checksum={} elapsed={}",
                packet.length(),
                packet.command(),
                command_name(packet.command()),
                packet.sensor_address(),
                if payload.is_empty() { "-" } else { payload.as_str() },
                checksum_label(packet.checksum_valid()),
                elapsed_label(elapsed_ms)
            );
        }
        OutputFormat::Raw => {
            print_raw(packet.payload());
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    schema_id: &'a str,
    command: u8,
    command_name: &'a str,
    sensor_address: u8,
    length: usize,
    frame: String,
}

/// Print the wire bytes of an encoded response.
pub fn print_encoded(response: &Response, wire: &[u8], format: OutputFormat) {
    let frame = hex::encode(wire);
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                schema_id: "ibusprims/cli/v1/encoded",
                command: response.command,
                command_name: command_name(response.command),
                sensor_address: response.sensor_address,
                length: wire.len(),
                frame,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "ADDR", "LEN", "FRAME"])
                .add_row(vec![
                    command_name(response.command).to_string(),
                    response.sensor_address.to_string(),
                    wire.len().to_string(),
                    frame,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{frame}"),
        OutputFormat::Raw => print_raw(wire),
    }
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    schema_id: &'a str,
    address: u8,
    sensor_type: &'a str,
    #[serde(flatten)]
    summary: &'a SessionSummary,
}

/// Print how a sensor session ended.
pub fn print_summary(
    summary: &SessionSummary,
    address: u8,
    sensor_type: SensorType,
    format: OutputFormat,
) {
    let stats = &summary.stats;
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            let out = SummaryOutput {
                schema_id: "ibusprims/cli/v1/session-summary",
                address,
                sensor_type: sensor_type.name(),
                summary,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["stop reason".to_string(), summary.stop_reason.to_string()])
                .add_row(vec!["address".to_string(), address.to_string()])
                .add_row(vec!["sensor type".to_string(), sensor_type.name().to_string()])
                .add_row(vec!["packets".to_string(), stats.packets.to_string()])
                .add_row(vec!["responses".to_string(), stats.responses.to_string()])
                .add_row(vec!["ignored".to_string(), stats.ignored.to_string()])
                .add_row(vec![
                    "checksum errors".to_string(),
                    stats.checksum_errors.to_string(),
                ])
                .add_row(vec![
                    "invalid frames".to_string(),
                    stats.invalid_frames.to_string(),
                ])
                .add_row(vec![
                    "unknown commands".to_string(),
                    stats.unknown_commands.to_string(),
                ])
                .add_row(vec!["timeouts".to_string(), stats.timeouts.to_string()])
                .add_row(vec!["echo faults".to_string(), stats.echo_faults.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "stopped: {} packets={} responses={} ignored={} checksum_errors={} invalid_frames={} unknown_commands={} timeouts={} echo_faults={}",
                summary.stop_reason,
                stats.packets,
                stats.responses,
                stats.ignored,
                stats.checksum_errors,
                stats.invalid_frames,
                stats.unknown_commands,
                stats.timeouts,
                stats.echo_faults
            );
        }
    }
}

#[derive(Serialize)]
struct SensorTypeOutput<'a> {
    code: u8,
    name: &'a str,
    byte_width: u8,
}

#[derive(Serialize)]
struct SensorTypesOutput<'a> {
    schema_id: &'a str,
    sensor_types: Vec<SensorTypeOutput<'a>>,
}

pub fn print_sensor_types(types: &[SensorType], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            let out = SensorTypesOutput {
                schema_id: "ibusprims/cli/v1/sensor-types",
                sensor_types: types
                    .iter()
                    .map(|t| SensorTypeOutput {
                        code: t.code(),
                        name: t.name(),
                        byte_width: t.default_byte_width(),
                    })
                    .collect(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODE", "NAME", "WIDTH"]);
            for t in types {
                table.add_row(vec![
                    format!("0x{:02X}", t.code()),
                    t.name().to_string(),
                    t.default_byte_width().to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for t in types {
                println!(
                    "0x{:02X} {} ({} bytes)",
                    t.code(),
                    t.name(),
                    t.default_byte_width()
                );
            }
        }
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Serialize)]
struct PortsOutput<'a> {
    schema_id: &'a str,
    ports: Vec<PortOutput<'a>>,
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            let out = PortsOutput {
                schema_id: "ibusprims/cli/v1/ports",
                ports: ports
                    .iter()
                    .map(|p| PortOutput {
                        name: &p.name,
                        kind: p.kind,
                        description: p.description.as_deref(),
                    })
                    .collect(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "KIND", "DESCRIPTION"]);
            for p in ports {
                table.add_row(vec![
                    p.name.clone(),
                    p.kind.to_string(),
                    p.description.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for p in ports {
                match &p.description {
                    Some(description) => println!("{} [{}] {}", p.name, p.kind, description),
                    None => println!("{} [{}]", p.name, p.kind),
                }
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn checksum_label(valid: bool) -> &'static str {
    if valid {
        "ok"
    } else {
        "BAD"
    }
}

fn elapsed_label(elapsed_ms: Option<u64>) -> String {
    elapsed_ms
        .map(|ms| format!("{ms}ms"))
        .unwrap_or_else(|| "-".to_string())
}
