mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ibusprims", version, about = "IBUS telemetry sensor CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        global = true,
        env = "IBUSPRIMS_LOG_LEVEL"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sense_subcommand() {
        let cli = Cli::try_parse_from([
            "ibusprims",
            "sense",
            "/dev/ttyUSB0",
            "--address",
            "2",
            "--sensor-type",
            "fuel",
            "--value",
            "55",
            "--no-echo",
        ])
        .expect("sense args should parse");

        let Command::Sense(args) = cli.command else {
            panic!("expected sense");
        };
        assert_eq!(args.address, 2);
        assert_eq!(args.value, 55);
        assert!(args.no_echo);
        assert_eq!(args.baud, 115_200);
    }

    #[test]
    fn rejects_out_of_range_address() {
        let err = Cli::try_parse_from(["ibusprims", "sense", "/dev/ttyUSB0", "--address", "16"])
            .expect_err("address 16 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Cli::try_parse_from(["ibusprims", "sense", "/dev/ttyUSB0", "--address", "0"])
            .expect_err("address 0 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_identity_with_inline_flags() {
        let err = Cli::try_parse_from([
            "ibusprims",
            "sense",
            "/dev/ttyUSB0",
            "--identity",
            "sensor.json",
            "--value",
            "10",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_encode_with_global_format() {
        let cli = Cli::try_parse_from([
            "ibusprims",
            "encode",
            "--command",
            "discover",
            "--address",
            "1",
            "--format",
            "pretty",
        ])
        .expect("encode args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Pretty)));
        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn parses_monitor_subcommand() {
        let cli = Cli::try_parse_from(["ibusprims", "monitor", "/dev/ttyUSB0", "--count", "10"])
            .expect("monitor args should parse");
        assert!(matches!(cli.command, Command::Monitor(_)));
    }
}
