use std::fs;

use ibusprims_sensor::{FixedReading, SensorIdentity, SensorSession, SessionConfig};
use ibusprims_transport::BusConfig;
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_duration, parse_sensor_type, SenseArgs};
use crate::exit::{identity_error, io_error, session_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_summary, OutputFormat};

pub fn run(args: SenseArgs, format: OutputFormat) -> CliResult<i32> {
    let identity = resolve_identity(&args)?;
    let address = identity.address();
    let sensor_type = identity.sensor_type();

    let bus = BusConfig::new(&args.port)
        .with_baud_rate(args.baud)
        .with_timeout(parse_duration(&args.timeout)?)
        .with_self_echo(!args.no_echo);
    let config = SessionConfig {
        stop_on_checksum_error: !args.keep_going,
        stop_on_unknown_command: !args.keep_going,
        max_packets: args.count,
    };

    let mut session = SensorSession::open(&bus, identity, config)
        .map_err(|err| session_error("open failed", err))?;
    install_ctrlc_handler(session.running_flag())?;

    info!(
        port = %args.port.display(),
        address,
        sensor_type = sensor_type.name(),
        byte_width = session.identity().byte_width(),
        "answering polls"
    );

    let summary = session
        .run()
        .map_err(|err| session_error("session failed", err))?;

    print_summary(&summary, address, sensor_type, format);

    if summary.stop_reason.is_protocol_error() {
        Ok(DATA_INVALID)
    } else {
        Ok(SUCCESS)
    }
}

fn resolve_identity(args: &SenseArgs) -> CliResult<SensorIdentity> {
    if let Some(path) = &args.identity {
        let json = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return SensorIdentity::from_json(&json)
            .map_err(|err| identity_error(&format!("invalid identity {}", path.display()), err));
    }

    let sensor_type = parse_sensor_type(&args.sensor_type)?;
    let identity = SensorIdentity::new(args.address, sensor_type, FixedReading(args.value))
        .map_err(|err| identity_error("invalid identity", err))?;
    match args.byte_width {
        Some(width) => identity
            .with_byte_width(width)
            .map_err(|err| identity_error("invalid identity", err)),
        None => Ok(identity),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ibusprims_frame::SensorType;

    use super::*;

    fn args() -> SenseArgs {
        SenseArgs {
            port: PathBuf::from("/dev/null"),
            address: 2,
            sensor_type: "fuel".to_string(),
            value: 0x0150,
            byte_width: None,
            identity: None,
            baud: 115_200,
            timeout: "500ms".to_string(),
            no_echo: false,
            count: None,
            keep_going: false,
        }
    }

    #[test]
    fn identity_from_flags() {
        let identity = resolve_identity(&args()).unwrap();
        assert_eq!(identity.address(), 2);
        assert_eq!(identity.sensor_type(), SensorType::Fuel);
        assert_eq!(identity.produce_reading().as_ref(), &[0x50, 0x01]);
    }

    #[test]
    fn identity_width_override() {
        let identity = resolve_identity(&SenseArgs {
            byte_width: Some(1),
            ..args()
        })
        .unwrap();
        assert_eq!(identity.produce_reading().as_ref(), &[0x50]);
    }

    #[test]
    fn missing_identity_file_is_reported() {
        let err = resolve_identity(&SenseArgs {
            identity: Some(PathBuf::from("/nonexistent/ibusprims-identity.json")),
            ..args()
        })
        .unwrap_err();
        assert!(err.message.contains("failed reading"));
    }
}
