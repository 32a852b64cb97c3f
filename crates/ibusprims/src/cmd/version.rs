use ibusprims_frame::{command_name, SensorType, DISCOVER, SENSOR_READ, SENSOR_TYPE};
use ibusprims_transport::{SerialBus, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ibusprims {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    for (key, value) in extended_lines() {
        println!("{key}: {value}");
    }
    Ok(SUCCESS)
}

fn extended_lines() -> Vec<(&'static str, String)> {
    let commands = [DISCOVER, SENSOR_TYPE, SENSOR_READ]
        .iter()
        .map(|&c| format!("{}={c}", command_name(c)))
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        ("name", "ibusprims".to_string()),
        ("version", env!("CARGO_PKG_VERSION").to_string()),
        (
            "target",
            option_env!("IBUSPRIMS_BUILD_TARGET")
                .unwrap_or("unknown")
                .to_string(),
        ),
        ("rustc", option_env!("RUSTC_VERSION").unwrap_or("unknown").to_string()),
        ("git_hash", option_env!("GIT_HASH").unwrap_or("unknown").to_string()),
        ("transport", SerialBus::transport_name().to_string()),
        (
            "bus_defaults",
            format!(
                "{DEFAULT_BAUD_RATE} baud 8N1, timeout {}ms",
                DEFAULT_TIMEOUT.as_millis()
            ),
        ),
        ("commands", commands),
        ("sensor_types", SensorType::all().count().to_string()),
        ("features", format!("async={}, cli=true", cfg!(feature = "async"))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_lines_describe_the_bus() {
        let lines = extended_lines();
        let get = |key: &str| {
            lines
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .unwrap_or_else(|| panic!("missing {key}"))
        };

        assert_eq!(get("transport"), "serial-half-duplex");
        assert_eq!(get("bus_defaults"), "115200 baud 8N1, timeout 500ms");
        assert_eq!(get("commands"), "DISCOVER=8, SENSOR_TYPE=9, SENSOR_READ=10");
        assert!(get("features").ends_with("cli=true"));
    }
}
