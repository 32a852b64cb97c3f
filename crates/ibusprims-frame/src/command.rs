//! IBUS command codes.
//!
//! The receiver polls each sensor address with these three commands in
//! turn. Other 4-bit values are valid on the wire but no sensor answers them.

/// Is there a sensor at this address? Answered with an empty frame.
pub const DISCOVER: u8 = 8;

/// What kind of sensor is this? Answered with `[type code, byte width]`.
pub const SENSOR_TYPE: u8 = 9;

/// Current reading. Answered with the value, low byte first.
pub const SENSOR_READ: u8 = 10;

/// Returns a human-readable name for a command code.
pub fn command_name(command: u8) -> &'static str {
    match command {
        DISCOVER => "DISCOVER",
        SENSOR_TYPE => "SENSOR_TYPE",
        SENSOR_READ => "SENSOR_READ",
        _ => "UNKNOWN",
    }
}

/// Returns true for the commands a sensor responds to.
pub fn is_known_command(command: u8) -> bool {
    matches!(command, DISCOVER | SENSOR_TYPE | SENSOR_READ)
}
