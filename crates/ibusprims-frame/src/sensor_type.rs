//! Sensor type codes reported in `SENSOR_TYPE` responses.
//!
//! The code tells the receiver how to scale and label the reading; the codec
//! only carries it. Units below are what FlySky receivers assume.

/// Sensor kinds known to FlySky receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    /// Receiver's own supply voltage, 0.01 V. Reserved for the receiver.
    InternalVoltage,
    /// 0.1 °C, offset so that 0 = -40 °C.
    Temperature,
    RpmFlysky,
    /// External voltage, 0.01 V.
    ExternalVoltage,
    /// Average cell voltage.
    Cell,
    /// Battery current, A * 100.
    BatteryCurrent,
    /// Remaining battery percentage or fuel level.
    Fuel,
    /// Throttle value / battery capacity.
    Rpm,
    /// Heading 0..360, 0 = north.
    CompassHeading,
    /// m/s * 100.
    ClimbRate,
    /// Course over ground, degrees * 100.
    CourseOverGround,
    GpsStatus,
    AccelX,
    AccelY,
    AccelZ,
    Roll,
    Pitch,
    Yaw,
    VerticalSpeed,
    GroundSpeed,
    /// Distance from home, m.
    GpsDistance,
    Armed,
    FlightMode,
    /// 4 bytes.
    Pressure,
    Odometer1,
    Odometer2,
    /// km/h.
    Speed,
    /// 4 bytes, degrees * 1e7.
    GpsLatitude,
    /// 4 bytes, degrees * 1e7.
    GpsLongitude,
    /// 4 bytes, m * 100.
    GpsAltitude,
    /// 4 bytes, m * 100.
    Altitude,
    /// 4 bytes, m * 100.
    AltitudeMax,
    /// 2 bytes signed, m.
    AltitudeFlysky,
    Unknown,
    /// A code outside the table above.
    Other(u8),
}

const TABLE: &[(SensorType, u8, &str)] = &[
    (SensorType::InternalVoltage, 0x00, "internal-voltage"),
    (SensorType::Temperature, 0x01, "temperature"),
    (SensorType::RpmFlysky, 0x02, "rpm-flysky"),
    (SensorType::ExternalVoltage, 0x03, "external-voltage"),
    (SensorType::Cell, 0x04, "cell"),
    (SensorType::BatteryCurrent, 0x05, "battery-current"),
    (SensorType::Fuel, 0x06, "fuel"),
    (SensorType::Rpm, 0x07, "rpm"),
    (SensorType::CompassHeading, 0x08, "compass-heading"),
    (SensorType::ClimbRate, 0x09, "climb-rate"),
    (SensorType::CourseOverGround, 0x0a, "course-over-ground"),
    (SensorType::GpsStatus, 0x0b, "gps-status"),
    (SensorType::AccelX, 0x0c, "accel-x"),
    (SensorType::AccelY, 0x0d, "accel-y"),
    (SensorType::AccelZ, 0x0e, "accel-z"),
    (SensorType::Roll, 0x0f, "roll"),
    (SensorType::Pitch, 0x10, "pitch"),
    (SensorType::Yaw, 0x11, "yaw"),
    (SensorType::VerticalSpeed, 0x12, "vertical-speed"),
    (SensorType::GroundSpeed, 0x13, "ground-speed"),
    (SensorType::GpsDistance, 0x14, "gps-distance"),
    (SensorType::Armed, 0x15, "armed"),
    (SensorType::FlightMode, 0x16, "flight-mode"),
    (SensorType::Pressure, 0x41, "pressure"),
    (SensorType::Odometer1, 0x7c, "odometer-1"),
    (SensorType::Odometer2, 0x7d, "odometer-2"),
    (SensorType::Speed, 0x7e, "speed"),
    (SensorType::GpsLatitude, 0x80, "gps-latitude"),
    (SensorType::GpsLongitude, 0x81, "gps-longitude"),
    (SensorType::GpsAltitude, 0x82, "gps-altitude"),
    (SensorType::Altitude, 0x83, "altitude"),
    (SensorType::AltitudeMax, 0x84, "altitude-max"),
    (SensorType::AltitudeFlysky, 0xf9, "altitude-flysky"),
    (SensorType::Unknown, 0xff, "unknown"),
];

impl SensorType {
    /// All named sensor types, in code order.
    pub fn all() -> impl Iterator<Item = SensorType> {
        TABLE.iter().map(|(ty, _, _)| *ty)
    }

    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            SensorType::Other(code) => code,
            ty => TABLE
                .iter()
                .find(|(t, _, _)| *t == ty)
                .map(|(_, code, _)| *code)
                .unwrap_or(0xff),
        }
    }

    /// Look up a wire code. Codes outside the table become [`SensorType::Other`].
    pub fn from_code(code: u8) -> Self {
        TABLE
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(ty, _, _)| *ty)
            .unwrap_or(SensorType::Other(code))
    }

    /// Look up a type by its [`SensorType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        TABLE
            .iter()
            .find(|(_, _, n)| n.eq_ignore_ascii_case(name))
            .map(|(ty, _, _)| *ty)
    }

    /// Short kebab-case name for logs and the CLI.
    pub fn name(self) -> &'static str {
        TABLE
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("other")
    }

    /// Bytes the receiver expects in a reading of this type.
    pub fn default_byte_width(self) -> u8 {
        match self {
            SensorType::Pressure
            | SensorType::GpsLatitude
            | SensorType::GpsLongitude
            | SensorType::GpsAltitude
            | SensorType::Altitude
            | SensorType::AltitudeMax => 4,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_table() {
        for ty in SensorType::all() {
            assert_eq!(SensorType::from_code(ty.code()), ty);
        }
    }

    #[test]
    fn reference_codes() {
        assert_eq!(SensorType::ExternalVoltage.code(), 3);
        assert_eq!(SensorType::Fuel.code(), 6);
        assert_eq!(SensorType::from_code(0x41), SensorType::Pressure);
    }

    #[test]
    fn unlisted_code_is_preserved() {
        let ty = SensorType::from_code(0x42);
        assert_eq!(ty, SensorType::Other(0x42));
        assert_eq!(ty.code(), 0x42);
        assert_eq!(ty.name(), "other");
    }

    #[test]
    fn byte_widths() {
        assert_eq!(SensorType::ExternalVoltage.default_byte_width(), 2);
        assert_eq!(SensorType::GpsLatitude.default_byte_width(), 4);
        assert_eq!(SensorType::Other(0x50).default_byte_width(), 2);
    }

    #[test]
    fn names_parse_back() {
        assert_eq!(
            SensorType::from_name("external-voltage"),
            Some(SensorType::ExternalVoltage)
        );
        assert_eq!(SensorType::from_name("FUEL"), Some(SensorType::Fuel));
        assert_eq!(SensorType::from_name("warp-drive"), None);
    }
}
