use bytes::Bytes;
use ibusprims_frame::{is_known_command, Packet, Response, SENSOR_READ, SENSOR_TYPE};

use crate::identity::SensorIdentity;

/// What to do with one decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Send this response.
    Respond(Response),
    /// A known poll for another sensor. The common case on a shared bus.
    NotForUs,
    /// The packet's checksum did not match; the bus is likely out of sync.
    ChecksumError,
    /// A command no sensor answers.
    UnknownCommand,
}

/// Classify `packet` and build the reply `identity` owes, if any.
///
/// Stateless: the same packet and identity always classify the same way,
/// though `SENSOR_READ` samples the identity's reading source each time.
pub fn handle(packet: &Packet, identity: &SensorIdentity) -> DispatchOutcome {
    if !packet.checksum_valid() {
        return DispatchOutcome::ChecksumError;
    }

    let command = packet.command();
    if !is_known_command(command) {
        return DispatchOutcome::UnknownCommand;
    }

    if packet.sensor_address() != identity.address() {
        return DispatchOutcome::NotForUs;
    }

    let payload = match command {
        SENSOR_TYPE => Bytes::copy_from_slice(&[
            identity.sensor_type().code(),
            identity.byte_width(),
        ]),
        SENSOR_READ => identity.produce_reading(),
        _ => Bytes::new(),
    };

    DispatchOutcome::Respond(Response::new(command, identity.address(), payload))
}

/// Holds the local sensor identity and answers packets for it.
#[derive(Debug)]
pub struct Dispatcher {
    identity: SensorIdentity,
}

impl Dispatcher {
    pub fn new(identity: SensorIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &SensorIdentity {
        &self.identity
    }

    /// See [`handle`].
    pub fn handle(&self, packet: &Packet) -> DispatchOutcome {
        handle(packet, &self.identity)
    }
}

#[cfg(test)]
mod tests {
    use ibusprims_frame::{decode_packet, SensorType, DISCOVER};

    use super::*;
    use crate::reading::{FixedReading, SharedReading};

    fn poll(command: u8, address: u8) -> Packet {
        let wire = Response::empty(command, address).to_bytes().unwrap();
        decode_packet(&wire).unwrap()
    }

    fn voltage_sensor() -> SensorIdentity {
        SensorIdentity::new(1, SensorType::ExternalVoltage, FixedReading(228)).unwrap()
    }

    #[test]
    fn discover_for_us_is_acknowledged() {
        let outcome = handle(&poll(DISCOVER, 1), &voltage_sensor());
        assert_eq!(outcome, DispatchOutcome::Respond(Response::empty(DISCOVER, 1)));
    }

    #[test]
    fn discover_for_other_address_is_ignored() {
        assert_eq!(
            handle(&poll(DISCOVER, 2), &voltage_sensor()),
            DispatchOutcome::NotForUs
        );
    }

    #[test]
    fn address_zero_is_not_broadcast() {
        assert_eq!(
            handle(&poll(DISCOVER, 0), &voltage_sensor()),
            DispatchOutcome::NotForUs
        );
    }

    #[test]
    fn sensor_type_reports_code_and_width() {
        let outcome = handle(&poll(SENSOR_TYPE, 1), &voltage_sensor());
        assert_eq!(
            outcome,
            DispatchOutcome::Respond(Response::new(SENSOR_TYPE, 1, vec![0x03, 0x02]))
        );
    }

    #[test]
    fn sensor_read_encodes_value_low_byte_first() {
        let outcome = handle(&poll(SENSOR_READ, 1), &voltage_sensor());
        let DispatchOutcome::Respond(response) = outcome else {
            panic!("expected a response");
        };

        assert_eq!(response.payload.as_ref(), &[228, 0]);
        let wire = response.to_bytes().unwrap();
        assert_eq!(&wire[..4], &[0x06, 0xA1, 228, 0]);
    }

    #[test]
    fn sensor_read_picks_up_live_value() {
        let reading = SharedReading::new(100);
        let dispatcher = Dispatcher::new(
            SensorIdentity::new(3, SensorType::Temperature, reading.clone()).unwrap(),
        );

        reading.set(0x0190);
        let DispatchOutcome::Respond(response) = dispatcher.handle(&poll(SENSOR_READ, 3)) else {
            panic!("expected a response");
        };
        assert_eq!(response.payload.as_ref(), &[0x90, 0x01]);
    }

    #[test]
    fn bad_checksum_wins_over_everything() {
        let packet = decode_packet(&[0x04, 0x81, 0x00, 0x00]).unwrap();
        assert_eq!(
            handle(&packet, &voltage_sensor()),
            DispatchOutcome::ChecksumError
        );
    }

    #[test]
    fn unknown_command_regardless_of_address() {
        let identity = voltage_sensor();
        assert_eq!(
            handle(&poll(3, 1), &identity),
            DispatchOutcome::UnknownCommand
        );
        assert_eq!(
            handle(&poll(3, 7), &identity),
            DispatchOutcome::UnknownCommand
        );
    }
}
