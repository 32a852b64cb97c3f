use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ibusprims_frame::{command_name, FrameConfig, FrameError, PacketReader, PacketWriter};
use ibusprims_transport::{BusConfig, BusStream, SerialBus};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::Result;
use crate::identity::SensorIdentity;

/// When the poll loop gives up.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Stop on a bad checksum or an impossible length byte. Default: true.
    pub stop_on_checksum_error: bool,
    /// Stop when the receiver sends a command we do not know. Default: true.
    pub stop_on_unknown_command: bool,
    /// Stop after this many decoded packets.
    pub max_packets: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stop_on_checksum_error: true,
            stop_on_unknown_command: true,
            max_packets: None,
        }
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Nothing complete arrived before the timeout.
    Idle,
    /// A length byte below the minimum frame size.
    InvalidFrame { length: u8 },
    /// A poll for another sensor.
    Ignored { command: u8, sensor_address: u8 },
    /// We answered; `length` bytes went on the wire.
    Responded {
        command: u8,
        sensor_address: u8,
        length: usize,
    },
    ChecksumError { command: u8, sensor_address: u8 },
    UnknownCommand { command: u8, sensor_address: u8 },
}

/// Why [`SensorSession::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    ChecksumError { command: u8, sensor_address: u8 },
    InvalidFrame { length: u8 },
    UnknownCommand { command: u8, sensor_address: u8 },
    PacketLimit,
    /// The running flag was cleared.
    Stopped,
}

impl StopReason {
    /// True when the stop was caused by the bus rather than the caller.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            StopReason::ChecksumError { .. }
                | StopReason::InvalidFrame { .. }
                | StopReason::UnknownCommand { .. }
        )
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ChecksumError {
                command,
                sensor_address,
            } => write!(
                f,
                "checksum error ({} to sensor {sensor_address})",
                command_name(*command)
            ),
            StopReason::InvalidFrame { length } => write!(f, "invalid frame length {length}"),
            StopReason::UnknownCommand {
                command,
                sensor_address,
            } => write!(f, "unknown command {command} to sensor {sensor_address}"),
            StopReason::PacketLimit => write!(f, "packet limit reached"),
            StopReason::Stopped => write!(f, "stopped"),
        }
    }
}

/// Running counters for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Structurally complete packets decoded.
    pub packets: usize,
    pub responses: usize,
    pub ignored: usize,
    pub checksum_errors: usize,
    pub invalid_frames: usize,
    pub unknown_commands: usize,
    /// Polls that timed out with no complete packet.
    pub timeouts: usize,
    /// Self-echo that was short or did not match what we sent.
    pub echo_faults: usize,
}

/// What [`SensorSession::run`] reports when it returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub stop_reason: StopReason,
    pub stats: SessionStats,
}

/// Emulates one sensor on the bus.
///
/// Each cycle reads a packet, dispatches it, writes the reply if there is
/// one and, on self-echoing wiring, reads the reply back off the wire before
/// the next poll.
pub struct SensorSession<R, W> {
    reader: PacketReader<R>,
    writer: PacketWriter<W>,
    dispatcher: Dispatcher,
    config: SessionConfig,
    stats: SessionStats,
    running: Arc<AtomicBool>,
}

impl<R: Read, W: Write> SensorSession<R, W> {
    /// Echo draining follows `reader.config().drain_self_echo`.
    pub fn new(
        reader: PacketReader<R>,
        writer: PacketWriter<W>,
        identity: SensorIdentity,
        config: SessionConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            dispatcher: Dispatcher::new(identity),
            config,
            stats: SessionStats::default(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag checked between cycles; store `false` to end [`Self::run`].
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn identity(&self) -> &SensorIdentity {
        self.dispatcher.identity()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one decode → dispatch → encode → drain cycle.
    pub fn poll_once(&mut self) -> Result<SessionEvent> {
        let packet = match self.reader.read_packet() {
            Ok(packet) => packet,
            Err(FrameError::Truncated { .. }) => {
                self.stats.timeouts += 1;
                return Ok(SessionEvent::Idle);
            }
            Err(FrameError::InvalidLength(length)) => {
                self.stats.invalid_frames += 1;
                warn!(length, "invalid frame length");
                return Ok(SessionEvent::InvalidFrame { length });
            }
            Err(err) => return Err(err.into()),
        };

        self.stats.packets += 1;
        let command = packet.command();
        let sensor_address = packet.sensor_address();
        debug!(
            command,
            command_name = command_name(command),
            sensor_address,
            length = packet.length(),
            checksum_valid = packet.checksum_valid(),
            "received packet"
        );

        match self.dispatcher.handle(&packet) {
            DispatchOutcome::Respond(response) => {
                let sent = self.writer.send(&response)?;
                if self.reader.config().drain_self_echo {
                    self.drain_echo(&sent)?;
                }
                self.stats.responses += 1;
                debug!(command, sensor_address, length = sent.len(), "responded");
                Ok(SessionEvent::Responded {
                    command,
                    sensor_address,
                    length: sent.len(),
                })
            }
            DispatchOutcome::NotForUs => {
                self.stats.ignored += 1;
                Ok(SessionEvent::Ignored {
                    command,
                    sensor_address,
                })
            }
            DispatchOutcome::ChecksumError => {
                self.stats.checksum_errors += 1;
                warn!(command, sensor_address, "checksum error");
                Ok(SessionEvent::ChecksumError {
                    command,
                    sensor_address,
                })
            }
            DispatchOutcome::UnknownCommand => {
                self.stats.unknown_commands += 1;
                warn!(command, sensor_address, "unknown command");
                Ok(SessionEvent::UnknownCommand {
                    command,
                    sensor_address,
                })
            }
        }
    }

    /// Poll until a stop condition.
    pub fn run(&mut self) -> Result<SessionSummary> {
        self.run_with(|_| {})
    }

    /// Poll until a stop condition, handing every event to `on_event`.
    pub fn run_with(&mut self, mut on_event: impl FnMut(&SessionEvent)) -> Result<SessionSummary> {
        info!(
            address = self.identity().address(),
            sensor_type = self.identity().sensor_type().name(),
            "sensor session started"
        );

        while self.running.load(Ordering::SeqCst) {
            if let Some(max) = self.config.max_packets {
                if self.stats.packets >= max {
                    return Ok(self.finish(StopReason::PacketLimit));
                }
            }

            let event = self.poll_once()?;
            on_event(&event);

            let stop = match event {
                SessionEvent::ChecksumError {
                    command,
                    sensor_address,
                } if self.config.stop_on_checksum_error => Some(StopReason::ChecksumError {
                    command,
                    sensor_address,
                }),
                SessionEvent::InvalidFrame { length } if self.config.stop_on_checksum_error => {
                    Some(StopReason::InvalidFrame { length })
                }
                SessionEvent::UnknownCommand {
                    command,
                    sensor_address,
                } if self.config.stop_on_unknown_command => Some(StopReason::UnknownCommand {
                    command,
                    sensor_address,
                }),
                _ => None,
            };
            if let Some(reason) = stop {
                return Ok(self.finish(reason));
            }
        }

        Ok(self.finish(StopReason::Stopped))
    }

    /// Take the streams back.
    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }

    fn drain_echo(&mut self, sent: &[u8]) -> Result<()> {
        match self.reader.drain_echo(sent) {
            Ok(()) => Ok(()),
            Err(err @ (FrameError::Truncated { .. } | FrameError::EchoMismatch)) => {
                self.stats.echo_faults += 1;
                warn!(error = %err, "self-echo fault");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn finish(&self, stop_reason: StopReason) -> SessionSummary {
        info!(%stop_reason, packets = self.stats.packets, responses = self.stats.responses, "sensor session ended");
        SessionSummary {
            stop_reason,
            stats: self.stats.clone(),
        }
    }
}

impl SensorSession<BusStream, BusStream> {
    /// Open the serial bus and start a session on it.
    ///
    /// Echo draining follows `bus.self_echo`.
    pub fn open(bus: &BusConfig, identity: SensorIdentity, config: SessionConfig) -> Result<Self> {
        let stream = SerialBus::open(bus)?;
        let write_half = stream.try_clone()?;

        let frame_config = FrameConfig {
            timeout: Some(bus.timeout),
            drain_self_echo: stream.self_echo(),
        };
        let reader = PacketReader::with_config_bus(stream, frame_config.clone())?;
        let writer = PacketWriter::with_config_bus(write_half, frame_config)?;

        Ok(Self::new(reader, writer, identity, config))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::ErrorKind;
    use std::rc::Rc;

    use ibusprims_frame::{
        decode_packet, Response, SensorType, DISCOVER, SENSOR_READ, SENSOR_TYPE,
    };

    use super::*;
    use crate::reading::FixedReading;

    #[derive(Default)]
    struct BusState {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
        echo: bool,
        garble_echo: bool,
    }

    /// Scripted half-duplex bus. Reads on an empty queue time out.
    #[derive(Clone, Default)]
    struct MockBus(Rc<RefCell<BusState>>);

    impl MockBus {
        fn new(echo: bool) -> Self {
            let bus = Self::default();
            bus.0.borrow_mut().echo = echo;
            bus
        }

        fn poll(&self, command: u8, address: u8) {
            let wire = Response::empty(command, address).to_bytes().unwrap();
            self.push(&wire);
        }

        fn push(&self, bytes: &[u8]) {
            self.0.borrow_mut().inbound.extend(bytes.iter().copied());
        }

        fn outbound(&self) -> Vec<u8> {
            self.0.borrow().outbound.clone()
        }

        fn pending(&self) -> usize {
            self.0.borrow().inbound.len()
        }
    }

    impl Read for MockBus {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let mut state = self.0.borrow_mut();
            if state.inbound.is_empty() {
                return Err(ErrorKind::TimedOut.into());
            }
            let n = buf.len().min(state.inbound.len());
            for slot in buf.iter_mut().take(n) {
                *slot = state.inbound.pop_front().unwrap_or_default();
            }
            Ok(n)
        }
    }

    impl Write for MockBus {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let mut state = self.0.borrow_mut();
            state.outbound.extend_from_slice(buf);
            if state.echo {
                // Our bytes arrive ahead of anything the receiver sends next.
                for (i, &b) in buf.iter().enumerate().rev() {
                    let b = if state.garble_echo && i == 1 { b ^ 0xFF } else { b };
                    state.inbound.push_front(b);
                }
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn session(bus: &MockBus, config: SessionConfig) -> SensorSession<MockBus, MockBus> {
        let identity =
            SensorIdentity::new(1, SensorType::ExternalVoltage, FixedReading(228)).unwrap();
        let frame_config = FrameConfig {
            timeout: None,
            drain_self_echo: bus.0.borrow().echo,
        };
        SensorSession::new(
            PacketReader::with_config(bus.clone(), frame_config.clone()),
            PacketWriter::with_config(bus.clone(), frame_config),
            identity,
            config,
        )
    }

    #[test]
    fn answers_full_poll_sequence_with_echo() {
        let bus = MockBus::new(true);
        for (cmd, addr) in [
            (DISCOVER, 1u8),
            (DISCOVER, 2),
            (SENSOR_TYPE, 1),
            (SENSOR_READ, 1),
        ] {
            bus.poll(cmd, addr);
        }

        let mut session = session(&bus, SessionConfig::default());
        let events: Vec<_> = (0..4).map(|_| session.poll_once().unwrap()).collect();

        assert_eq!(
            events,
            vec![
                SessionEvent::Responded {
                    command: DISCOVER,
                    sensor_address: 1,
                    length: 4
                },
                SessionEvent::Ignored {
                    command: DISCOVER,
                    sensor_address: 2
                },
                SessionEvent::Responded {
                    command: SENSOR_TYPE,
                    sensor_address: 1,
                    length: 6
                },
                SessionEvent::Responded {
                    command: SENSOR_READ,
                    sensor_address: 1,
                    length: 6
                },
            ]
        );

        let out = bus.outbound();
        assert_eq!(&out[..4], &[0x04, 0x81, 0x7A, 0xFF]);
        assert_eq!(&out[4..10], &[0x06, 0x91, 0x03, 0x02, 0x63, 0xFF]);
        let read = decode_packet(&out[10..]).unwrap();
        assert_eq!(read.payload().as_ref(), &[228, 0]);
        assert!(read.checksum_valid());

        assert_eq!(bus.pending(), 0, "echo must be fully drained");
        assert_eq!(session.stats().responses, 3);
        assert_eq!(session.stats().ignored, 1);
        assert_eq!(session.stats().echo_faults, 0);
    }

    #[test]
    fn without_echo_nothing_is_drained() {
        let bus = MockBus::new(false);
        bus.poll(DISCOVER, 1);
        bus.poll(SENSOR_TYPE, 1);

        let mut session = session(&bus, SessionConfig::default());
        session.poll_once().unwrap();
        let second = session.poll_once().unwrap();

        assert!(matches!(
            second,
            SessionEvent::Responded {
                command: SENSOR_TYPE,
                ..
            }
        ));
        assert_eq!(session.stats().echo_faults, 0);
    }

    #[test]
    fn quiet_bus_is_idle() {
        let bus = MockBus::new(true);
        let mut session = session(&bus, SessionConfig::default());

        assert_eq!(session.poll_once().unwrap(), SessionEvent::Idle);
        assert_eq!(session.stats().timeouts, 1);
        assert_eq!(session.stats().packets, 0);
    }

    #[test]
    fn run_stops_on_checksum_error() {
        let bus = MockBus::new(true);
        bus.poll(DISCOVER, 1);
        bus.push(&[0x04, 0x91, 0x00, 0x00]);
        bus.poll(SENSOR_READ, 1);

        let mut session = session(&bus, SessionConfig::default());
        let summary = session.run().unwrap();

        assert_eq!(
            summary.stop_reason,
            StopReason::ChecksumError {
                command: SENSOR_TYPE,
                sensor_address: 1
            }
        );
        assert!(summary.stop_reason.is_protocol_error());
        assert_eq!(summary.stats.responses, 1);
        assert_eq!(summary.stats.checksum_errors, 1);
        assert_eq!(bus.pending(), 4, "the read poll is never consumed");
    }

    #[test]
    fn run_stops_on_unknown_command() {
        let bus = MockBus::new(true);
        bus.poll(5, 1);

        let mut session = session(&bus, SessionConfig::default());
        let summary = session.run().unwrap();

        assert_eq!(
            summary.stop_reason,
            StopReason::UnknownCommand {
                command: 5,
                sensor_address: 1
            }
        );
        assert!(bus.outbound().is_empty());
    }

    #[test]
    fn run_stops_on_invalid_length() {
        let bus = MockBus::new(true);
        bus.push(&[0x01]);
        bus.poll(DISCOVER, 1);

        let mut session = session(&bus, SessionConfig::default());
        let summary = session.run().unwrap();

        assert_eq!(summary.stop_reason, StopReason::InvalidFrame { length: 1 });
        assert_eq!(summary.stats.invalid_frames, 1);
        assert!(bus.outbound().is_empty());
    }

    #[test]
    fn lenient_session_answers_poll_after_invalid_length() {
        let bus = MockBus::new(true);
        bus.push(&[0x01]);
        bus.poll(DISCOVER, 1);

        let config = SessionConfig {
            stop_on_checksum_error: false,
            max_packets: Some(1),
            ..SessionConfig::default()
        };
        let mut session = session(&bus, config);
        let summary = session.run().unwrap();

        assert_eq!(summary.stop_reason, StopReason::PacketLimit);
        assert_eq!(summary.stats.invalid_frames, 1);
        assert_eq!(summary.stats.responses, 1);
        assert_eq!(summary.stats.echo_faults, 0);
        assert_eq!(bus.outbound(), vec![0x04, 0x81, 0x7A, 0xFF]);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn short_fragment_is_idle_not_invalid() {
        let bus = MockBus::new(true);
        bus.push(&[0x02, 0x81]);

        let mut session = session(&bus, SessionConfig::default());
        assert_eq!(session.poll_once().unwrap(), SessionEvent::Idle);
        assert_eq!(session.stats().timeouts, 1);
        assert_eq!(session.stats().invalid_frames, 0);
    }

    #[test]
    fn lenient_session_keeps_polling_past_errors() {
        let bus = MockBus::new(true);
        bus.push(&[0x04, 0x81, 0x00, 0x00]);
        bus.poll(5, 1);
        bus.poll(SENSOR_READ, 1);

        let config = SessionConfig {
            stop_on_checksum_error: false,
            stop_on_unknown_command: false,
            max_packets: Some(3),
        };
        let mut session = session(&bus, config);
        let summary = session.run().unwrap();

        assert_eq!(summary.stop_reason, StopReason::PacketLimit);
        assert_eq!(summary.stats.packets, 3);
        assert_eq!(summary.stats.checksum_errors, 1);
        assert_eq!(summary.stats.unknown_commands, 1);
        assert_eq!(summary.stats.responses, 1);
    }

    #[test]
    fn packet_limit_ends_run() {
        let bus = MockBus::new(true);
        bus.poll(DISCOVER, 1);

        let config = SessionConfig {
            max_packets: Some(1),
            ..SessionConfig::default()
        };
        let mut session = session(&bus, config);

        let mut events = Vec::new();
        let summary = session.run_with(|event| events.push(event.clone())).unwrap();

        assert_eq!(summary.stop_reason, StopReason::PacketLimit);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn idle_polls_count_as_timeouts() {
        let bus = MockBus::new(true);
        let mut session = session(&bus, SessionConfig::default());
        let running = session.running_flag();

        let mut idle = 0;
        let summary = session
            .run_with(|event| {
                if *event == SessionEvent::Idle {
                    idle += 1;
                }
                if idle == 3 {
                    running.store(false, Ordering::SeqCst);
                }
            })
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::Stopped);
        assert!(!summary.stop_reason.is_protocol_error());
        assert_eq!(summary.stats.timeouts, 3);
    }

    #[test]
    fn garbled_echo_is_counted_not_fatal() {
        let bus = MockBus::new(true);
        bus.0.borrow_mut().garble_echo = true;
        bus.poll(DISCOVER, 1);
        bus.poll(SENSOR_TYPE, 1);

        let mut session = session(&bus, SessionConfig::default());
        session.poll_once().unwrap();
        let second = session.poll_once().unwrap();

        assert!(matches!(second, SessionEvent::Responded { .. }));
        assert_eq!(session.stats().echo_faults, 2);
    }

    #[test]
    fn summary_serializes_for_reports() {
        let summary = SessionSummary {
            stop_reason: StopReason::PacketLimit,
            stats: SessionStats {
                packets: 2,
                ..SessionStats::default()
            },
        };
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["stop_reason"]["reason"], "packet_limit");
        assert_eq!(json["stats"]["packets"], 2);
    }

    #[test]
    fn into_parts_returns_streams() {
        let bus = MockBus::new(false);
        let session = session(&bus, SessionConfig::default());
        let (_reader, _writer) = session.into_parts();
    }
}
