use std::io::{ErrorKind, Read};

use ibusprims_transport::BusStream;
use tracing::trace;

use crate::codec::{FrameConfig, Packet, MAX_PACKET_LEN, MIN_PACKET_LEN};
use crate::error::{FrameError, Result};

/// Reads packets from any `Read` stream.
///
/// Each call asks for a minimum-size frame, then for the rest of it. If the
/// stream times out or ends first the call fails with
/// [`FrameError::Truncated`] and whatever arrived is dropped, so the next call
/// starts on a fresh length byte. A length byte below the minimum is dropped
/// alone; the bytes read after it are kept for the next call.
pub struct PacketReader<T> {
    inner: T,
    buf: [u8; MAX_PACKET_LEN],
    /// Bytes at the front of `buf` left over from an invalid length byte.
    carried: usize,
    config: FrameConfig,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new packet reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: [0u8; MAX_PACKET_LEN],
            carried: 0,
            config,
        }
    }

    /// Read the next packet (blocking up to the stream's timeout per read).
    pub fn read_packet(&mut self) -> Result<Packet> {
        let carried = std::mem::take(&mut self.carried);
        let filled =
            carried + read_up_to(&mut self.inner, &mut self.buf[carried..MIN_PACKET_LEN])?;
        if filled < MIN_PACKET_LEN {
            let expected = match filled {
                0 => MIN_PACKET_LEN,
                _ => usize::from(self.buf[0]).max(MIN_PACKET_LEN),
            };
            return Err(FrameError::Truncated {
                expected,
                received: filled,
            });
        }

        let length = self.buf[0];
        let total = usize::from(length);
        if total < MIN_PACKET_LEN {
            self.buf.copy_within(1..filled, 0);
            self.carried = filled - 1;
            trace!(length, "discarding byte with invalid frame length");
            return Err(FrameError::InvalidLength(length));
        }

        let got = read_up_to(&mut self.inner, &mut self.buf[MIN_PACKET_LEN..total])?;
        if MIN_PACKET_LEN + got < total {
            return Err(FrameError::Truncated {
                expected: total,
                received: MIN_PACKET_LEN + got,
            });
        }

        let packet = Packet::from_frame(&self.buf[..total]);
        trace!(
            length,
            command = packet.command(),
            sensor_address = packet.sensor_address(),
            checksum_valid = packet.checksum_valid(),
            "decoded packet"
        );
        Ok(packet)
    }

    /// Consume our own just-transmitted frame from the receive side.
    ///
    /// Reads exactly `sent.len()` bytes. A short read is
    /// [`FrameError::Truncated`]; bytes that differ from `sent` mean another
    /// device talked over us and yield [`FrameError::EchoMismatch`].
    pub fn drain_echo(&mut self, sent: &[u8]) -> Result<()> {
        let mut echo = vec![0u8; sent.len()];
        let from_carry = self.carried.min(sent.len());
        echo[..from_carry].copy_from_slice(&self.buf[..from_carry]);
        self.buf.copy_within(from_carry..self.carried, 0);
        self.carried -= from_carry;

        let got = from_carry + read_up_to(&mut self.inner, &mut echo[from_carry..])?;
        trace!(expected = sent.len(), received = got, "drained self-echo");

        if got < sent.len() {
            return Err(FrameError::Truncated {
                expected: sent.len(),
                received: got,
            });
        }
        if echo != sent {
            return Err(FrameError::EchoMismatch);
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current packet reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl PacketReader<BusStream> {
    /// Create a packet reader for `BusStream` and apply the timeout from config.
    pub fn with_config_bus(mut inner: BusStream, config: FrameConfig) -> Result<Self> {
        if let Some(timeout) = config.timeout {
            inner.set_timeout(timeout).map_err(transport_to_frame_error)?;
        }
        Ok(Self::with_config(inner, config))
    }
}

/// Fill `buf` from `src`, stopping early on timeout or end of stream.
///
/// Returns how many bytes landed in `buf`.
fn read_up_to<T: Read>(src: &mut T, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                break
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(filled)
}

pub(crate) fn transport_to_frame_error(err: ibusprims_transport::TransportError) -> FrameError {
    match err {
        ibusprims_transport::TransportError::Io(io) => FrameError::Io(io),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
