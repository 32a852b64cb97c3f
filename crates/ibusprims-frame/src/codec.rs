use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{EncodeError, FrameError, Result};

/// Smallest frame: length + command/address + 2 checksum bytes.
pub const MIN_PACKET_LEN: usize = 4;

/// The length field is one byte.
pub const MAX_PACKET_LEN: usize = u8::MAX as usize;

/// Largest payload that still fits the length byte.
pub const MAX_PAYLOAD: usize = MAX_PACKET_LEN - MIN_PACKET_LEN;

/// Compute the IBUS checksum for a frame.
///
/// `length` is the frame's length byte and `covered` is everything between it
/// and the checksum field (command/address byte plus payload). The sum wraps
/// at 16 bits and is subtracted from `0xFFFF`.
pub fn checksum(length: u8, covered: &[u8]) -> u16 {
    let sum = covered
        .iter()
        .fold(u16::from(length), |acc, &b| acc.wrapping_add(u16::from(b)));
    u16::MAX - sum
}

/// A decoded frame.
///
/// Built once per decode and never mutated. A packet whose checksum did not
/// match is still fully structured; check [`Packet::checksum_valid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    length: u8,
    command: u8,
    sensor_address: u8,
    payload: Bytes,
    checksum_valid: bool,
}

impl Packet {
    /// Build a packet from exactly one frame (`frame.len() == frame[0]`,
    /// at least [`MIN_PACKET_LEN`] bytes).
    pub(crate) fn from_frame(frame: &[u8]) -> Self {
        let length = frame[0];
        let body = &frame[1..];
        let end = body.len();

        let checksum_field = u16::from_le_bytes([body[end - 2], body[end - 1]]);
        let expected = checksum(length, &body[..usize::from(length) - 3]);

        Self {
            length,
            command: body[0] >> 4,
            sensor_address: body[0] & 0x0F,
            payload: Bytes::copy_from_slice(&body[1..end - 2]),
            checksum_valid: checksum_field == expected,
        }
    }

    /// On-wire byte count, including the length byte and checksum.
    pub fn length(&self) -> u8 {
        self.length
    }

    /// High nibble of the command/address byte.
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Low nibble of the command/address byte.
    pub fn sensor_address(&self) -> u8 {
        self.sensor_address
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn checksum_valid(&self) -> bool {
        self.checksum_valid
    }
}

/// An outgoing message, turned into bytes by [`encode_response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub command: u8,
    pub sensor_address: u8,
    pub payload: Bytes,
}

impl Response {
    /// Create a response. Command and address are 4-bit fields; higher
    /// bits are dropped.
    pub fn new(command: u8, sensor_address: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            command: command & 0x0F,
            sensor_address: sensor_address & 0x0F,
            payload: payload.into(),
        }
    }

    /// A response with no payload (discovery acknowledgement).
    pub fn empty(command: u8, sensor_address: u8) -> Self {
        Self::new(command, sensor_address, Bytes::new())
    }

    /// The total wire size of this response.
    pub fn wire_size(&self) -> usize {
        MIN_PACKET_LEN + self.payload.len()
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> std::result::Result<Bytes, EncodeError> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_response(self, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// Encode a response into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬─────────────┬──────────────┬──────────────────┐
/// │ Length   │ Cmd | Addr  │ Payload      │ Checksum         │
/// │ (1B)     │ (4b | 4b)   │ (0..251 B)   │ (2B LE)          │
/// └──────────┴─────────────┴──────────────┴──────────────────┘
/// ```
///
/// Returns the number of bytes appended to `dst`.
pub fn encode_response(
    response: &Response,
    dst: &mut BytesMut,
) -> std::result::Result<usize, EncodeError> {
    let size = response.wire_size();
    if size > MAX_PACKET_LEN {
        return Err(EncodeError::PayloadTooLarge {
            size: response.payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let length = size as u8;
    let cmd_byte = ((response.command & 0x0F) << 4) | (response.sensor_address & 0x0F);

    let mut covered = Vec::with_capacity(1 + response.payload.len());
    covered.push(cmd_byte);
    covered.extend_from_slice(&response.payload);

    dst.reserve(size);
    dst.put_u8(length);
    dst.put_slice(&covered);
    dst.put_u16_le(checksum(length, &covered));
    Ok(size)
}

/// Decode one frame from the front of `src`.
///
/// `src` plays the role of the byte source: a minimum-size frame is taken
/// first, then the rest of the frame its length byte announces. Fewer than
/// [`MIN_PACKET_LEN`] bytes is always [`FrameError::Truncated`]; a complete
/// minimum frame with a length byte below it is [`FrameError::InvalidLength`].
/// Anything past the frame is ignored.
pub fn decode_packet(src: &[u8]) -> Result<Packet> {
    if src.len() < MIN_PACKET_LEN {
        let expected = src
            .first()
            .map_or(MIN_PACKET_LEN, |&length| usize::from(length).max(MIN_PACKET_LEN));
        return Err(FrameError::Truncated {
            expected,
            received: src.len(),
        });
    }

    let length = src[0];
    let total = usize::from(length);
    if total < MIN_PACKET_LEN {
        return Err(FrameError::InvalidLength(length));
    }
    if src.len() < total {
        return Err(FrameError::Truncated {
            expected: total,
            received: src.len(),
        });
    }

    Ok(Packet::from_frame(&src[..total]))
}

/// Configuration for packet readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Blocking timeout applied to a `BusStream`. `None` leaves the stream as is.
    pub timeout: Option<std::time::Duration>,
    /// Read back our own transmission after every write.
    pub drain_self_echo: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            drain_self_echo: true,
        }
    }
}
