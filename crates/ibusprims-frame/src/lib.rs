//! IBUS packet framing with a 16-bit checksum.
//!
//! Every packet on the bus is framed as:
//! - A 1-byte total length (including itself and the checksum)
//! - A command nibble and a sensor-address nibble packed into one byte
//! - 0..=251 payload bytes
//! - A 2-byte little-endian checksum: `0xFFFF` minus the 16-bit wrapping sum
//!   of every preceding byte
//!
//! A bad checksum does not fail decoding; the packet comes back flagged so
//! the caller can decide whether the bus is out of sync.

pub mod codec;
pub mod command;
pub mod error;
pub mod reader;
pub mod sensor_type;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::IbusCodec;
pub use codec::{
    checksum, decode_packet, encode_response, FrameConfig, Packet, Response, MAX_PACKET_LEN,
    MAX_PAYLOAD, MIN_PACKET_LEN,
};
pub use command::{command_name, is_known_command, DISCOVER, SENSOR_READ, SENSOR_TYPE};
pub use error::{EncodeError, FrameError, Result};
pub use reader::PacketReader;
pub use sensor_type::SensorType;
pub use writer::PacketWriter;
