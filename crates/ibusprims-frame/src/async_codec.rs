use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::{encode_response, Packet, Response, MIN_PACKET_LEN};
use crate::error::FrameError;

/// `tokio_util` codec for IBUS frames.
///
/// Decoding yields [`Packet`]s and encoding takes [`Response`]s, with the same
/// checksum rules as the blocking reader and writer. An incomplete frame is
/// `Ok(None)` rather than `Truncated`: the stream simply has not delivered
/// the rest yet. A length byte below the minimum frame size is skipped and
/// decoding resumes at the next byte, so a `FramedRead` keeps going past line
/// noise instead of ending.
#[derive(Debug, Clone, Copy, Default)]
pub struct IbusCodec;

impl IbusCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for IbusCodec {
    type Item = Packet;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, FrameError> {
        loop {
            let Some(&length) = src.first() else {
                return Ok(None);
            };

            let total = usize::from(length);
            if total < MIN_PACKET_LEN {
                trace!(length, "skipping byte with invalid frame length");
                src.advance(1);
                continue;
            }
            if src.len() < total {
                src.reserve(total - src.len());
                return Ok(None);
            }

            let frame = src.split_to(total);
            return Ok(Some(Packet::from_frame(&frame)));
        }
    }
}

impl Encoder<Response> for IbusCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_response(&item, dst)?;
        Ok(())
    }
}
