use std::io::{ErrorKind, Write};

use bytes::{Bytes, BytesMut};
use ibusprims_transport::BusStream;
use tracing::trace;

use crate::codec::{encode_response, FrameConfig, Response, MAX_PACKET_LEN};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

/// Writes complete response frames to any `Write` stream.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> PacketWriter<T> {
    /// Create a new packet writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new packet writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_PACKET_LEN),
            config,
        }
    }

    /// Encode and transmit a response (blocking until the stream accepts it).
    ///
    /// Returns the exact bytes put on the wire, which is what the caller
    /// expects to see echoed back on a half-duplex bus.
    pub fn send(&mut self, response: &Response) -> Result<Bytes> {
        self.buf.clear();
        encode_response(response, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        self.flush()?;

        trace!(
            command = response.command,
            sensor_address = response.sensor_address,
            length = self.buf.len(),
            "transmitted response"
        );
        Ok(self.buf.split().freeze())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current packet writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl PacketWriter<BusStream> {
    /// Create a packet writer for `BusStream` and apply the timeout from config.
    pub fn with_config_bus(mut inner: BusStream, config: FrameConfig) -> Result<Self> {
        if let Some(timeout) = config.timeout {
            inner.set_timeout(timeout).map_err(transport_to_frame_error)?;
        }
        Ok(Self::with_config(inner, config))
    }
}
