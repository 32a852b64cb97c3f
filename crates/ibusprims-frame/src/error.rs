/// Errors that can occur while reading packets off the bus.
///
/// A bad checksum is not one of them: it yields a [`crate::Packet`] with
/// `checksum_valid() == false`.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes arrived than the frame (or echo) needs before the read
    /// timed out or the stream ended.
    #[error("truncated frame ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },

    /// The length byte is below the 4-byte minimum frame.
    #[error("invalid frame length {0} (minimum 4)")]
    InvalidLength(u8),

    /// Our own transmission came back different from what we sent.
    #[error("self-echo mismatch (another device transmitted at the same time)")]
    EchoMismatch,

    /// The response could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// An I/O error other than a timeout occurred on the bus.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// True for errors that only mean "no complete packet yet".
    pub fn is_timeout(&self) -> bool {
        matches!(self, FrameError::Truncated { .. })
    }
}

/// Errors on the encode path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The payload does not fit a one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
