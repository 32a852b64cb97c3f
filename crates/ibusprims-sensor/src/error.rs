/// Errors that end a sensor session.
///
/// Protocol-level stops (bad checksum, unknown command) are not errors; see
/// [`crate::StopReason`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ibusprims_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] ibusprims_frame::FrameError),
}

/// Errors building a [`crate::SensorIdentity`].
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Sensor addresses are 1..=15; 0 belongs to the receiver.
    #[error("invalid sensor address {0} (expected 1..=15)")]
    InvalidAddress(u8),

    /// Readings are 1 to 4 bytes wide.
    #[error("invalid reading width {0} (expected 1..=4)")]
    InvalidByteWidth(u8),

    /// The identity document could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
