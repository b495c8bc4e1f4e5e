use parcelwire_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
///
/// A checksum mismatch is deliberately absent: it is reported on the decoded
/// frame (see [`crate::Verification`]) and never aborts a read.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A payload slice is shorter or longer than its fixed layout.
    #[error("truncated {what} ({actual} bytes, expected {expected})")]
    Truncated {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The declared length byte disagrees with the frame type's fixed layout.
    #[error("{frame_type} frame declares length {declared}, expected {expected}")]
    LengthMismatch {
        frame_type: &'static str,
        declared: u8,
        expected: u8,
    },

    /// The payload does not fit the 8-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the error is a read/write timeout rather than a failure.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err)
                if matches!(err.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock)
        )
    }
}

impl From<TransportError> for FrameError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(io) => FrameError::Io(io),
            other => FrameError::Io(std::io::Error::new(other.io_kind(), other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
