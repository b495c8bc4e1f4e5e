use std::time::Duration;

/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open or configure the named port.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: serialport::Error,
    },

    /// The port rejected a configuration change after it was opened.
    #[error("failed to configure {setting}: {source}")]
    Configure {
        setting: &'static str,
        source: serialport::Error,
    },

    /// Port enumeration failed.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(serialport::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested timeout cannot be expressed by the port driver.
    #[error("invalid timeout {0:?}")]
    InvalidTimeout(Duration),
}

impl TransportError {
    /// The `std::io::ErrorKind` closest to this error, for exit-code mapping.
    pub fn io_kind(&self) -> std::io::ErrorKind {
        match self {
            TransportError::Open { source, .. }
            | TransportError::Configure { source, .. }
            | TransportError::Enumerate(source) => serial_kind(source),
            TransportError::Io(err) => err.kind(),
            TransportError::InvalidTimeout(_) => std::io::ErrorKind::InvalidInput,
        }
    }
}

fn serial_kind(err: &serialport::Error) -> std::io::ErrorKind {
    match err.kind() {
        serialport::ErrorKind::NoDevice => std::io::ErrorKind::NotFound,
        serialport::ErrorKind::InvalidInput => std::io::ErrorKind::InvalidInput,
        serialport::ErrorKind::Io(kind) => kind,
        _ => std::io::ErrorKind::Other,
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
