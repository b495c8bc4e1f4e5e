use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Timeout installed when the caller asks for fully blocking reads.
///
/// The serial driver needs a finite value; a day is long enough that the
/// session loop treats expiry as plain idle time.
pub const BLOCKING_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// A connected serial stream. Implements `Read` and `Write`.
///
/// This is the fundamental I/O type returned by [`crate::SerialLink::open`].
/// Each clone owns its own handle and its own timeout, so a reader half and a
/// writer half can block independently.
pub struct SerialStream {
    inner: Box<dyn serialport::SerialPort>,
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl SerialStream {
    /// Wrap an already opened port.
    pub fn from_port(port: Box<dyn serialport::SerialPort>) -> Self {
        Self { inner: port }
    }

    /// Set the I/O timeout on this handle. `None` blocks (practically) forever.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let timeout = match timeout {
            Some(t) if t.is_zero() => return Err(TransportError::InvalidTimeout(t)),
            Some(t) => t,
            None => BLOCKING_TIMEOUT,
        };
        self.inner
            .set_timeout(timeout)
            .map_err(|source| TransportError::Configure {
                setting: "timeout",
                source,
            })
    }

    /// Current I/O timeout of this handle.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout()
    }

    /// Port name as reported by the driver, if any.
    pub fn name(&self) -> Option<String> {
        self.inner.name()
    }

    /// Try to clone this stream (creates a new handle to the same port).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self
            .inner
            .try_clone()
            .map_err(|source| TransportError::Configure {
                setting: "clone",
                source,
            })?;
        Ok(Self::from_port(cloned))
    }

    /// Split into a read half and a write half.
    pub fn split(self) -> Result<(Self, Self)> {
        let writer = self.try_clone()?;
        Ok((self, writer))
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("name", &self.inner.name())
            .field("timeout", &self.inner.timeout())
            .finish()
    }
}
