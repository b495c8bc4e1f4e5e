use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use parcelwire_transport::SerialStream;

use crate::codec::{decode_frame, wire_len_hint, FrameConfig, ReceivedFrame};
use crate::error::{FrameError, Result};

/// Largest response on the wire: header, dump header, 255 events, trailer.
const MAX_FRAME_SIZE: usize = 2 + 4 + 255 * 16 + 1;

/// Reads complete response frames from any `Read` stream.
///
/// Each underlying read asks for exactly the bytes the current frame still
/// needs (header, then payload, then trailer), so nothing past the frame is
/// pulled off the stream. Bytes already received stay buffered across calls:
/// a read timeout in the middle of a frame loses nothing.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached, even
    /// part way through a frame. A checksum mismatch is not an error; it is
    /// reported on the returned frame.
    pub fn read_frame(&mut self) -> Result<ReceivedFrame> {
        let mut chunk = [0u8; MAX_FRAME_SIZE];
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, &self.config.decode)? {
                return Ok(frame);
            }

            let missing = wire_len_hint(&self.buf) - self.buf.len();
            let read = match self.inner.read(&mut chunk[..missing]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes of a partially received frame held from earlier reads.
    pub fn buffered(&self) -> usize {
        self.buf.len()
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

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<SerialStream> {
    /// Create a frame reader for a serial stream and apply read timeout from config.
    pub fn with_config_serial(mut inner: SerialStream, config: FrameConfig) -> Result<Self> {
        inner.set_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
