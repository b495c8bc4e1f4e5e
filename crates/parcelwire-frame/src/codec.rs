use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::checksum::checksum;
use crate::error::{FrameError, Result};
use crate::frame_type::{
    is_response, type_name, CMD_DUMP, CMD_INIT, CMD_STATUS, RES_ACK, RES_DUMP, RES_NAK,
    RES_STATUS,
};
use crate::payload::{
    DumpHeader, DumpReport, StatusReport, Timestamp, TrackMode, DUMP_HEADER_SIZE, EVENT_SIZE,
    STATUS_PAYLOAD_SIZE,
};

/// Frame header: type (1) + length (1) = 2 bytes.
pub const HEADER_SIZE: usize = 2;

/// Checksum trailer size.
pub const TRAILER_SIZE: usize = 1;

/// Init payload bytes before the tracking number.
pub const INIT_FIXED_PAYLOAD: usize = 16;

/// Length byte deployed devices expect on an init frame.
pub const LEGACY_INIT_LEN: u8 = 34;

/// Tracking-number length byte deployed devices expect.
pub const LEGACY_TRACKING_LEN: u8 = 18;

/// Largest payload an 8-bit length field can declare.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Parameters of an init command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub package_id: u16,
    /// Current time; the device seeds its clock from it.
    pub timestamp: Timestamp,
    pub carrier_access_code: u8,
    pub user_access_code: u8,
    pub track_mode: TrackMode,
    /// ASCII tracking number. Non-ASCII input is the caller's problem.
    pub tracking_number: String,
}

/// A host-to-device command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Init(InitRequest),
    Dump { access_code: u8 },
    Status,
}

impl OutboundFrame {
    /// The type byte this frame is sent with.
    pub fn frame_type(&self) -> u8 {
        match self {
            OutboundFrame::Init(_) => CMD_INIT,
            OutboundFrame::Dump { .. } => CMD_DUMP,
            OutboundFrame::Status => CMD_STATUS,
        }
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self, config: &EncodeConfig) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        encode_frame(self, config, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// How the init frame's length bytes are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitLength {
    /// Always 34 / 18, whatever the tracking number's actual length.
    #[default]
    Legacy,
    /// Computed from the tracking number.
    Derived,
}

/// Encoder options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeConfig {
    pub init_length: InitLength,
}

/// Encode a command frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬─────────────────┬──────────┐
/// │ Type     │ Length   │ Payload          │ Checksum │
/// │ (1B)     │ (1B)     │ (Length bytes)   │ (1B XOR) │
/// └──────────┴──────────┴─────────────────┴──────────┘
/// ```
///
/// The checksum covers every byte written before it.
pub fn encode_frame(
    frame: &OutboundFrame,
    config: &EncodeConfig,
    dst: &mut BytesMut,
) -> Result<()> {
    let start = dst.len();
    match frame {
        OutboundFrame::Init(init) => encode_init(init, config.init_length, dst)?,
        OutboundFrame::Dump { access_code } => {
            dst.reserve(HEADER_SIZE + 1 + TRAILER_SIZE);
            dst.put_u8(CMD_DUMP);
            dst.put_u8(1);
            dst.put_u8(*access_code);
        }
        OutboundFrame::Status => {
            dst.reserve(HEADER_SIZE + TRAILER_SIZE);
            dst.put_u8(CMD_STATUS);
            dst.put_u8(0);
        }
    }
    let crc = checksum(&dst[start..]);
    dst.put_u8(crc);
    Ok(())
}

fn encode_init(init: &InitRequest, mode: InitLength, dst: &mut BytesMut) -> Result<()> {
    let tracking = init.tracking_number.as_bytes();
    let (frame_len, tracking_len) = match mode {
        InitLength::Legacy => (LEGACY_INIT_LEN, LEGACY_TRACKING_LEN),
        InitLength::Derived => {
            let size = INIT_FIXED_PAYLOAD + tracking.len();
            if size > MAX_PAYLOAD {
                return Err(FrameError::PayloadTooLarge {
                    size,
                    max: MAX_PAYLOAD,
                });
            }
            (size as u8, tracking.len() as u8)
        }
    };

    dst.reserve(HEADER_SIZE + INIT_FIXED_PAYLOAD + tracking.len() + TRAILER_SIZE);
    dst.put_u8(CMD_INIT);
    dst.put_u8(frame_len);
    dst.put_u16_le(init.package_id);
    dst.put_slice(&[0x00, 0x00]);
    init.timestamp.put(dst);
    dst.put_u8(init.carrier_access_code);
    dst.put_u8(init.user_access_code);
    dst.put_u8(init.track_mode.bits());
    dst.put_u8(tracking_len);
    dst.put_slice(tracking);
    Ok(())
}

/// A device-to-host response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Ack,
    Status(StatusReport),
    Dump(DumpReport),
    Nak,
    /// Unknown type byte. Only the 2-byte header was consumed.
    Unrecognized { frame_type: u8 },
}

impl InboundFrame {
    /// The type byte this frame arrived with.
    pub fn frame_type(&self) -> u8 {
        match self {
            InboundFrame::Ack => RES_ACK,
            InboundFrame::Status(_) => RES_STATUS,
            InboundFrame::Dump(_) => RES_DUMP,
            InboundFrame::Nak => RES_NAK,
            InboundFrame::Unrecognized { frame_type } => *frame_type,
        }
    }

    /// Display name of the type byte.
    pub fn name(&self) -> &'static str {
        type_name(self.frame_type())
    }
}

/// Outcome of comparing the received trailer with the computed checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Passed,
    Mismatch { expected: u8, received: u8 },
    /// No trailer to check (unrecognized frame type).
    Skipped,
}

impl Verification {
    fn compare(expected: u8, received: u8) -> Self {
        if expected == received {
            Verification::Passed
        } else {
            Verification::Mismatch { expected, received }
        }
    }
}

/// A decoded response together with its integrity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub frame: InboundFrame,
    /// Length byte as sent by the device.
    pub declared_len: u8,
    pub verification: Verification,
}

impl ReceivedFrame {
    /// True only when the trailer matched. Unrecognized frames are never ok.
    pub fn checksum_ok(&self) -> bool {
        self.verification == Verification::Passed
    }
}

/// Decoder options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Reject ACK, NAK and STATUS frames whose length byte disagrees with
    /// their fixed payload size. The offending frame is still consumed.
    pub strict_length: bool,
}

/// Number of bytes the frame at the head of `src` is known to need so far.
///
/// Grows as more of the frame arrives: 2 until the header is in, then the
/// type's fixed size, and for a dump the size implied by its event count. Once
/// `src.len()` reaches the returned value the frame is complete.
pub fn wire_len_hint(src: &[u8]) -> usize {
    if src.len() < HEADER_SIZE {
        return HEADER_SIZE;
    }
    match src[0] {
        RES_ACK | RES_NAK => HEADER_SIZE + TRAILER_SIZE,
        RES_STATUS => HEADER_SIZE + STATUS_PAYLOAD_SIZE + TRAILER_SIZE,
        RES_DUMP => {
            let header_end = HEADER_SIZE + DUMP_HEADER_SIZE;
            if src.len() < header_end {
                return header_end;
            }
            let count = src[HEADER_SIZE + 2] as usize;
            header_end + count * EVENT_SIZE + TRAILER_SIZE
        }
        _ => HEADER_SIZE,
    }
}

/// Decode a response frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes exactly the frame's bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, config: &DecodeConfig) -> Result<Option<ReceivedFrame>> {
    let needed = wire_len_hint(src);
    if src.len() < needed {
        return Ok(None);
    }

    let raw = src.split_to(needed);
    let frame_type = raw[0];
    let declared_len = raw[1];

    if !is_response(frame_type) {
        warn!(
            frame_type = format_args!("{frame_type:#04x}"),
            declared_len, "unrecognized frame type"
        );
        return Ok(Some(ReceivedFrame {
            frame: InboundFrame::Unrecognized { frame_type },
            declared_len,
            verification: Verification::Skipped,
        }));
    }

    let body = &raw[HEADER_SIZE..needed - TRAILER_SIZE];
    if config.strict_length && frame_type != RES_DUMP {
        let expected = body.len() as u8;
        if declared_len != expected {
            return Err(FrameError::LengthMismatch {
                frame_type: type_name(frame_type),
                declared: declared_len,
                expected,
            });
        }
    }

    let frame = match frame_type {
        RES_ACK => InboundFrame::Ack,
        RES_NAK => InboundFrame::Nak,
        RES_STATUS => InboundFrame::Status(StatusReport::parse(body)?),
        _ => {
            let (header, records) = body.split_at(DUMP_HEADER_SIZE);
            InboundFrame::Dump(DumpReport::parse(DumpHeader::parse(header)?, records)?)
        }
    };

    let verification =
        Verification::compare(checksum(&raw[..needed - TRAILER_SIZE]), raw[needed - 1]);
    if let Verification::Mismatch { expected, received } = verification {
        warn!(
            frame_type = type_name(frame_type),
            expected = format_args!("{expected:#04x}"),
            received = format_args!("{received:#04x}"),
            "checksum mismatch"
        );
    }
    debug!(
        frame_type = type_name(frame_type),
        declared_len,
        wire_len = needed,
        "frame decoded"
    );

    Ok(Some(ReceivedFrame {
        frame,
        declared_len,
        verification,
    }))
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone, Default)]
pub struct FrameConfig {
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
    pub encode: EncodeConfig,
    pub decode: DecodeConfig,
}
