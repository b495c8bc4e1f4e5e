//! Checksummed, type-tagged packet framing for the parcel tracker protocol.
//!
//! This is the core of parcelwire. Every frame on the serial link is:
//! - A 1-byte frame type (commands below 0x80, responses at 0x80 and above)
//! - A 1-byte payload length
//! - The payload, fixed or count-prefixed depending on the type
//! - A 1-byte running XOR checksum over everything before it
//!
//! Commands are built as [`OutboundFrame`] values and encoded with
//! [`encode_frame`]; responses are decoded into [`ReceivedFrame`] values that
//! carry the typed payload and the checksum verdict side by side.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod frame_type;
pub mod payload;
pub mod reader;
pub mod writer;

pub use checksum::{checksum, Checksum};
pub use codec::{
    decode_frame, encode_frame, wire_len_hint, DecodeConfig, EncodeConfig, FrameConfig,
    InboundFrame, InitLength, InitRequest, OutboundFrame, ReceivedFrame, Verification,
    HEADER_SIZE, TRAILER_SIZE,
};
pub use error::{FrameError, Result};
pub use frame_type::{
    type_name, CMD_DUMP, CMD_INIT, CMD_STATUS, RES_ACK, RES_DUMP, RES_NAK, RES_STATUS,
};
pub use payload::{
    DeviceStatus, DumpHeader, DumpReport, EventKind, StatusReport, Timestamp, TrackMode,
    TrackingEvent,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
