//! Typed payload structures and their fixed-offset layouts.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Wire size of a [`Timestamp`].
pub const TIMESTAMP_SIZE: usize = 8;

/// Wire size of a [`TrackingEvent`] record.
pub const EVENT_SIZE: usize = 16;

/// Wire size of the status response payload.
pub const STATUS_PAYLOAD_SIZE: usize = 4;

/// Wire size of the dump response payload header.
pub const DUMP_HEADER_SIZE: usize = 4;

/// Offset of the timestamp inside an event record.
const EVENT_TIMESTAMP_OFFSET: usize = 4;

/// Offset of the data word inside an event record.
const EVENT_DATA_OFFSET: usize = 12;

fn expect_len(what: &'static str, src: &[u8], expected: usize) -> Result<()> {
    if src.len() != expected {
        return Err(FrameError::Truncated {
            what,
            expected,
            actual: src.len(),
        });
    }
    Ok(())
}

/// Calendar time as kept by the device clock.
///
/// Fields are raw integers, not BCD. `weekday` counts from Sunday = 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub weekday: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    /// Parse the 8-byte layout: year (LE), month, weekday, day, hour, minute, second.
    pub fn parse(src: &[u8]) -> Result<Self> {
        expect_len("timestamp", src, TIMESTAMP_SIZE)?;
        Ok(Self {
            year: u16::from_le_bytes([src[0], src[1]]),
            month: src[2],
            weekday: src[3],
            day: src[4],
            hour: src[5],
            minute: src[6],
            second: src[7],
        })
    }

    /// Append the 8-byte layout to `dst`.
    pub fn put(&self, dst: &mut BytesMut) {
        dst.put_u16_le(self.year);
        dst.put_u8(self.month);
        dst.put_u8(self.weekday);
        dst.put_u8(self.day);
        dst.put_u8(self.hour);
        dst.put_u8(self.minute);
        dst.put_u8(self.second);
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}/{:04} {:02}:{:02}:{:02}",
            self.month, self.day, self.year, self.hour, self.minute, self.second
        )
    }
}

/// Which events the device should record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackMode {
    pub drops: bool,
    pub flips: bool,
}

impl TrackMode {
    const DROPS: u8 = 0b01;
    const FLIPS: u8 = 0b10;

    /// Record both drops and flips.
    pub const ALL: TrackMode = TrackMode {
        drops: true,
        flips: true,
    };

    /// Packed flag byte: bit0 = drops, bit1 = flips.
    pub fn bits(self) -> u8 {
        let mut bits = 0;
        if self.drops {
            bits |= Self::DROPS;
        }
        if self.flips {
            bits |= Self::FLIPS;
        }
        bits
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            drops: bits & Self::DROPS != 0,
            flips: bits & Self::FLIPS != 0,
        }
    }
}

impl Default for TrackMode {
    fn default() -> Self {
        Self::ALL
    }
}

/// Device state reported in a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Uninitialized,
    Tracking,
    /// Any other code; the raw value is kept for display.
    Error(u8),
}

impl DeviceStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => DeviceStatus::Uninitialized,
            1 => DeviceStatus::Tracking,
            other => DeviceStatus::Error(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            DeviceStatus::Uninitialized => 0,
            DeviceStatus::Tracking => 1,
            DeviceStatus::Error(code) => code,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Uninitialized => "uninitialized",
            DeviceStatus::Tracking => "tracking",
            DeviceStatus::Error(_) => "error",
        }
    }
}

/// Kind of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Drop,
    Flip,
}

impl EventKind {
    /// 0 is a drop; any other flag is a flip.
    pub fn from_flag(flag: u8) -> Self {
        if flag == 0 {
            EventKind::Drop
        } else {
            EventKind::Flip
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Drop => "drop",
            EventKind::Flip => "flip",
        }
    }
}

/// One 16-byte record of a dump response.
///
/// ```text
/// ┌──────┬──────────┬──────────────────┬───────────┐
/// │ flag │ unused   │ timestamp        │ data      │
/// │ (1B) │ (3B)     │ (8B)             │ (4B LE)   │
/// └──────┴──────────┴──────────────────┴───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingEvent {
    pub kind: EventKind,
    pub timestamp: Timestamp,
    /// Sensor reading captured with the event (acceleration magnitude).
    pub data: u32,
}

impl TrackingEvent {
    pub fn parse(src: &[u8]) -> Result<Self> {
        expect_len("event record", src, EVENT_SIZE)?;
        let timestamp = Timestamp::parse(&src[EVENT_TIMESTAMP_OFFSET..EVENT_DATA_OFFSET])?;
        Ok(Self {
            kind: EventKind::from_flag(src[0]),
            timestamp,
            data: u32::from_le_bytes([
                src[EVENT_DATA_OFFSET],
                src[EVENT_DATA_OFFSET + 1],
                src[EVENT_DATA_OFFSET + 2],
                src[EVENT_DATA_OFFSET + 3],
            ]),
        })
    }
}

/// Payload of a status response: id (2B LE), status code, unused byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub package_id: u16,
    pub status: DeviceStatus,
}

impl StatusReport {
    pub fn parse(src: &[u8]) -> Result<Self> {
        expect_len("status payload", src, STATUS_PAYLOAD_SIZE)?;
        Ok(Self {
            package_id: u16::from_le_bytes([src[0], src[1]]),
            status: DeviceStatus::from_code(src[2]),
        })
    }
}

/// Header of a dump response: id (2B LE), event count, unused byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpHeader {
    pub package_id: u16,
    pub event_count: u8,
}

impl DumpHeader {
    pub fn parse(src: &[u8]) -> Result<Self> {
        expect_len("dump header", src, DUMP_HEADER_SIZE)?;
        Ok(Self {
            package_id: u16::from_le_bytes([src[0], src[1]]),
            event_count: src[2],
        })
    }

    /// Bytes of event records that follow this header.
    pub fn events_len(&self) -> usize {
        self.event_count as usize * EVENT_SIZE
    }
}

/// Decoded dump response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    pub package_id: u16,
    pub events: Vec<TrackingEvent>,
}

impl DumpReport {
    /// Parse the event records announced by `header`.
    pub fn parse(header: DumpHeader, records: &[u8]) -> Result<Self> {
        expect_len("event records", records, header.events_len())?;
        let events = records
            .chunks_exact(EVENT_SIZE)
            .map(TrackingEvent::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            package_id: header.package_id,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> [u8; EVENT_SIZE] {
        [
            0x00, 0x00, 0x00, 0x00, // drop, unused
            0xE2, 0x07, 0x01, 0x02, 0x02, 0x03, 0x04, 0x05, // 2018-01-02 03:04:05, tuesday
            0xDD, 0xCC, 0xBB, 0xAA, // data
        ]
    }

    #[test]
    fn timestamp_layout() {
        let ts = Timestamp {
            year: 2018,
            month: 5,
            weekday: 2,
            day: 1,
            hour: 13,
            minute: 14,
            second: 15,
        };
        let mut buf = BytesMut::new();
        ts.put(&mut buf);
        assert_eq!(buf.as_ref(), &[0xE2, 0x07, 5, 2, 1, 13, 14, 15]);
        assert_eq!(Timestamp::parse(&buf).unwrap(), ts);
        assert_eq!(ts.to_string(), "05/01/2018 13:14:15");
    }

    #[test]
    fn timestamp_rejects_short_slice() {
        let err = Timestamp::parse(&[0xE2, 0x07, 1]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                what: "timestamp",
                expected: 8,
                actual: 3
            }
        ));
    }

    #[test]
    fn track_mode_bits() {
        assert_eq!(TrackMode::ALL.bits(), 0x03);
        assert_eq!(
            TrackMode {
                drops: true,
                flips: false
            }
            .bits(),
            0x01
        );
        assert_eq!(TrackMode::from_bits(0x02), TrackMode {
            drops: false,
            flips: true
        });
        assert_eq!(TrackMode::default(), TrackMode::ALL);
    }

    #[test]
    fn device_status_codes() {
        assert_eq!(DeviceStatus::from_code(0), DeviceStatus::Uninitialized);
        assert_eq!(DeviceStatus::from_code(1), DeviceStatus::Tracking);
        assert_eq!(DeviceStatus::from_code(7), DeviceStatus::Error(7));
        assert_eq!(DeviceStatus::Error(7).as_str(), "error");
        assert_eq!(DeviceStatus::Error(7).code(), 7);
    }

    #[test]
    fn event_kind_flag() {
        assert_eq!(EventKind::from_flag(0), EventKind::Drop);
        assert_eq!(EventKind::from_flag(1), EventKind::Flip);
        assert_eq!(EventKind::from_flag(0xFF), EventKind::Flip);
    }

    #[test]
    fn parse_event_record() {
        let event = TrackingEvent::parse(&sample_event()).unwrap();
        assert_eq!(event.kind, EventKind::Drop);
        assert_eq!(event.timestamp.year, 2018);
        assert_eq!(event.timestamp.month, 1);
        assert_eq!(event.timestamp.weekday, 2);
        assert_eq!(event.timestamp.day, 2);
        assert_eq!(event.timestamp.hour, 3);
        assert_eq!(event.timestamp.minute, 4);
        assert_eq!(event.timestamp.second, 5);
        assert_eq!(event.data, 0xAABB_CCDD);
    }

    #[test]
    fn event_ignores_unused_bytes() {
        let mut raw = sample_event();
        raw[0] = 0x01;
        raw[1..4].copy_from_slice(&[0xFF, 0xFF, 0xFF]);
        let event = TrackingEvent::parse(&raw).unwrap();
        assert_eq!(event.kind, EventKind::Flip);
        assert_eq!(event.data, 0xAABB_CCDD);
    }

    #[test]
    fn status_payload() {
        let report = StatusReport::parse(&[0x34, 0x12, 0x01, 0x99]).unwrap();
        assert_eq!(report.package_id, 0x1234);
        assert_eq!(report.status, DeviceStatus::Tracking);

        assert!(StatusReport::parse(&[0x34, 0x12, 0x01]).is_err());
    }

    #[test]
    fn dump_report_checks_record_bytes() {
        let header = DumpHeader::parse(&[0xEF, 0xBE, 0x02, 0x00]).unwrap();
        assert_eq!(header.package_id, 0xBEEF);
        assert_eq!(header.events_len(), 32);

        let mut records = sample_event().to_vec();
        let err = DumpReport::parse(header, &records).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { expected: 32, actual: 16, .. }));

        records.extend_from_slice(&sample_event());
        let report = DumpReport::parse(header, &records).unwrap();
        assert_eq!(report.package_id, 0xBEEF);
        assert_eq!(report.events.len(), 2);
    }

    #[test]
    fn empty_dump() {
        let header = DumpHeader::parse(&[0x01, 0x00, 0x00, 0x00]).unwrap();
        let report = DumpReport::parse(header, &[]).unwrap();
        assert!(report.events.is_empty());
    }
}
