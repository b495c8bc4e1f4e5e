//! Frame type bytes.
//!
//! Commands (host to device) live below 0x80, responses (device to host) at
//! 0x80 and above.

/// Request the device status.
pub const CMD_STATUS: u8 = 0x00;

/// Initialize the device for a new shipment.
pub const CMD_INIT: u8 = 0x01;

/// Request the event log.
pub const CMD_DUMP: u8 = 0x02;

/// Command accepted.
pub const RES_ACK: u8 = 0x80;

/// Status report.
pub const RES_STATUS: u8 = 0x81;

/// Event log.
pub const RES_DUMP: u8 = 0x82;

/// Command rejected.
pub const RES_NAK: u8 = 0x8F;

/// Returns a human-readable name for a frame type byte.
pub fn type_name(frame_type: u8) -> &'static str {
    match frame_type {
        CMD_STATUS => "STATUS_CMD",
        CMD_INIT => "INIT",
        CMD_DUMP => "DUMP_CMD",
        RES_ACK => "ACK",
        RES_STATUS => "STATUS",
        RES_DUMP => "DUMP",
        RES_NAK => "NAK",
        _ => "UNRECOGNIZED",
    }
}

/// Returns true if the type byte is a known host command.
pub fn is_command(frame_type: u8) -> bool {
    matches!(frame_type, CMD_STATUS | CMD_INIT | CMD_DUMP)
}

/// Returns true if the type byte is a known device response.
pub fn is_response(frame_type: u8) -> bool {
    matches!(frame_type, RES_ACK | RES_STATUS | RES_DUMP | RES_NAK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(type_name(RES_ACK), "ACK");
        assert_eq!(type_name(RES_NAK), "NAK");
        assert_eq!(type_name(0x42), "UNRECOGNIZED");
    }

    #[test]
    fn direction() {
        assert!(is_command(CMD_INIT));
        assert!(!is_command(RES_DUMP));
        assert!(is_response(RES_STATUS));
        assert!(!is_response(0x83));
    }
}
