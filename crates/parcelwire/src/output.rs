use std::fmt::Write as _;
use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use parcelwire_frame::{InboundFrame, ReceivedFrame, TrackingEvent, Verification};
use parcelwire_transport::PortInfo;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput {
    kind: &'static str,
    timestamp: String,
    weekday: u8,
    data: u32,
}

impl From<&TrackingEvent> for EventOutput {
    fn from(event: &TrackingEvent) -> Self {
        Self {
            kind: event.kind.as_str(),
            timestamp: event.timestamp.to_string(),
            weekday: event.timestamp.weekday,
            data: event.data,
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame_type: &'static str,
    type_byte: u8,
    declared_len: u8,
    checksum: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_checksum: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    received_checksum: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    package_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<EventOutput>>,
    port: &'a str,
    timestamp: String,
}

fn checksum_label(verification: Verification) -> &'static str {
    match verification {
        Verification::Passed => "passed",
        Verification::Mismatch { .. } => "failed",
        Verification::Skipped => "skipped",
    }
}

fn frame_output<'a>(frame: &ReceivedFrame, port: &'a str) -> FrameOutput<'a> {
    let (expected_checksum, received_checksum) = match frame.verification {
        Verification::Mismatch { expected, received } => (Some(expected), Some(received)),
        _ => (None, None),
    };
    let mut out = FrameOutput {
        frame_type: frame.frame.name(),
        type_byte: frame.frame.frame_type(),
        declared_len: frame.declared_len,
        checksum: checksum_label(frame.verification),
        expected_checksum,
        received_checksum,
        package_id: None,
        status: None,
        status_code: None,
        events: None,
        port,
        timestamp: now_unix_seconds(),
    };
    match &frame.frame {
        InboundFrame::Status(report) => {
            out.package_id = Some(report.package_id);
            out.status = Some(report.status.as_str());
            out.status_code = Some(report.status.code());
        }
        InboundFrame::Dump(report) => {
            out.package_id = Some(report.package_id);
            out.events = Some(report.events.iter().map(EventOutput::from).collect());
        }
        InboundFrame::Ack | InboundFrame::Nak | InboundFrame::Unrecognized { .. } => {}
    }
    out
}

pub fn print_frame(frame: &ReceivedFrame, port: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&frame_output(frame, port))
                    .unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => print_frame_table(frame),
        OutputFormat::Pretty => print!("{}", render_pretty(frame)),
    }
}

fn print_frame_table(frame: &ReceivedFrame) {
    let (id, status, events) = match &frame.frame {
        InboundFrame::Status(report) => (
            format!("0x{:X}", report.package_id),
            report.status.as_str().to_string(),
            String::new(),
        ),
        InboundFrame::Dump(report) => (
            format!("0x{:X}", report.package_id),
            String::new(),
            report.events.len().to_string(),
        ),
        _ => (String::new(), String::new(), String::new()),
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["TYPE", "ID", "STATUS", "EVENTS", "CHECKSUM"])
        .add_row(vec![
            frame.frame.name().to_string(),
            id,
            status,
            events,
            checksum_label(frame.verification).to_string(),
        ]);
    println!("{table}");

    if let InboundFrame::Dump(report) = &frame.frame {
        if report.events.is_empty() {
            return;
        }
        let mut events = Table::new();
        events
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["#", "EVENT", "TIME", "DATA"]);
        for (i, event) in report.events.iter().enumerate() {
            events.add_row(vec![
                i.to_string(),
                event.kind.as_str().to_string(),
                event.timestamp.to_string(),
                format!("0x{:08X}", event.data),
            ]);
        }
        println!("{events}");
    }
}

/// Plain multi-line rendering, one block per frame.
pub fn render_pretty(frame: &ReceivedFrame) -> String {
    let mut out = String::new();
    match &frame.frame {
        InboundFrame::Ack => out.push_str("ACK:\n"),
        InboundFrame::Nak => out.push_str("NAK:\n"),
        InboundFrame::Status(report) => {
            let _ = writeln!(out, "Status:");
            let _ = writeln!(out, "  ID: 0x{:X}", report.package_id);
            let _ = writeln!(out, "  status: {}", report.status.as_str());
        }
        InboundFrame::Dump(report) => {
            let _ = writeln!(out, "Dump:");
            let _ = writeln!(out, "  ID: 0x{:X}", report.package_id);
            let _ = writeln!(out, "  num_events: {}", report.events.len());
            for event in &report.events {
                let _ = writeln!(
                    out,
                    "  Event: {} {} data=0x{:08X}",
                    event.kind.as_str(),
                    event.timestamp,
                    event.data
                );
            }
        }
        InboundFrame::Unrecognized { frame_type } => {
            let _ = writeln!(out, "Unrecognized (type 0x{frame_type:02X})");
        }
    }
    match frame.verification {
        Verification::Passed => out.push_str("  CRC passed\n"),
        Verification::Mismatch { expected, received } => {
            let _ = writeln!(
                out,
                "  CRC failed - expected: 0x{expected:02X}, got: 0x{received:02X}"
            );
        }
        Verification::Skipped => {}
    }
    out.push('\n');
    out
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    product: Option<&'a str>,
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|p| PortOutput {
                    name: &p.name,
                    kind: p.kind,
                    product: p.product.as_deref(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "KIND", "PRODUCT"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.product.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                match &port.product {
                    Some(product) => println!("{} ({}, {product})", port.name, port.kind),
                    None => println!("{} ({})", port.name, port.kind),
                }
            }
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use parcelwire_frame::{
        DeviceStatus, DumpReport, EventKind, StatusReport, Timestamp, TrackingEvent,
    };

    use super::*;

    fn dump_frame() -> ReceivedFrame {
        ReceivedFrame {
            frame: InboundFrame::Dump(DumpReport {
                package_id: 0xBEEF,
                events: vec![TrackingEvent {
                    kind: EventKind::Drop,
                    timestamp: Timestamp {
                        year: 2018,
                        month: 1,
                        weekday: 2,
                        day: 2,
                        hour: 3,
                        minute: 4,
                        second: 5,
                    },
                    data: 0xAABB_CCDD,
                }],
            }),
            declared_len: 20,
            verification: Verification::Passed,
        }
    }

    #[test]
    fn pretty_dump() {
        let text = render_pretty(&dump_frame());
        assert_eq!(
            text,
            "Dump:\n  ID: 0xBEEF\n  num_events: 1\n  Event: drop 01/02/2018 03:04:05 data=0xAABBCCDD\n  CRC passed\n\n"
        );
    }

    #[test]
    fn pretty_checksum_failure() {
        let frame = ReceivedFrame {
            frame: InboundFrame::Status(StatusReport {
                package_id: 0x1234,
                status: DeviceStatus::Uninitialized,
            }),
            declared_len: 4,
            verification: Verification::Mismatch {
                expected: 0xA0,
                received: 0x0A,
            },
        };
        let text = render_pretty(&frame);
        assert!(text.starts_with("Status:\n  ID: 0x1234\n  status: uninitialized\n"));
        assert!(text.contains("CRC failed - expected: 0xA0, got: 0x0A"));
    }

    #[test]
    fn pretty_unrecognized_has_no_crc_line() {
        let frame = ReceivedFrame {
            frame: InboundFrame::Unrecognized { frame_type: 0x42 },
            declared_len: 0,
            verification: Verification::Skipped,
        };
        assert_eq!(render_pretty(&frame), "Unrecognized (type 0x42)\n\n");
    }

    #[test]
    fn json_dump_fields() {
        let value = serde_json::to_value(frame_output(&dump_frame(), "/dev/ttyUSB0")).unwrap();
        assert_eq!(value["frame_type"], "DUMP");
        assert_eq!(value["type_byte"], 0x82);
        assert_eq!(value["checksum"], "passed");
        assert_eq!(value["package_id"], 0xBEEF);
        assert_eq!(value["events"][0]["kind"], "drop");
        assert_eq!(value["events"][0]["timestamp"], "01/02/2018 03:04:05");
        assert_eq!(value["events"][0]["data"], 0xAABB_CCDDu32);
        assert_eq!(value["port"], "/dev/ttyUSB0");
        assert!(value.get("status").is_none());
        assert!(value.get("expected_checksum").is_none());
    }

    #[test]
    fn json_mismatch_reports_both_values() {
        let frame = ReceivedFrame {
            frame: InboundFrame::Ack,
            declared_len: 0,
            verification: Verification::Mismatch {
                expected: 0x80,
                received: 0x00,
            },
        };
        let value = serde_json::to_value(frame_output(&frame, "COM21")).unwrap();
        assert_eq!(value["checksum"], "failed");
        assert_eq!(value["expected_checksum"], 0x80);
        assert_eq!(value["received_checksum"], 0x00);
    }
}
