#![cfg(unix)]

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use parcelwire::frame::{
    checksum, DeviceStatus, EventKind, FrameConfig, FrameError, FrameReader, FrameWriter,
    InboundFrame, ReceivedFrame, Timestamp, Verification, CMD_DUMP, CMD_INIT, CMD_STATUS,
};
use parcelwire::session::{
    run_command_loop, run_decode_loop, FixedClock, RequestTemplate, SessionError, Shutdown,
};

fn with_checksum(mut bytes: Vec<u8>) -> Vec<u8> {
    let sum = checksum(&bytes);
    bytes.push(sum);
    bytes
}

fn status_response() -> Vec<u8> {
    with_checksum(vec![0x81, 0x04, 0xEF, 0xBE, 0x01, 0x00])
}

fn dump_response() -> Vec<u8> {
    let mut bytes = vec![0x82, 20, 0xEF, 0xBE, 0x01, 0x00];
    bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
    bytes.extend_from_slice(&[0xE8, 0x07, 0x06, 0x01, 0x03, 0x0C, 0x1E, 0x00]);
    bytes.extend_from_slice(&7u32.to_le_bytes());
    with_checksum(bytes)
}

/// Reads command frames off the wire and answers each one like a tracker.
fn fake_device(mut link: UnixStream, seen: mpsc::Sender<Vec<u8>>) {
    loop {
        let mut header = [0u8; 2];
        if link.read_exact(&mut header).is_err() {
            return;
        }
        let mut rest = vec![0u8; header[1] as usize + 1];
        if link.read_exact(&mut rest).is_err() {
            return;
        }
        let mut frame = header.to_vec();
        frame.extend_from_slice(&rest);
        let reply = match header[0] {
            CMD_STATUS => status_response(),
            CMD_DUMP => dump_response(),
            CMD_INIT => with_checksum(vec![0x80, 0x00]),
            _ => with_checksum(vec![0x8F, 0x00]),
        };
        let _ = seen.send(frame);
        if link.write_all(&reply).is_err() {
            return;
        }
    }
}

fn fixed_clock() -> FixedClock {
    FixedClock(Timestamp {
        year: 2024,
        month: 6,
        weekday: 1,
        day: 3,
        hour: 12,
        minute: 30,
        second: 0,
    })
}

#[test]
fn session_round_trip_against_fake_device() {
    let (host, device) = UnixStream::pair().expect("socket pair");
    host.set_read_timeout(Some(Duration::from_millis(50)))
        .expect("read timeout");
    let (seen_tx, seen_rx) = mpsc::channel();
    let device_thread = thread::spawn(move || fake_device(device, seen_tx));

    let shutdown = Shutdown::new();
    let frames: Arc<Mutex<Vec<ReceivedFrame>>> = Arc::default();

    let mut reader = FrameReader::new(host.try_clone().expect("clone"));
    let decode_shutdown = shutdown.clone();
    let sink_frames = Arc::clone(&frames);
    let decoder = thread::spawn(move || {
        run_decode_loop(&mut reader, &decode_shutdown, |frame| {
            let mut frames = sink_frames.lock().expect("lock");
            frames.push(frame.clone());
            if frames.len() == 3 {
                decode_shutdown.trigger();
            }
        })
    });

    let mut writer = FrameWriter::new(host.try_clone().expect("clone"));
    let sent = run_command_loop(
        "s\nd\ni\n".as_bytes(),
        &mut writer,
        &RequestTemplate::default(),
        &fixed_clock(),
        &Shutdown::new(),
    )
    .expect("command loop");
    assert_eq!(sent, 3);

    let received = decoder.join().expect("decode thread").expect("decode loop");
    assert_eq!(received, 3);
    assert!(!shutdown.is_running());

    let frames = frames.lock().expect("lock");
    assert!(frames
        .iter()
        .all(|f| f.verification == Verification::Passed));

    match &frames[0].frame {
        InboundFrame::Status(report) => {
            assert_eq!(report.package_id, 0xBEEF);
            assert_eq!(report.status, DeviceStatus::Tracking);
        }
        other => panic!("expected status, got {other:?}"),
    }
    match &frames[1].frame {
        InboundFrame::Dump(report) => {
            assert_eq!(report.events.len(), 1);
            assert_eq!(report.events[0].kind, EventKind::Flip);
            assert_eq!(report.events[0].timestamp.to_string(), "06/03/2024 12:30:00");
            assert_eq!(report.events[0].data, 7);
        }
        other => panic!("expected dump, got {other:?}"),
    }
    assert_eq!(frames[2].frame, InboundFrame::Ack);

    let commands: Vec<Vec<u8>> = seen_rx.try_iter().collect();
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0], vec![0x00, 0x00, 0x00]);
    assert_eq!(commands[1], vec![0x02, 0x01, 0x8A, 0x89]);
    let init = &commands[2];
    assert_eq!(init.len(), 37);
    assert_eq!(&init[..4], &[0x01, 34, 0xEF, 0xBE]);
    assert_eq!(&init[6..8], &2024u16.to_le_bytes());
    assert_eq!(&init[18..36], b"1ZA807T70336134832");
    assert_eq!(checksum(init), 0);

    drop(writer);
    drop(host);
    device_thread.join().expect("device thread");
}

#[test]
fn decode_loop_stops_when_link_closes() {
    let (host, device) = UnixStream::pair().expect("socket pair");
    host.set_read_timeout(Some(Duration::from_millis(20)))
        .expect("read timeout");

    let writer = thread::spawn(move || {
        let mut device = device;
        device
            .write_all(&with_checksum(vec![0x80, 0x00]))
            .expect("write ack");
        // Half a status frame, then hang up.
        device.write_all(&[0x81, 0x04, 0x01]).expect("write partial");
    });

    let shutdown = Shutdown::new();
    let mut reader = FrameReader::with_config(host, FrameConfig::default());
    let mut names = Vec::new();
    let err = run_decode_loop(&mut reader, &shutdown, |frame| names.push(frame.frame.name()))
        .expect_err("closed link should end the loop");
    writer.join().expect("device thread");

    assert_eq!(names, vec!["ACK"]);
    assert!(matches!(
        err,
        SessionError::Link(FrameError::ConnectionClosed)
    ));
    assert!(!shutdown.is_running());
}

#[test]
fn corrupted_reply_is_reported_not_dropped() {
    let (host, mut device) = UnixStream::pair().expect("socket pair");
    let mut bad = status_response();
    let last = bad.len() - 1;
    bad[last] ^= 0xFF;
    device.write_all(&bad).expect("write");

    let mut reader = FrameReader::new(host);
    let frame = reader.read_frame().expect("frame");
    assert!(matches!(
        frame.verification,
        Verification::Mismatch { expected, received } if expected != received
    ));
    assert!(!frame.checksum_ok());
}
