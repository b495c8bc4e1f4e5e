//! Interactive session plumbing.
//!
//! A session runs two loops against one serial link: the decode loop owns
//! every read, the command loop owns every write. They share nothing but a
//! [`Shutdown`] token, which either side can trigger.

use std::io::{BufRead, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Timelike};
use parcelwire_frame::{
    FrameError, FrameReader, FrameWriter, InitRequest, OutboundFrame, ReceivedFrame, Timestamp,
    TrackMode,
};
use tracing::{debug, info, warn};

/// Errors that end a session loop.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The serial link failed while reading or writing frames.
    #[error("link failure: {0}")]
    Link(#[from] FrameError),

    /// Reading the command input failed.
    #[error("command input failure: {0}")]
    Input(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Cancellation token shared by the session loops.
#[derive(Debug, Clone)]
pub struct Shutdown {
    running: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask every loop holding this token to stop at its next boundary.
    pub fn trigger(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!("shutdown requested");
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// A single-character session command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Init,
    Dump,
    Status,
    Quit,
}

impl UserCommand {
    pub const USAGE: &'static str = "Usage:\n  's': status\n  'i': initialize\n  'd': get data\n  'q': quit";

    /// Parse one input line. Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "i" => Some(UserCommand::Init),
            "d" => Some(UserCommand::Dump),
            "s" => Some(UserCommand::Status),
            "q" => Some(UserCommand::Quit),
            _ => None,
        }
    }
}

/// Source of the time stamped into init requests.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// The host's local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> Timestamp {
        timestamp_from(&chrono::Local::now())
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Convert a chrono date-time into the device's clock layout.
///
/// The weekday counts from Sunday = 0.
pub fn timestamp_from<T: Datelike + Timelike>(dt: &T) -> Timestamp {
    Timestamp {
        year: dt.year().clamp(0, i32::from(u16::MAX)) as u16,
        month: dt.month() as u8,
        weekday: dt.weekday().num_days_from_sunday() as u8,
        day: dt.day() as u8,
        hour: dt.hour() as u8,
        minute: dt.minute() as u8,
        second: dt.second() as u8,
    }
}

/// Fixed fields of the requests a session sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    pub package_id: u16,
    pub carrier_access_code: u8,
    pub user_access_code: u8,
    /// Access code sent with dump requests.
    pub dump_access_code: u8,
    pub track_mode: TrackMode,
    pub tracking_number: String,
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            package_id: 0xBEEF,
            carrier_access_code: 0x8A,
            user_access_code: 0xB2,
            dump_access_code: 0x8A,
            track_mode: TrackMode::ALL,
            tracking_number: "1ZA807T70336134832".to_string(),
        }
    }
}

impl RequestTemplate {
    /// The frame to send for `command`, or `None` for [`UserCommand::Quit`].
    pub fn request(&self, command: UserCommand, clock: &dyn Clock) -> Option<OutboundFrame> {
        match command {
            UserCommand::Init => Some(OutboundFrame::Init(InitRequest {
                package_id: self.package_id,
                timestamp: clock.now(),
                carrier_access_code: self.carrier_access_code,
                user_access_code: self.user_access_code,
                track_mode: self.track_mode,
                tracking_number: self.tracking_number.clone(),
            })),
            UserCommand::Dump => Some(OutboundFrame::Dump {
                access_code: self.dump_access_code,
            }),
            UserCommand::Status => Some(OutboundFrame::Status),
            UserCommand::Quit => None,
        }
    }
}

/// Read frames and hand each to `sink` until `shutdown` fires.
///
/// A read timeout counts as idle time. A frame whose declared length is
/// rejected is skipped. Any other error triggers shutdown and is returned,
/// unless shutdown was already under way. Returns the number of frames seen.
pub fn run_decode_loop<T, F>(
    reader: &mut FrameReader<T>,
    shutdown: &Shutdown,
    mut sink: F,
) -> Result<usize>
where
    T: Read,
    F: FnMut(&ReceivedFrame),
{
    let mut seen = 0usize;
    while shutdown.is_running() {
        match reader.read_frame() {
            Ok(frame) => {
                seen += 1;
                sink(&frame);
            }
            Err(err) if err.is_timeout() => continue,
            Err(err @ FrameError::LengthMismatch { .. }) => {
                warn!(error = %err, "dropping frame");
            }
            Err(err) => {
                if !shutdown.is_running() {
                    break;
                }
                shutdown.trigger();
                return Err(err.into());
            }
        }
    }
    debug!(frames = seen, "decode loop stopped");
    Ok(seen)
}

/// Turn input lines into command frames until quit, end of input or shutdown.
///
/// Triggers `shutdown` on exit. Returns the number of frames sent.
pub fn run_command_loop<I, W>(
    input: I,
    writer: &mut FrameWriter<W>,
    template: &RequestTemplate,
    clock: &dyn Clock,
    shutdown: &Shutdown,
) -> Result<usize>
where
    I: BufRead,
    W: Write,
{
    let result = command_loop(input, writer, template, clock, shutdown);
    shutdown.trigger();
    result
}

fn command_loop<I, W>(
    input: I,
    writer: &mut FrameWriter<W>,
    template: &RequestTemplate,
    clock: &dyn Clock,
    shutdown: &Shutdown,
) -> Result<usize>
where
    I: BufRead,
    W: Write,
{
    let mut sent = 0usize;
    for line in input.lines() {
        if !shutdown.is_running() {
            break;
        }
        let line = line.map_err(SessionError::Input)?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = UserCommand::parse(&line) else {
            warn!(input = line.trim(), "unknown command");
            continue;
        };
        let Some(frame) = template.request(command, clock) else {
            info!("closing");
            break;
        };
        info!(command = ?command, "sending request");
        writer.send(&frame)?;
        sent += 1;
    }
    Ok(sent)
}
