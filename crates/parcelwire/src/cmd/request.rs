use std::io::Read;
use std::time::{Duration, Instant};

use parcelwire::session::{LocalClock, UserCommand};
use parcelwire_frame::{FrameReader, FrameWriter, InboundFrame, ReceivedFrame, Verification};
use tracing::{debug, info};

use crate::cmd::{frame_config, parse_duration, RequestArgs};
use crate::exit::{
    frame_error, transport_error, CliError, CliResult, DATA_INVALID, FAILURE, INTERNAL, SUCCESS,
    TIMEOUT, USAGE,
};
use crate::output::{print_frame, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Status,
    Dump,
    Init,
}

impl Kind {
    fn command(self) -> UserCommand {
        match self {
            Kind::Status => UserCommand::Status,
            Kind::Dump => UserCommand::Dump,
            Kind::Init => UserCommand::Init,
        }
    }
}

pub fn run(kind: Kind, args: RequestArgs, format: OutputFormat) -> CliResult<i32> {
    let read_timeout = parse_duration(&args.link.read_timeout)?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let template = args.template.template()?;
    let deadline = deadline_after(wait_timeout)?;
    let config = frame_config(
        &args.link,
        Some(&args.template),
        read_timeout.min(wait_timeout),
    );

    let frame = template
        .request(kind.command(), &LocalClock)
        .ok_or_else(|| CliError::new(INTERNAL, "no request for command"))?;

    let stream = args.link.open(read_timeout)?;
    let (read_half, write_half) = stream
        .split()
        .map_err(|err| transport_error("split failed", err))?;
    let mut reader = FrameReader::with_config_serial(read_half, config.clone())
        .map_err(|err| frame_error("configure failed", err))?;
    let mut writer = FrameWriter::with_config_serial(write_half, config)
        .map_err(|err| frame_error("configure failed", err))?;

    writer
        .send(&frame)
        .map_err(|err| frame_error("send failed", err))?;
    info!(request = ?kind, port = %args.link.port, "request sent");

    let response = await_response(&mut reader, deadline, wait_timeout)?;
    print_frame(&response, &args.link.port, format);
    Ok(exit_code(&response))
}

/// The instant `wait` from now, or a usage error if the clock cannot
/// represent it.
pub fn deadline_after(wait: Duration) -> CliResult<Instant> {
    Instant::now().checked_add(wait).ok_or_else(|| {
        CliError::new(
            USAGE,
            format!("--wait-timeout of {}s is too large", wait.as_secs()),
        )
    })
}

/// Read frames until one arrives or `deadline` passes.
///
/// Individual read timeouts before the deadline are retried; bytes of a
/// partial frame stay buffered in the reader between attempts. `wait` is
/// only used in the timeout message.
pub fn await_response<T: Read>(
    reader: &mut FrameReader<T>,
    deadline: Instant,
    wait: Duration,
) -> CliResult<ReceivedFrame> {
    loop {
        match reader.read_frame() {
            Ok(frame) => return Ok(frame),
            Err(err) if err.is_timeout() => {
                if Instant::now() >= deadline {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("no response within {}ms", wait.as_millis()),
                    ));
                }
                debug!(buffered = reader.buffered(), "still waiting for response");
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        }
    }
}

/// Exit code for a one-shot response.
pub fn exit_code(frame: &ReceivedFrame) -> i32 {
    if let Verification::Mismatch { .. } = frame.verification {
        return DATA_INVALID;
    }
    match frame.frame {
        InboundFrame::Ack | InboundFrame::Status(_) | InboundFrame::Dump(_) => SUCCESS,
        InboundFrame::Nak => FAILURE,
        InboundFrame::Unrecognized { .. } => DATA_INVALID,
    }
}
