use std::io;
use std::thread;

use parcelwire::session::{run_command_loop, run_decode_loop, LocalClock, Shutdown, UserCommand};
use parcelwire_frame::{FrameReader, FrameWriter};
use tracing::{error, info};

use crate::cmd::{frame_config, parse_duration, SessionArgs};
use crate::exit::{
    frame_error, session_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS,
};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SessionArgs, format: OutputFormat) -> CliResult<i32> {
    let read_timeout = parse_duration(&args.link.read_timeout)?;
    let template = args.template.template()?;
    let config = frame_config(&args.link, Some(&args.template), read_timeout);

    let stream = args.link.open(read_timeout)?;
    let (read_half, write_half) = stream
        .split()
        .map_err(|err| transport_error("split failed", err))?;
    let mut reader = FrameReader::with_config_serial(read_half, config.clone())
        .map_err(|err| frame_error("configure failed", err))?;
    let mut writer = FrameWriter::with_config_serial(write_half, config)
        .map_err(|err| frame_error("configure failed", err))?;

    let shutdown = Shutdown::new();
    let port = args.link.port.clone();
    let decode_shutdown = shutdown.clone();
    let decoder = thread::Builder::new()
        .name("decode".to_string())
        .spawn(move || {
            let result = run_decode_loop(&mut reader, &decode_shutdown, |frame| {
                print_frame(frame, &port, format)
            });
            if let Err(err) = &result {
                error!(error = %err, "decode loop failed; press enter to exit");
            }
            result
        })
        .map_err(|err| CliError::new(INTERNAL, format!("decode thread spawn failed: {err}")))?;

    info!(port = %args.link.port, baud = args.link.baud, "session started");
    eprintln!("{}", UserCommand::USAGE);

    let stdin = io::stdin();
    let sent = run_command_loop(stdin.lock(), &mut writer, &template, &LocalClock, &shutdown);

    let decoded = decoder
        .join()
        .map_err(|_| CliError::new(INTERNAL, "decode thread panicked"))?;

    let sent = sent.map_err(|err| session_error("command loop failed", err))?;
    let received = decoded.map_err(|err| session_error("decode loop failed", err))?;
    info!(sent, received, "session closed");
    Ok(SUCCESS)
}
