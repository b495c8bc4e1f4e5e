use parcelwire::session::{run_decode_loop, Shutdown};
use parcelwire_frame::FrameReader;
use tracing::info;

use crate::cmd::{frame_config, parse_duration, ListenArgs};
use crate::exit::{frame_error, session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let read_timeout = parse_duration(&args.link.read_timeout)?;
    let config = frame_config(&args.link, None, read_timeout);

    let stream = args.link.open(read_timeout)?;
    let mut reader = FrameReader::with_config_serial(stream, config)
        .map_err(|err| frame_error("configure failed", err))?;

    let shutdown = Shutdown::new();
    install_ctrlc_handler(shutdown.clone())?;

    let mut printed = 0usize;
    let port = args.link.port.as_str();
    let result = run_decode_loop(&mut reader, &shutdown, |frame| {
        print_frame(frame, port, format);
        printed = printed.saturating_add(1);
        if args.count.is_some_and(|count| printed >= count) {
            shutdown.trigger();
        }
    });

    let seen = result.map_err(|err| session_error("receive failed", err))?;
    info!(frames = seen, "listen stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(shutdown: Shutdown) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.trigger()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
