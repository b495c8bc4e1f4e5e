use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use parcelwire::session::RequestTemplate;
use parcelwire_frame::{DecodeConfig, EncodeConfig, FrameConfig, InitLength, TrackMode};
use parcelwire_transport::{SerialConfig, SerialLink, SerialStream, DEFAULT_BAUD_RATE};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod ports;
pub mod request;
pub mod session;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive session: type i, d, s or q; responses print as they arrive.
    Session(SessionArgs),
    /// Ask the device for its status and print the reply.
    Status(RequestArgs),
    /// Download the device's event log and print it.
    Dump(RequestArgs),
    /// Initialize the device for a new shipment.
    Init(RequestArgs),
    /// Print every frame the device sends.
    Listen(ListenArgs),
    /// List serial ports.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Session(args) => session::run(args, format),
        Command::Status(args) => request::run(request::Kind::Status, args, format),
        Command::Dump(args) => request::run(request::Kind::Dump, args, format),
        Command::Init(args) => request::run(request::Kind::Init, args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial port (e.g. /dev/ttyUSB0, COM21).
    #[arg(env = "PARCELWIRE_PORT")]
    pub port: String,
    /// Line speed.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE, env = "PARCELWIRE_BAUD")]
    pub baud: u32,
    /// How long a read may block before the loop re-checks for shutdown (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub read_timeout: String,
    /// Reject ACK, NAK and STATUS frames whose length byte is wrong.
    #[arg(long)]
    pub strict_length: bool,
}

impl LinkArgs {
    pub fn open(&self, read_timeout: Duration) -> CliResult<SerialStream> {
        let config = SerialConfig::new(self.port.clone())
            .baud_rate(self.baud)
            .timeout(Some(read_timeout));
        SerialLink::open(&config).map_err(|err| transport_error("open failed", err))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TrackArg {
    Drops,
    Flips,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum InitLengthArg {
    /// Fixed 34/18 length bytes, as deployed firmware expects.
    Legacy,
    /// Length bytes computed from the tracking number.
    Derived,
}

#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Package id sent with init (hex with 0x prefix, or decimal).
    #[arg(long, default_value = "0xBEEF", value_parser = parse_u16)]
    pub package_id: u16,
    /// Carrier access code sent with init.
    #[arg(long, default_value = "0x8A", value_parser = parse_u8)]
    pub carrier_code: u8,
    /// User access code sent with init.
    #[arg(long, default_value = "0xB2", value_parser = parse_u8)]
    pub user_code: u8,
    /// Access code sent with dump.
    #[arg(long, default_value = "0x8A", value_parser = parse_u8)]
    pub access_code: u8,
    /// Tracking number sent with init.
    #[arg(
        long,
        default_value = "1ZA807T70336134832",
        env = "PARCELWIRE_TRACKING_NUMBER"
    )]
    pub tracking_number: String,
    /// Events the device should record (comma-separated).
    #[arg(long, value_enum, value_delimiter = ',', default_value = "drops,flips")]
    pub track: Vec<TrackArg>,
    /// How init length bytes are produced.
    #[arg(long, value_enum, default_value = "legacy")]
    pub init_length: InitLengthArg,
}

impl TemplateArgs {
    pub fn template(&self) -> CliResult<RequestTemplate> {
        if !self.tracking_number.is_ascii() {
            return Err(CliError::new(USAGE, "--tracking-number must be ASCII"));
        }
        Ok(RequestTemplate {
            package_id: self.package_id,
            carrier_access_code: self.carrier_code,
            user_access_code: self.user_code,
            dump_access_code: self.access_code,
            track_mode: TrackMode {
                drops: self.track.contains(&TrackArg::Drops),
                flips: self.track.contains(&TrackArg::Flips),
            },
            tracking_number: self.tracking_number.clone(),
        })
    }
}

/// Frame settings for one link. Both halves of a split port get the same
/// finite `timeout`: on Windows it is a device setting, not a handle setting.
pub fn frame_config(
    link: &LinkArgs,
    template: Option<&TemplateArgs>,
    timeout: Duration,
) -> FrameConfig {
    let init_length = match template.map(|t| t.init_length) {
        Some(InitLengthArg::Derived) => InitLength::Derived,
        _ => InitLength::Legacy,
    };
    FrameConfig {
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
        encode: EncodeConfig { init_length },
        decode: DecodeConfig {
            strict_length: link.strict_length,
        },
    }
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub template: TemplateArgs,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub template: TemplateArgs,
    /// Maximum time to wait for the response (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

fn parse_int(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid number: {input}"))
}

fn parse_u8(input: &str) -> Result<u8, String> {
    let value = parse_int(input)?;
    u8::try_from(value).map_err(|_| format!("{input} does not fit in one byte"))
}

fn parse_u16(input: &str) -> Result<u16, String> {
    let value = parse_int(input)?;
    u16::try_from(value).map_err(|_| format!("{input} does not fit in two bytes"))
}
