use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("parcelwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: parcelwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("PARCELWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("PARCELWIRE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("default_baud: {}", parcelwire_transport::DEFAULT_BAUD_RATE);
    println!(
        "protocol: init=0x{:02X} dump=0x{:02X} status=0x{:02X}",
        parcelwire_frame::CMD_INIT,
        parcelwire_frame::CMD_DUMP,
        parcelwire_frame::CMD_STATUS
    );

    Ok(SUCCESS)
}
