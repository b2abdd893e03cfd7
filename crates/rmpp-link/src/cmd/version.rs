use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("rmpp-link {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: rmpp-link");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("RMPP_LINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "frame: status {} bytes, command {} bytes",
        rmpp_link_frame::STATUS_FRAME_LEN,
        rmpp_link_frame::COMMAND_FRAME_LEN
    );
    println!(
        "heartbeat: probe {:?}, ack {:?}",
        rmpp_link_session::HEARTBEAT_PROBE,
        rmpp_link_session::HEARTBEAT_ACK
    );

    Ok(SUCCESS)
}
