use rmpp_link_session::LinkConfig;
use tracing::info;

use crate::cmd::{connect_session, OffArgs};
use crate::exit::{CliError, CliResult, SUCCESS, TRANSPORT_ERROR};

pub fn run(args: OffArgs, config: LinkConfig) -> CliResult<i32> {
    let mut session = connect_session(&args.path, config, args.connect_timeout)?;

    let sent = session.control().power_off();
    session.shutdown();

    if !sent {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            "power-off command could not be sent",
        ));
    }
    info!(path = %args.path.display(), "power-off sent");
    Ok(SUCCESS)
}
