use std::sync::atomic::Ordering;
use std::time::Instant;

use rmpp_link_frame::Direction;
use rmpp_link_session::{driver, LinkConfig};
use tracing::{info, warn};

use crate::cmd::{connect_session, install_ctrlc_handler, DriveArgs};
use crate::exit::{CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{OutputFormat, TelemetryRenderer};

pub fn run(args: DriveArgs, config: LinkConfig, format: OutputFormat) -> CliResult<i32> {
    let running = install_ctrlc_handler()?;
    let mut session = connect_session(&args.path, config, args.connect_timeout)?;
    let mut renderer = TelemetryRenderer::new(format);

    let direction = Direction::from(args.direction);
    let mut control = session.control();
    if !control.select_direction(direction) || !control.set_duty_percent(args.duty) {
        session.shutdown();
        return Err(CliError::new(
            TRANSPORT_ERROR,
            "setpoint could not be sent",
        ));
    }
    info!(?direction, duty = args.duty, hold = ?args.hold, "setpoint applied");

    // While holding, the session keeps resending the setpoint whenever the
    // device reports external control, so the device's alive timer stays fed.
    let until = Instant::now() + args.hold;
    driver::run(&mut session, &mut renderer, |_, _| {
        running.load(Ordering::SeqCst) && Instant::now() < until
    });

    let mut stopped = session.control().power_off();
    if !stopped {
        warn!("power-off not sent; waiting for the link to return");
        let retry_until = Instant::now() + args.connect_timeout;
        driver::run(&mut session, &mut renderer, |session, _| {
            running.load(Ordering::SeqCst) && !session.is_open() && Instant::now() < retry_until
        });
        stopped = session.control().power_off();
    }
    session.shutdown();
    driver::dispatch_events(&mut session, &mut renderer);

    if !stopped {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            "power-off command could not be sent",
        ));
    }
    info!("output powered off");
    Ok(SUCCESS)
}
