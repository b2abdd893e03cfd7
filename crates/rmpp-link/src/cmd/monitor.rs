use std::sync::atomic::Ordering;

use rmpp_link_session::{driver, LinkConfig, LinkSession};
use rmpp_link_transport::UnixConnector;
use tracing::info;

use crate::cmd::{install_ctrlc_handler, MonitorArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{OutputFormat, TelemetryRenderer};

pub fn run(args: MonitorArgs, config: LinkConfig, format: OutputFormat) -> CliResult<i32> {
    let running = install_ctrlc_handler()?;
    let mut session = LinkSession::new(UnixConnector::new(&args.path), config);
    let mut renderer = TelemetryRenderer::new(format);

    driver::run(&mut session, &mut renderer, |_, renderer| {
        running.load(Ordering::SeqCst)
            && args.count.map_or(true, |count| renderer.frames() < count)
    });

    info!(
        frames = renderer.frames(),
        reconnects = session.reconnect_count(),
        "monitor stopped"
    );
    session.shutdown();
    driver::dispatch_events(&mut session, &mut renderer);
    Ok(SUCCESS)
}
