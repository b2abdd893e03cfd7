use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand, ValueEnum};
use rmpp_link_frame::Direction;
use rmpp_link_session::{LinkConfig, LinkSession, MAX_PERIOD};
use rmpp_link_transport::UnixConnector;
use tracing::debug;

use crate::exit::{link_error, transport_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod drive;
pub mod monitor;
pub mod off;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a device and print its telemetry and link events.
    Monitor(MonitorArgs),
    /// Drive the output at a fixed setpoint, then power off.
    Drive(DriveArgs),
    /// Send the power-off command once.
    Off(OffArgs),
    /// Run a device simulator on a socket path.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, config: LinkConfig, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, config, format),
        Command::Drive(args) => drive::run(args, config, format),
        Command::Off(args) => off::run(args, config),
        Command::Simulate(args) => simulate::run(args),
        Command::Version(args) => version::run(args),
    }
}

/// Link timing overrides, applied on top of `--config` or the defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct TimingArgs {
    /// Quiet time before each heartbeat probe (e.g. 4s, 500ms).
    #[arg(long, value_name = "DURATION", global = true, env = "RMPP_LINK_HEARTBEAT_INTERVAL", value_parser = parse_duration)]
    pub heartbeat_interval: Option<Duration>,
    /// How long a heartbeat probe may go unanswered.
    #[arg(long, value_name = "DURATION", global = true, env = "RMPP_LINK_HEARTBEAT_TIMEOUT", value_parser = parse_duration)]
    pub heartbeat_timeout: Option<Duration>,
    /// Status-frame silence before the link is reported stale.
    #[arg(long, value_name = "DURATION", global = true, env = "RMPP_LINK_STALE_AFTER", value_parser = parse_duration)]
    pub stale_after: Option<Duration>,
    /// Setpoint resend period under external control.
    #[arg(long, value_name = "DURATION", global = true, env = "RMPP_LINK_RESEND_PERIOD", value_parser = parse_duration)]
    pub resend_period: Option<Duration>,
    /// Delay before retrying a failed connect.
    #[arg(long, value_name = "DURATION", global = true, env = "RMPP_LINK_RETRY_INTERVAL", value_parser = parse_duration)]
    pub retry_interval: Option<Duration>,
}

impl TimingArgs {
    fn apply(&self, config: &mut LinkConfig) {
        let overrides = [
            (self.heartbeat_interval, &mut config.heartbeat_interval),
            (self.heartbeat_timeout, &mut config.heartbeat_timeout),
            (self.stale_after, &mut config.stale_after),
            (self.resend_period, &mut config.resend_period),
            (self.retry_interval, &mut config.retry_interval),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Build the effective link configuration.
pub fn load_config(path: Option<&Path>, timing: &TimingArgs) -> CliResult<LinkConfig> {
    let mut config = match path {
        Some(path) => LinkConfig::from_json_file(path)
            .map_err(|err| link_error(&format!("failed loading {}", path.display()), err))?,
        None => LinkConfig::default(),
    };
    timing.apply(&mut config);
    config
        .validate()
        .map_err(|err| link_error("invalid configuration", err))?;
    debug!(?config, "effective link configuration");
    Ok(config)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Forward,
    Reverse,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Forward => Direction::Forward,
            DirectionArg::Reverse => Direction::Reverse,
        }
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Device socket path.
    pub path: PathBuf,
    /// Exit after printing N status frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DriveArgs {
    /// Device socket path.
    pub path: PathBuf,
    /// Travel direction.
    #[arg(long, short = 'd')]
    pub direction: DirectionArg,
    /// Output duty in percent (0-100).
    #[arg(long, value_parser = parse_percent)]
    pub duty: f32,
    /// How long to hold the setpoint before powering off (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub hold: Duration,
    /// Maximum time to wait for the link to open.
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub connect_timeout: Duration,
}

#[derive(Args, Debug)]
pub struct OffArgs {
    /// Device socket path.
    pub path: PathBuf,
    /// Maximum time to wait for the link to open.
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub connect_timeout: Duration,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Status frame interval.
    #[arg(long, default_value = "200ms", value_parser = parse_duration)]
    pub status_period: Duration,
    /// Turn the output off when no command arrives for this long.
    #[arg(long, default_value = "3s", value_parser = parse_duration)]
    pub alive_timeout: Duration,
    /// Reported input voltage in volts.
    #[arg(long, default_value = "12.0")]
    pub voltage: f32,
    /// Reported CPU temperature in degrees Celsius.
    #[arg(long, default_value = "35", allow_hyphen_values = true)]
    pub temperature: i8,
    /// Latch an output fault once the output has been on this long.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub fault_after: Option<Duration>,
    /// Never answer heartbeat probes, forcing the console to reconnect.
    #[arg(long)]
    pub drop_pongs: bool,
    /// Exit after serving N connections.
    #[arg(long)]
    pub connections: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a duration such as `5s`, `150ms` or a bare number of seconds.
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

    let duration = match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    };
    if duration > MAX_PERIOD {
        return Err(CliError::new(
            USAGE,
            format!("duration must not exceed {}s: {input}", MAX_PERIOD.as_secs()),
        ));
    }
    Ok(duration)
}

/// Parse an operator duty percentage.
pub fn parse_percent(input: &str) -> CliResult<f32> {
    let value: f32 = input
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid percentage: {input}")))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(CliError::new(
            USAGE,
            format!("percentage must be between 0 and 100: {input}"),
        ));
    }
    Ok(value)
}

/// Open a session and wait until the link is up.
///
/// Failed connects are retried at the configured interval until `timeout`
/// elapses; the last connect error is reported.
pub(crate) fn connect_session(
    path: &Path,
    config: LinkConfig,
    timeout: Duration,
) -> CliResult<LinkSession<UnixConnector>> {
    let mut session = LinkSession::new(UnixConnector::new(path), config);
    let deadline = Instant::now() + timeout;

    let mut last_error = match session.open(Instant::now()) {
        Ok(()) => return Ok(session),
        Err(err) => err,
    };

    while Instant::now() < deadline {
        let next_retry = session.next_deadline().unwrap_or(deadline).min(deadline);
        std::thread::sleep(next_retry.saturating_duration_since(Instant::now()));
        if Instant::now() >= deadline {
            break;
        }
        match session.open(Instant::now()) {
            Ok(()) => return Ok(session),
            Err(err) => last_error = err,
        }
    }

    let err = transport_error("connect failed", last_error);
    Err(CliError::new(
        err.code,
        format!("{} (gave up after {:?})", err.message, timeout),
    ))
}

pub(crate) fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(running)
}
