mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{Command, TimingArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "rmpp-link",
    version,
    about = "Console link to a model railway power pack"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Link timing config file (JSON, millisecond fields).
    #[arg(long, value_name = "FILE", global = true, env = "RMPP_LINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    timing: TimingArgs,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::load_config(cli.config.as_deref(), &cli.timing)
        .and_then(|config| cmd::run(cli.command, config, format));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cmd::DirectionArg;

    #[test]
    fn parses_drive_subcommand() {
        let cli = Cli::try_parse_from([
            "rmpp-link",
            "drive",
            "/tmp/rmpp.sock",
            "--direction",
            "reverse",
            "--duty",
            "40",
            "--hold",
            "750ms",
        ])
        .expect("drive args should parse");

        match cli.command {
            Command::Drive(args) => {
                assert_eq!(args.direction, DirectionArg::Reverse);
                assert_eq!(args.duty, 40.0);
                assert_eq!(args.hold, Duration::from_millis(750));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_duty_out_of_range() {
        let err = Cli::try_parse_from([
            "rmpp-link",
            "drive",
            "/tmp/rmpp.sock",
            "--direction",
            "forward",
            "--duty",
            "150",
        ])
        .expect_err("duty above 100 should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn drive_requires_direction() {
        let err = Cli::try_parse_from(["rmpp-link", "drive", "/tmp/rmpp.sock", "--duty", "10"])
            .expect_err("missing direction should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn timing_overrides_are_global() {
        let cli = Cli::try_parse_from([
            "rmpp-link",
            "monitor",
            "/tmp/rmpp.sock",
            "--count",
            "3",
            "--heartbeat-timeout",
            "250ms",
        ])
        .expect("monitor args should parse");

        assert!(matches!(cli.command, Command::Monitor(_)));
        assert_eq!(cli.timing.heartbeat_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn parses_simulate_subcommand() {
        let cli = Cli::try_parse_from([
            "rmpp-link",
            "simulate",
            "/tmp/rmpp.sock",
            "--drop-pongs",
            "--temperature",
            "-5",
        ])
        .expect("simulate args should parse");

        match cli.command {
            Command::Simulate(args) => {
                assert!(args.drop_pongs);
                assert_eq!(args.temperature, -5);
                assert_eq!(args.status_period, Duration::from_millis(200));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
