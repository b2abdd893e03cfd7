use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rmpp_link_frame::{encode_status, Decivolts, DeviceMode, Direction, StatusFrame};
use rmpp_link_session::{LinkObserver, LinkState};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Input voltage readout. `--.-` without data, `!` prefix below 10.0 V.
pub fn voltage_readout(voltage: Option<Decivolts>) -> String {
    match voltage {
        None => "--.-".to_string(),
        Some(v) if v.0 < 100 => format!("!{v}"),
        Some(v) => v.to_string(),
    }
}

/// CPU temperature readout, padded to the console's fixed-width display.
///
/// `---` without data. Otherwise the value is prefixed with filler marks so
/// that it occupies the same width whatever its magnitude and sign.
pub fn temperature_readout(celsius: Option<i8>) -> String {
    let Some(t) = celsius else {
        return "---".to_string();
    };
    let prefix = match t {
        i8::MIN..=-10 => "-",
        -9..=-1 => "!-",
        0..=9 => "!!",
        10..=99 => "!",
        _ => "",
    };
    format!("{prefix}{t}")
}

pub fn mode_label(mode: u8) -> String {
    match DeviceMode::from(mode) {
        DeviceMode::Init => "init".to_string(),
        DeviceMode::Off => "off".to_string(),
        DeviceMode::On => "on".to_string(),
        DeviceMode::Fault => "fault".to_string(),
        DeviceMode::Fail => "fail".to_string(),
        DeviceMode::Other(other) => format!("mode-{other}"),
    }
}

pub fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::None => "none",
        Direction::Forward => "forward",
        Direction::Reverse => "reverse",
    }
}

pub fn state_label(state: LinkState) -> &'static str {
    match state {
        LinkState::Connecting => "connecting",
        LinkState::Open => "open",
        LinkState::AwaitingPong => "awaiting_pong",
        LinkState::Closed => "closed",
    }
}

fn flag(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    event: &'static str,
    mode_name: String,
    #[serde(flatten)]
    frame: &'a StatusFrame,
    voltage: String,
    temperature: String,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum LinkOutput {
    State { state: LinkState },
    Motion { mode: String, direction: Direction },
    ExternalControl { enabled: bool },
    Stale { voltage: String, temperature: String },
    SetpointReset,
}

/// Prints link events and telemetry to stdout in the selected format.
pub struct TelemetryRenderer {
    format: OutputFormat,
    frames: usize,
}

impl TelemetryRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, frames: 0 }
    }

    /// Status frames rendered so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    fn print_event(&self, event: LinkOutput, pretty: String) {
        match self.format {
            OutputFormat::Json => print_json(&event),
            OutputFormat::Table | OutputFormat::Pretty => println!("{pretty}"),
            OutputFormat::Raw => {}
        }
    }
}

impl LinkObserver for TelemetryRenderer {
    fn on_state_changed(&mut self, state: LinkState) {
        self.print_event(
            LinkOutput::State { state },
            format!("link {}", state_label(state)),
        );
    }

    fn on_motion_changed(&mut self, mode: u8, direction: Direction) {
        self.print_event(
            LinkOutput::Motion {
                mode: mode_label(mode),
                direction,
            },
            format!(
                "mode {} direction {}",
                mode_label(mode),
                direction_label(direction)
            ),
        );
    }

    fn on_status(&mut self, frame: &StatusFrame) {
        self.frames = self.frames.saturating_add(1);
        print_status(frame, self.format);
    }

    fn on_external_control(&mut self, enabled: bool) {
        self.print_event(
            LinkOutput::ExternalControl { enabled },
            format!("external control {}", flag(enabled)),
        );
    }

    fn on_stale(&mut self) {
        let voltage = voltage_readout(None);
        let temperature = temperature_readout(None);
        let pretty = format!("no data volt={voltage} temp={temperature}");
        self.print_event(
            LinkOutput::Stale {
                voltage,
                temperature,
            },
            pretty,
        );
    }

    fn on_setpoint_reset(&mut self) {
        self.print_event(LinkOutput::SetpointReset, "setpoint reset".to_string());
    }
}

pub fn print_status(frame: &StatusFrame, format: OutputFormat) {
    let voltage = voltage_readout(Some(frame.input_voltage));
    let temperature = temperature_readout(Some(frame.cpu_temperature));

    match format {
        OutputFormat::Json => print_json(&StatusOutput {
            event: "status",
            mode_name: mode_label(frame.mode),
            frame,
            voltage,
            temperature,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODE", "DIR", "EXT", "OUT FAULT", "SYS FAULT", "VOLT", "TEMP"])
                .add_row(vec![
                    mode_label(frame.mode),
                    direction_label(frame.direction).to_string(),
                    flag(frame.external_control).to_string(),
                    flag(frame.output_fault).to_string(),
                    flag(frame.system_fault).to_string(),
                    voltage,
                    temperature,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "mode={} dir={} ext={} out_fault={} sys_fault={} volt={} temp={}",
                mode_label(frame.mode),
                direction_label(frame.direction),
                flag(frame.external_control),
                flag(frame.output_fault),
                flag(frame.system_fault),
                voltage,
                temperature
            );
        }
        OutputFormat::Raw => print_raw(&encode_status(frame)),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
