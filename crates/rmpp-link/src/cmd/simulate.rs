//! Device simulator: the power-pack side of the link, over a Unix socket.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use rmpp_link_frame::{
    decode_command, encode_status, CommandFrame, Decivolts, DeviceMode, Direction, StatusFrame,
};
use rmpp_link_session::{HEARTBEAT_ACK, HEARTBEAT_PROBE};
use rmpp_link_transport::{Message, MessageTransport, TransportError, UnixMessageListener};
use tracing::{debug, info, warn};

use crate::cmd::{install_ctrlc_handler, SimulateArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};

const MODE_OFF: u8 = 1;
const MODE_ON: u8 = 2;
const MODE_FAULT: u8 = 3;

/// Output stage state, driven by command frames and the alive timer.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    mode: u8,
    direction: Direction,
    duty: u16,
    external_control: bool,
    output_fault: bool,
    input_voltage: Decivolts,
    cpu_temperature: i8,
    alive_timeout: Duration,
    fault_after: Option<Duration>,
    last_command: Option<Instant>,
    on_since: Option<Instant>,
}

impl SimulatedDevice {
    pub fn new(input_voltage: Decivolts, cpu_temperature: i8, alive_timeout: Duration) -> Self {
        Self {
            mode: MODE_OFF,
            direction: Direction::None,
            duty: 0,
            external_control: false,
            output_fault: false,
            input_voltage,
            cpu_temperature,
            alive_timeout,
            fault_after: None,
            last_command: None,
            on_since: None,
        }
    }

    /// Latch an output fault once the output has been on for `after`.
    pub fn with_fault_after(mut self, after: Option<Duration>) -> Self {
        self.fault_after = after;
        self
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }

    /// Apply one command frame received at `now`.
    ///
    /// A drive command starts the output when it is off and updates the duty
    /// once it is on; the direction is fixed until the output stops. The
    /// power-off frame stops the output, or clears a latched fault.
    pub fn apply(&mut self, command: CommandFrame, now: Instant) {
        self.last_command = Some(now);

        if command.is_power_off() {
            self.stop();
            return;
        }
        if self.mode == MODE_OFF {
            info!(direction = ?command.direction(), "output on");
            self.mode = MODE_ON;
            self.external_control = true;
            self.direction = command.direction();
            self.on_since = Some(now);
        }
        if self.mode == MODE_ON {
            self.duty = command.duty();
        }
    }

    /// Turn the output off when commands stopped arriving, and trip the
    /// configured fault.
    pub fn tick(&mut self, now: Instant) {
        let tripped = match (self.fault_after, self.on_since) {
            (Some(after), Some(since)) => now.saturating_duration_since(since) >= after,
            _ => false,
        };
        if self.mode == MODE_ON && tripped {
            warn!("output fault");
            self.trip();
            return;
        }

        let expired = self
            .last_command
            .is_some_and(|at| now.saturating_duration_since(at) > self.alive_timeout);
        if self.mode == MODE_ON && expired {
            warn!(timeout = ?self.alive_timeout, "alive monitoring timeout");
            self.stop();
        }
    }

    fn trip(&mut self) {
        self.turn_output_off();
        self.mode = MODE_FAULT;
        self.output_fault = true;
    }

    pub fn status(&self) -> StatusFrame {
        StatusFrame {
            mode: self.mode,
            direction: self.direction,
            external_control: self.external_control,
            output_fault: self.output_fault,
            system_fault: false,
            input_voltage: self.input_voltage,
            cpu_temperature: self.cpu_temperature,
        }
    }

    fn stop(&mut self) {
        match DeviceMode::from(self.mode) {
            DeviceMode::On => {
                info!("output off");
                self.turn_output_off();
                self.mode = MODE_OFF;
            }
            DeviceMode::Fault => {
                info!("fault cleared");
                self.mode = MODE_OFF;
                self.output_fault = false;
            }
            _ => {}
        }
    }

    fn turn_output_off(&mut self) {
        self.on_since = None;
        self.direction = Direction::None;
        self.external_control = false;
        self.duty = 0;
    }
}

pub fn run(args: SimulateArgs) -> CliResult<i32> {
    let running = install_ctrlc_handler()?;
    let listener = UnixMessageListener::bind(&args.path)
        .map_err(|err| transport_error("bind failed", err))?;
    info!(path = %listener.path().display(), "device simulator listening");

    let voltage = Decivolts((args.voltage * 10.0).round().clamp(0.0, 255.0) as u8);
    let mut device = SimulatedDevice::new(voltage, args.temperature, args.alive_timeout)
        .with_fault_after(args.fault_after);
    let mut served = 0usize;

    while running.load(Ordering::SeqCst) {
        if args.connections.is_some_and(|limit| served >= limit) {
            break;
        }
        let mut stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        served = served.saturating_add(1);
        info!(connection = served, "console connected");

        match serve(&mut stream, &mut device, &args, &|| running.load(Ordering::SeqCst)) {
            Ok(()) | Err(TransportError::Closed) => info!("console disconnected"),
            Err(err) => warn!(error = %err, "connection dropped"),
        }
    }

    Ok(SUCCESS)
}

/// Serve one console connection until it closes.
fn serve<T: MessageTransport>(
    transport: &mut T,
    device: &mut SimulatedDevice,
    args: &SimulateArgs,
    running: &dyn Fn() -> bool,
) -> Result<(), TransportError> {
    let mut next_status = Instant::now() + args.status_period;

    while running() {
        let wait = next_status.saturating_duration_since(Instant::now());
        if let Some(message) = transport.recv_timeout(wait)? {
            handle(transport, device, message, args.drop_pongs)?;
        }

        let now = Instant::now();
        device.tick(now);
        if now >= next_status {
            transport.send(&Message::binary(encode_status(&device.status()).to_vec()))?;
            next_status += args.status_period;
            if next_status <= now {
                next_status = now + args.status_period;
            }
        }
    }
    Ok(())
}

fn handle<T: MessageTransport>(
    transport: &mut T,
    device: &mut SimulatedDevice,
    message: Message,
    drop_pongs: bool,
) -> Result<(), TransportError> {
    match message {
        Message::Text(text) if text == HEARTBEAT_PROBE => {
            if drop_pongs {
                debug!("heartbeat probe ignored");
            } else {
                transport.send(&Message::text(HEARTBEAT_ACK))?;
            }
        }
        Message::Text(text) => debug!(%text, "ignoring text message"),
        Message::Binary(payload) => match decode_command(&payload) {
            Ok(command) => {
                device.apply(command, Instant::now());
                debug!(duty = device.duty(), ?command, "command applied");
            }
            Err(err) => warn!(error = %err, "dropping undecodable command"),
        },
    }
    Ok(())
}
