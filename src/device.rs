//! The Numato board driver: connection lifecycle, command queue, poll loop,
//! watchdogs, input edge detection and output control.
//!
//! The driver is single-threaded and cooperative. Nothing happens on its own:
//! [`NumatoDevice::process`] runs every timer that is due at the clock's
//! current instant, and [`NumatoDevice::run`] calls it in a loop. The timers are:
//!
//! * the reconnect watchdog (1000ms), armed by [`NumatoDevice::initialize`] and
//!   disarmed only by [`NumatoDevice::close`];
//! * the poll tick (10ms), running while the device is initialized. Each tick
//!   sends one queued command, or `gpio readall` when the queue is empty;
//! * one keyed pulse-reset timer per output index.
//!
//! Faults after initialization never reach the caller. They are logged, handed
//! to the error callback, and connection-level faults drop the connection so
//! the reconnect watchdog can pick it up again.

use crate::binary_state::BinaryState;
use crate::command::Command;
use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::serial::SerialConnector;
use crate::state::{DeviceState, Transition};
use crate::transport::{Clock, Connector, LineFramer, SystemClock, Transport};
use log::{debug, trace, warn, Level};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// Called with the index of an input that saw an accepted rising edge.
pub type InputCallback = Box<dyn FnMut(u8) + Send>;
/// Called for every message the driver logs.
pub type LogCallback = Box<dyn FnMut(Level, &str) + Send>;
/// Called for every fault the driver handles internally.
pub type ErrorCallback = Box<dyn FnMut(&Error) + Send>;

/// Bytes pulled from the transport per read call.
const READ_CHUNK: usize = 256;

/// Builds the `iodir` register for `gpi_count` inputs at the top of `port_count` ports.
///
/// Output bits are 1 and input bits are 0, e.g. 3 inputs on 8 ports is `00011111`.
pub fn direction_mask(gpi_count: u8, port_count: u8) -> Result<BinaryState> {
    if gpi_count > port_count {
        return Err(Error::InvalidGeometry {
            gpi_count,
            port_count,
        });
    }
    let mut dir = BinaryState::new(0, port_count)?;
    dir.set_all_on();
    for i in (port_count - gpi_count)..port_count {
        dir.update_at(i, false)?;
    }
    Ok(dir)
}

/// A handle to a Numato USB GPIO / relay board.
///
/// Outputs ("GPOs") are ports `[0, gpi_index)`, inputs ("GPIs") are
/// `[gpi_index, port_count)`.
///
/// ```no_run
/// use numato_gpio::{NumatoDevice, Result};
///
/// fn main() -> Result<()> {
///     let mut device = NumatoDevice::new(8, 3)?;
///     device.on_input(|gpi| println!("GPI {} triggered", gpi));
///     device.initialize(true)?;
///     device.pulse_output(0);
///     device.run(|_| true);
///     Ok(())
/// }
/// ```
pub struct NumatoDevice<C: Connector = SerialConnector, K: Clock = SystemClock> {
    connector: C,
    clock: K,
    config: DeviceConfig,
    port: Option<C::Port>,
    framer: LineFramer,
    state: DeviceState,
    queue: VecDeque<Command>,
    /// Last decoded pin levels (outputs are also updated locally on write).
    gpio_state: BinaryState,
    /// 1 = output, 0 = input. The vendor documents the opposite; the hardware disagrees.
    gpio_dir: BinaryState,
    last_triggers: Vec<Option<Instant>>,
    /// Most recent status request sent; its echo announces the payload line.
    status_request: Option<Command>,
    awaiting_status: bool,
    last_received: Instant,
    next_poll: Option<Instant>,
    next_reconnect: Option<Instant>,
    reconnect_logged: bool,
    pulse_resets: BTreeMap<u8, Instant>,
    on_input: Option<InputCallback>,
    on_log: Option<LogCallback>,
    on_error: Option<ErrorCallback>,
}

impl NumatoDevice {
    /// Creates a driver for a board with `port_count` ports, the top `gpi_count`
    /// of which are inputs. Uses the real serial ports and the system clock.
    pub fn new(port_count: u8, gpi_count: u8) -> Result<Self> {
        Self::with_config(DeviceConfig::new(port_count, gpi_count))
    }

    /// Creates a driver from a full configuration.
    pub fn with_config(config: DeviceConfig) -> Result<Self> {
        Self::with_connector(config, SerialConnector, SystemClock)
    }
}

impl<C: Connector, K: Clock> NumatoDevice<C, K> {
    /// Creates a driver with a custom connector and clock.
    pub fn with_connector(config: DeviceConfig, connector: C, clock: K) -> Result<Self> {
        config.validate()?;
        let gpio_state = BinaryState::new(0, config.port_count)?;
        let gpio_dir = direction_mask(config.gpi_count, config.port_count)?;
        let last_received = clock.now();
        Ok(Self {
            connector,
            clock,
            last_triggers: vec![None; config.port_count as usize],
            config,
            port: None,
            framer: LineFramer::new(),
            state: DeviceState::Uninitialized,
            queue: VecDeque::new(),
            gpio_state,
            gpio_dir,
            status_request: None,
            awaiting_status: false,
            last_received,
            next_poll: None,
            next_reconnect: None,
            reconnect_logged: false,
            pulse_resets: BTreeMap::new(),
            on_input: None,
            on_log: None,
            on_error: None,
        })
    }

    // --- Accessors ---

    /// Current lifecycle state.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Active configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Total number of ports.
    pub fn port_count(&self) -> u8 {
        self.config.port_count
    }

    /// Index of the first input.
    pub fn gpi_index(&self) -> u8 {
        self.config.gpi_index()
    }

    /// Last known pin levels.
    pub fn gpio_state(&self) -> &BinaryState {
        &self.gpio_state
    }

    /// Current direction register (1 = output).
    pub fn direction(&self) -> &BinaryState {
        &self.gpio_dir
    }

    /// Level of input `index`, or `None` if `index` is not an input.
    pub fn input(&self, index: u8) -> Option<bool> {
        (self.gpi_index()..self.port_count())
            .contains(&index)
            .then(|| self.gpio_state.get_at(index))
    }

    /// Number of commands waiting to be sent.
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// True while the poll tick is scheduled.
    pub fn is_polling(&self) -> bool {
        self.next_poll.is_some()
    }

    /// True while the reconnect watchdog is armed.
    pub fn is_watchdog_armed(&self) -> bool {
        self.next_reconnect.is_some()
    }

    /// Whether input levels are inverted before edge detection.
    pub fn invert_inputs(&self) -> bool {
        self.config.invert_inputs
    }

    /// Sets input inversion. Applies from the next decoded status reply.
    pub fn set_invert_inputs(&mut self, invert: bool) {
        self.config.invert_inputs = invert;
    }

    /// Whether the output wire verbs are swapped.
    pub fn invert_outputs(&self) -> bool {
        self.config.invert_outputs
    }

    /// Swaps the wire verbs of subsequent output commands.
    pub fn set_invert_outputs(&mut self, invert: bool) {
        self.config.invert_outputs = invert;
    }

    // --- Callbacks (last registration wins) ---

    /// Registers the input-change callback.
    pub fn on_input<F: FnMut(u8) + Send + 'static>(&mut self, callback: F) {
        self.on_input = Some(Box::new(callback));
    }

    /// Registers the logging callback.
    pub fn on_log<F: FnMut(Level, &str) + Send + 'static>(&mut self, callback: F) {
        self.on_log = Some(Box::new(callback));
    }

    /// Registers the error callback.
    pub fn on_error<F: FnMut(&Error) + Send + 'static>(&mut self, callback: F) {
        self.on_error = Some(Box::new(callback));
    }

    // --- Lifecycle ---

    /// Finds and opens the board, queues the setup sequence and starts polling.
    ///
    /// Also arms the reconnect watchdog, which keeps retrying in the background
    /// even if this call fails. With `verbose` set, progress is logged at info level.
    pub fn initialize(&mut self, verbose: bool) -> Result<()> {
        if self.next_reconnect.is_none() {
            self.next_reconnect = Some(self.clock.now() + self.config.reconnect_interval);
        }
        self.drop_connection(Transition::InitStarted);
        self.queue.clear();

        if verbose {
            self.log(Level::Info, "Initializing..");
        }
        let path = self
            .connector
            .find_device(self.config.vendor_id, self.config.product_id)?;
        if verbose {
            self.log(Level::Info, &format!("Found Numato device at {}", path));
        }

        let port = self.connector.open(&path, self.config.baud_rate)?;
        self.port = Some(port);

        let now = self.clock.now();
        self.last_received = now;
        self.next_poll = Some(now + self.config.poll_interval);
        self.queue_setup_sequence();
        self.state = self.state.transition(Transition::SetupComplete);
        debug!(
            "Numato device initialized at {} ({} commands queued)",
            path,
            self.queue.len()
        );
        Ok(())
    }

    /// Changes how many of the top ports are inputs.
    ///
    /// When already initialized, the setup sequence is queued again so the
    /// hardware direction follows immediately.
    pub fn reconfigure_input_count(&mut self, gpi_count: u8) -> Result<()> {
        let port_count = self.config.port_count;
        self.gpio_dir = direction_mask(gpi_count, port_count)?;
        self.config.gpi_count = gpi_count;

        let gpi_index = self.gpi_index();
        let gpos = if gpi_index > 0 {
            format!("0-{}", gpi_index - 1)
        } else {
            "none".to_string()
        };
        let gpis = if gpi_index < port_count {
            format!("{}-{}", gpi_index, port_count - 1)
        } else {
            "none".to_string()
        };
        self.log(
            Level::Info,
            &format!("Numato {} ports. GPOs: {} & GPIs: {}", port_count, gpos, gpis),
        );

        // Pending resets on ports that are now inputs would drive them.
        self.pulse_resets.retain(|&index, _| index < gpi_index);

        if self.state.is_initialized() {
            self.queue_setup_sequence();
        }
        Ok(())
    }

    /// Stops polling and closes the port.
    ///
    /// The reconnect watchdog and pending pulse resets keep running, so an
    /// armed driver reconnects on the next watchdog period. Use [`Self::close`]
    /// to stop everything.
    pub fn teardown(&mut self) {
        debug!("Tearing down Numato connection");
        self.drop_connection(Transition::TornDown);
    }

    /// Tears down, disarms the reconnect watchdog and cancels every pending pulse reset.
    pub fn close(&mut self) {
        self.teardown();
        self.next_reconnect = None;
        self.reconnect_logged = false;
        self.pulse_resets.clear();
    }

    // --- Outputs ---

    /// Drives output `index` to the logical `value`.
    ///
    /// Supersedes any pending pulse reset on the same output. Errors (bad
    /// index, not initialized) go to the log and error callbacks.
    pub fn set_output(&mut self, index: u8, value: bool) {
        let result = self.check_output(index).and_then(|()| {
            self.pulse_resets.remove(&index);
            self.write_output(index, value)
        });
        if let Err(e) = result {
            self.log(Level::Error, &e.to_string());
            self.report_error(&e);
        }
    }

    /// Asserts output `index` and releases it after the configured pulse hold time.
    pub fn pulse_output(&mut self, index: u8) {
        self.pulse_output_for(index, self.config.pulse_hold);
    }

    /// Asserts output `index` and releases it after `hold`.
    ///
    /// A later pulse or [`Self::set_output`] on the same index replaces the pending release.
    pub fn pulse_output_for(&mut self, index: u8, hold: Duration) {
        let result = self
            .check_output(index)
            .and_then(|()| self.write_output(index, true));
        match result {
            Ok(()) => {
                let due = self.clock.now() + hold;
                trace!("Pulse on GPO {} until {:?}", index, due);
                self.pulse_resets.insert(index, due);
            }
            Err(e) => {
                self.log(Level::Error, &e.to_string());
                self.report_error(&e);
            }
        }
    }

    fn check_output(&self, index: u8) -> Result<()> {
        let output_count = self.gpi_index();
        if index >= output_count {
            return Err(Error::InvalidIndex {
                index,
                output_count,
            });
        }
        if !self.state.is_initialized() || self.port.is_none() {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn write_output(&mut self, index: u8, value: bool) -> Result<()> {
        self.gpio_state.update_at(index, value)?;
        self.queue_command(Command::write_output(
            index,
            value,
            self.config.invert_outputs,
        ));
        Ok(())
    }

    // --- Scheduling ---

    /// Runs everything that is due now: reconnect watchdog, incoming data,
    /// pulse resets and the poll tick.
    pub fn process(&mut self) {
        let now = self.clock.now();
        self.run_reconnect_watchdog(now);
        self.receive(now);
        self.run_pulse_resets(now);
        self.run_poll_tick(now);
    }

    /// Earliest instant at which [`Self::process`] has timer work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.next_reconnect,
            self.next_poll,
            self.pulse_resets.values().min().copied(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Blocking loop: processes, then sleeps until the next deadline (never
    /// longer than one poll interval, so incoming data is picked up promptly).
    /// Exits when `keep_running` returns false.
    pub fn run<F: FnMut(&mut Self) -> bool>(&mut self, mut keep_running: F) {
        while keep_running(self) {
            self.process();
            let now = self.clock.now();
            let wait = self
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(now))
                .unwrap_or(self.config.poll_interval)
                .min(self.config.poll_interval);
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
        }
    }

    fn run_reconnect_watchdog(&mut self, now: Instant) {
        match self.next_reconnect {
            Some(due) if now >= due => {}
            _ => return,
        }
        self.next_reconnect = Some(now + self.config.reconnect_interval);
        if self.state.is_initialized() {
            return;
        }

        if !self.reconnect_logged {
            self.log(Level::Info, "Device not initialized, trying to reconnect..");
            self.reconnect_logged = true;
        }
        match self.initialize(false) {
            Ok(()) => {
                self.log(Level::Info, "Numato device reconnected");
                self.reconnect_logged = false;
            }
            Err(e) => debug!("Reconnect attempt failed: {}", e),
        }
    }

    fn run_pulse_resets(&mut self, now: Instant) {
        let due: Vec<u8> = self
            .pulse_resets
            .iter()
            .filter(|(_, &at)| now >= at)
            .map(|(&index, _)| index)
            .collect();
        for index in due {
            self.pulse_resets.remove(&index);
            trace!("Pulse reset on GPO {}", index);
            if let Err(e) = self.write_output(index, false) {
                warn!("Pulse reset on GPO {} failed: {}", index, e);
            }
        }
    }

    fn run_poll_tick(&mut self, now: Instant) {
        match self.next_poll {
            Some(due) if now >= due => {}
            _ => return,
        }
        self.next_poll = Some(now + self.config.poll_interval);

        // A failing tick is reported and skipped; the loop itself keeps going.
        if let Err(e) = self.poll_tick(now) {
            self.report_fault(e);
        }
    }

    fn poll_tick(&mut self, now: Instant) -> Result<()> {
        if now.saturating_duration_since(self.last_received) > self.config.receive_timeout {
            return Err(Error::ReceiveTimeout(self.config.receive_timeout));
        }
        let command = self.queue.pop_front().unwrap_or_else(Command::read_all);
        self.write_command(&command)
    }

    fn queue_command(&mut self, command: Command) {
        trace!("Queueing '{}' ({} pending)", command, self.queue.len());
        self.queue.push_back(command);
    }

    /// iomask all-on, writeall inactive, iodir, then release every output.
    fn queue_setup_sequence(&mut self) {
        let invert = self.config.invert_outputs;
        let mut all_on = self.gpio_dir;
        all_on.set_all_on();
        let inactive = if invert { all_on.inverted() } else { all_on };

        self.queue_command(Command::set_io_mask(&all_on));
        self.queue_command(Command::write_all(&inactive));
        self.queue_command(Command::set_io_dir(&self.gpio_dir));
        for index in 0..self.gpi_index() {
            self.queue_command(Command::release_output(index, invert));
        }
    }

    fn write_command(&mut self, command: &Command) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotInitialized)?;
        trace!("TX: {}", command);
        port.write_all(&command.to_wire())
            .map_err(|source| Error::Write {
                command: command.text().to_string(),
                source,
            })?;
        if command.expects_status() {
            self.status_request = Some(command.clone());
        }
        Ok(())
    }

    // --- Receive path ---

    fn receive(&mut self, now: Instant) {
        let mut buf = [0u8; READ_CHUNK];
        while let Some(port) = self.port.as_mut() {
            match port.read_available(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    self.last_received = now;
                    self.framer.push(&buf[..n]);
                }
                Err(e) => {
                    self.report_fault(e);
                    return;
                }
            }
        }
        while let Some(line) = self.framer.next_line() {
            self.handle_line(&line, now);
        }
    }

    fn handle_line(&mut self, line: &str, now: Instant) {
        let is_status_echo = self
            .status_request
            .as_ref()
            .is_some_and(|request| request.is_echo(line));
        if is_status_echo {
            self.awaiting_status = true;
            return;
        }
        if !self.awaiting_status {
            // Echoes and acknowledgements of fire-and-forget commands.
            trace!("Ignoring line {:?}", line);
            return;
        }
        self.awaiting_status = false;

        match BinaryState::from_hex(line, self.config.port_count) {
            Ok(raw) => {
                let decoded = if self.config.invert_inputs {
                    raw.inverted()
                } else {
                    raw
                };
                self.apply_status(decoded, now);
            }
            Err(e) => {
                self.log(Level::Warn, &format!("Skipping status reply: {}", e));
                self.report_error(&e);
            }
        }
    }

    /// Fires input events for debounced rising edges, then replaces the snapshot.
    fn apply_status(&mut self, decoded: BinaryState, now: Instant) {
        for index in self.gpi_index()..self.config.port_count {
            if !decoded.get_at(index) || self.gpio_state.get_at(index) {
                continue;
            }
            let slot = &mut self.last_triggers[index as usize];
            let accepted = match *slot {
                Some(last) => now.saturating_duration_since(last) >= self.config.debounce,
                None => true,
            };
            if accepted {
                *slot = Some(now);
                debug!("GPI {} rising edge", index);
                if let Some(callback) = self.on_input.as_mut() {
                    callback(index);
                }
            } else {
                trace!("GPI {} edge suppressed by debounce", index);
            }
        }
        self.gpio_state = decoded;
    }

    // --- Fault handling ---

    fn report_fault(&mut self, error: Error) {
        self.log(Level::Error, &error.to_string());
        self.report_error(&error);
        let transition = match error {
            Error::Write { .. } => Some(Transition::WriteError),
            Error::ReceiveTimeout(_) => Some(Transition::ReceiveTimeout),
            Error::Serial(_) | Error::Io(_) => Some(Transition::TransportError),
            _ => None,
        };
        if let Some(transition) = transition {
            self.drop_connection(transition);
        }
    }

    /// Stops the poll tick, closes the port and applies `transition`.
    fn drop_connection(&mut self, transition: Transition) {
        self.next_poll = None;
        if self.port.take().is_some() {
            debug!("Closed Numato port ({:?})", transition);
        }
        self.framer.clear();
        self.status_request = None;
        self.awaiting_status = false;
        self.state = self.state.transition(transition);
    }

    fn log(&mut self, level: Level, message: &str) {
        log::log!(level, "{}", message);
        if let Some(callback) = self.on_log.as_mut() {
            callback(level, message);
        }
    }

    fn report_error(&mut self, error: &Error) {
        if let Some(callback) = self.on_error.as_mut() {
            callback(error);
        }
    }
}

impl<C: Connector, K: Clock> fmt::Debug for NumatoDevice<C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumatoDevice")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("connected", &self.port.is_some())
            .field("gpio_state", &self.gpio_state.to_binary_string())
            .field("gpio_dir", &self.gpio_dir.to_binary_string())
            .field("pending_commands", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_mask_from_gpi_count() {
        let dir = direction_mask(3, 8).unwrap();
        assert_eq!(dir.to_binary_string(), "00011111");
        assert_eq!(direction_mask(0, 8).unwrap().to_hex(), "ff");
        assert_eq!(direction_mask(8, 8).unwrap().to_hex(), "00");
        assert_eq!(direction_mask(4, 16).unwrap().to_hex(), "0fff");
    }

    #[test]
    fn test_direction_mask_rejects_too_many_inputs() {
        assert!(matches!(
            direction_mask(9, 8),
            Err(Error::InvalidGeometry {
                gpi_count: 9,
                port_count: 8
            })
        ));
    }
}
