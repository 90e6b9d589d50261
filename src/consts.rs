//! Internal constants: USB identifiers, line settings, and driver timing.

use std::time::Duration;

// Default Vendor/Product IDs
/// Numato Lab vendor ID.
pub const NUMATO_VID: u16 = 0x2A19;
/// Product ID shared by the Numato USB GPIO / relay module family (CDC ACM interface).
pub const NUMATO_GPIO_PID: u16 = 0x0800;

/// Line speed of the CDC serial interface.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

// --- Driver Timing ---
/// Period of the command queue drain / status poll tick.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Silence on the receive side longer than this tears the connection down.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_millis(3000);
/// Period of the reconnect watchdog.
pub const RECONNECT_INTERVAL: Duration = Duration::from_millis(1000);
/// Minimum time between two accepted rising edges on one input.
pub const GPI_DEBOUNCE: Duration = Duration::from_millis(300);
/// Default hold time of `pulse_output`.
pub const GPO_SPRINGBACK: Duration = Duration::from_millis(1000);

/// Timeout handed to the OS serial driver. `serialport` applies it to reads and
/// writes alike. Reads never wait on it (only bytes already queued are read);
/// writes may, so it must cover the longest command at 9600 baud (~32ms).
pub const SERIAL_TIMEOUT: Duration = Duration::from_millis(100);

// --- Wire Protocol ---
pub mod wire {
    /// Terminator appended to every command.
    pub const COMMAND_TERMINATOR: char = '\r';
    /// Prompt the firmware prints before echoing a received command.
    pub const PROMPT: char = '>';
    /// Largest register the board family exposes (64 GPIO module).
    pub const MAX_PORTS: u8 = 64;
    /// Longest partial line kept while waiting for its line break.
    pub const MAX_LINE_LEN: usize = 256;
}
