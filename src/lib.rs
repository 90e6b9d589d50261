//! # numato-gpio
//!
//! A Rust crate for driving Numato Lab USB GPIO and relay modules through
//! their line-oriented ASCII serial protocol (`gpio readall`, `gpio set 3`, ...).
//!
//! This crate uses the `serialport` crate for cross-platform serial communication.
//!
//! ## Features
//!
//! *   Device discovery by USB VID/PID (`find_all`, `find_first`, `find_devices`).
//! *   A bit-addressable register type (`BinaryState`) with the board's
//!     MSB-first binary and zero-padded hex codecs.
//! *   Pure command encoders for the whole vocabulary (`Command`).
//! *   A cooperative, single-threaded driver (`NumatoDevice`):
//!     *   Command queue drained by a 10ms poll tick, with a `gpio readall`
//!         heartbeat whenever the queue is empty.
//!     *   Receive watchdog (3s of silence drops the connection).
//!     *   Reconnect watchdog (1s period, retries forever until `close`).
//!     *   Rising-edge detection on inputs with a 300ms per-input debounce.
//!     *   Output set/pulse with configurable polarity, and keyed pulse
//!         timers so a newer request always wins.
//!
//! ## Port Geometry
//!
//! A board has `port_count` ports. The top `gpi_count` of them are inputs
//! (GPIs), the rest are outputs (GPOs):
//!
//! *   GPOs: `0 .. port_count - gpi_count`
//! *   GPIs: `port_count - gpi_count .. port_count`
//!
//! ## Basic Usage
//!
//! ```no_run
//! use numato_gpio::{NumatoDevice, Result};
//! use std::time::{Duration, Instant};
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     // 8-port board, ports 5-7 are inputs
//!     let mut device = NumatoDevice::new(8, 3)?;
//!     device.set_invert_inputs(true);
//!     device.on_input(|gpi| println!("GPI {} triggered", gpi));
//!     device.on_error(|e| eprintln!("Device error: {}", e));
//!
//!     device.initialize(true)?;
//!     device.set_output(0, true);
//!     device.pulse_output_for(1, Duration::from_millis(500));
//!
//!     let stop_at = Instant::now() + Duration::from_secs(10);
//!     device.run(|_| Instant::now() < stop_at);
//!     device.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Hardware Setup Notes
//!
//! *   **Linux udev Rules:** The board enumerates as a CDC ACM device
//!     (`/dev/ttyACM*`). Grant access with `/etc/udev/rules.d/99-numato.rules`:
//!     ```udev
//!     SUBSYSTEM=="tty", ATTRS{idVendor}=="2a19", ATTRS{idProduct}=="0800", MODE="0666", GROUP="dialout"
//!     ```
//! *   **Relay polarity:** Relay modules are active-low. A logical assert sends
//!     `gpio clear <n>` unless `invert_outputs` is set.
//!
//! ## License
//!
//! This project is licensed under the WTFPL.

mod consts;
mod error;
pub mod binary_state;
pub mod command;
pub mod config;
pub mod device;
pub mod serial;
pub mod state;
pub mod transport;

pub use binary_state::BinaryState;
pub use command::Command;
pub use config::DeviceConfig;
pub use device::{direction_mask, NumatoDevice};
pub use error::{Error, Result};
pub use serial::{find_all, find_devices, find_first, NumatoPortInfo, SerialConnector};
pub use state::{DeviceState, Transition};
pub use transport::{Clock, Connector, LineFramer, SystemClock, Transport};
// Re-export only essential public constants
pub use consts::{
    DEFAULT_BAUD_RATE, GPI_DEBOUNCE, GPO_SPRINGBACK, NUMATO_GPIO_PID, NUMATO_VID, POLL_INTERVAL,
    RECEIVE_TIMEOUT, RECONNECT_INTERVAL,
};
