use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when using Numato GPIO devices.
///
/// This enum covers device discovery, the serial transport, the bit register
/// codecs, and misuse of the output API.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the underlying serial port layer.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    /// General I/O error during device communication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// No serial device was found with the specified vendor/product ID.
    #[error("Numato device not found (VID={vid:04X}, PID={pid:04X})")]
    DeviceNotFound {
        /// Vendor ID that was searched for.
        vid: u16,
        /// Product ID that was searched for.
        pid: u16,
    },
    /// The serial port was found but could not be opened.
    #[error("Failed to open serial port '{path}': {source}")]
    PortOpen {
        /// Platform-specific port name (e.g. `/dev/ttyACM0`, `COM3`).
        path: String,
        /// Underlying error reported by the serial layer.
        #[source]
        source: serialport::Error,
    },
    /// Writing a command to the transport failed.
    #[error("Failed to write command '{command}': {source}")]
    Write {
        /// Command text that was being sent (without terminator).
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The device stopped sending data.
    #[error("No data received for {0:?}, closing port")]
    ReceiveTimeout(Duration),
    /// Output index outside the configured GPO range.
    #[error("Invalid GPO number: {index} ({output_count} outputs configured)")]
    InvalidIndex {
        /// The index that was requested.
        index: u8,
        /// Number of outputs currently configured (`[0, output_count)` is valid).
        output_count: u8,
    },
    /// Bit index outside a register's width.
    #[error("Bit index {index} out of range for {width}-bit register")]
    IndexOutOfRange {
        /// The invalid bit index.
        index: u8,
        /// Width of the register.
        width: u8,
    },
    /// Register width outside 1-64 bits.
    #[error("Register width must be 1-64 bits (got {0})")]
    InvalidWidth(u8),
    /// Binary string with the wrong length or non-binary characters.
    #[error("Invalid binary string '{value}' for {width}-bit register")]
    InvalidBinaryString {
        /// The rejected input.
        value: String,
        /// Width the string was expected to match.
        width: u8,
    },
    /// Malformed or truncated `gpio readall` reply.
    #[error("Malformed status payload: {0:?}")]
    InvalidPayload(String),
    /// Input count larger than the number of ports.
    #[error("Invalid GPI count {gpi_count} for {port_count}-port device")]
    InvalidGeometry {
        /// Requested number of inputs.
        gpi_count: u8,
        /// Total number of ports on the device.
        port_count: u8,
    },
    /// The operation needs an open connection.
    #[error("Device not initialized")]
    NotInitialized,
}

/// Result type alias for Numato GPIO operations.
///
/// This is a convenience alias for `std::result::Result<T, Error>` used
/// throughout the crate to reduce boilerplate.
pub type Result<T> = std::result::Result<T, Error>;
