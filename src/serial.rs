//! Serial port discovery and the `serialport`-backed transport.

use crate::consts;
use crate::error::{Error, Result};
use crate::transport::{Connector, Transport};
use log::{debug, trace, warn};
use serialport::{SerialPort, SerialPortType};
use std::io::{self, Read, Write};

/// Information about a discovered Numato serial device.
/// Can be used with [`SerialConnector::open`] to connect to a specific board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumatoPortInfo {
    /// Platform-specific port name (e.g. `/dev/ttyACM0`, `COM3`).
    pub port_name: String,
    /// USB vendor ID.
    pub vid: u16,
    /// USB product ID.
    pub pid: u16,
    /// USB serial number string, if reported.
    pub serial_number: Option<String>,
    /// Manufacturer string, if reported.
    pub manufacturer: Option<String>,
    /// Product string, if reported.
    pub product: Option<String>,
}

/// Find all serial ports backed by a USB device with the given VID/PID.
pub fn find_devices(vid: u16, pid: u16) -> Result<Vec<NumatoPortInfo>> {
    let ports = serialport::available_ports()?;
    let devices = ports
        .into_iter()
        .filter_map(|port| match port.port_type {
            SerialPortType::UsbPort(usb) if usb.vid == vid && usb.pid == pid => {
                debug!(
                    "Found matching device: VID={:04X}, PID={:04X}, Port={}, SN={:?}",
                    usb.vid, usb.pid, port.port_name, usb.serial_number
                );
                Some(NumatoPortInfo {
                    port_name: port.port_name,
                    vid: usb.vid,
                    pid: usb.pid,
                    serial_number: usb.serial_number,
                    manufacturer: usb.manufacturer,
                    product: usb.product,
                })
            }
            _ => None,
        })
        .collect();
    Ok(devices)
}

/// Find all Numato GPIO boards using the default VID/PID.
pub fn find_all() -> Result<Vec<NumatoPortInfo>> {
    find_devices(consts::NUMATO_VID, consts::NUMATO_GPIO_PID)
}

/// Find the first device matching `vid`/`pid`.
///
/// **Warning:** If several boards are connected, which one is "first" is
/// decided by the OS enumeration order.
pub fn find_first(vid: u16, pid: u16) -> Result<NumatoPortInfo> {
    find_devices(vid, pid)?
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound { vid, pid })
}

/// Opens real serial ports via the `serialport` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    type Port = SerialTransport;

    fn find_device(&mut self, vid: u16, pid: u16) -> Result<String> {
        find_first(vid, pid).map(|info| info.port_name)
    }

    fn open(&mut self, path: &str, baud_rate: u32) -> Result<SerialTransport> {
        SerialTransport::open(path, baud_rate)
    }
}

/// An open serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish()
    }
}

impl SerialTransport {
    /// Opens `path` at `baud_rate` with RTS asserted.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port_open = |source| Error::PortOpen {
            path: path.to_string(),
            source,
        };
        let mut port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .flow_control(serialport::FlowControl::None)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(consts::SERIAL_TIMEOUT)
            .open()
            .map_err(port_open)?;
        port.write_request_to_send(true).map_err(port_open)?;
        debug!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self { port })
    }
}

/// Hands `bytes` to the OS without waiting for them to drain.
///
/// `flush` on a serial port is `tcdrain`/`FlushFileBuffers`, which ignores the
/// port timeout and hangs for as long as the USB endpoint stalls.
fn write_frame<W: Write + ?Sized>(port: &mut W, bytes: &[u8]) -> io::Result<()> {
    trace!("TX: {:?}", String::from_utf8_lossy(bytes));
    port.write_all(bytes)
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_frame(&mut self.port, bytes)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(0);
        }
        let len = available.min(buf.len());
        match self.port.read(&mut buf[..len]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => {
                warn!("Serial read failed: {}", e);
                Err(Error::Io(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary_state::BinaryState;
    use crate::command::Command;
    use std::time::Duration;

    /// Writer whose `flush` would block forever on a stalled endpoint.
    #[derive(Default)]
    struct StalledPort {
        written: Vec<u8>,
    }

    impl Write for StalledPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            panic!("flush waits for the output queue to drain");
        }
    }

    #[test]
    fn test_write_frame_does_not_flush() {
        let mut port = StalledPort::default();
        write_frame(&mut port, &Command::read_all().to_wire()).unwrap();
        assert_eq!(port.written, b"gpio readall\r");
    }

    #[test]
    fn test_serial_timeout_covers_longest_command() {
        let mut all_on = BinaryState::new(0, 64).unwrap();
        all_on.set_all_on();
        let longest = Command::write_all(&all_on).to_wire().len() as u64;
        // 8N1: ten bit times per byte.
        let baud = u64::from(consts::DEFAULT_BAUD_RATE);
        let transmit = Duration::from_micros(longest * 10 * 1_000_000 / baud);
        assert!(
            consts::SERIAL_TIMEOUT > transmit,
            "{:?} <= {:?}",
            consts::SERIAL_TIMEOUT,
            transmit
        );
        assert!(consts::SERIAL_TIMEOUT < consts::RECEIVE_TIMEOUT);
    }
}
