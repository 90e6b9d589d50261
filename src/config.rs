//! Driver configuration.

use crate::consts;
use crate::error::{Error, Result};
use std::time::Duration;

/// Configuration for a [`crate::NumatoDevice`].
///
/// Ports `[0, port_count - gpi_count)` are outputs, the remaining
/// `gpi_count` ports are inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Total number of GPIO ports on the board (8, 16, 32 or 64 for the Numato range).
    pub port_count: u8,
    /// Number of ports (counted from the top) used as inputs.
    pub gpi_count: u8,
    /// Invert the level read back from inputs before edge detection.
    pub invert_inputs: bool,
    /// Swap the wire verb used for a logical output assert.
    pub invert_outputs: bool,
    /// USB vendor ID used for discovery.
    pub vendor_id: u16,
    /// USB product ID used for discovery.
    pub product_id: u16,
    /// Serial line speed.
    pub baud_rate: u32,
    /// Poll tick period.
    pub poll_interval: Duration,
    /// Receive silence that tears the connection down.
    pub receive_timeout: Duration,
    /// Reconnect watchdog period.
    pub reconnect_interval: Duration,
    /// Minimum time between accepted rising edges on one input.
    pub debounce: Duration,
    /// Default hold time for `pulse_output`.
    pub pulse_hold: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port_count: 8,
            gpi_count: 0,
            invert_inputs: false,
            invert_outputs: false,
            vendor_id: consts::NUMATO_VID,
            product_id: consts::NUMATO_GPIO_PID,
            baud_rate: consts::DEFAULT_BAUD_RATE,
            poll_interval: consts::POLL_INTERVAL,
            receive_timeout: consts::RECEIVE_TIMEOUT,
            reconnect_interval: consts::RECONNECT_INTERVAL,
            debounce: consts::GPI_DEBOUNCE,
            pulse_hold: consts::GPO_SPRINGBACK,
        }
    }
}

impl DeviceConfig {
    /// Default timings with the given port geometry.
    pub fn new(port_count: u8, gpi_count: u8) -> Self {
        Self {
            port_count,
            gpi_count,
            ..Self::default()
        }
    }

    /// Checks the geometry.
    pub fn validate(&self) -> Result<()> {
        if self.port_count == 0 || self.port_count > consts::wire::MAX_PORTS {
            return Err(Error::InvalidWidth(self.port_count));
        }
        if self.gpi_count > self.port_count {
            return Err(Error::InvalidGeometry {
                gpi_count: self.gpi_count,
                port_count: self.port_count,
            });
        }
        Ok(())
    }

    /// Index of the first input port.
    #[inline]
    pub fn gpi_index(&self) -> u8 {
        self.port_count.saturating_sub(self.gpi_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DeviceConfig::default();
        assert_eq!(config.port_count, 8);
        assert_eq!(config.gpi_count, 0);
        assert_eq!(config.vendor_id, 0x2A19);
        assert_eq!(config.product_id, 0x0800);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.receive_timeout, Duration::from_millis(3000));
        assert_eq!(config.reconnect_interval, Duration::from_millis(1000));
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.pulse_hold, Duration::from_millis(1000));
    }

    #[test]
    fn test_config_geometry() {
        let config = DeviceConfig::new(8, 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.gpi_index(), 5);

        assert!(matches!(
            DeviceConfig::new(8, 9).validate(),
            Err(Error::InvalidGeometry {
                gpi_count: 9,
                port_count: 8
            })
        ));
        assert!(matches!(
            DeviceConfig::new(0, 0).validate(),
            Err(Error::InvalidWidth(0))
        ));
        assert!(matches!(
            DeviceConfig::new(65, 0).validate(),
            Err(Error::InvalidWidth(65))
        ));
    }
}
