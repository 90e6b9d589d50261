//! Pulses a relay for a configurable time, then exits.
//!
//! Run with: cargo run --example pulse -- <gpo> [hold_ms]

use numato_gpio::{DeviceConfig, NumatoDevice, Result};
use std::env;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let gpo: u8 = args.next().and_then(|a| a.parse().ok()).unwrap_or(0);
    let hold_ms: u64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(1000);

    let config = DeviceConfig {
        pulse_hold: Duration::from_millis(hold_ms),
        ..DeviceConfig::new(8, 0)
    };
    let mut device = NumatoDevice::with_config(config)?;
    device.on_error(|e| eprintln!("Device error: {}", e));
    device.initialize(true)?;

    println!("Pulsing GPO {} for {}ms", gpo, hold_ms);
    device.pulse_output(gpo);

    // Leave time for the setup sequence, the pulse, and its release to drain.
    let stop_at = Instant::now() + Duration::from_millis(hold_ms + 500);
    device.run(|device| Instant::now() < stop_at || device.pending_commands() > 0);
    device.close();
    Ok(())
}
