//! Toggles GPO 0 and 1 every 3 seconds and prints input triggers.
//!
//! Run with: RUST_LOG=info cargo run --example toggle

use numato_gpio::{NumatoDevice, Result};
use std::time::{Duration, Instant};

const TOGGLE_PERIOD: Duration = Duration::from_secs(3);

fn main() -> Result<()> {
    env_logger::init();

    // 8-port board with the top 6 ports wired as inputs
    let mut device = NumatoDevice::new(8, 6)?;
    device.on_log(|level, message| println!("{} {}", level, message));
    device.on_error(|e| eprintln!("Device error: {}", e));
    device.on_input(|gpi| println!("GPI {} triggered", gpi));

    device.initialize(true)?;
    device.set_invert_inputs(true);
    println!("Device initialized (Press Ctrl+C to stop)");

    let mut toggle = false;
    let mut next_toggle = Instant::now() + TOGGLE_PERIOD;
    device.run(|device| {
        if Instant::now() >= next_toggle {
            device.set_output(0, toggle);
            device.set_output(1, toggle);
            toggle = !toggle;
            next_toggle += TOGGLE_PERIOD;
        }
        true
    });
    // Note: Loop runs forever, cleanup won't happen without Ctrl+C handling
    Ok(())
}
