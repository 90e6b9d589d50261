//! Lists every Numato GPIO board attached to this machine.
//!
//! Run with: cargo run --example list_devices

use numato_gpio::{self, Result};

fn main() -> Result<()> {
    env_logger::init();

    println!(
        "Searching for Numato GPIO devices (VID=0x{:04X}, PID=0x{:04X})...",
        numato_gpio::NUMATO_VID,
        numato_gpio::NUMATO_GPIO_PID
    );
    let devices = numato_gpio::find_all()?;

    if devices.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    println!("Found {} device(s):", devices.len());
    for (i, info) in devices.iter().enumerate() {
        println!(
            "  {}: Port={}, Serial='{}', Manufacturer='{}', Product='{}'",
            i,
            info.port_name,
            info.serial_number.as_deref().unwrap_or("N/A"),
            info.manufacturer.as_deref().unwrap_or("N/A"),
            info.product.as_deref().unwrap_or("N/A"),
        );
    }
    Ok(())
}
