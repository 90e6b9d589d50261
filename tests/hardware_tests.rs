// tests/hardware_tests.rs
//
// These tests talk to a real board and are ignored by default.
// Run with: cargo test --test hardware_tests -- --ignored --test-threads=1
use numato_gpio::{self, DeviceState, NumatoDevice, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// CHANGE THESE to match the board under test
const PORT_COUNT: u8 = 8;
const GPI_COUNT: u8 = 3;

// Helper to open the first device, panics on failure for test simplicity
fn open_test_device() -> NumatoDevice {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut device = NumatoDevice::new(PORT_COUNT, GPI_COUNT).expect("valid geometry");
    device
        .initialize(true)
        .expect("Failed to open any Numato device. Is it connected and permissions set?");
    device
}

fn run_for(device: &mut NumatoDevice, duration: Duration) {
    let stop_at = Instant::now() + duration;
    device.run(|_| Instant::now() < stop_at);
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_enumerate_finds_board() -> Result<()> {
    let devices = numato_gpio::find_all()?;
    assert!(!devices.is_empty(), "No Numato board found");
    for info in &devices {
        println!("Found {:?}", info);
        assert_eq!(info.vid, numato_gpio::NUMATO_VID);
        assert_eq!(info.pid, numato_gpio::NUMATO_GPIO_PID);
    }
    Ok(())
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_heartbeat_keeps_connection() {
    let mut device = open_test_device();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    device.on_error(move |e| sink.lock().unwrap().push(e.to_string()));

    // Longer than the receive timeout: replies to `gpio readall` must keep it alive.
    run_for(&mut device, Duration::from_secs(5));

    assert_eq!(device.state(), DeviceState::Initialized);
    assert!(errors.lock().unwrap().is_empty(), "{:?}", errors);
    assert_eq!(device.pending_commands(), 0);
    device.close();
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_output_toggle() {
    let mut device = open_test_device();
    run_for(&mut device, Duration::from_millis(200));

    println!("Toggling GPO 0 (listen for the relay)");
    for value in [true, false, true, false] {
        device.set_output(0, value);
        run_for(&mut device, Duration::from_millis(300));
    }
    assert_eq!(device.state(), DeviceState::Initialized);
    device.close();
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_pulse_springs_back() {
    let mut device = open_test_device();
    run_for(&mut device, Duration::from_millis(200));

    device.pulse_output_for(1, Duration::from_millis(250));
    assert!(device.gpio_state().get_at(1));
    // Release is queued after 250ms; the snapshot then follows `gpio readall`.
    run_for(&mut device, Duration::from_millis(500));
    assert_eq!(device.state(), DeviceState::Initialized);
    assert_eq!(device.pending_commands(), 0);
    device.close();
}
