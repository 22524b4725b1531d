use std::env;

use rigol_dp700::{
    DEFAULT_TTY,
    psu::{Dp700, PsuConfig},
    transport::SerialTransport,
};
use tracing_subscriber::EnvFilter;

// Configuration constants - adjust these for your setup
const BAUD_RATE: u32 = 9600;
const SERIAL_TIMEOUT_MS: u32 = 300;
const OUTPUT_VOLTAGE: f64 = 5.5;
const CURRENT_LIMIT: f64 = 0.1;
const PRESET_SLOT: u8 = 1;
const STABILIZATION_DELAY_MS: u64 = 1000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Serial port from command line arg, or the platform default.
    let port_name = env::args().nth(1).unwrap_or_else(|| DEFAULT_TTY.to_owned());
    println!("Using port: {}", port_name);

    let config = PsuConfig::default()
        .with_baud_rate(BAUD_RATE)
        .with_timeout(fugit::MillisDurationU32::millis(SERIAL_TIMEOUT_MS));

    // Open the port and identify the PSU.
    let mut psu: Dp700<SerialTransport> =
        Dp700::open(&port_name, config).expect("Failed to connect to PSU");
    println!("Connected to: {}", psu);

    match psu.limits() {
        Some(limits) => println!(
            "Limits: {}V / {}A",
            limits.max_voltage, limits.max_current
        ),
        None => println!("Unknown model, limits are not enforced"),
    }

    psu.set_output_voltage(OUTPUT_VOLTAGE).unwrap();
    println!("Set output voltage to {}V", OUTPUT_VOLTAGE);

    psu.set_output_current(CURRENT_LIMIT).unwrap();
    println!("Set current limit to {}A", CURRENT_LIMIT);

    psu.save_to_memory(PRESET_SLOT).unwrap();
    println!("Saved settings to memory slot {}", PRESET_SLOT);

    psu.enable_output(true).unwrap();
    println!("Output enabled: {}", psu.is_output_enabled().unwrap());

    // Wait for output to stabilize
    std::thread::sleep(std::time::Duration::from_millis(STABILIZATION_DELAY_MS));

    let measurements = psu.read_measurements().unwrap();
    println!("{:#?}", measurements);

    psu.enable_output(false).unwrap();
    println!("Output disabled");

    // Hand the front panel back to the user.
    psu.close().unwrap();
}
