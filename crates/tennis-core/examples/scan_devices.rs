//! Example: Scanning for sensors
//!
//! Lists peripherals that advertise the Nordic UART Service or the
//! collector's name.
//!
//! Run with: `cargo run --example scan_devices`

use tennis_core::scan::{self, ScanOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("Scanning for sensors...");
    println!();

    let options = ScanOptions::default().duration_secs(10);
    let sensors = scan::scan_for_sensors(options).await?;

    if sensors.is_empty() {
        println!("No sensors found.");
        println!();
        println!("Make sure:");
        println!("  - The collector board is powered on and advertising");
        println!("  - Bluetooth is enabled on this computer");
        println!("  - No other central is already connected to the board");
    } else {
        println!("Found {} device(s):", sensors.len());
        println!();

        for sensor in &sensors {
            let name = sensor.name.as_deref().unwrap_or("Unknown");
            let rssi = sensor
                .rssi
                .map(|r| format!("{} dBm", r))
                .unwrap_or_else(|| "N/A".to_string());

            println!("  {}", name);
            println!("    Identifier: {}", sensor.identifier);
            println!("    RSSI: {}", rssi);
            println!("    NUS advertised: {}", sensor.advertises_nus);
            println!();
        }
    }

    Ok(())
}
