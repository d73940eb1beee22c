//! Device discovery and scanning.
//!
//! This module finds peripherals that advertise the Nordic UART Service
//! or carry the collector's advertised name.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::util::{create_identifier, format_peripheral_id};
use tennis_types::uuids::NUS_SERVICE;

/// Name the collector firmware advertises.
pub const SENSOR_NAME: &str = "Tennis Sensor";

/// Information about a discovered peripheral.
#[derive(Debug, Clone)]
pub struct DiscoveredSensor {
    /// The advertised name (e.g., "Tennis Sensor").
    pub name: Option<String>,
    /// The peripheral ID for connecting.
    pub id: PeripheralId,
    /// The BLE address as a string (may be zeros on macOS, use `id` instead).
    pub address: String,
    /// A connection identifier (peripheral ID on macOS, address on other platforms).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Whether the advertisement lists the Nordic UART Service.
    pub advertises_nus: bool,
}

impl DiscoveredSensor {
    /// Whether this looks like the motion-sensor collector.
    pub fn is_sensor(&self) -> bool {
        self.advertises_nus || self.name.as_deref().is_some_and(name_matches_sensor)
    }
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Only return peripherals that look like the sensor.
    pub sensors_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            sensors_only: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    #[must_use]
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Set whether to filter for sensors only.
    #[must_use]
    pub fn sensors_only(mut self, filter: bool) -> Self {
        self.sensors_only = filter;
        self
    }

    /// Scan for all BLE devices.
    #[must_use]
    pub fn all_devices(self) -> Self {
        self.sensors_only(false)
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Scan for sensors in range.
///
/// An empty list indicates nothing was found (not an error).
///
/// # Errors
///
/// Returns an error if:
/// - No Bluetooth adapter is available
/// - Bluetooth is not enabled
/// - The scan could not be started or stopped
pub async fn scan_for_sensors(options: ScanOptions) -> Result<Vec<DiscoveredSensor>> {
    let adapter = get_adapter().await?;
    scan_with_adapter(&adapter, options).await
}

/// Scan for devices using a specific adapter.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: ScanOptions,
) -> Result<Vec<DiscoveredSensor>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let peripherals = adapter.peripherals().await?;
    let mut discovered = Vec::new();

    for peripheral in peripherals {
        match process_peripheral(&peripheral).await {
            Ok(Some(sensor)) if !options.sensors_only || sensor.is_sensor() => {
                debug!(name = ?sensor.name, identifier = %sensor.identifier, "Found peripheral");
                discovered.push(sensor);
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Error processing peripheral: {}", e);
            }
        }
    }

    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

async fn process_peripheral(peripheral: &Peripheral) -> Result<Option<DiscoveredSensor>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    let id = peripheral.id();
    let address = properties.address.to_string();
    let identifier = create_identifier(&address, &id);

    Ok(Some(DiscoveredSensor {
        name: properties.local_name.clone(),
        advertises_nus: advertises_nus(&properties),
        id,
        address,
        identifier,
        rssi: properties.rssi,
    }))
}

fn advertises_nus(properties: &PeripheralProperties) -> bool {
    properties.services.contains(&NUS_SERVICE)
        || properties.service_data.contains_key(&NUS_SERVICE)
}

fn name_matches_sensor(name: &str) -> bool {
    name.to_lowercase().contains("tennis")
}

/// Find a peripheral by name, address or peripheral ID.
///
/// Known peripherals are checked before a single scan window is run.
pub async fn find_device(identifier: &str, options: ScanOptions) -> Result<(Adapter, Peripheral)> {
    let adapter = get_adapter().await?;
    let identifier_lower = identifier.to_lowercase();

    info!("Looking for device: {}", identifier);

    if let Some(peripheral) = find_peripheral_by_identifier(&adapter, &identifier_lower).await? {
        info!("Found device in cache (no scan needed)");
        return Ok((adapter, peripheral));
    }

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    if let Some(peripheral) = find_peripheral_by_identifier(&adapter, &identifier_lower).await? {
        return Ok((adapter, peripheral));
    }

    warn!("Device not found: {}", identifier);
    Err(Error::device_not_found(identifier))
}

/// Find the first peripheral that looks like the sensor.
///
/// Peripherals advertising the Nordic UART Service are preferred over
/// name-only matches.
pub async fn find_first_sensor(options: ScanOptions) -> Result<(Adapter, Peripheral)> {
    let adapter = get_adapter().await?;
    let sensors = scan_with_adapter(&adapter, options.sensors_only(true)).await?;

    let chosen = sensors
        .iter()
        .find(|s| s.advertises_nus)
        .or_else(|| sensors.first())
        .map(|s| s.id.clone());

    let Some(id) = chosen else {
        return Err(Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange));
    };

    let peripheral = adapter.peripheral(&id).await?;
    Ok((adapter, peripheral))
}

async fn find_peripheral_by_identifier(
    adapter: &Adapter,
    identifier_lower: &str,
) -> Result<Option<Peripheral>> {
    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        if let Ok(Some(props)) = peripheral.properties().await {
            let address = props.address.to_string().to_lowercase();
            let peripheral_id = format_peripheral_id(&peripheral.id()).to_lowercase();

            // macOS uses UUIDs
            if peripheral_id.contains(identifier_lower) {
                debug!("Matched by peripheral ID: {}", peripheral_id);
                return Ok(Some(peripheral));
            }

            if address != "00:00:00:00:00:00"
                && (address == identifier_lower
                    || address.replace(':', "") == identifier_lower.replace(':', ""))
            {
                debug!("Matched by address: {}", address);
                return Ok(Some(peripheral));
            }

            if let Some(name) = &props.local_name
                && name.to_lowercase().contains(identifier_lower)
            {
                debug!("Matched by name: {}", name);
                return Ok(Some(peripheral));
            }
        }
    }

    Ok(None)
}
