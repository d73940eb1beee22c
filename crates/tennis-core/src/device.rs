//! Sensor connection over Bluetooth Low Energy.
//!
//! This module connects to the collector board, locates the Nordic UART
//! Service TX characteristic, and exposes its notifications as a stream of
//! raw buffers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Characteristic, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::scan::{ScanOptions, find_device, find_first_sensor};
use crate::traits::{FrameSource, NotificationStream};
use crate::util::{create_identifier, format_peripheral_id};
use tennis_types::uuids::{NUS_SERVICE, NUS_TX};

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default scan window when looking for the device.
const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);

/// Configuration for BLE connection timeouts.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use tennis_core::device::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .scan_duration(Duration::from_secs(8));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// How long to scan when the device is not already known.
    pub scan_duration: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            scan_duration: DEFAULT_SCAN_DURATION,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the scan duration.
    #[must_use]
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }
}

/// A connected collector board.
///
/// # Cleanup
///
/// Call [`Device::disconnect`] before dropping the device to release BLE
/// resources. Dropping without it logs a warning and spawns a best-effort
/// disconnect.
pub struct Device {
    /// Kept alive for the lifetime of the peripheral connection.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    name: Option<String>,
    address: String,
    tx: Characteristic,
    /// Cleared when the adapter reports the peripheral gone.
    connected: Arc<AtomicBool>,
    lost: CancellationToken,
    watcher: std::sync::Mutex<Option<JoinHandle<()>>>,
    /// Whether disconnect has been called (for Drop warning).
    disconnected: AtomicBool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Connect to a sensor by name, address or peripheral ID.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tennis_core::device::Device;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let device = Device::connect("Tennis Sensor").await?;
    ///     println!("Connected to {:?}", device);
    ///     device.disconnect().await?;
    ///     Ok(())
    /// }
    /// ```
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect(identifier: &str) -> Result<Self> {
        Self::connect_with_config(Some(identifier), ConnectionConfig::default()).await
    }

    /// Connect to the first sensor in range.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn connect_first() -> Result<Self> {
        Self::connect_with_config(None, ConnectionConfig::default()).await
    }

    /// Connect with full configuration.
    ///
    /// With no identifier, the first peripheral advertising the Nordic UART
    /// Service (or the sensor's name) is used.
    #[tracing::instrument(level = "info", skip_all, fields(identifier = ?identifier))]
    pub async fn connect_with_config(
        identifier: Option<&str>,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let options = ScanOptions::default().duration(config.scan_duration);
        let (adapter, peripheral) = match identifier {
            Some(identifier) => find_device(identifier, options).await?,
            None => find_first_sensor(options).await?,
        };

        Self::from_peripheral_with_config(adapter, peripheral, config).await
    }

    /// Create a Device from an already-discovered peripheral.
    #[tracing::instrument(level = "info", skip_all, fields(connect_timeout = ?config.connection_timeout))]
    pub async fn from_peripheral_with_config(
        adapter: Adapter,
        peripheral: Peripheral,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let peripheral_id = format_peripheral_id(&peripheral.id());

        info!("Connecting to device...");
        timeout(config.connection_timeout, peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", config.connection_timeout))?
            .map_err(|e| Error::connection_failed(Some(peripheral_id.clone()), e.to_string()))?;
        info!("Connected!");

        info!("Discovering services...");
        timeout(config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", config.discovery_timeout))??;

        let services = peripheral.services();
        debug!("Found {} services", services.len());

        let tx = services
            .iter()
            .filter(|service| service.uuid == NUS_SERVICE)
            .flat_map(|service| service.characteristics.iter())
            .chain(services.iter().flat_map(|service| service.characteristics.iter()))
            .find(|c| c.uuid == NUS_TX)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(NUS_TX.to_string(), services.len()))?;

        let properties = peripheral.properties().await?;
        let name = properties.as_ref().and_then(|p| p.local_name.clone());

        // On macOS the address may be 00:00:00:00:00:00, so the peripheral ID is used
        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or(peripheral_id);

        let connected = Arc::new(AtomicBool::new(true));
        let lost = CancellationToken::new();
        let watcher = spawn_disconnect_watcher(&adapter, &peripheral, &connected, &lost).await?;

        Ok(Self {
            adapter,
            peripheral,
            name,
            address,
            tx,
            connected,
            lost,
            watcher: std::sync::Mutex::new(Some(watcher)),
            disconnected: AtomicBool::new(false),
            config,
        })
    }

    /// Check if the link is up.
    ///
    /// Combines the disconnect watcher's view with the BLE stack's state.
    pub async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
            && self.peripheral.is_connected().await.unwrap_or(false)
    }

    /// Get the current connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get the device name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the device address or identifier.
    ///
    /// On Linux and Windows, this returns the Bluetooth MAC address (e.g., "AA:BB:CC:DD:EE:FF").
    /// On macOS, this returns a UUID identifier since MAC addresses are not exposed.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Token cancelled when the link drops.
    pub fn disconnect_signal(&self) -> CancellationToken {
        self.lost.clone()
    }

    /// Subscribe to the TX characteristic.
    ///
    /// The returned stream yields raw buffers and ends when the link drops.
    #[tracing::instrument(level = "debug", skip(self), fields(device_name = ?self.name))]
    pub async fn subscribe(&self) -> Result<NotificationStream> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }

        self.peripheral.subscribe(&self.tx).await?;
        let notifications = self.peripheral.notifications().await?;
        let tx_uuid = self.tx.uuid;
        info!("Subscribed to notifications");

        let stream = notifications
            .filter_map(move |n| async move { (n.uuid == tx_uuid).then_some(n.value) })
            .take_until(self.lost.clone().cancelled_owned());

        Ok(Box::pin(stream))
    }

    /// Disconnect from the device.
    ///
    /// Cancels the disconnect signal, stops the watcher and closes the link.
    #[tracing::instrument(level = "info", skip(self), fields(device_name = ?self.name))]
    pub async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.disconnected.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.lost.cancel();
        self.abort_watcher();

        if let Err(e) = self.peripheral.unsubscribe(&self.tx).await {
            debug!(error = %e, "Unsubscribe failed (link may already be down)");
        }
        self.peripheral.disconnect().await?;
        Ok(())
    }

    fn abort_watcher(&self) {
        let handle = match self.watcher.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

/// Watch adapter events and flag the link as lost when this peripheral drops.
async fn spawn_disconnect_watcher(
    adapter: &Adapter,
    peripheral: &Peripheral,
    connected: &Arc<AtomicBool>,
    lost: &CancellationToken,
) -> Result<JoinHandle<()>> {
    let mut events = adapter.events().await?;
    let id = peripheral.id();
    let connected = Arc::clone(connected);
    let lost = lost.clone();

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = lost.cancelled() => break,
                event = events.next() => match event {
                    Some(CentralEvent::DeviceDisconnected(gone)) if gone == id => {
                        warn!(peripheral = %format_peripheral_id(&gone), "Device disconnected");
                        connected.store(false, Ordering::SeqCst);
                        lost.cancel();
                        break;
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }
    }))
}

impl Drop for Device {
    fn drop(&mut self) {
        if !self.disconnected.load(Ordering::SeqCst) {
            self.disconnected.store(true, Ordering::SeqCst);

            warn!(
                device_name = ?self.name,
                device_address = %self.address,
                "Device dropped without calling disconnect() - performing best-effort cleanup. \
                 For reliable cleanup, call device.disconnect().await before dropping."
            );

            self.lost.cancel();
            self.abort_watcher();

            let peripheral = self.peripheral.clone();
            let address = self.address.clone();

            // May fail if the runtime is shutting down
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = peripheral.disconnect().await {
                        debug!(
                            device_address = %address,
                            error = %e,
                            "Best-effort disconnect failed (device may already be disconnected)"
                        );
                    }
                });
            }
        }
    }
}

#[async_trait]
impl FrameSource for Device {
    fn name(&self) -> Option<&str> {
        Device::name(self)
    }

    fn address(&self) -> &str {
        Device::address(self)
    }

    async fn is_connected(&self) -> bool {
        Device::is_connected(self).await
    }

    fn disconnect_signal(&self) -> CancellationToken {
        Device::disconnect_signal(self)
    }

    async fn disconnect(&self) -> Result<()> {
        Device::disconnect(self).await
    }

    async fn subscribe(&self) -> Result<NotificationStream> {
        Device::subscribe(self).await
    }
}
