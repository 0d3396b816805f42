//! Fleet orchestration.
//!
//! The bridge owns one appliance implementation per supported device,
//! refreshes their snapshots from the transport and routes host writes to
//! the right device. Unsupported devices are skipped, never fatal.

use crate::accessory::{AccessoryState, Command};
use crate::config::{PlatformConfig, SharedConfig};
use crate::controller::DeviceController;
use crate::device::Device;
use crate::devices::ApplianceDevice;
use crate::error::{BridgeError, Result};
use crate::registry::DeviceRegistry;
use crate::transport::ThinqTransport;
use futures_util::future::join_all;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct Bridge {
    transport: Arc<dyn ThinqTransport>,
    config: SharedConfig,
    devices: BTreeMap<String, Box<dyn ApplianceDevice>>,
}

impl Bridge {
    pub fn new(transport: Arc<dyn ThinqTransport>, config: SharedConfig) -> Self {
        Self {
            transport,
            config,
            devices: BTreeMap::new(),
        }
    }

    /// Resolve `device` through the registry and start serving it.
    ///
    /// An already known id is replaced. Unsupported devices are logged and
    /// reported as [`BridgeError::UnsupportedDevice`].
    pub fn add_device(&mut self, device: Device) -> Result<()> {
        let Some(implementation) = DeviceRegistry::resolve_implementation(&device) else {
            warn!(
                "[Bridge] [{}] Skipping unsupported device type {} ({})",
                device.name, device.device_type, device.platform
            );
            return Err(BridgeError::UnsupportedDevice {
                device_type: device.device_type,
                platform: device.platform.to_string(),
            });
        };

        info!(
            "[Bridge] [{}] Added {} as {}",
            device.name, device.device_type, implementation.name
        );
        let id = device.id.clone();
        let controller =
            DeviceController::new(device, Arc::clone(&self.transport), Arc::clone(&self.config));
        self.devices.insert(id, implementation.instantiate(controller));
        Ok(())
    }

    /// Add every device, returning how many are served.
    pub fn add_devices(&mut self, devices: impl IntoIterator<Item = Device>) -> usize {
        devices
            .into_iter()
            .filter_map(|device| self.add_device(device).ok())
            .count()
    }

    pub fn remove_device(&mut self, id: &str) -> bool {
        match self.devices.remove(id) {
            Some(device) => {
                info!("[Bridge] [{}] Removed", device.controller().name());
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn device(&self, id: &str) -> Option<&dyn ApplianceDevice> {
        self.devices.get(id).map(|device| device.as_ref())
    }

    pub fn accessory_state(&self, id: &str) -> Option<AccessoryState> {
        self.devices.get(id).map(|device| device.accessory_state())
    }

    pub fn accessory_states(&self) -> Vec<AccessoryState> {
        self.devices.values().map(|device| device.accessory_state()).collect()
    }

    /// Replace the platform configuration; accessory projections pick it up
    /// on their next read.
    pub fn update_config(&self, config: PlatformConfig) {
        *self.config.write() = config;
        info!("[Bridge] Configuration updated");
    }

    /// Fetch every snapshot concurrently and attach the results.
    ///
    /// Returns how many devices were refreshed. A failed fetch keeps the
    /// device's previous snapshot.
    pub async fn refresh(&mut self) -> usize {
        let ids: Vec<String> = self.devices.keys().cloned().collect();
        let transport = Arc::clone(&self.transport);
        let results = join_all(ids.iter().map(|id| transport.fetch_snapshot(id))).await;

        let mut refreshed = 0;
        for (id, result) in ids.iter().zip(results) {
            let Some(device) = self.devices.get_mut(id) else {
                continue;
            };
            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(
                        "[Bridge] [{}] Snapshot refresh failed: {}",
                        device.controller().name(),
                        e
                    );
                    continue;
                }
            };

            let layout = device.accessory_state().layout_hash();
            let updated = device.controller().device().clone().with_snapshot(snapshot);
            device.update(updated);
            if device.accessory_state().layout_hash() != layout {
                info!(
                    "[Bridge] [{}] Accessory services changed",
                    device.controller().name()
                );
            }

            if let Err(e) = device.keep_alive().await {
                warn!(
                    "[Bridge] [{}] Keep-alive failed: {}",
                    device.controller().name(),
                    e
                );
            }
            refreshed += 1;
        }
        refreshed
    }

    /// Route a host write to the device with `id`.
    pub async fn command(&mut self, id: &str, command: Command) -> Result<bool> {
        let device = self
            .devices
            .get_mut(id)
            .ok_or_else(|| BridgeError::UnknownDevice(id.to_string()))?;
        debug!(
            "[Bridge] [{}] Command {}",
            device.controller().name(),
            command.describe()
        );
        device.handle_command(command).await
    }

    /// Refresh on every `interval` tick until `cancel` fires.
    pub async fn run(&mut self, interval: Duration, cancel: CancellationToken) {
        info!(
            "[Bridge] Serving {} device(s), refreshing every {:?}",
            self.len(),
            interval
        );
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let refreshed = self.refresh().await;
                    debug!("[Bridge] Refreshed {}/{} device(s)", refreshed, self.len());
                }
            }
        }
        info!("[Bridge] Stopped");
    }
}
