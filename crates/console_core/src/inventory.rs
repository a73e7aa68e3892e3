use std::{collections::HashSet, sync::Arc};

use shared::{
    domain::{LogLevel, PrinterId},
    protocol::PrinterUpdate,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    backend::{BackendError, FleetBackend},
    store::FleetStore,
    transform::{normalize_device, Device, DeviceRecord},
};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to load printers: {0}")]
    Fetch(#[source] BackendError),
    #[error("failed to update printer {id}: {source}")]
    Update {
        id: String,
        #[source]
        source: BackendError,
    },
    #[error("failed to refresh printer {id}: {source}")]
    Refresh {
        id: String,
        #[source]
        source: BackendError,
    },
    #[error("printer {0} is not in the current fleet")]
    StaleDevice(String),
}

/// Keeps the store's device collection in sync with the inventory service
/// and runs the per-device maintenance actions.
#[derive(Clone)]
pub struct Inventory {
    store: Arc<FleetStore>,
    backend: Arc<dyn FleetBackend>,
}

impl Inventory {
    pub fn new(store: Arc<FleetStore>, backend: Arc<dyn FleetBackend>) -> Self {
        Self { store, backend }
    }

    /// First load of a console session.
    pub async fn bootstrap(&self) -> Result<usize, InventoryError> {
        let loaded = self
            .load(|count| {
                (count > 0).then(|| format!("Loaded {count} printer(s) from the inventory"))
            })
            .await;
        self.store
            .append_log("Console ready to provision users", LogLevel::Success);
        loaded
    }

    /// Replaces the store's devices with a fresh fetch. On failure the
    /// previous collection stays in place.
    pub async fn reload(&self) -> Result<usize, InventoryError> {
        self.load(|count| Some(format!("Fleet updated: {count} printer(s) available")))
            .await
    }

    async fn load(
        &self,
        success_message: impl FnOnce(usize) -> Option<String>,
    ) -> Result<usize, InventoryError> {
        self.store.set_loading(true);
        let fetched = self.backend.fetch_devices().await;
        let result = match fetched {
            Ok(records) => {
                let devices = dedupe_by_id(
                    records
                        .into_iter()
                        .map(DeviceRecord::from)
                        .map(normalize_device),
                );
                let count = devices.len();
                self.store.set_devices(devices);
                info!(count, "inventory: devices loaded");
                if let Some(message) = success_message(count) {
                    self.store.append_log(message, LogLevel::Success);
                }
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "inventory: device fetch failed");
                self.store.append_log(
                    format!("Failed to load printers from the inventory: {}", err.reason()),
                    LogLevel::Error,
                );
                Err(InventoryError::Fetch(err))
            }
        };
        self.store.set_loading(false);
        result
    }

    /// Renames or relocates a registered printer, then reloads the fleet.
    pub async fn update_device(
        &self,
        device_id: &str,
        update: PrinterUpdate,
    ) -> Result<(), InventoryError> {
        let printer_id = self.resolve(device_id)?;
        match self.backend.update_device(printer_id, &update).await {
            Ok(record) => {
                self.store.append_log(
                    format!("Printer updated: {}", display_name(&record.hostname)),
                    LogLevel::Success,
                );
                self.reload_after_change().await;
                Ok(())
            }
            Err(err) => {
                self.store.append_log(
                    format!("Failed to update printer: {}", err.reason()),
                    LogLevel::Error,
                );
                Err(InventoryError::Update {
                    id: device_id.to_string(),
                    source: err,
                })
            }
        }
    }

    /// Asks the service to re-poll a printer over SNMP, then reloads.
    pub async fn refresh_device(&self, device_id: &str) -> Result<(), InventoryError> {
        let printer_id = self.resolve(device_id)?;
        let hostname = self
            .store
            .device(device_id)
            .map(|device| device.hostname)
            .unwrap_or_else(|| device_id.to_string());

        self.store.info(format!("Querying SNMP for {hostname}..."));
        match self.backend.refresh_device_snmp(printer_id).await {
            Ok(response) if response.success => {
                self.store.append_log(
                    format!("SNMP data updated for {hostname}"),
                    LogLevel::Success,
                );
                self.reload_after_change().await;
                Ok(())
            }
            Ok(response) => {
                // The service answers 200 with success=false when SNMP
                // polling is disabled on its side.
                self.store.append_log(response.message, LogLevel::Warning);
                Ok(())
            }
            Err(err) => {
                self.store.append_log(
                    format!("SNMP query failed: {}", err.reason()),
                    LogLevel::Error,
                );
                Err(InventoryError::Refresh {
                    id: device_id.to_string(),
                    source: err,
                })
            }
        }
    }

    fn resolve(&self, device_id: &str) -> Result<PrinterId, InventoryError> {
        self.store.backend_id(device_id).ok_or_else(|| {
            self.store.append_log(
                format!("Printer {device_id} is no longer part of the fleet"),
                LogLevel::Error,
            );
            InventoryError::StaleDevice(device_id.to_string())
        })
    }

    async fn reload_after_change(&self) {
        // reload() already logged the failure for the operator
        if let Err(err) = self.reload().await {
            warn!(error = %err, "inventory: reload after change failed");
        }
    }
}

fn display_name(hostname: &str) -> &str {
    if hostname.trim().is_empty() {
        "unnamed"
    } else {
        hostname
    }
}

fn dedupe_by_id(devices: impl Iterator<Item = Device>) -> Vec<Device> {
    let mut seen = HashSet::new();
    devices
        .filter(|device| {
            let fresh = seen.insert(device.id.clone());
            if !fresh {
                warn!(id = %device.id, "inventory: duplicate device id dropped");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/inventory_tests.rs"]
mod tests;
