use std::{
    collections::VecDeque,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{LogLevel, PrinterId};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::{selection::Selection, transform::Device};

/// Number of activity log entries kept; older entries are evicted first.
pub const LOG_CAPACITY: usize = 50;

const LOG_BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
}

#[derive(Default)]
struct FleetState {
    devices: Vec<Device>,
    selection: Selection,
    loading: bool,
    log: VecDeque<LogEntry>,
}

/// Shared fleet state: devices, operator selection, loading flag and the
/// bounded activity log.
///
/// Every operation takes the lock once and releases it before returning, so
/// no caller can observe a half-applied mutation and no lock is ever held
/// across an `.await`. Share it as `Arc<FleetStore>`.
pub struct FleetStore {
    state: RwLock<FleetState>,
    log_events: broadcast::Sender<LogEntry>,
}

impl Default for FleetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetStore {
    pub fn new() -> Self {
        let (log_events, _) = broadcast::channel(LOG_BROADCAST_CAPACITY);
        Self {
            state: RwLock::new(FleetState {
                log: VecDeque::with_capacity(LOG_CAPACITY + 1),
                ..FleetState::default()
            }),
            log_events,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FleetState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FleetState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_devices(&self, devices: Vec<Device>) {
        self.write().devices = devices;
    }

    pub fn clear_devices(&self) {
        self.set_devices(Vec::new());
    }

    pub fn devices(&self) -> Vec<Device> {
        self.read().devices.clone()
    }

    pub fn device(&self, id: &str) -> Option<Device> {
        self.read()
            .devices
            .iter()
            .find(|device| device.id == id)
            .cloned()
    }

    pub fn set_loading(&self, loading: bool) {
        self.write().loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Returns whether `id` is selected after the toggle.
    pub fn toggle_selected(&self, id: &str) -> bool {
        self.write().selection.toggle(id)
    }

    pub fn clear_selection(&self) {
        self.write().selection.clear();
    }

    pub fn selection(&self) -> Vec<String> {
        self.read().selection.to_vec()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.read().selection.contains(id)
    }

    /// Looks up the backend identifier of a known device. `None` when the
    /// device is not in the current collection or its id is not numeric.
    pub fn backend_id(&self, id: &str) -> Option<PrinterId> {
        self.read()
            .devices
            .iter()
            .find(|device| device.id == id)
            .and_then(Device::backend_id)
    }

    /// Resolves the current selection against the current device collection
    /// in one snapshot. Returns the number of selected ids together with the
    /// backend ids that resolved, in selection order; stale ids are skipped.
    pub fn resolve_selected_targets(&self) -> (usize, Vec<PrinterId>) {
        let state = self.read();
        let resolved = state
            .selection
            .iter()
            .filter_map(|id| {
                state
                    .devices
                    .iter()
                    .find(|device| device.id == id)
                    .and_then(Device::backend_id)
            })
            .collect();
        (state.selection.len(), resolved)
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append_log(message, LogLevel::Info);
    }

    /// Appends an entry stamped with a fresh id and the current time, then
    /// evicts down to [`LOG_CAPACITY`]. Timestamps never go backwards even if
    /// the wall clock does.
    pub fn append_log(&self, message: impl Into<String>, level: LogLevel) {
        let entry = {
            let mut state = self.write();
            let now = Utc::now();
            let timestamp = match state.log.back() {
                Some(last) if last.timestamp > now => last.timestamp,
                _ => now,
            };
            let entry = LogEntry {
                id: Uuid::new_v4(),
                timestamp,
                message: message.into(),
                level,
            };
            state.log.push_back(entry.clone());
            while state.log.len() > LOG_CAPACITY {
                state.log.pop_front();
            }
            // Published under the lock so followers see the same order as
            // the log. No receivers just means nobody is following live.
            let _ = self.log_events.send(entry.clone());
            entry
        };

        debug!(level = entry.level.as_str(), message = %entry.message, "activity");
    }

    /// Entries oldest first.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.read().log.iter().cloned().collect()
    }

    /// Live feed of entries appended after this call.
    pub fn subscribe_logs(&self) -> broadcast::Receiver<LogEntry> {
        self.log_events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
