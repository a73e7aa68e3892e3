use std::{collections::HashSet, sync::Arc};

use shared::{domain::LogLevel, protocol::DiscoveredDevice};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    backend::{BackendError, FleetBackend},
    selection::Selection,
    store::FleetStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    Idle,
    Scanning,
    /// Scan finished with at least one candidate.
    Results,
    /// Scan finished and nothing answered on the range.
    Empty,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateField {
    Hostname,
    Location,
}

/// A printer found by a scan, with the operator's pending edits.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredCandidate {
    pub scanned: DiscoveredDevice,
    pub edited_hostname: String,
    pub edited_location: String,
}

impl DiscoveredCandidate {
    fn from_scan(scanned: DiscoveredDevice) -> Self {
        Self {
            edited_hostname: scanned.hostname.clone(),
            edited_location: scanned.location.clone().unwrap_or_default(),
            scanned,
        }
    }

    pub fn ip_address(&self) -> &str {
        &self.scanned.ip_address
    }

    /// Record submitted for registration. Blank edits fall back to the
    /// scanned values.
    pub fn registration_record(&self) -> DiscoveredDevice {
        let mut record = self.scanned.clone();
        if !self.edited_hostname.trim().is_empty() {
            record.hostname = self.edited_hostname.clone();
        }
        if !self.edited_location.trim().is_empty() {
            record.location = Some(self.edited_location.clone());
        }
        record
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub count: usize,
    /// Summary returned by the service, e.g. how many were skipped.
    pub message: String,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("select at least one device to register")]
    NothingSelected,
    #[error("network scan failed: {0}")]
    ScanFailed(#[source] BackendError),
    #[error("device registration failed: {0}")]
    RegistrationFailed(#[source] BackendError),
}

/// One scan → edit → register cycle over printers that are not yet part of
/// the fleet. Candidates and their selection are local to the session and
/// never touch the store's device selection.
pub struct DiscoverySession {
    store: Arc<FleetStore>,
    backend: Arc<dyn FleetBackend>,
    candidates: Vec<DiscoveredCandidate>,
    selected: Selection,
    phase: watch::Sender<DiscoveryPhase>,
}

impl DiscoverySession {
    pub fn new(store: Arc<FleetStore>, backend: Arc<dyn FleetBackend>) -> Self {
        let (phase, _) = watch::channel(DiscoveryPhase::Idle);
        Self {
            store,
            backend,
            candidates: Vec::new(),
            selected: Selection::new(),
            phase,
        }
    }

    pub fn phase(&self) -> DiscoveryPhase {
        *self.phase.borrow()
    }

    /// Lets a UI disable the scan control while a scan is in flight.
    pub fn subscribe_phase(&self) -> watch::Receiver<DiscoveryPhase> {
        self.phase.subscribe()
    }

    pub fn candidates(&self) -> &[DiscoveredCandidate] {
        &self.candidates
    }

    pub fn candidate(&self, ip_address: &str) -> Option<&DiscoveredCandidate> {
        self.candidates
            .iter()
            .find(|candidate| candidate.ip_address() == ip_address)
    }

    pub fn is_candidate_selected(&self, ip_address: &str) -> bool {
        self.selected.contains(ip_address)
    }

    /// Selected candidates in scan order.
    pub fn selected_candidates(&self) -> Vec<&DiscoveredCandidate> {
        self.candidates
            .iter()
            .filter(|candidate| self.selected.contains(candidate.ip_address()))
            .collect()
    }

    /// Scans `ip_range` (CIDR) and replaces the candidate list. Any earlier
    /// candidates and selection are discarded first, so a failed scan leaves
    /// nothing behind.
    pub async fn scan(&mut self, ip_range: &str) -> Result<usize, DiscoveryError> {
        self.phase.send_replace(DiscoveryPhase::Scanning);
        self.candidates.clear();
        self.selected.clear();
        info!(ip_range, "discovery: scanning");

        match self.backend.scan_devices(ip_range).await {
            Ok(devices) => {
                let mut seen = HashSet::new();
                self.candidates = devices
                    .into_iter()
                    .filter(|device| seen.insert(device.ip_address.clone()))
                    .map(DiscoveredCandidate::from_scan)
                    .collect();
                let found = self.candidates.len();
                if found == 0 {
                    self.phase.send_replace(DiscoveryPhase::Empty);
                    self.store.append_log(
                        format!("No printers found in {ip_range}"),
                        LogLevel::Warning,
                    );
                } else {
                    self.phase.send_replace(DiscoveryPhase::Results);
                    self.store
                        .info(format!("Found {found} printer(s) in {ip_range}"));
                }
                Ok(found)
            }
            Err(err) => {
                warn!(ip_range, error = %err, "discovery: scan failed");
                self.phase.send_replace(DiscoveryPhase::Failed);
                self.store.append_log(
                    "Scan failed. Check the IP range and try again.",
                    LogLevel::Error,
                );
                Err(DiscoveryError::ScanFailed(err))
            }
        }
    }

    /// Edits one candidate's pending hostname or location. Unknown addresses
    /// are ignored.
    pub fn edit_candidate(
        &mut self,
        ip_address: &str,
        field: CandidateField,
        value: impl Into<String>,
    ) {
        let Some(candidate) = self
            .candidates
            .iter_mut()
            .find(|candidate| candidate.ip_address() == ip_address)
        else {
            return;
        };
        match field {
            CandidateField::Hostname => candidate.edited_hostname = value.into(),
            CandidateField::Location => candidate.edited_location = value.into(),
        }
    }

    /// Flips a candidate in or out of the registration set. Returns whether
    /// it is selected afterwards; addresses outside the candidate list are
    /// never selected.
    pub fn toggle_candidate(&mut self, ip_address: &str) -> bool {
        if self.candidate(ip_address).is_none() {
            return false;
        }
        self.selected.toggle(ip_address)
    }

    /// Registers the selected candidates with their edits applied. The
    /// candidate list is kept afterwards, so a failed attempt can be retried
    /// without rescanning.
    pub async fn register(&mut self) -> Result<RegistrationOutcome, DiscoveryError> {
        let records: Vec<DiscoveredDevice> = self
            .selected_candidates()
            .into_iter()
            .map(DiscoveredCandidate::registration_record)
            .collect();
        if records.is_empty() {
            self.store.append_log(
                "Select at least one device to register",
                LogLevel::Error,
            );
            return Err(DiscoveryError::NothingSelected);
        }

        let count = records.len();
        info!(count, "discovery: registering devices");
        match self.backend.register_devices(&records).await {
            Ok(response) => {
                self.store.append_log(
                    format!("Registered {count} device(s)"),
                    LogLevel::Success,
                );
                if !response.message.trim().is_empty() {
                    self.store.info(response.message.clone());
                }
                Ok(RegistrationOutcome {
                    count,
                    message: response.message,
                })
            }
            Err(err) => {
                warn!(count, error = %err, "discovery: registration failed");
                self.store.append_log(
                    "Could not register the selected printers; some of them may already exist.",
                    LogLevel::Error,
                );
                Err(DiscoveryError::RegistrationFailed(err))
            }
        }
    }

    /// Ends the session, discarding candidates and their edits.
    pub fn close(self) {
        self.phase.send_replace(DiscoveryPhase::Idle);
    }
}

#[cfg(test)]
#[path = "tests/discovery_tests.rs"]
mod tests;
