//! Fleet state and provisioning orchestration for the printer console.
//!
//! [`FleetStore`] is the single owner of the device collection, the operator
//! selection and the activity log. The orchestrators ([`Inventory`],
//! [`DiscoverySession`], [`ProvisioningWorkflow`]) talk to the inventory
//! service through the [`FleetBackend`] trait and write results back through
//! the store's operations. [`LogChannel`] forwards the service's live log
//! socket into the same store.

pub mod backend;
pub mod discovery;
pub mod inventory;
pub mod log_channel;
pub mod provisioning;
pub mod selection;
pub mod store;
pub mod transform;

pub use backend::{BackendError, FleetBackend, HttpFleetBackend};
pub use discovery::{
    CandidateField, DiscoveredCandidate, DiscoveryError, DiscoveryPhase, DiscoverySession,
    RegistrationOutcome,
};
pub use inventory::{Inventory, InventoryError};
pub use log_channel::LogChannel;
pub use provisioning::{
    BusyHandle, ProvisionOutcome, ProvisioningError, ProvisioningForm, ProvisioningWorkflow,
    ValidationFailure, DEFAULT_SMB_SERVER, SMB_PORT,
};
pub use selection::Selection;
pub use store::{FleetStore, LogEntry, LOG_CAPACITY};
pub use transform::{normalize_device, Device, DeviceCard, DeviceRecord, TonerReadings};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
