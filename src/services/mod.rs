//! Services - the allocation and session-lifecycle engine
//!
//! This module contains the core business logic:
//! - `ledger` - the park/exit state machine and transactional orchestrator
//! - `slot_inventory` - slot pool ownership and occupancy
//! - `allocation` - category to zone mapping and tie-break selection
//! - `registry` - per-vehicle master records and running averages
//! - `maintenance` - orphan reporting, retention purge, full reset
//! - `locks` - per-vehicle mutual exclusion
//! - `auth` - credential collaborator for login flows

pub mod allocation;
pub mod auth;
pub mod ledger;
pub mod locks;
pub mod maintenance;
pub mod registry;
pub mod slot_inventory;

// Re-export commonly used types
pub use allocation::AllocationPolicy;
pub use auth::{CredentialValidator, Role, UserDirectory};
pub use ledger::SessionLedger;
