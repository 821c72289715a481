//! Parking slot allocation and session-lifecycle engine
//!
//! Exposes modules for integration testing and binary reuse.
//!
//! Module structure:
//! - `domain/` - Core business types (ids, records, error taxonomy)
//! - `store/` - SQLite persistence gateway (transactional read/write contract)
//! - `services/` - Business logic (SessionLedger, SlotInventory, AllocationPolicy, ...)
//! - `infra/` - Infrastructure (Config)

pub mod domain;
pub mod infra;
pub mod services;
pub mod store;
