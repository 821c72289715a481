//! Domain models - core business types for the parking engine
//!
//! This module contains the canonical data types used throughout the system:
//! - `VehicleId`, `SlotId`, `Zone` - validated identifiers
//! - `Slot`, `ActiveSession`, `HistoryRecord`, `VehicleMaster` - persisted records
//! - `ParkingError` - the full error taxonomy

pub mod error;
pub mod records;
pub mod types;

// Re-export commonly used types at module level
pub use error::ParkingError;
pub use records::{
    ActiveSession, DashboardStats, ExitReceipt, HistoryRecord, OrphanReport, ParkReceipt, Slot,
    VehicleMaster, ZoneStats,
};
pub use types::{Category, SlotId, TieBreak, VehicleId, VehicleType, Zone};
