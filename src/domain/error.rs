//! Error taxonomy for the parking core
//!
//! Business-rule outcomes (`AlreadyParked`, `NoSlotAvailable`, ...) are
//! expected results a caller handles; `Storage` means the transaction did not
//! complete and the caller must not assume any state change occurred.

use crate::domain::types::{SlotId, VehicleId, Zone};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParkingError {
    /// Missing or malformed vehicle identifier
    #[error("validation failed: {0}")]
    Validation(String),

    /// An active session already exists for the vehicle
    #[error("vehicle {0} is already parked")]
    AlreadyParked(VehicleId),

    /// No active session exists for the vehicle
    #[error("vehicle {0} is not parked")]
    NotParked(VehicleId),

    /// Every slot in the zone is occupied
    #[error("no slot available in zone {0}")]
    NoSlotAvailable(Zone),

    /// Exit time precedes entry time (clock regression); never clamped
    #[error("exit time {exit} is before entry time {entry}")]
    InvalidTimeRange {
        entry: DateTime<Utc>,
        exit: DateTime<Utc>,
    },

    /// Internal invariant violation: should never surface if the session
    /// ledger is correct
    #[error("slot {0} is already occupied")]
    SlotAlreadyOccupied(SlotId),

    /// Internal invariant violation: should never surface if the session
    /// ledger is correct
    #[error("slot {0} is not occupied")]
    SlotNotOccupied(SlotId),

    /// I/O or transaction failure; no retry inside the core
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ParkingError {
    /// Whether this is an expected business-rule outcome, as opposed to a
    /// storage failure or an internal invariant violation.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            ParkingError::Validation(_)
                | ParkingError::AlreadyParked(_)
                | ParkingError::NotParked(_)
                | ParkingError::NoSlotAvailable(_)
                | ParkingError::InvalidTimeRange { .. }
        )
    }
}
