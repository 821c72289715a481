//! Persisted record shapes and operation results
//!
//! These mirror the rows of the four core tables. Ownership is strict:
//! the slot inventory is the only writer of `Slot` occupancy, the session
//! ledger of `ActiveSession` and `HistoryRecord`, the vehicle registry of
//! `VehicleMaster`.

use crate::domain::types::{Category, SlotId, VehicleId, VehicleType, Zone};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One physical parking space. `occupied` holds iff `vehicle` is present.
#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    pub id: SlotId,
    pub zone: Zone,
    pub occupied: bool,
    pub vehicle: Option<VehicleId>,
    pub entry_time: Option<DateTime<Utc>>,
}

/// Live record of a vehicle currently occupying a slot.
///
/// Exists iff some slot references the vehicle; created by `park`, deleted
/// by `exit`.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSession {
    pub vehicle: VehicleId,
    pub slot_id: SlotId,
    pub zone: Zone,
    pub entry_time: DateTime<Utc>,
}

/// One parking session in the log: open (`exit_time` null) while the vehicle
/// is parked, closed with a duration on exit. At most one open row exists
/// per vehicle at any time.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub vehicle: VehicleId,
    pub slot_id: SlotId,
    pub zone: Zone,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub duration_min: Option<i64>,
}

/// Master record, one per vehicle ever seen.
///
/// `first_entry` is set once and never overwritten; `avg_duration` is the
/// running mean over `closed_sessions` completed sessions.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleMaster {
    pub vehicle: VehicleId,
    pub vehicle_type: VehicleType,
    pub category: Category,
    pub first_entry: DateTime<Utc>,
    pub last_slot: Option<SlotId>,
    pub avg_duration: f64,
    pub closed_sessions: i64,
}

/// Per-zone occupancy counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneStats {
    pub zone: Zone,
    pub total: i64,
    pub occupied: i64,
    pub available: i64,
}

/// Successful `park` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParkReceipt {
    pub slot_id: SlotId,
    pub zone: Zone,
}

/// Successful `exit` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitReceipt {
    pub duration_min: i64,
}

/// Lot-wide dashboard figures: per-zone occupancy plus the number of
/// distinct vehicles ever registered.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub zones: Vec<ZoneStats>,
    pub distinct_vehicles: i64,
}

/// Consistency report: rows that reference entities which no longer exist.
/// Reported, never auto-repaired.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrphanReport {
    /// Active sessions whose slot is missing from the inventory
    pub sessions_without_slot: Vec<VehicleId>,
    /// History rows whose vehicle is absent from the master table
    pub history_without_vehicle: Vec<i64>,
}

impl OrphanReport {
    pub fn is_empty(&self) -> bool {
        self.sessions_without_slot.is_empty() && self.history_without_vehicle.is_empty()
    }
}
