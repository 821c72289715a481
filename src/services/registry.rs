//! Vehicle registry: one master record per vehicle ever seen
//!
//! Sole writer of `vehicles_master`. `first_entry` is written once and never
//! touched again; type, category and last slot refresh on every park; the
//! average duration is a running mean maintained incrementally on exit.

use crate::domain::{Category, ParkingError, SlotId, VehicleId, VehicleMaster, VehicleType};
use crate::store::{ts_from_sql, ts_to_sql};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Insert or refresh the master record. A first-time insert sets
/// `first_entry = time`; later calls update type, category and last slot but
/// leave `first_entry` alone.
pub fn upsert(
    conn: &Connection,
    vehicle: &VehicleId,
    vehicle_type: &VehicleType,
    category: &Category,
    time: DateTime<Utc>,
    last_slot: SlotId,
) -> Result<(), ParkingError> {
    conn.execute(
        "INSERT INTO vehicles_master \
             (vehicle_number, vehicle_type, category, first_entry, last_slot) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (vehicle_number) DO UPDATE SET \
             vehicle_type = excluded.vehicle_type, \
             category = excluded.category, \
             last_slot = excluded.last_slot",
        params![
            vehicle.as_str(),
            vehicle_type.as_str(),
            category.as_str(),
            ts_to_sql(time),
            last_slot.0,
        ],
    )?;
    Ok(())
}

/// Fold one closed session into the running mean:
/// `avg' = avg + (duration - avg) / closed_count'`. O(1), no history scan.
pub fn record_duration(
    conn: &Connection,
    vehicle: &VehicleId,
    duration_min: i64,
) -> Result<(), ParkingError> {
    let changed = conn.execute(
        "UPDATE vehicles_master SET \
             closed_sessions = closed_sessions + 1, \
             avg_duration = avg_duration \
                 + (CAST(?2 AS REAL) - avg_duration) / (closed_sessions + 1) \
         WHERE vehicle_number = ?1",
        params![vehicle.as_str(), duration_min],
    )?;
    if changed == 0 {
        // A closing session without a master row is a storage inconsistency
        return Err(ParkingError::Storage(rusqlite::Error::QueryReturnedNoRows));
    }
    Ok(())
}

/// Fetch a master record.
pub fn get(conn: &Connection, vehicle: &VehicleId) -> Result<Option<VehicleMaster>, ParkingError> {
    let record = conn
        .query_row(
            "SELECT vehicle_number, vehicle_type, category, first_entry, last_slot, \
                    avg_duration, closed_sessions \
             FROM vehicles_master WHERE vehicle_number = ?1",
            [vehicle.as_str()],
            |row| {
                let vehicle_type: String = row.get(1)?;
                let category: String = row.get(2)?;
                let first_entry: String = row.get(3)?;
                Ok(VehicleMaster {
                    vehicle: vehicle.clone(),
                    vehicle_type: vehicle_type.parse().expect("infallible"),
                    category: category.parse().expect("infallible"),
                    first_entry: ts_from_sql(3, &first_entry)?,
                    last_slot: row.get::<_, Option<i64>>(4)?.map(SlotId),
                    avg_duration: row.get(5)?,
                    closed_sessions: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

/// Number of distinct vehicles ever registered (dashboard figure).
pub fn distinct_vehicles(conn: &Connection) -> Result<i64, ParkingError> {
    let count = conn.query_row(
        "SELECT COUNT(DISTINCT vehicle_number) FROM vehicles_master",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
