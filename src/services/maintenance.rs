//! Consistency and retention helpers (batch operations, externally triggered)
//!
//! `find_orphans` only reports; repairing automatically would mask the bug
//! that produced the orphan. `purge_history` and `reset_all` are the only
//! operations that ever delete rows.

use crate::domain::{OrphanReport, ParkingError, VehicleId};
use crate::store::ts_to_sql;
use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::Connection;
use tracing::{info, warn};

/// Report active sessions whose slot no longer exists, and history rows
/// whose vehicle is absent from the master table.
pub fn find_orphans(conn: &Connection) -> Result<OrphanReport, ParkingError> {
    let mut report = OrphanReport::default();

    let mut stmt = conn.prepare(
        "SELECT vehicle_number FROM active_vehicles \
         WHERE slot_id NOT IN (SELECT slot_id FROM slots) \
         ORDER BY vehicle_number",
    )?;
    let sessions = stmt.query_map([], |row| row.get::<_, String>(0))?;
    for vehicle in sessions {
        let raw = vehicle?;
        if let Ok(id) = raw.parse::<VehicleId>() {
            report.sessions_without_slot.push(id);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT id FROM parking_history \
         WHERE vehicle_num NOT IN (SELECT vehicle_number FROM vehicles_master) \
         ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
    for id in rows {
        report.history_without_vehicle.push(id?);
    }

    if !report.is_empty() {
        warn!(
            sessions = %report.sessions_without_slot.len(),
            history_rows = %report.history_without_vehicle.len(),
            "orphans_found"
        );
    }
    Ok(report)
}

/// Delete closed history rows (`exit_time` non-null) older than the cutoff.
/// The open row of a parked vehicle is never eligible, whatever its age.
pub fn purge_history(
    conn: &Connection,
    older_than_days: u32,
    now: DateTime<Utc>,
) -> Result<usize, ParkingError> {
    let cutoff = now - TimeDelta::days(i64::from(older_than_days));
    let deleted = conn.execute(
        "DELETE FROM parking_history \
         WHERE exit_time IS NOT NULL AND datetime(exit_time) < datetime(?1)",
        [ts_to_sql(cutoff)],
    )?;
    info!(deleted = %deleted, older_than_days = %older_than_days, "history_purged");
    Ok(deleted)
}

/// Full system reset: clear sessions, history and master records and free
/// every slot. Runs inside the caller's transaction, so it is all-or-nothing.
pub fn reset_all(conn: &Connection) -> Result<(), ParkingError> {
    conn.execute("DELETE FROM active_vehicles", [])?;
    conn.execute("DELETE FROM parking_history", [])?;
    conn.execute("DELETE FROM vehicles_master", [])?;
    conn.execute(
        "UPDATE slots SET is_occupied = 0, vehicle_num = NULL, entry_time = NULL",
        [],
    )?;
    info!("system_reset");
    Ok(())
}

/// Erase all data for one vehicle: session, history, master row, and any
/// slot it occupies.
pub fn delete_vehicle_data(conn: &Connection, vehicle: &VehicleId) -> Result<(), ParkingError> {
    conn.execute(
        "DELETE FROM active_vehicles WHERE vehicle_number = ?1",
        [vehicle.as_str()],
    )?;
    conn.execute(
        "DELETE FROM parking_history WHERE vehicle_num = ?1",
        [vehicle.as_str()],
    )?;
    conn.execute(
        "DELETE FROM vehicles_master WHERE vehicle_number = ?1",
        [vehicle.as_str()],
    )?;
    conn.execute(
        "UPDATE slots SET is_occupied = 0, vehicle_num = NULL, entry_time = NULL \
         WHERE vehicle_num = ?1",
        [vehicle.as_str()],
    )?;
    info!(vehicle = %vehicle, "vehicle_data_deleted");
    Ok(())
}
