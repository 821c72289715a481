//! Slot inventory: the pool of physical slots per zone and their occupancy
//!
//! Exclusive owner of `slots.is_occupied` / `slots.vehicle_num`; nothing
//! else writes those columns. All functions operate on the caller's
//! connection so the ledger can run them inside one transaction.

use crate::domain::{ParkingError, Slot, SlotId, TieBreak, VehicleId, Zone, ZoneStats};
use crate::store::{ts_from_sql, ts_to_sql};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Populate zones with fixed slot counts. Idempotent per zone: a zone that
/// already has slots is left untouched, so repeated seeding never duplicates.
/// Returns the number of slots created.
pub fn seed(conn: &Connection, zone_counts: &BTreeMap<Zone, u32>) -> Result<u32, ParkingError> {
    let mut created = 0;
    for (zone, count) in zone_counts {
        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM slots WHERE zone = ?1",
            [zone.as_str()],
            |row| row.get(0),
        )?;
        if existing > 0 {
            debug!(zone = %zone, existing = %existing, "seed_skipped_zone_populated");
            continue;
        }
        for _ in 0..*count {
            conn.execute(
                "INSERT INTO slots (zone, is_occupied) VALUES (?1, 0)",
                [zone.as_str()],
            )?;
        }
        created += count;
        info!(zone = %zone, count = %count, "slots_seeded");
    }
    Ok(created)
}

/// Find a free slot in the zone using the given tie-break, or `None` if the
/// zone is full. Must run inside the same write transaction as the
/// subsequent `occupy` so the chosen slot cannot be taken in between.
pub fn find_available(
    conn: &Connection,
    zone: &Zone,
    tie_break: TieBreak,
) -> Result<Option<SlotId>, ParkingError> {
    let order = match tie_break {
        TieBreak::First | TieBreak::Front => "ASC",
        TieBreak::Corner => "DESC",
    };
    let sql = format!(
        "SELECT slot_id FROM slots WHERE zone = ?1 AND is_occupied = 0 \
         ORDER BY slot_id {order} LIMIT 1"
    );
    let slot = conn
        .query_row(&sql, [zone.as_str()], |row| row.get(0).map(SlotId))
        .optional()?;
    Ok(slot)
}

/// Mark a slot occupied by a vehicle. Fails with `SlotAlreadyOccupied` if it
/// is not free.
pub fn occupy(
    conn: &Connection,
    slot_id: SlotId,
    vehicle: &VehicleId,
    time: DateTime<Utc>,
) -> Result<(), ParkingError> {
    let changed = conn.execute(
        "UPDATE slots SET is_occupied = 1, vehicle_num = ?2, entry_time = ?3 \
         WHERE slot_id = ?1 AND is_occupied = 0",
        params![slot_id.0, vehicle.as_str(), ts_to_sql(time)],
    )?;
    if changed == 0 {
        return Err(occupancy_conflict(conn, slot_id, true)?);
    }
    Ok(())
}

/// Mark a slot free again. Fails with `SlotNotOccupied` if it is not
/// occupied.
pub fn release(conn: &Connection, slot_id: SlotId) -> Result<(), ParkingError> {
    let changed = conn.execute(
        "UPDATE slots SET is_occupied = 0, vehicle_num = NULL, entry_time = NULL \
         WHERE slot_id = ?1 AND is_occupied = 1",
        [slot_id.0],
    )?;
    if changed == 0 {
        return Err(occupancy_conflict(conn, slot_id, false)?);
    }
    Ok(())
}

/// A guarded occupancy update matched zero rows: either the slot is in the
/// opposite occupancy state, or it does not exist at all (a storage-level
/// inconsistency).
fn occupancy_conflict(
    conn: &Connection,
    slot_id: SlotId,
    expected_free: bool,
) -> Result<ParkingError, ParkingError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT slot_id FROM slots WHERE slot_id = ?1",
            [slot_id.0],
            |row| row.get(0),
        )
        .optional()?;
    Ok(match exists {
        Some(_) if expected_free => ParkingError::SlotAlreadyOccupied(slot_id),
        Some(_) => ParkingError::SlotNotOccupied(slot_id),
        None => ParkingError::Storage(rusqlite::Error::QueryReturnedNoRows),
    })
}

/// Occupancy counts, for one zone or all zones, ordered by zone name.
pub fn counts(conn: &Connection, zone: Option<&Zone>) -> Result<Vec<ZoneStats>, ParkingError> {
    let base = "SELECT zone, COUNT(*) AS total, \
                SUM(CASE WHEN is_occupied = 1 THEN 1 ELSE 0 END) AS occupied \
                FROM slots";
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<ZoneStats> {
        let total: i64 = row.get(1)?;
        let occupied: i64 = row.get(2)?;
        Ok(ZoneStats {
            zone: Zone::new(row.get::<_, String>(0)?),
            total,
            occupied,
            available: total - occupied,
        })
    };
    let stats = match zone {
        Some(zone) => {
            let sql = format!("{base} WHERE zone = ?1 GROUP BY zone ORDER BY zone");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([zone.as_str()], map_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let sql = format!("{base} GROUP BY zone ORDER BY zone");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], map_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(stats)
}

/// Fetch a single slot row.
pub fn get(conn: &Connection, slot_id: SlotId) -> Result<Option<Slot>, ParkingError> {
    let slot = conn
        .query_row(
            "SELECT slot_id, zone, is_occupied, vehicle_num, entry_time \
             FROM slots WHERE slot_id = ?1",
            [slot_id.0],
            |row| {
                let vehicle: Option<String> = row.get(3)?;
                let entry: Option<String> = row.get(4)?;
                Ok(Slot {
                    id: SlotId(row.get(0)?),
                    zone: Zone::new(row.get::<_, String>(1)?),
                    occupied: row.get::<_, i64>(2)? != 0,
                    // Stored ids were validated on the way in
                    vehicle: vehicle.and_then(|v| v.parse::<VehicleId>().ok()),
                    entry_time: entry.map(|t| ts_from_sql(4, &t)).transpose()?,
                })
            },
        )
        .optional()?;
    Ok(slot)
}
