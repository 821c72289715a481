//! Session ledger: the park/exit state machine per vehicle
//!
//! Sole writer of `active_vehicles` and `parking_history`. Each transition
//! touches four tables (slot, active session, history, master record) and
//! commits them as one atomic unit: either all apply or none do.
//!
//! Concurrency model: transitions are serialized per vehicle by an in-memory
//! lock map, and the slot-selection-then-occupy sequence runs inside a single
//! `BEGIN IMMEDIATE` transaction, so two concurrent `park` calls can never
//! claim the same last free slot.

use crate::domain::{
    ActiveSession, Category, DashboardStats, ExitReceipt, HistoryRecord, OrphanReport, ParkReceipt,
    ParkingError, SlotId, TieBreak, VehicleId, VehicleType, Zone, ZoneStats,
};
use crate::services::allocation::AllocationPolicy;
use crate::services::locks::VehicleLocks;
use crate::services::{maintenance, registry, slot_inventory};
use crate::store::{ts_from_sql, ts_to_sql, Store};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use tracing::info;

pub struct SessionLedger {
    store: Store,
    policy: AllocationPolicy,
    locks: VehicleLocks,
}

impl SessionLedger {
    pub fn new(store: Store, policy: AllocationPolicy) -> Self {
        Self {
            store,
            policy,
            locks: VehicleLocks::new(),
        }
    }

    /// Park a vehicle: resolve its zone, claim a free slot, open the session
    /// and history row, refresh the master record. One transaction.
    pub fn park(
        &self,
        vehicle: &VehicleId,
        vehicle_type: &VehicleType,
        category: &Category,
        time: DateTime<Utc>,
    ) -> Result<ParkReceipt, ParkingError> {
        self.park_with(vehicle, vehicle_type, category, time, None)
    }

    /// `park` with an explicit tie-break instead of the configured default.
    pub fn park_with(
        &self,
        vehicle: &VehicleId,
        vehicle_type: &VehicleType,
        category: &Category,
        time: DateTime<Utc>,
        tie_break: Option<TieBreak>,
    ) -> Result<ParkReceipt, ParkingError> {
        let lock = self.locks.acquire(vehicle.as_str());
        let _held = lock.lock();

        let zone = self.policy.zone_for(category);
        let tie_break = self.policy.tie_break(tie_break);

        let receipt = self.store.with_write_tx(|tx| {
            if session_for(tx, vehicle)?.is_some() {
                return Err(ParkingError::AlreadyParked(vehicle.clone()));
            }
            let slot_id = slot_inventory::find_available(tx, &zone, tie_break)?
                .ok_or_else(|| ParkingError::NoSlotAvailable(zone.clone()))?;

            slot_inventory::occupy(tx, slot_id, vehicle, time)?;
            insert_session(tx, vehicle, slot_id, &zone, time)?;
            open_history(tx, vehicle, slot_id, &zone, time)?;
            registry::upsert(tx, vehicle, vehicle_type, category, time, slot_id)?;

            Ok(ParkReceipt {
                slot_id,
                zone: zone.clone(),
            })
        })?;

        info!(
            vehicle = %vehicle,
            slot = %receipt.slot_id,
            zone = %receipt.zone,
            "vehicle_parked"
        );
        Ok(receipt)
    }

    /// Exit a vehicle: free its slot, delete the session, close the open
    /// history row, fold the duration into the master record. One
    /// transaction.
    pub fn exit(
        &self,
        vehicle: &VehicleId,
        time: DateTime<Utc>,
    ) -> Result<ExitReceipt, ParkingError> {
        let lock = self.locks.acquire(vehicle.as_str());
        let _held = lock.lock();

        let receipt = self.store.with_write_tx(|tx| {
            let session =
                session_for(tx, vehicle)?.ok_or_else(|| ParkingError::NotParked(vehicle.clone()))?;

            if time < session.entry_time {
                // Clock regression is surfaced, never clamped
                return Err(ParkingError::InvalidTimeRange {
                    entry: session.entry_time,
                    exit: time,
                });
            }
            let duration_min = (time - session.entry_time).num_minutes();

            slot_inventory::release(tx, session.slot_id)?;
            delete_session(tx, vehicle)?;
            close_history(tx, vehicle, time, duration_min)?;
            registry::record_duration(tx, vehicle, duration_min)?;

            Ok(ExitReceipt { duration_min })
        })?;

        info!(
            vehicle = %vehicle,
            duration_min = %receipt.duration_min,
            "vehicle_exited"
        );
        Ok(receipt)
    }

    /// Occupancy counts, for one zone or all zones.
    pub fn stats(&self, zone: Option<&Zone>) -> Result<Vec<ZoneStats>, ParkingError> {
        self.store.with_read(|conn| slot_inventory::counts(conn, zone))
    }

    /// Lot-wide dashboard figures: all zone counts plus the number of
    /// distinct vehicles ever registered.
    pub fn dashboard(&self) -> Result<DashboardStats, ParkingError> {
        self.store.with_read(|conn| {
            Ok(DashboardStats {
                zones: slot_inventory::counts(conn, None)?,
                distinct_vehicles: registry::distinct_vehicles(conn)?,
            })
        })
    }

    /// History rows, optionally filtered by vehicle and/or entry date,
    /// ordered by entry time.
    pub fn history(
        &self,
        vehicle: Option<&VehicleId>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<HistoryRecord>, ParkingError> {
        self.store.with_read(|conn| query_history(conn, vehicle, date))
    }

    /// Currently parked vehicles, most recent entry first.
    pub fn active_sessions(&self) -> Result<Vec<ActiveSession>, ParkingError> {
        self.store.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT vehicle_number, slot_id, zone, entry_time \
                 FROM active_vehicles ORDER BY entry_time DESC",
            )?;
            let rows = stmt.query_map([], map_session)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Seed the slot pool. Idempotent per zone.
    pub fn seed_slots(&self, zone_counts: &BTreeMap<Zone, u32>) -> Result<u32, ParkingError> {
        self.store
            .with_write_tx(|tx| slot_inventory::seed(tx, zone_counts))
    }

    /// Full system reset: clears sessions, history and master records and
    /// frees every slot. All or nothing.
    pub fn reset_all(&self) -> Result<(), ParkingError> {
        self.store.with_write_tx(|tx| maintenance::reset_all(tx))
    }

    /// Delete closed history rows older than the cutoff. Open rows are never
    /// touched. Returns the number of rows deleted.
    pub fn purge_history(&self, older_than_days: u32, now: DateTime<Utc>) -> Result<usize, ParkingError> {
        self.store
            .with_write_tx(|tx| maintenance::purge_history(tx, older_than_days, now))
    }

    /// Report rows referencing entities that no longer exist. Never repairs.
    pub fn find_orphans(&self) -> Result<OrphanReport, ParkingError> {
        self.store.with_read(maintenance::find_orphans)
    }

    /// Erase every trace of one vehicle (master row, history, session, slot
    /// occupancy). One transaction.
    pub fn delete_vehicle_data(&self, vehicle: &VehicleId) -> Result<(), ParkingError> {
        let lock = self.locks.acquire(vehicle.as_str());
        let _held = lock.lock();
        self.store
            .with_write_tx(|tx| maintenance::delete_vehicle_data(tx, vehicle))
    }

    /// Store handle, for collaborators that share the same database (e.g.
    /// the credential directory).
    pub fn store(&self) -> &Store {
        &self.store
    }
}

fn map_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActiveSession> {
    let vehicle: String = row.get(0)?;
    let entry: String = row.get(3)?;
    Ok(ActiveSession {
        vehicle: vehicle.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(0, "vehicle_number".to_string(), rusqlite::types::Type::Text)
        })?,
        slot_id: SlotId(row.get(1)?),
        zone: Zone::new(row.get::<_, String>(2)?),
        entry_time: ts_from_sql(3, &entry)?,
    })
}

fn session_for(conn: &Connection, vehicle: &VehicleId) -> Result<Option<ActiveSession>, ParkingError> {
    let session = conn
        .query_row(
            "SELECT vehicle_number, slot_id, zone, entry_time \
             FROM active_vehicles WHERE vehicle_number = ?1",
            [vehicle.as_str()],
            map_session,
        )
        .optional()?;
    Ok(session)
}

fn insert_session(
    conn: &Connection,
    vehicle: &VehicleId,
    slot_id: SlotId,
    zone: &Zone,
    time: DateTime<Utc>,
) -> Result<(), ParkingError> {
    conn.execute(
        "INSERT INTO active_vehicles (vehicle_number, slot_id, zone, entry_time) \
         VALUES (?1, ?2, ?3, ?4)",
        params![vehicle.as_str(), slot_id.0, zone.as_str(), ts_to_sql(time)],
    )?;
    Ok(())
}

fn delete_session(conn: &Connection, vehicle: &VehicleId) -> Result<(), ParkingError> {
    conn.execute(
        "DELETE FROM active_vehicles WHERE vehicle_number = ?1",
        [vehicle.as_str()],
    )?;
    Ok(())
}

fn open_history(
    conn: &Connection,
    vehicle: &VehicleId,
    slot_id: SlotId,
    zone: &Zone,
    time: DateTime<Utc>,
) -> Result<(), ParkingError> {
    conn.execute(
        "INSERT INTO parking_history (vehicle_num, slot_id, zone, entry_time) \
         VALUES (?1, ?2, ?3, ?4)",
        params![vehicle.as_str(), slot_id.0, zone.as_str(), ts_to_sql(time)],
    )?;
    Ok(())
}

fn close_history(
    conn: &Connection,
    vehicle: &VehicleId,
    exit_time: DateTime<Utc>,
    duration_min: i64,
) -> Result<(), ParkingError> {
    let changed = conn.execute(
        "UPDATE parking_history SET exit_time = ?2, duration_min = ?3 \
         WHERE vehicle_num = ?1 AND exit_time IS NULL",
        params![vehicle.as_str(), ts_to_sql(exit_time), duration_min],
    )?;
    if changed != 1 {
        // A session without exactly one open history row is a storage
        // inconsistency
        return Err(ParkingError::Storage(rusqlite::Error::QueryReturnedNoRows));
    }
    Ok(())
}

fn query_history(
    conn: &Connection,
    vehicle: Option<&VehicleId>,
    date: Option<NaiveDate>,
) -> Result<Vec<HistoryRecord>, ParkingError> {
    let mut sql = String::from(
        "SELECT id, vehicle_num, slot_id, zone, entry_time, exit_time, duration_min \
         FROM parking_history",
    );
    let mut conds: Vec<&str> = Vec::new();
    let mut args: Vec<String> = Vec::new();
    if let Some(vehicle) = vehicle {
        conds.push("vehicle_num = ?");
        args.push(vehicle.as_str().to_string());
    }
    if let Some(date) = date {
        conds.push("DATE(entry_time) = ?");
        args.push(date.to_string());
    }
    if !conds.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conds.join(" AND "));
    }
    sql.push_str(" ORDER BY entry_time ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), |row| {
        let vehicle: String = row.get(1)?;
        let entry: String = row.get(4)?;
        let exit: Option<String> = row.get(5)?;
        Ok(HistoryRecord {
            id: row.get(0)?,
            vehicle: vehicle.parse().map_err(|_| {
                rusqlite::Error::InvalidColumnType(1, "vehicle_num".to_string(), rusqlite::types::Type::Text)
            })?,
            slot_id: SlotId(row.get(2)?),
            zone: Zone::new(row.get::<_, String>(3)?),
            entry_time: ts_from_sql(4, &entry)?,
            exit_time: exit.map(|t| ts_from_sql(5, &t)).transpose()?,
            duration_min: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
