//! Integration tests for the park/exit lifecycle against a real database file

use chrono::{TimeDelta, Utc};
use lotkeeper::domain::{Category, ParkingError, SlotId, VehicleId, VehicleType, Zone};
use lotkeeper::services::{registry, AllocationPolicy, SessionLedger};
use lotkeeper::store::Store;
use std::collections::BTreeMap;
use std::time::Duration;
use tempfile::TempDir;

fn ledger_in(dir: &TempDir, zone_counts: &BTreeMap<Zone, u32>) -> SessionLedger {
    let store = Store::open(dir.path().join("test.db"), Duration::from_millis(5000)).unwrap();
    let ledger = SessionLedger::new(store, AllocationPolicy::default());
    ledger.seed_slots(zone_counts).unwrap();
    ledger
}

fn vehicle(id: &str) -> VehicleId {
    id.parse().unwrap()
}

#[test]
fn test_fill_release_refill_cycle() {
    let dir = TempDir::new().unwrap();
    let counts = BTreeMap::from([(Zone::new("A"), 2)]);
    let ledger = ledger_in(&dir, &counts);

    let t0 = Utc::now();
    let v1 = vehicle("KA01V1");
    let v2 = vehicle("KA01V2");
    let v3 = vehicle("KA01V3");

    let r1 = ledger
        .park(&v1, &VehicleType::Car, &Category::Student, t0)
        .unwrap();
    assert_eq!(r1.slot_id, SlotId(1));

    let r2 = ledger
        .park(&v2, &VehicleType::Bike, &Category::Student, t0 + TimeDelta::minutes(1))
        .unwrap();
    assert_eq!(r2.slot_id, SlotId(2));

    // Zone full: third park is rejected without side effects
    let full = ledger.park(&v3, &VehicleType::Car, &Category::Student, t0 + TimeDelta::minutes(2));
    assert!(matches!(full, Err(ParkingError::NoSlotAvailable(_))));
    assert_eq!(ledger.active_sessions().unwrap().len(), 2);

    // First vehicle leaves, freeing its slot for the waiting one
    let exit = ledger.exit(&v1, t0 + TimeDelta::minutes(30)).unwrap();
    assert_eq!(exit.duration_min, 30);

    let r3 = ledger
        .park(&v3, &VehicleType::Car, &Category::Student, t0 + TimeDelta::minutes(31))
        .unwrap();
    assert_eq!(r3.slot_id, SlotId(1));

    let stats = ledger.stats(Some(&Zone::new("A"))).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].total, 2);
    assert_eq!(stats[0].occupied, 2);
    assert_eq!(stats[0].available, 0);
}

#[test]
fn test_seed_is_idempotent_per_zone() {
    let dir = TempDir::new().unwrap();
    let counts = BTreeMap::from([(Zone::new("A"), 3), (Zone::new("B"), 2)]);
    let ledger = ledger_in(&dir, &counts);

    // Second seed of the same zones creates nothing
    assert_eq!(ledger.seed_slots(&counts).unwrap(), 0);

    // A new zone can still be added later without touching existing ones
    let v1 = vehicle("V1");
    ledger
        .park(&v1, &VehicleType::Car, &Category::Student, Utc::now())
        .unwrap();
    let extended = BTreeMap::from([
        (Zone::new("A"), 3),
        (Zone::new("B"), 2),
        (Zone::new("D"), 4),
    ]);
    assert_eq!(ledger.seed_slots(&extended).unwrap(), 4);

    let stats = ledger.stats(None).unwrap();
    assert_eq!(stats.len(), 3);
    let zone_a = stats.iter().find(|s| s.zone == Zone::new("A")).unwrap();
    assert_eq!(zone_a.occupied, 1);
}

#[test]
fn test_running_average_across_sessions() {
    let dir = TempDir::new().unwrap();
    let counts = BTreeMap::from([(Zone::new("A"), 1)]);
    let ledger = ledger_in(&dir, &counts);
    let v = vehicle("AVG1");
    let mut t = Utc::now();

    for minutes in [10, 20, 60] {
        ledger
            .park(&v, &VehicleType::Car, &Category::Student, t)
            .unwrap();
        t += TimeDelta::minutes(minutes);
        ledger.exit(&v, t).unwrap();
        t += TimeDelta::minutes(1);
    }

    let master = ledger
        .store()
        .with_read(|conn| registry::get(conn, &v))
        .unwrap()
        .unwrap();
    assert_eq!(master.closed_sessions, 3);
    assert!((master.avg_duration - 30.0).abs() < 1e-9);

    let history = ledger.history(Some(&v), None).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|h| h.exit_time.is_some()));
}

#[test]
fn test_purge_spares_recent_and_open_rows() {
    let dir = TempDir::new().unwrap();
    let counts = BTreeMap::from([(Zone::new("A"), 2)]);
    let ledger = ledger_in(&dir, &counts);
    let now = Utc::now();

    // One old closed session, one still open
    let old = vehicle("OLD1");
    let t_old = now - TimeDelta::days(120);
    ledger
        .park(&old, &VehicleType::Car, &Category::Student, t_old)
        .unwrap();
    ledger.exit(&old, t_old + TimeDelta::minutes(45)).unwrap();

    let open = vehicle("OPEN1");
    ledger
        .park(&open, &VehicleType::Car, &Category::Student, now - TimeDelta::days(120))
        .unwrap();

    let deleted = ledger.purge_history(90, now).unwrap();
    assert_eq!(deleted, 1);

    // The open row survives regardless of age
    let remaining = ledger.history(None, None).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].vehicle, open);
    assert!(remaining[0].exit_time.is_none());
}

#[test]
fn test_reset_clears_everything() {
    let dir = TempDir::new().unwrap();
    let counts = BTreeMap::from([(Zone::new("A"), 2)]);
    let ledger = ledger_in(&dir, &counts);
    let now = Utc::now();

    let v = vehicle("R1");
    ledger
        .park(&v, &VehicleType::Car, &Category::Student, now)
        .unwrap();
    ledger.reset_all().unwrap();

    assert!(ledger.active_sessions().unwrap().is_empty());
    assert!(ledger.history(None, None).unwrap().is_empty());

    // Slots survive the reset and are all free again
    let stats = ledger.stats(Some(&Zone::new("A"))).unwrap();
    assert_eq!(stats[0].total, 2);
    assert_eq!(stats[0].available, 2);

    // Same vehicle can park again from a clean slate
    ledger
        .park(&v, &VehicleType::Car, &Category::Student, now)
        .unwrap();
}

#[test]
fn test_forget_vehicle_erases_all_traces() {
    let dir = TempDir::new().unwrap();
    let counts = BTreeMap::from([(Zone::new("A"), 2)]);
    let ledger = ledger_in(&dir, &counts);
    let now = Utc::now();

    let v = vehicle("GONE1");
    ledger
        .park(&v, &VehicleType::Car, &Category::Student, now)
        .unwrap();
    ledger.delete_vehicle_data(&v).unwrap();

    assert!(ledger.active_sessions().unwrap().is_empty());
    assert!(ledger.history(Some(&v), None).unwrap().is_empty());
    let master = ledger
        .store()
        .with_read(|conn| registry::get(conn, &v))
        .unwrap();
    assert!(master.is_none());

    // Its slot is free again
    let stats = ledger.stats(Some(&Zone::new("A"))).unwrap();
    assert_eq!(stats[0].available, 2);
}

#[test]
fn test_database_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("persist.db");
    let now = Utc::now();
    let v = vehicle("P1");

    {
        let store = Store::open(&db_path, Duration::from_millis(5000)).unwrap();
        let ledger = SessionLedger::new(store, AllocationPolicy::default());
        ledger
            .seed_slots(&BTreeMap::from([(Zone::new("A"), 1)]))
            .unwrap();
        ledger
            .park(&v, &VehicleType::Car, &Category::Student, now)
            .unwrap();
    }

    let store = Store::open(&db_path, Duration::from_millis(5000)).unwrap();
    let ledger = SessionLedger::new(store, AllocationPolicy::default());

    let sessions = ledger.active_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].vehicle, v);

    let exit = ledger.exit(&v, now + TimeDelta::minutes(15)).unwrap();
    assert_eq!(exit.duration_min, 15);
}
