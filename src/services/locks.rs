//! Per-vehicle lock map
//!
//! Each `park`/`exit` transition is serialized per vehicle: two concurrent
//! calls for the same vehicle take turns instead of racing the duplicate
//! checks. Locks are created lazily, one per unique vehicle id, and repeated
//! lookups return the same lock.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct VehicleLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl VehicleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a vehicle id. The caller holds the
    /// returned mutex for the duration of the transition.
    pub fn acquire(&self, vehicle: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        // Sweep entries no caller holds anymore so the map stays bounded by
        // the number of in-flight transitions
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(vehicle.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_vehicle_same_lock() {
        let locks = VehicleLocks::new();
        let a = locks.acquire("KA01A1");
        let b = locks.acquire("KA01A1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_different_vehicles_different_locks() {
        let locks = VehicleLocks::new();
        let a = locks.acquire("KA01A1");
        let b = locks.acquire("KA01A2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_released_locks_are_swept() {
        let locks = VehicleLocks::new();
        drop(locks.acquire("KA01A1"));
        drop(locks.acquire("KA01A2"));

        // The next acquire drops the idle entries and tracks only its own
        let held = locks.acquire("KA01A3");
        assert_eq!(locks.tracked(), 1);

        // A lock still held survives the sweep
        let again = locks.acquire("KA01A3");
        assert!(Arc::ptr_eq(&held, &again));
        drop(held);
        drop(again);
    }

    #[test]
    fn test_lock_excludes_second_holder() {
        let locks = VehicleLocks::new();
        let lock = locks.acquire("KA01A1");
        let held = lock.lock();
        assert!(locks.acquire("KA01A1").try_lock().is_none());
        drop(held);
        assert!(locks.acquire("KA01A1").try_lock().is_some());
    }
}
