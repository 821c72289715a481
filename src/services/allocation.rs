//! Allocation policy: category to zone mapping and slot tie-break selection
//!
//! Pure functions over a static table, no state. Unknown categories fall
//! back to zone A.

use crate::domain::types::{Category, TieBreak, Zone};

/// Maps a vehicle category to its zone and selects the tie-break rule used
/// when several slots in that zone are free.
#[derive(Debug, Clone)]
pub struct AllocationPolicy {
    default_tie_break: TieBreak,
}

impl AllocationPolicy {
    pub fn new(default_tie_break: TieBreak) -> Self {
        Self { default_tie_break }
    }

    /// Static category -> zone table; anything unrecognized goes to zone A.
    pub fn zone_for(&self, category: &Category) -> Zone {
        match category {
            Category::Student => Zone::new("A"),
            Category::Faculty => Zone::new("B"),
            Category::Vip => Zone::new("C"),
            Category::Other(_) => Zone::new("A"),
        }
    }

    /// Tie-break to use: the caller's requested variant, or the configured
    /// default.
    pub fn tie_break(&self, requested: Option<TieBreak>) -> TieBreak {
        requested.unwrap_or(self.default_tie_break)
    }
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self::new(TieBreak::First)
    }
}
