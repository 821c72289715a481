//! Shared value types for the parking core

use crate::domain::error::ParkingError;
use serde::{Deserialize, Serialize};

/// Newtype wrapper for slot ids to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SlotId(pub i64);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named partition of the slot pool (e.g. "A", "B", "C"), each with its
/// own slot count and independent availability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Zone(pub String);

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Zone(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated vehicle identifier.
///
/// Normalized to trimmed upper-case on parse. Empty ids, over-long ids, and
/// ids with characters outside `[A-Z0-9-]` are rejected with a validation
/// error before they ever reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct VehicleId(String);

/// Upper bound on a normalized vehicle id (longest real-world plates are
/// well under this).
const MAX_VEHICLE_ID_LEN: usize = 20;

impl VehicleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for VehicleId {
    type Err = ParkingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(ParkingError::Validation("vehicle id is empty".to_string()));
        }
        if normalized.len() > MAX_VEHICLE_ID_LEN {
            return Err(ParkingError::Validation(format!(
                "vehicle id '{normalized}' exceeds {MAX_VEHICLE_ID_LEN} characters"
            )));
        }
        if !normalized.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ParkingError::Validation(format!(
                "vehicle id '{normalized}' contains invalid characters"
            )));
        }
        Ok(VehicleId(normalized))
    }
}

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vehicle type as reported at the entry barrier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleType {
    Car,
    Bike,
    Other(String),
}

impl std::str::FromStr for VehicleType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Car" | "car" => VehicleType::Car,
            "Bike" | "bike" => VehicleType::Bike,
            other => VehicleType::Other(other.to_string()),
        })
    }
}

impl VehicleType {
    pub fn as_str(&self) -> &str {
        match self {
            VehicleType::Car => "Car",
            VehicleType::Bike => "Bike",
            VehicleType::Other(s) => s,
        }
    }
}

/// Vehicle owner category; drives zone assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Student,
    Faculty,
    Vip,
    Other(String),
}

impl std::str::FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Student" | "student" => Category::Student,
            "Faculty" | "faculty" => Category::Faculty,
            "VIP" | "Vip" | "vip" => Category::Vip,
            other => Category::Other(other.to_string()),
        })
    }
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Student => "Student",
            Category::Faculty => "Faculty",
            Category::Vip => "VIP",
            Category::Other(s) => s,
        }
    }
}

/// Rule used to choose among multiple available slots in a zone.
///
/// `Front` and `First` both pick the lowest id today; the original system
/// named them separately ("prefer front" vs the default) so both are kept as
/// distinct policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Lowest slot id (default)
    #[default]
    First,
    /// Lowest slot id ("front" slots)
    Front,
    /// Highest slot id ("corner" slots)
    Corner,
}

impl TieBreak {
    pub fn as_str(&self) -> &str {
        match self {
            TieBreak::First => "first",
            TieBreak::Front => "front",
            TieBreak::Corner => "corner",
        }
    }
}
