//! Shared types for the parking system

use crate::domain::error::ParkingError;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Newtype wrapper for spot numbers to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SpotId(pub u32);

impl std::fmt::Display for SpotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vehicle category, which also decides the spot category and hourly rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParkingType {
    Car,
    Bike,
}

impl ParkingType {
    /// Resolve a raw menu selection (1 = car, 2 = bike)
    pub fn from_selection(selection: i64) -> Result<Self, ParkingError> {
        match selection {
            1 => Ok(ParkingType::Car),
            2 => Ok(ParkingType::Bike),
            other => Err(ParkingError::InvalidCategorySelection(other)),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ParkingType::Car => "CAR",
            ParkingType::Bike => "BIKE",
        }
    }
}

impl std::fmt::Display for ParkingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ParkingType {
    type Err = ParkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CAR" => Ok(ParkingType::Car),
            "BIKE" => Ok(ParkingType::Bike),
            other => Err(ParkingError::UnknownCategory(other.to_string())),
        }
    }
}

/// A single physical parking location
///
/// Identity is the spot number alone: two values with the same `id` compare
/// equal (and hash equal) even when category or availability differ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParkingSpot {
    pub id: SpotId,
    pub category: ParkingType,
    pub available: bool,
}

impl ParkingSpot {
    #[inline]
    pub fn new(id: SpotId, category: ParkingType, available: bool) -> Self {
        Self { id, category, available }
    }
}

impl PartialEq for ParkingSpot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ParkingSpot {}

impl Hash for ParkingSpot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
