//! Domain models - core parking types
//!
//! This module contains the canonical data types used throughout the system:
//! - `ParkingSpot` - a physical spot, identified by its number alone
//! - `ParkingType` - closed set of vehicle categories
//! - `Ticket` - one vehicle's visit, open until the vehicle exits
//! - `ParkingError` / `StorageError` - the error taxonomy

pub mod error;
pub mod ticket;
pub mod types;

// Re-export commonly used types at module level
pub use error::{ParkingError, StorageError};
pub use ticket::{Ticket, TicketState};
pub use types::{ParkingSpot, ParkingType, SpotId};
