//! Error taxonomy for parking operations
//!
//! `ParkingError` is what callers of the flow controller see. Storage
//! failures are wrapped opaquely in `ParkingError::Storage`. A full lot is
//! not an error at all; see `EntryOutcome::LotFull`.

use crate::domain::types::SpotId;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParkingError {
    #[error("Out time provided is incorrect: in={in_time}, out={}", fmt_out_time(.out_time))]
    InvalidDuration { in_time: DateTime<Utc>, out_time: Option<DateTime<Utc>> },

    #[error("Unknown parking type: {0}")]
    UnknownCategory(String),

    #[error("Incorrect input provided: {0} is not a vehicle type")]
    InvalidCategorySelection(i64),

    #[error("No open ticket for vehicle {plate}")]
    NoOpenTicket { plate: String },

    #[error("Vehicle {plate} is already parked")]
    VehicleAlreadyParked { plate: String },

    #[error("Invalid input provided: {0}")]
    InvalidInput(String),

    /// The operator console itself failed; not recoverable by re-prompting
    #[error("Console I/O failed: {0}")]
    Console(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn fmt_out_time(out_time: &Option<DateTime<Utc>>) -> String {
    out_time.map_or_else(|| "none".to_string(), |t| t.to_rfc3339())
}

/// Failures reported by a `Storage` implementation
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Parking spot {0} does not exist")]
    SpotNotFound(SpotId),

    #[error("Parking spot {0} is already occupied")]
    SpotOccupied(SpotId),

    #[error("Ticket {0} does not exist")]
    TicketNotFound(String),

    #[error("Ticket {0} is closed and cannot be updated")]
    TicketClosed(String),

    #[error("Ticket ledger I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
