//! Ticket model: one vehicle's occupancy of a spot from entry to exit

use crate::domain::types::ParkingSpot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new ticket ID (UUIDv7, time-sortable)
pub fn new_ticket_id() -> String {
    Uuid::now_v7().to_string()
}

/// Ticket lifecycle state, derived from `out_time`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    /// Vehicle is parked (no out time yet)
    Open,
    /// Vehicle left; out time and price are set
    Closed,
}

impl TicketState {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Open => "open",
            TicketState::Closed => "closed",
        }
    }
}

/// A parking ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Assigned by storage on first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub spot: ParkingSpot,
    pub plate: String,
    pub in_time: DateTime<Utc>,
    #[serde(default)]
    pub out_time: Option<DateTime<Utc>>,
    /// Unrounded fare, set at exit
    #[serde(default)]
    pub price: Option<f64>,
}

impl Ticket {
    /// Open a ticket for a vehicle entering `spot` at `in_time`.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Utc;
    /// use parking_system::domain::ticket::{Ticket, TicketState};
    /// use parking_system::domain::types::{ParkingSpot, ParkingType, SpotId};
    ///
    /// let spot = ParkingSpot::new(SpotId(1), ParkingType::Car, false);
    /// let ticket = Ticket::open(spot, "ABCDEF", Utc::now());
    /// assert_eq!(ticket.state(), TicketState::Open);
    /// assert!(ticket.id.is_none());
    /// ```
    pub fn open(spot: ParkingSpot, plate: &str, in_time: DateTime<Utc>) -> Self {
        Self {
            id: None,
            spot,
            plate: plate.to_string(),
            in_time,
            out_time: None,
            price: None,
        }
    }

    #[inline]
    pub fn state(&self) -> TicketState {
        if self.out_time.is_some() {
            TicketState::Closed
        } else {
            TicketState::Open
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state() == TicketState::Open
    }

    /// Stamp the exit time and fare. Callers only close open tickets.
    pub fn close(&mut self, out_time: DateTime<Utc>, price: f64) {
        debug_assert!(self.is_open(), "closing a closed ticket");
        self.out_time = Some(out_time);
        self.price = Some(price);
    }

    /// Whole minutes parked so far (or in total, once closed)
    pub fn parked_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.out_time.unwrap_or(now);
        (end - self.in_time).num_minutes()
    }
}
