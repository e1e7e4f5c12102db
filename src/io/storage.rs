//! Storage interface for spots and tickets, plus the in-process implementation
//!
//! Implementations must make spot reservation atomic: marking a spot
//! unavailable has to fail when another visit already took it, so two
//! concurrent entries can never land on the same spot.

use crate::domain::error::StorageError;
use crate::domain::ticket::{new_ticket_id, Ticket};
use crate::domain::types::{ParkingSpot, ParkingType, SpotId};
use crate::infra::config::Config;
use crate::io::ledger::TicketLedger;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub trait Storage: Send + Sync {
    /// Lowest-numbered available spot of `category`
    fn find_next_free_spot(&self, category: ParkingType) -> Result<Option<ParkingSpot>, StorageError>;

    /// Flip a spot's availability. Reserving (`available = false`) an already
    /// occupied spot fails with `SpotOccupied`.
    fn set_spot_availability(&self, spot_id: SpotId, available: bool) -> Result<(), StorageError>;

    /// Insert (no id yet) or update (id set) a ticket; returns the ticket id.
    /// Closed tickets are immutable.
    fn save_ticket(&self, ticket: &Ticket) -> Result<String, StorageError>;

    /// The plate's current open ticket, if any
    fn load_open_ticket(&self, plate: &str) -> Result<Option<Ticket>, StorageError>;

    /// Number of closed tickets on record for the plate
    fn count_prior_tickets(&self, plate: &str) -> Result<u32, StorageError>;
}

/// Tickets for one plate, oldest first. Most plates have a handful of visits.
type PlateHistory = SmallVec<[Ticket; 4]>;

struct Inner {
    spots: BTreeMap<SpotId, ParkingSpot>,
    tickets: FxHashMap<String, PlateHistory>,
}

/// Mutex-guarded store; every operation is atomic with respect to the others
pub struct MemoryStore {
    inner: Mutex<Inner>,
    ledger: Option<TicketLedger>,
}

impl MemoryStore {
    /// In-memory store over the given spot inventory
    pub fn new(spots: Vec<ParkingSpot>) -> Self {
        let spots = spots.into_iter().map(|s| (s.id, s)).collect();
        Self { inner: Mutex::new(Inner { spots, tickets: FxHashMap::default() }), ledger: None }
    }

    /// Store backed by a ticket ledger. Replays the ledger first: closed
    /// tickets restore customer history, open tickets re-occupy their spots.
    pub fn with_ledger(spots: Vec<ParkingSpot>, ledger: TicketLedger) -> anyhow::Result<Self> {
        let mut store = Self::new(spots);
        let tickets = ledger.replay()?;

        {
            let inner = store.inner.get_mut();
            let mut reoccupied = 0usize;
            for ticket in tickets {
                if ticket.is_open() {
                    match inner.spots.get_mut(&ticket.spot.id) {
                        Some(spot) if spot.available => {
                            spot.available = false;
                            reoccupied += 1;
                        }
                        Some(_) => warn!(
                            spot_id = %ticket.spot.id,
                            plate = %ticket.plate,
                            "ledger_spot_double_booked"
                        ),
                        None => warn!(
                            spot_id = %ticket.spot.id,
                            plate = %ticket.plate,
                            "ledger_spot_not_in_inventory"
                        ),
                    }
                }
                inner.tickets.entry(ticket.plate.clone()).or_default().push(ticket);
            }
            info!(plates = %inner.tickets.len(), reoccupied = %reoccupied, "store_restored");
        }

        store.ledger = Some(ledger);
        Ok(store)
    }

    /// Build the store described by the config (ledger-backed when enabled)
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let spots = config.spot_inventory();
        if config.ledger_enabled() {
            Self::with_ledger(spots, TicketLedger::new(config.ledger_file()))
        } else {
            Ok(Self::new(spots))
        }
    }

    /// Current state of a spot
    pub fn spot(&self, spot_id: SpotId) -> Option<ParkingSpot> {
        self.inner.lock().spots.get(&spot_id).copied()
    }

    /// Every ticket on record for a plate, oldest first
    pub fn tickets_for(&self, plate: &str) -> Vec<Ticket> {
        self.inner.lock().tickets.get(plate).map(|h| h.to_vec()).unwrap_or_default()
    }

    /// (free, total) spots of a category
    pub fn capacity(&self, category: ParkingType) -> (usize, usize) {
        let inner = self.inner.lock();
        let spots = inner.spots.values().filter(|s| s.category == category);
        spots.fold((0, 0), |(free, total), s| (free + usize::from(s.available), total + 1))
    }
}

impl Storage for MemoryStore {
    fn find_next_free_spot(&self, category: ParkingType) -> Result<Option<ParkingSpot>, StorageError> {
        let inner = self.inner.lock();
        Ok(inner.spots.values().find(|s| s.category == category && s.available).copied())
    }

    fn set_spot_availability(&self, spot_id: SpotId, available: bool) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let spot = inner.spots.get_mut(&spot_id).ok_or(StorageError::SpotNotFound(spot_id))?;

        if !available && !spot.available {
            return Err(StorageError::SpotOccupied(spot_id));
        }
        spot.available = available;
        debug!(spot_id = %spot_id, available = %available, "spot_updated");
        Ok(())
    }

    fn save_ticket(&self, ticket: &Ticket) -> Result<String, StorageError> {
        let mut inner = self.inner.lock();

        let Some(id) = ticket.id.clone() else {
            let mut stored = ticket.clone();
            let id = new_ticket_id();
            stored.id = Some(id.clone());
            if let Some(ledger) = &self.ledger {
                ledger.append(&stored)?;
            }
            inner.tickets.entry(stored.plate.clone()).or_default().push(stored);
            debug!(ticket_id = %id, plate = %ticket.plate, "ticket_inserted");
            return Ok(id);
        };

        let existing = inner
            .tickets
            .get_mut(&ticket.plate)
            .and_then(|history| history.iter_mut().find(|t| t.id.as_deref() == Some(id.as_str())))
            .ok_or_else(|| StorageError::TicketNotFound(id.clone()))?;

        if !existing.is_open() {
            return Err(StorageError::TicketClosed(id));
        }
        if let Some(ledger) = &self.ledger {
            ledger.append(ticket)?;
        }
        *existing = ticket.clone();
        debug!(ticket_id = %id, plate = %ticket.plate, state = %ticket.state().as_str(), "ticket_updated");
        Ok(id)
    }

    fn load_open_ticket(&self, plate: &str) -> Result<Option<Ticket>, StorageError> {
        let inner = self.inner.lock();
        Ok(inner
            .tickets
            .get(plate)
            .and_then(|history| history.iter().rev().find(|t| t.is_open()))
            .cloned())
    }

    fn count_prior_tickets(&self, plate: &str) -> Result<u32, StorageError> {
        let inner = self.inner.lock();
        let closed = inner
            .tickets
            .get(plate)
            .map_or(0, |history| history.iter().filter(|t| !t.is_open()).count());
        Ok(u32::try_from(closed).unwrap_or(u32::MAX))
    }
}
