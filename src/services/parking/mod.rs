//! Vehicle flow controller
//!
//! Orchestrates a visit end to end:
//! - Entry: resolve vehicle type, allocate a spot, reserve it, open a ticket
//! - Exit: close the open ticket, price it, release the spot
//!
//! Ordering rules:
//! - A full lot is reported before anything is written.
//! - On entry the spot is reserved first; if the ticket save then fails the
//!   reservation is rolled back.
//! - On exit the spot is only released after the closed ticket is saved, so
//!   a failed save leaves the spot occupied instead of double-allocating it.


use crate::domain::error::ParkingError;
use crate::domain::ticket::Ticket;
use crate::domain::types::{ParkingSpot, ParkingType};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::input::InputSource;
use crate::io::storage::Storage;
use crate::services::allocator::SpotAllocator;
use crate::services::clock::Clock;
use crate::services::fare::{round_to_cents, FareCalculator};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of an entry attempt
#[derive(Debug, Clone)]
pub enum EntryOutcome {
    Parked(EntryReceipt),
    /// No free spot of this type; nothing was written
    LotFull { category: ParkingType },
}

#[derive(Debug, Clone)]
pub struct EntryReceipt {
    pub ticket: Ticket,
    /// Plate has completed visits on record and will get the loyalty discount
    pub recurring_user: bool,
}

impl EntryReceipt {
    pub fn spot(&self) -> ParkingSpot {
        self.ticket.spot
    }
}

#[derive(Debug, Clone)]
pub struct ExitReceipt {
    pub ticket: Ticket,
    pub discounted: bool,
}

impl ExitReceipt {
    /// Unrounded fare as stored on the ticket
    pub fn price(&self) -> f64 {
        self.ticket.price.unwrap_or(0.0)
    }

    /// Fare rounded to cents for display
    pub fn amount_due(&self) -> f64 {
        round_to_cents(self.price())
    }
}

pub struct ParkingService {
    storage: Arc<dyn Storage>,
    allocator: SpotAllocator,
    fares: FareCalculator,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
}

impl ParkingService {
    pub fn new(
        fares: FareCalculator,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let allocator = SpotAllocator::new(storage.clone());
        Self { storage, allocator, fares, clock, metrics }
    }

    pub fn from_config(
        config: &Config,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self::new(FareCalculator::from_config(config), storage, clock, metrics)
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Ask for the vehicle type and find a spot for it, without reserving
    pub fn next_parking_spot(
        &self,
        input: &mut dyn InputSource,
    ) -> Result<(ParkingType, Option<ParkingSpot>), ParkingError> {
        let selection = input.read_category_selection()?;
        let category = ParkingType::from_selection(selection)?;
        let spot = self.allocator.next_available(category)?;
        Ok((category, spot))
    }

    /// Entry driven by operator input: vehicle type first, then plate
    pub fn process_incoming_vehicle(
        &self,
        input: &mut dyn InputSource,
    ) -> Result<EntryOutcome, ParkingError> {
        let (category, spot) = self.next_parking_spot(input)?;
        let Some(spot) = spot else {
            return Ok(self.lot_full(category));
        };

        let plate = input.read_plate()?;
        let plate = normalize_plate(&plate)?;
        self.park_in(spot, plate).map(EntryOutcome::Parked)
    }

    /// Entry for a known vehicle type and plate
    pub fn park_vehicle(&self, category: ParkingType, plate: &str) -> Result<EntryOutcome, ParkingError> {
        let plate = normalize_plate(plate)?;
        match self.allocator.next_available(category)? {
            Some(spot) => self.park_in(spot, plate).map(EntryOutcome::Parked),
            None => Ok(self.lot_full(category)),
        }
    }

    fn lot_full(&self, category: ParkingType) -> EntryOutcome {
        self.metrics.record_lot_full();
        warn!(category = %category, "lot_full");
        EntryOutcome::LotFull { category }
    }

    fn park_in(&self, mut spot: ParkingSpot, plate: &str) -> Result<EntryReceipt, ParkingError> {
        if self.storage.load_open_ticket(plate)?.is_some() {
            return Err(ParkingError::VehicleAlreadyParked { plate: plate.to_string() });
        }
        let prior_tickets = self.storage.count_prior_tickets(plate)?;

        self.storage.set_spot_availability(spot.id, false)?;
        spot.available = false;

        let mut ticket = Ticket::open(spot, plate, self.clock.now());
        match self.storage.save_ticket(&ticket) {
            Ok(id) => ticket.id = Some(id),
            Err(e) => {
                self.metrics.record_failed_ticket_save();
                error!(plate = %plate, spot_id = %spot.id, error = %e, "ticket_create_failed");
                if let Err(release_err) = self.storage.set_spot_availability(spot.id, true) {
                    error!(spot_id = %spot.id, error = %release_err, "spot_release_failed");
                }
                return Err(e.into());
            }
        }

        let recurring_user = prior_tickets > 0;
        if recurring_user {
            info!(plate = %plate, prior_tickets = %prior_tickets, "recurring_user");
        }
        self.metrics.record_vehicle_parked(recurring_user);

        info!(
            plate = %plate,
            spot_id = %spot.id,
            category = %spot.category,
            in_time = %ticket.in_time.to_rfc3339(),
            "vehicle_parked"
        );

        Ok(EntryReceipt { ticket, recurring_user })
    }

    /// Exit driven by operator input
    pub fn process_exiting_vehicle(&self, input: &mut dyn InputSource) -> Result<ExitReceipt, ParkingError> {
        let plate = input.read_plate()?;
        self.exit_vehicle(&plate)
    }

    /// Close the plate's open ticket, price it and release the spot
    pub fn exit_vehicle(&self, plate: &str) -> Result<ExitReceipt, ParkingError> {
        let plate = normalize_plate(plate)?;
        let mut ticket = self
            .storage
            .load_open_ticket(plate)?
            .ok_or_else(|| ParkingError::NoOpenTicket { plate: plate.to_string() })?;

        let out_time = self.clock.now();
        let discounted = self.storage.count_prior_tickets(plate)? > 0;
        let price = self.fares.calculate(ticket.in_time, Some(out_time), ticket.spot.category, discounted)?;
        ticket.close(out_time, price);

        if let Err(e) = self.storage.save_ticket(&ticket) {
            self.metrics.record_failed_ticket_save();
            error!(plate = %plate, spot_id = %ticket.spot.id, error = %e, "ticket_update_failed");
            return Err(e.into());
        }

        if let Err(e) = self.storage.set_spot_availability(ticket.spot.id, true) {
            // Ticket is already closed; the spot needs manual release
            error!(plate = %plate, spot_id = %ticket.spot.id, error = %e, "spot_release_failed");
            return Err(e.into());
        }
        ticket.spot.available = true;
        self.metrics.record_vehicle_exited(price, discounted);

        info!(
            plate = %plate,
            spot_id = %ticket.spot.id,
            minutes = %ticket.parked_minutes(out_time),
            price = %format!("{:.2}", round_to_cents(price)),
            discounted = %discounted,
            "vehicle_exited"
        );

        Ok(ExitReceipt { ticket, discounted })
    }
}

fn normalize_plate(plate: &str) -> Result<&str, ParkingError> {
    let plate = plate.trim();
    if plate.is_empty() {
        debug!("empty_plate_rejected");
        return Err(ParkingError::InvalidInput("registration number is empty".to_string()));
    }
    Ok(plate)
}
