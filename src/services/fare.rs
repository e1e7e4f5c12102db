//! Fare calculation
//!
//! Duration is measured in whole minutes (truncated) and all free-period
//! arithmetic stays in integer minutes. Only the final multiplication by the
//! per-minute rate produces a float. Rounding to cents is a display concern,
//! see `round_to_cents`.

use crate::domain::error::ParkingError;
use crate::domain::ticket::Ticket;
use crate::domain::types::ParkingType;
use crate::infra::config::Config;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

/// Default hourly rate for cars
pub const CAR_RATE_PER_HOUR: f64 = 1.5;
/// Default hourly rate for bikes
pub const BIKE_RATE_PER_HOUR: f64 = 1.0;
/// Default free period at the start of every visit
pub const FREE_MINUTES: i64 = 30;
/// Default loyalty discount for recurring users (5%)
pub const LOYALTY_DISCOUNT: f64 = 0.05;
/// Default rate table entries
pub const DEFAULT_RATES: [(ParkingType, f64); 2] =
    [(ParkingType::Car, CAR_RATE_PER_HOUR), (ParkingType::Bike, BIKE_RATE_PER_HOUR)];

/// Hourly rate per vehicle type, immutable once built
#[derive(Debug, Clone)]
pub struct RateTable {
    rates: FxHashMap<ParkingType, f64>,
}

impl RateTable {
    pub fn new(rates: &[(ParkingType, f64)]) -> Self {
        Self { rates: rates.iter().copied().collect() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rates())
    }

    /// Hourly rate for a vehicle type
    pub fn rate_for(&self, category: ParkingType) -> Result<f64, ParkingError> {
        self.rates
            .get(&category)
            .copied()
            .ok_or_else(|| ParkingError::UnknownCategory(category.to_string()))
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(&DEFAULT_RATES)
    }
}

/// Pure fare computation: no storage, no clock
#[derive(Debug, Clone)]
pub struct FareCalculator {
    rates: RateTable,
    free_minutes: i64,
    discount_factor: f64,
}

impl FareCalculator {
    pub fn new(rates: RateTable, free_minutes: i64, loyalty_discount: f64) -> Self {
        Self { rates, free_minutes, discount_factor: 1.0 - loyalty_discount }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(RateTable::from_config(config), config.free_minutes(), config.loyalty_discount())
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Compute the fare for a visit.
    ///
    /// Fails with `InvalidDuration` when `out_time` is missing or precedes
    /// `in_time`, and with `UnknownCategory` when the rate table has no entry
    /// for `category`. Visits within the free period cost 0 without touching
    /// the rate table.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use parking_system::domain::types::ParkingType;
    /// use parking_system::services::fare::FareCalculator;
    ///
    /// let calc = FareCalculator::default();
    /// let in_time = Utc::now();
    /// let out_time = in_time + Duration::minutes(20);
    /// let fare = calc.calculate(in_time, Some(out_time), ParkingType::Car, false).unwrap();
    /// assert_eq!(fare, 0.0);
    /// ```
    pub fn calculate(
        &self,
        in_time: DateTime<Utc>,
        out_time: Option<DateTime<Utc>>,
        category: ParkingType,
        apply_discount: bool,
    ) -> Result<f64, ParkingError> {
        let out = match out_time {
            Some(out) if out >= in_time => out,
            _ => return Err(ParkingError::InvalidDuration { in_time, out_time }),
        };

        let elapsed_minutes = (out - in_time).num_minutes();
        if elapsed_minutes <= self.free_minutes {
            return Ok(0.0);
        }

        let payable_minutes = elapsed_minutes - self.free_minutes;
        let per_minute = self.rates.rate_for(category)? / 60.0;
        let base = payable_minutes as f64 * per_minute;

        Ok(if apply_discount { base * self.discount_factor } else { base })
    }

    /// Compute the fare for a ticket whose out time has been stamped
    pub fn calculate_ticket(&self, ticket: &Ticket, apply_discount: bool) -> Result<f64, ParkingError> {
        self.calculate(ticket.in_time, ticket.out_time, ticket.spot.category, apply_discount)
    }
}

impl Default for FareCalculator {
    fn default() -> Self {
        Self::new(RateTable::default(), FREE_MINUTES, LOYALTY_DISCOUNT)
    }
}

/// Round a fare to cents for display
#[inline]
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
