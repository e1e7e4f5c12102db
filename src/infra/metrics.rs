//! Lock-free metrics collection and reporting
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only and must not drive allocation or billing decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters for the parking flow
pub struct Metrics {
    vehicles_parked: AtomicU64,
    vehicles_exited: AtomicU64,
    recurring_entries: AtomicU64,
    discounted_exits: AtomicU64,
    lot_full: AtomicU64,
    failed_ticket_saves: AtomicU64,
    /// Sum of fares, rounded to cents per exit
    revenue_cents: AtomicU64,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            vehicles_parked: AtomicU64::new(0),
            vehicles_exited: AtomicU64::new(0),
            recurring_entries: AtomicU64::new(0),
            discounted_exits: AtomicU64::new(0),
            lot_full: AtomicU64::new(0),
            failed_ticket_saves: AtomicU64::new(0),
            revenue_cents: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    #[inline]
    pub fn record_vehicle_parked(&self, recurring: bool) {
        self.vehicles_parked.fetch_add(1, Ordering::Relaxed);
        if recurring {
            self.recurring_entries.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_vehicle_exited(&self, price: f64, discounted: bool) {
        self.vehicles_exited.fetch_add(1, Ordering::Relaxed);
        if discounted {
            self.discounted_exits.fetch_add(1, Ordering::Relaxed);
        }
        let cents = (price.max(0.0) * 100.0).round() as u64;
        self.revenue_cents.fetch_add(cents, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_lot_full(&self) {
        self.lot_full.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failed_ticket_save(&self) {
        self.failed_ticket_saves.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters (non-resetting)
    pub fn report(&self) -> MetricsSummary {
        MetricsSummary {
            uptime_secs: self.started_at.elapsed().as_secs(),
            vehicles_parked: self.vehicles_parked.load(Ordering::Relaxed),
            vehicles_exited: self.vehicles_exited.load(Ordering::Relaxed),
            recurring_entries: self.recurring_entries.load(Ordering::Relaxed),
            discounted_exits: self.discounted_exits.load(Ordering::Relaxed),
            lot_full: self.lot_full.load(Ordering::Relaxed),
            failed_ticket_saves: self.failed_ticket_saves.load(Ordering::Relaxed),
            revenue_cents: self.revenue_cents.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub vehicles_parked: u64,
    pub vehicles_exited: u64,
    pub recurring_entries: u64,
    pub discounted_exits: u64,
    pub lot_full: u64,
    pub failed_ticket_saves: u64,
    pub revenue_cents: u64,
}

impl MetricsSummary {
    /// Vehicles currently inside according to the counters
    pub fn occupancy(&self) -> u64 {
        self.vehicles_parked.saturating_sub(self.vehicles_exited)
    }

    pub fn log(&self) {
        info!(
            uptime_secs = %self.uptime_secs,
            parked = %self.vehicles_parked,
            exited = %self.vehicles_exited,
            occupancy = %self.occupancy(),
            recurring = %self.recurring_entries,
            discounted = %self.discounted_exits,
            lot_full = %self.lot_full,
            failed_saves = %self.failed_ticket_saves,
            revenue = %format!("{:.2}", self.revenue_cents as f64 / 100.0),
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let summary = Metrics::new().report();
        assert_eq!(summary.vehicles_parked, 0);
        assert_eq!(summary.revenue_cents, 0);
        assert_eq!(summary.occupancy(), 0);
    }

    #[test]
    fn test_record_flow() {
        let metrics = Metrics::new();
        metrics.record_vehicle_parked(false);
        metrics.record_vehicle_parked(true);
        metrics.record_vehicle_exited(0.48, true);
        metrics.record_lot_full();

        let summary = metrics.report();
        assert_eq!(summary.vehicles_parked, 2);
        assert_eq!(summary.recurring_entries, 1);
        assert_eq!(summary.vehicles_exited, 1);
        assert_eq!(summary.discounted_exits, 1);
        assert_eq!(summary.lot_full, 1);
        assert_eq!(summary.occupancy(), 1);
        assert_eq!(summary.revenue_cents, 48);
    }

    #[test]
    fn test_revenue_accumulates_per_exit() {
        let metrics = Metrics::new();
        metrics.record_vehicle_exited(0.75, false);
        metrics.record_vehicle_exited(0.0, false);
        metrics.record_vehicle_exited(1.5, false);
        assert_eq!(metrics.report().revenue_cents, 225);
    }
}
