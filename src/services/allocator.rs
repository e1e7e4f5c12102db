//! Spot allocation: picks the next free spot for a vehicle type
//!
//! The allocator only reads. Reserving the returned spot is a separate step
//! owned by the flow controller, so a failed ticket save never silently
//! consumes a spot.

use crate::domain::error::ParkingError;
use crate::domain::types::{ParkingSpot, ParkingType};
use crate::io::storage::Storage;
use std::sync::Arc;
use tracing::debug;

pub struct SpotAllocator {
    storage: Arc<dyn Storage>,
}

impl SpotAllocator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Lowest-numbered free spot of `category`, or `None` when the lot is full
    /// for that category
    pub fn next_available(&self, category: ParkingType) -> Result<Option<ParkingSpot>, ParkingError> {
        let spot = self.storage.find_next_free_spot(category)?;
        match spot {
            Some(spot) => debug!(category = %category, spot_id = %spot.id, "spot_found"),
            None => debug!(category = %category, "no_spot_available"),
        }
        Ok(spot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SpotId;
    use crate::infra::config::Config;
    use crate::io::storage::MemoryStore;

    fn create_allocator() -> (Arc<MemoryStore>, SpotAllocator) {
        let store = Arc::new(MemoryStore::new(Config::default().spot_inventory()));
        let allocator = SpotAllocator::new(store.clone());
        (store, allocator)
    }

    #[test]
    fn test_returns_lowest_free_spot() {
        let (_store, allocator) = create_allocator();

        let car = allocator.next_available(ParkingType::Car).unwrap().unwrap();
        assert_eq!(car.id, SpotId(1));
        assert!(car.available);

        let bike = allocator.next_available(ParkingType::Bike).unwrap().unwrap();
        assert_eq!(bike.id, SpotId(4));
        assert_eq!(bike.category, ParkingType::Bike);
    }

    #[test]
    fn test_does_not_reserve() {
        let (_store, allocator) = create_allocator();

        let first = allocator.next_available(ParkingType::Car).unwrap().unwrap();
        let second = allocator.next_available(ParkingType::Car).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_skips_occupied_spots() {
        let (store, allocator) = create_allocator();
        store.set_spot_availability(SpotId(1), false).unwrap();

        let spot = allocator.next_available(ParkingType::Car).unwrap().unwrap();
        assert_eq!(spot.id, SpotId(2));
    }

    #[test]
    fn test_full_category_returns_none() {
        let (store, allocator) = create_allocator();
        store.set_spot_availability(SpotId(4), false).unwrap();
        store.set_spot_availability(SpotId(5), false).unwrap();

        assert!(allocator.next_available(ParkingType::Bike).unwrap().is_none());
        // Other categories are unaffected
        assert!(allocator.next_available(ParkingType::Car).unwrap().is_some());
    }
}
