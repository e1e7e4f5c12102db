//! Services - business logic
//!
//! - `fare` - Fare computation (hourly rates, free period, loyalty discount)
//! - `allocator` - Next free spot lookup per vehicle type
//! - `clock` - Time source for ticket stamps
//! - `parking` - Entry/exit flow controller

pub mod allocator;
pub mod clock;
pub mod fare;
pub mod parking;

// Re-export commonly used types
pub use allocator::SpotAllocator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use fare::{round_to_cents, FareCalculator, RateTable};
pub use parking::{EntryOutcome, EntryReceipt, ExitReceipt, ParkingService};
