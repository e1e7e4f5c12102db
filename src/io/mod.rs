//! IO modules - operator console and persistence
//!
//! - `input` - Operator answers (menu, vehicle type, plate)
//! - `shell` - Interactive menu loop
//! - `storage` - Spot and ticket storage interface, in-memory store
//! - `ledger` - Ticket snapshots to file (JSONL format)

pub mod input;
pub mod ledger;
pub mod shell;
pub mod storage;

// Re-export commonly used types
pub use input::{ConsoleInput, InputSource};
pub use ledger::TicketLedger;
pub use shell::InteractiveShell;
pub use storage::{MemoryStore, Storage};
