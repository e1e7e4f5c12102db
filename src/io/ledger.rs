//! Ticket ledger - append-only JSONL log of ticket saves
//!
//! Each save writes one full ticket snapshot per line. Replaying the file
//! (last snapshot per ticket id wins) rebuilds ticket history after a restart.

use crate::domain::ticket::Ticket;
use anyhow::Context;
use rustc_hash::FxHashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct TicketLedger {
    file_path: PathBuf,
}

impl TicketLedger {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        info!(file_path = %file_path.display(), "ledger_initialized");
        Self { file_path }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Append a ticket snapshot
    pub fn append(&self, ticket: &Ticket) -> std::io::Result<()> {
        let line = serde_json::to_string(ticket)?;

        // Create parent directories if they don't exist
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.file_path)?;
        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path.display(), bytes = %line.len(), "ledger_written");

        Ok(())
    }

    /// Replay the ledger: latest snapshot of every ticket, in first-seen order.
    ///
    /// A missing file is an empty ledger. Lines that fail to parse, or that
    /// carry no ticket id, are skipped with a warning.
    pub fn replay(&self) -> anyhow::Result<Vec<Ticket>> {
        let file = match fs::File::open(&self.file_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to open ticket ledger {}", self.file_path.display())
                })
            }
        };

        let mut tickets: Vec<Ticket> = Vec::new();
        // ticket id -> position in `tickets`
        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        let mut skipped = 0usize;

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| {
                format!("Failed to read ticket ledger {}", self.file_path.display())
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let ticket: Ticket = match serde_json::from_str(&line) {
                Ok(ticket) => ticket,
                Err(e) => {
                    warn!(line = %(line_no + 1), error = %e, "ledger_line_invalid");
                    skipped += 1;
                    continue;
                }
            };
            let Some(id) = ticket.id.clone() else {
                warn!(line = %(line_no + 1), "ledger_line_missing_id");
                skipped += 1;
                continue;
            };

            match index.get(&id) {
                Some(&idx) => tickets[idx] = ticket,
                None => {
                    index.insert(id, tickets.len());
                    tickets.push(ticket);
                }
            }
        }

        info!(
            file = %self.file_path.display(),
            tickets = %tickets.len(),
            skipped = %skipped,
            "ledger_replayed"
        );
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::new_ticket_id;
    use crate::domain::types::{ParkingSpot, ParkingType, SpotId};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn create_ticket(plate: &str) -> Ticket {
        let in_time = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let spot = ParkingSpot::new(SpotId(1), ParkingType::Car, false);
        let mut ticket = Ticket::open(spot, plate, in_time);
        ticket.id = Some(new_ticket_id());
        ticket
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let ledger = TicketLedger::new(dir.path().join("tickets.jsonl"));
        assert!(ledger.replay().unwrap().is_empty());
    }

    #[test]
    fn test_append_writes_one_line_per_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tickets.jsonl");
        let ledger = TicketLedger::new(&path);

        ledger.append(&create_ticket("AAA")).unwrap();
        ledger.append(&create_ticket("BBB")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));
        for line in content.lines() {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(parsed["spot"]["category"], "CAR");
        }
    }

    #[test]
    fn test_replay_keeps_latest_snapshot() {
        let dir = tempdir().unwrap();
        let ledger = TicketLedger::new(dir.path().join("tickets.jsonl"));

        let mut ticket = create_ticket("ABCDEF");
        ledger.append(&ticket).unwrap();
        let other = create_ticket("XYZ");
        ledger.append(&other).unwrap();

        ticket.close(ticket.in_time + Duration::hours(1), 0.75);
        ledger.append(&ticket).unwrap();

        let replayed = ledger.replay().unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].plate, "ABCDEF");
        assert_eq!(replayed[0].price, Some(0.75));
        assert!(!replayed[0].is_open());
        assert!(replayed[1].is_open());
    }

    #[test]
    fn test_replay_large_ledger_keeps_order() {
        let dir = tempdir().unwrap();
        let ledger = TicketLedger::new(dir.path().join("tickets.jsonl"));

        let mut tickets: Vec<Ticket> = (0..2_000).map(|n| create_ticket(&format!("P{n}"))).collect();
        for ticket in &tickets {
            ledger.append(ticket).unwrap();
        }
        for ticket in tickets.iter_mut().step_by(2) {
            ticket.close(ticket.in_time + Duration::hours(1), 0.75);
            ledger.append(ticket).unwrap();
        }

        let replayed = ledger.replay().unwrap();
        assert_eq!(replayed.len(), tickets.len());
        assert_eq!(replayed, tickets);
    }

    #[test]
    fn test_replay_skips_invalid_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tickets.jsonl");
        let ledger = TicketLedger::new(&path);
        ledger.append(&create_ticket("ABCDEF")).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();

        let mut no_id = create_ticket("NOID");
        no_id.id = None;
        writeln!(file, "{}", serde_json::to_string(&no_id).unwrap()).unwrap();

        let replayed = ledger.replay().unwrap();
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].plate, "ABCDEF");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("dir").join("tickets.jsonl");
        let ledger = TicketLedger::new(&nested);

        ledger.append(&create_ticket("ABCDEF")).unwrap();
        assert!(nested.exists());
    }
}
