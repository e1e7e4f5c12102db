//! Interactive console shell - the operator's three-option menu loop

use crate::domain::error::ParkingError;
use crate::domain::types::ParkingType;
use crate::infra::config::Config;
use crate::io::input::{ConsoleInput, InputSource};
use crate::services::parking::{EntryOutcome, EntryReceipt, ExitReceipt, ParkingService};
use anyhow::Context;
use std::io::{BufRead, Write};
use tracing::{debug, info};

const MENU: &str = "Please select an option. Simply enter the number to choose an action\n\
                    1 New Vehicle Entering - Allocate Parking Space\n\
                    2 Vehicle Exiting - Generate Ticket Price\n\
                    3 Shutdown System";

const UNSUPPORTED_OPTION: &str =
    "Unsupported option. Please enter a number corresponding to the provided menu";

/// Print the main menu
pub fn load_menu<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{MENU}")
}

pub struct InteractiveShell {
    service: ParkingService,
    discount_percent: f64,
    log_metrics_on_shutdown: bool,
}

impl InteractiveShell {
    pub fn new(service: ParkingService, config: &Config) -> Self {
        Self {
            service,
            discount_percent: config.loyalty_discount() * 100.0,
            log_metrics_on_shutdown: config.metrics_log_on_shutdown(),
        }
    }

    pub fn service(&self) -> &ParkingService {
        &self.service
    }

    /// Run the menu loop until the operator shuts down or input ends.
    ///
    /// Failed visits are reported to the operator and the loop carries on;
    /// only a broken console aborts it.
    ///
    /// # Errors
    ///
    /// Returns an error when reading from or writing to the console fails.
    pub fn run<R: BufRead, W: Write>(&self, console: &mut ConsoleInput<R, W>) -> anyhow::Result<()> {
        writeln!(console.writer(), "Welcome to Parking System!")?;
        info!("shell_started");

        loop {
            load_menu(console.writer())?;
            match console.read_menu_selection() {
                Ok(Some(1)) => self.handle_entry(console)?,
                Ok(Some(2)) => self.handle_exit(console)?,
                Ok(Some(3)) => {
                    writeln!(console.writer(), "Exiting from the system!")?;
                    break;
                }
                Ok(None) => {
                    debug!("input_closed");
                    break;
                }
                Ok(Some(option)) => {
                    debug!(option = %option, "unsupported_option");
                    writeln!(console.writer(), "{UNSUPPORTED_OPTION}")?;
                }
                Err(ParkingError::Console(e)) => {
                    return Err(e).context("Failed to read menu selection");
                }
                Err(e) => {
                    debug!(error = %e, "unsupported_option");
                    writeln!(console.writer(), "{UNSUPPORTED_OPTION}")?;
                }
            }
        }

        if self.log_metrics_on_shutdown {
            self.service.metrics().report().log();
        }
        info!("shell_stopped");
        Ok(())
    }

    fn handle_entry<R: BufRead, W: Write>(&self, console: &mut ConsoleInput<R, W>) -> anyhow::Result<()> {
        match self.service.process_incoming_vehicle(console) {
            Ok(EntryOutcome::Parked(receipt)) => self.print_entry(console.writer(), &receipt)?,
            Ok(EntryOutcome::LotFull { category }) => print_lot_full(console.writer(), category)?,
            Err(ParkingError::Console(e)) => return Err(e).context("Failed to read vehicle details"),
            Err(e) => writeln!(console.writer(), "Unable to process incoming vehicle: {e}")?,
        }
        Ok(())
    }

    fn handle_exit<R: BufRead, W: Write>(&self, console: &mut ConsoleInput<R, W>) -> anyhow::Result<()> {
        match self.service.process_exiting_vehicle(console) {
            Ok(receipt) => print_exit(console.writer(), &receipt)?,
            Err(ParkingError::Console(e)) => return Err(e).context("Failed to read vehicle details"),
            Err(e) => writeln!(console.writer(), "Unable to process exiting vehicle: {e}")?,
        }
        Ok(())
    }

    fn print_entry<W: Write>(&self, out: &mut W, receipt: &EntryReceipt) -> std::io::Result<()> {
        if receipt.recurring_user {
            writeln!(
                out,
                "Welcome back! As a recurring user of our parking lot, you'll benefit from a {}% discount.",
                self.discount_percent.round()
            )?;
        }
        writeln!(out, "Generated Ticket and saved in DB")?;
        writeln!(out, "Please park your vehicle in spot number: {}", receipt.spot().id)?;
        writeln!(
            out,
            "Recorded in-time for vehicle number: {} is: {}",
            receipt.ticket.plate,
            receipt.ticket.in_time.to_rfc3339()
        )
    }
}

fn print_lot_full<W: Write>(out: &mut W, category: ParkingType) -> std::io::Result<()> {
    writeln!(out, "No {category} spot available. Parking slots might be full")
}

fn print_exit<W: Write>(out: &mut W, receipt: &ExitReceipt) -> std::io::Result<()> {
    writeln!(out, "Please pay the parking fare: {:.2}", receipt.amount_due())?;
    if let Some(out_time) = receipt.ticket.out_time {
        writeln!(
            out,
            "Recorded out-time for vehicle number: {} is: {}",
            receipt.ticket.plate,
            out_time.to_rfc3339()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::metrics::Metrics;
    use crate::io::storage::MemoryStore;
    use crate::services::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use std::io::Cursor;
    use std::sync::Arc;

    fn create_test_shell() -> (InteractiveShell, Arc<ManualClock>) {
        let config = Config::default().without_ledger().with_spots(1, 1);
        let store = Arc::new(MemoryStore::from_config(&config).unwrap());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()));
        let service =
            ParkingService::from_config(&config, store, clock.clone(), Arc::new(Metrics::new()));
        (InteractiveShell::new(service, &config), clock)
    }

    fn run_script(shell: &InteractiveShell, script: &str) -> String {
        let mut console = ConsoleInput::new(Cursor::new(script.as_bytes().to_vec()), Vec::new());
        shell.run(&mut console).unwrap();
        String::from_utf8(console.into_writer()).unwrap()
    }

    #[test]
    fn test_load_menu() {
        let mut out = Vec::new();
        load_menu(&mut out).unwrap();

        let expected = "Please select an option. Simply enter the number to choose an action\n\
                        1 New Vehicle Entering - Allocate Parking Space\n\
                        2 Vehicle Exiting - Generate Ticket Price\n\
                        3 Shutdown System\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_shutdown_option_stops_loop() {
        let (shell, _) = create_test_shell();
        let out = run_script(&shell, "3\n1\n");

        assert!(out.contains("Exiting from the system!"));
        assert_eq!(out.matches("3 Shutdown System").count(), 1);
    }

    #[test]
    fn test_end_of_input_stops_loop() {
        let (shell, _) = create_test_shell();
        let out = run_script(&shell, "");
        assert_eq!(out.matches("3 Shutdown System").count(), 1);
    }

    #[test]
    fn test_unsupported_option() {
        let (shell, _) = create_test_shell();
        let out = run_script(&shell, "7\nabc\n3\n");
        assert_eq!(out.matches(UNSUPPORTED_OPTION).count(), 2);
    }

    #[test]
    fn test_entry_then_exit() {
        let (shell, clock) = create_test_shell();

        let entry = run_script(&shell, "1\n1\nABCDEF\n3\n");
        assert!(entry.contains("Please park your vehicle in spot number: 1"));
        assert!(!entry.contains("Welcome back!"));

        clock.advance(Duration::minutes(60));
        let exit = run_script(&shell, "2\nABCDEF\n3\n");
        assert!(exit.contains("Please pay the parking fare: 0.75"));
    }

    #[test]
    fn test_recurring_user_greeted() {
        let (shell, clock) = create_test_shell();
        run_script(&shell, "1\n1\nABCDEF\n");
        clock.advance(Duration::minutes(60));
        run_script(&shell, "2\nABCDEF\n");

        let out = run_script(&shell, "1\n1\nABCDEF\n");
        assert!(out.contains(
            "Welcome back! As a recurring user of our parking lot, you'll benefit from a 5% discount."
        ));
    }

    #[test]
    fn test_lot_full_reported() {
        let (shell, _) = create_test_shell();
        let out = run_script(&shell, "1\n1\nFIRST\n1\n1\n3\n");
        assert!(out.contains("No CAR spot available"));
        assert!(out.contains("Exiting from the system!"));
    }

    /// Fails a fixed number of reads, then serves `script`
    struct FlakyReader {
        failures_left: usize,
        script: Cursor<Vec<u8>>,
    }

    impl std::io::Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let available = self.fill_buf()?;
            let n = available.len().min(buf.len());
            buf[..n].copy_from_slice(&available[..n]);
            self.consume(n);
            Ok(n)
        }
    }

    impl BufRead for FlakyReader {
        fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "input/output error"));
            }
            self.script.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.script.consume(amt);
        }
    }

    #[test]
    fn test_console_read_failure_aborts_loop() {
        let (shell, _) = create_test_shell();
        let reader = FlakyReader { failures_left: 50, script: Cursor::new(b"3\n".to_vec()) };
        let mut console = ConsoleInput::new(reader, Vec::new());

        let result = shell.run(&mut console);

        assert!(result.is_err());
        let out = String::from_utf8(console.into_writer()).unwrap();
        assert_eq!(out.matches("3 Shutdown System").count(), 1);
        assert!(!out.contains(UNSUPPORTED_OPTION));
    }

    #[test]
    fn test_console_failure_during_entry_aborts_loop() {
        let (shell, _) = create_test_shell();
        // Terminal goes away while the vehicle type is being asked for
        let reader = FlakyReader { failures_left: 1, script: Cursor::new(Vec::new()) };
        let mut console = ConsoleInput::new(reader, Vec::new());

        assert!(shell.handle_entry(&mut console).is_err());
    }

    #[test]
    fn test_errors_reported_and_loop_continues() {
        let (shell, _) = create_test_shell();
        let out = run_script(&shell, "2\nUNKNOWN\n1\n9\n3\n");

        assert!(out.contains("Unable to process exiting vehicle"));
        assert!(out.contains("Unable to process incoming vehicle"));
        assert!(out.contains("Exiting from the system!"));
    }
}
