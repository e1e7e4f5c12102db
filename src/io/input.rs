//! Operator input - menu choices, vehicle type and registration plate

use crate::domain::error::ParkingError;
use std::io::{BufRead, Write};
use tracing::debug;

/// Source of operator answers consumed by the parking flow
pub trait InputSource {
    /// Main menu choice; `None` once the input is closed
    fn read_menu_selection(&mut self) -> Result<Option<i64>, ParkingError>;

    /// Raw vehicle type choice (1 = car, 2 = bike)
    fn read_category_selection(&mut self) -> Result<i64, ParkingError>;

    /// Vehicle registration number, trimmed and non-empty
    fn read_plate(&mut self) -> Result<String, ParkingError>;
}

/// Line-oriented console input that writes its own prompts
pub struct ConsoleInput<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> ConsoleInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Writer the prompts go to, for callers printing their own output
    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the input, handing back the prompt writer
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn prompt(&mut self, text: &str) -> Result<(), ParkingError> {
        writeln!(self.writer, "{text}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Next line without its terminator; `None` at end of input
    fn next_line(&mut self) -> Result<Option<String>, ParkingError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn parse_selection(line: &str) -> Result<i64, ParkingError> {
        line.parse::<i64>().map_err(|_| {
            debug!(input = %line, "selection_not_a_number");
            ParkingError::InvalidInput(format!("'{line}' is not a number"))
        })
    }
}

fn input_closed() -> ParkingError {
    ParkingError::InvalidInput("input closed".to_string())
}

impl<R: BufRead, W: Write> InputSource for ConsoleInput<R, W> {
    fn read_menu_selection(&mut self) -> Result<Option<i64>, ParkingError> {
        match self.next_line()? {
            Some(line) => Self::parse_selection(&line).map(Some),
            None => Ok(None),
        }
    }

    fn read_category_selection(&mut self) -> Result<i64, ParkingError> {
        self.prompt("Please select vehicle type from menu\n1 CAR\n2 BIKE")?;
        let line = self.next_line()?.ok_or_else(input_closed)?;
        Self::parse_selection(&line)
    }

    fn read_plate(&mut self) -> Result<String, ParkingError> {
        self.prompt("Please type the vehicle registration number and press enter key")?;
        let plate = self.next_line()?.ok_or_else(input_closed)?;
        if plate.is_empty() {
            return Err(ParkingError::InvalidInput("registration number is empty".to_string()));
        }
        Ok(plate)
    }
}
