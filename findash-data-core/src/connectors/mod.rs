//! Concrete connector variants. Each owns its own I/O and record normalization.

pub mod csv;
pub mod google_sheets;

pub use self::csv::{CsvConnector, CsvSettings};
pub use self::google_sheets::{
    GoogleSheetsConnector, HttpSheetsApi, SheetSpec, SheetsApi, SheetsCredentials, SheetsSettings,
};
