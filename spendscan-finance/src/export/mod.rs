//! Expense set -> CSV text or XLSX bytes. Both encoders are deterministic:
//! same records and money policy, same output.

pub mod csv;
pub mod xlsx;

use thiserror::Error;

pub use self::csv::{read_csv, write_csv};
pub use self::xlsx::write_xlsx;

/// Column order shared by both encoders.
pub const COLUMNS: [&str; 7] = [
    "date",
    "description",
    "amount",
    "currency",
    "category",
    "source_account",
    "source_file",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("unexpected CSV header: expected {expected}, found {found}")]
    Header { expected: String, found: String },
    #[error("row {row}: invalid {field}: {reason}")]
    Row {
        row: usize,
        field: &'static str,
        reason: String,
    },
    #[error("amount {0} cannot be written as a spreadsheet number")]
    Amount(String),
}
