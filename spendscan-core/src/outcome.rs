//! Per-file parse outcomes and the batch summary built from them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::expense::ExpenseRecord;

/// Layout id reported when no registered layout matched.
pub const UNKNOWN_FORMAT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Not a PDF, encrypted, or no text layer. Terminal for the file.
    #[serde(rename = "unreadable_pdf")]
    UnreadablePdf,
    UnknownFormat,
    MalformedAmount,
    AmbiguousDate,
    MalformedLine,
    Timeout,
    Cancelled,
    ValidationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnreadablePdf => "unreadable_pdf",
            ErrorKind::UnknownFormat => "unknown_format",
            ErrorKind::MalformedAmount => "malformed_amount",
            ErrorKind::AmbiguousDate => "ambiguous_date",
            ErrorKind::MalformedLine => "malformed_line",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::ValidationError => "validation_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub line_context: Option<String>,
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line_context: None,
        }
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line_context = Some(line.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Success,
    Partial,
    Failed,
}

/// Everything recovered from one input file.
///
/// Fields are read-only outside this module so `status` always agrees with
/// `records`/`errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    source_file: String,
    status: ParseStatus,
    records: Vec<ExpenseRecord>,
    errors: Vec<ParseError>,
    detected_format: String,
}

impl ParseResult {
    /// Derive the status from what was recovered:
    /// no errors -> success, records and errors -> partial, only errors -> failed.
    pub fn from_parts(
        source_file: impl Into<String>,
        detected_format: impl Into<String>,
        records: Vec<ExpenseRecord>,
        errors: Vec<ParseError>,
    ) -> Self {
        let status = match (records.is_empty(), errors.is_empty()) {
            (_, true) => ParseStatus::Success,
            (false, false) => ParseStatus::Partial,
            (true, false) => ParseStatus::Failed,
        };
        Self {
            source_file: source_file.into(),
            status,
            records,
            errors,
            detected_format: detected_format.into(),
        }
    }

    /// A terminal failure: no records, exactly one error.
    pub fn failed(source_file: impl Into<String>, detected_format: impl Into<String>, error: ParseError) -> Self {
        Self::from_parts(source_file, detected_format, Vec::new(), vec![error])
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn status(&self) -> ParseStatus {
        self.status
    }

    pub fn records(&self) -> &[ExpenseRecord] {
        &self.records
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn detected_format(&self) -> &str {
        &self.detected_format
    }

    pub fn into_records(self) -> Vec<ExpenseRecord> {
        self.records
    }

    /// Kind of the first error, handy for asserting terminal failures.
    pub fn first_error_kind(&self) -> Option<ErrorKind> {
        self.errors.first().map(|e| e.kind)
    }
}

/// Counts and totals across all files of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub total_records: usize,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub net: Decimal,
}

impl BatchSummary {
    pub fn from_results(results: &[ParseResult]) -> Self {
        let mut summary = BatchSummary {
            total_files: results.len(),
            succeeded: 0,
            partial: 0,
            failed: 0,
            total_records: 0,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            net: Decimal::ZERO,
        };

        for result in results {
            match result.status() {
                ParseStatus::Success => summary.succeeded += 1,
                ParseStatus::Partial => summary.partial += 1,
                ParseStatus::Failed => summary.failed += 1,
            }
            summary.total_records += result.records().len();
            for record in result.records() {
                if record.amount.is_sign_negative() {
                    summary.total_debit += record.amount;
                } else {
                    summary.total_credit += record.amount;
                }
            }
        }
        summary.net = summary.total_debit + summary.total_credit;
        summary
    }
}
