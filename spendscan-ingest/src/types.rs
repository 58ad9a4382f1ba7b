use serde::{Deserialize, Serialize};
use spendscan_core::ParseError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Charges are printed positive; they are stored as debits.
    CreditCard,
    #[default]
    BankAccount,
}

/// Printed amount plus where its sign comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountText {
    /// Sign (if any) is part of the text
    Signed(String),
    /// Sat in the debit / paid-out column
    Debit(String),
    /// Sat in the credit / paid-in column
    Credit(String),
}

impl AmountText {
    pub fn text(&self) -> &str {
        match self {
            AmountText::Signed(s) | AmountText::Debit(s) | AmountText::Credit(s) => s,
        }
    }
}

/// A candidate transaction row as printed, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// 1-based page number
    pub page: usize,
    /// 1-based line number within the page
    pub line: usize,
    pub date: String,
    /// Empty for running-balance-only rows
    pub description: String,
    pub amount: AmountText,
    /// Currency symbol or code printed on the row, if any
    pub currency_hint: Option<String>,
    /// Row text; continuation lines are appended with '\n'
    pub raw_line: String,
}

impl LineItem {
    pub fn append_continuation(&mut self, line: &str) {
        let text = line.trim();
        if text.is_empty() {
            return;
        }
        if !self.description.is_empty() {
            self.description.push(' ');
        }
        self.description.push_str(text);
        self.raw_line.push('\n');
        self.raw_line.push_str(line.trim_end());
    }
}

/// Cooperative stop signal for a running parse, checked between lines and
/// rows. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Parser output in document order: recognized rows and rejected candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Row(LineItem),
    Rejected(ParseError),
}
