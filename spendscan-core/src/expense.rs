//! Canonical expense record shared by every stage after normalization.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One normalized transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub date: NaiveDate,
    /// Merchant text as printed, continuation lines joined with a space
    pub description: String,
    /// Negative = debit, positive = credit. Fixed-point, already rounded.
    pub amount: Decimal,
    pub currency: String,
    pub category: Option<String>,
    pub source_account: Option<String>,
    pub source_file: String,
    /// Statement text the record came from; absent for records built from JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_line: Option<String>,
}

impl ExpenseRecord {
    pub fn is_debit(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn is_credit(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Category label used for grouping; nulls land in `uncategorized`.
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

pub const UNCATEGORIZED: &str = "uncategorized";
