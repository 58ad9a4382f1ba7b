//! Chase checking (debit) statement.
//!
//! Expected extracted-text section:
//!   TRANSACTION DETAIL
//!          DATE        DESCRIPTION                                     AMOUNT     BALANCE
//!          04/22       Discover     E-Payment 8148   Web ID: ...       -15.00      53.70
//!
//! Rows are MM/DD; the year comes from the "March 30, 2024 through April 29, 2024" line.

use spendscan_core::{DateOrder, NumberFormat};

use super::strings;
use crate::layout::{LayoutSpec, PeriodSpec};
use crate::types::StatementKind;

pub fn spec() -> LayoutSpec {
    LayoutSpec {
        id: "chase_checking".to_string(),
        name: "Chase checking".to_string(),
        kind: StatementKind::BankAccount,
        anchors: strings(&[r"(?i)\bchase\b", r"(?i)checking\s+summary"]),
        header_window: 40,
        section_start: Some(r"(?i)transaction\s+detail".to_string()),
        section_end: Some(r"(?i)^\s*ending\s+balance\b".to_string()),
        ignore: strings(&[
            r"(?i)^\s*date\s+description\s+amount\s+balance\s*$",
            r"(?i)^\s*beginning\s+balance\b",
            r"(?i)page\s+\d+\s+of\s+\d+",
        ]),
        row_start: r"^\s*\d{2}/\d{2}\s".to_string(),
        // DATE DESCRIPTION AMOUNT BALANCE
        row: concat!(
            r"^\s*(?P<date>\d{2}/\d{2})\s+",
            r"(?:(?P<desc>.+?)\s+)?",
            r"(?P<amount>-?\$?\d[\d,.]*)\s+",
            r"(?P<balance>-?\$?\d[\d,.]*)\s*$"
        )
        .to_string(),
        columns: None,
        date_formats: strings(&["%m/%d"]),
        date_order: Some(DateOrder::MonthFirst),
        period: Some(PeriodSpec {
            pattern: r"(?P<start>[A-Z][a-z]+ \d{1,2}, \d{4})\s+through\s+(?P<end>[A-Z][a-z]+ \d{1,2}, \d{4})"
                .to_string(),
            formats: strings(&["%B %d, %Y", "%b %d, %Y"]),
        }),
        account: Some(r"(?i)account\s+number:?\s*(?P<number>\d[\d ]{3,}\d)".to_string()),
        number_format: NumberFormat::us(),
        currency: "USD".to_string(),
        fraction_digits: None,
    }
}
