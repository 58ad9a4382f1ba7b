//! UK current account with separate "Paid out" / "Paid in" columns.
//!
//!   Date        Description                Paid out     Paid in     Balance
//!   02/04/2024  TESCO STORES 2231             23.45                  976.55
//!   03/04/2024  SALARY ACME LTD                          1,500.00   2,476.55
//!
//! Amounts are unsigned; the column they sit under gives the sign.

use spendscan_core::{DateOrder, NumberFormat};

use super::strings;
use crate::layout::{ColumnSpec, LayoutSpec};
use crate::types::StatementKind;

pub fn spec() -> LayoutSpec {
    LayoutSpec {
        id: "uk_current_account".to_string(),
        name: "UK current account".to_string(),
        kind: StatementKind::BankAccount,
        anchors: strings(&[r"(?i)current\s+account", r"(?i)paid\s+out"]),
        header_window: 40,
        section_start: Some(r"(?i)\bdate\b.*\bpaid\s+out\b.*\bpaid\s+in\b".to_string()),
        section_end: Some(r"(?i)^\s*closing\s+balance\b".to_string()),
        ignore: strings(&[
            r"(?i)balance\s+(brought|carried)\s+forward",
            r"(?i)opening\s+balance",
            r"(?i)^\s*page\s+\d+",
        ]),
        row_start: r"^\s*(?:\d{2}/\d{2}/\d{4}|\d{1,2}\s+[A-Z][a-z]{2}\s+\d{4})\s".to_string(),
        row: concat!(
            r"^\s*(?P<date>\d{2}/\d{2}/\d{4}|\d{1,2}\s+[A-Z][a-z]{2}\s+\d{4})\s+",
            r"(?:(?P<desc>.+?)\s+)?",
            r"(?P<amount>\d[\d,.]*)\s+",
            r"(?P<balance>-?\d[\d,.]*)\s*$"
        )
        .to_string(),
        columns: Some(ColumnSpec {
            debit_header: r"(?i)paid\s+out".to_string(),
            credit_header: r"(?i)paid\s+in".to_string(),
        }),
        date_formats: strings(&["%d/%m/%Y", "%d %b %Y"]),
        date_order: Some(DateOrder::DayFirst),
        period: None,
        account: Some(r"(?i)account\s+number\s*:?\s*(?P<number>\d[\d -]{3,}\d)".to_string()),
        number_format: NumberFormat::us(),
        currency: "GBP".to_string(),
        fraction_digits: None,
    }
}
