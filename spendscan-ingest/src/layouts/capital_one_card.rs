//! Capital One US credit card statement.
//!
//! Expected text rows after PDF-to-text:
//!   Trans Date     Post Date      Description                                         Amount
//!   Jul 20         Jul 22         H-E-B #455SAN MARCOSTX                                $5.82
//!   Jul 28         Jul 29         WALMART.COMWALMART.COMAR                            - $14.05
//!
//! Charges print positive and credits carry a leading `-`; the statement kind
//! flips both so charges are stored as debits.

use spendscan_core::{DateOrder, NumberFormat};

use super::strings;
use crate::layout::{LayoutSpec, PeriodSpec};
use crate::types::StatementKind;

const HEADER: &str = r"Trans\s+Date\s+Post\s+Date\s+Description\s+Amount";

pub fn spec() -> LayoutSpec {
    LayoutSpec {
        id: "capital_one_card".to_string(),
        name: "Capital One credit card".to_string(),
        kind: StatementKind::CreditCard,
        anchors: strings(&[r"(?i)capital\s*one", HEADER]),
        header_window: 80,
        section_start: Some(HEADER.to_string()),
        section_end: Some(r"(?i)^\s*total\s+(transactions|fees|interest)\b".to_string()),
        ignore: strings(&[r"(?i)page\s+\d+\s+of\s+\d+", r"#\d{4}:\s"]),
        row_start: r"^\s*[A-Z][a-z]{2}\s+\d{1,2}\s".to_string(),
        row: concat!(
            r"^\s*(?P<date>[A-Za-z]{3}\s+\d{1,2})\s+",
            r"(?P<post_date>[A-Za-z]{3}\s+\d{1,2})\s+",
            r"(?P<desc>.+?)\s+",
            r"(?P<amount>-?\s*\$\s*\d[\d,.]*)\s*$"
        )
        .to_string(),
        columns: None,
        date_formats: strings(&["%b %d"]),
        date_order: Some(DateOrder::MonthFirst),
        period: Some(PeriodSpec {
            pattern: r"(?P<start>[A-Z][a-z]{2} \d{1,2}, \d{4})\s*-\s*(?P<end>[A-Z][a-z]{2} \d{1,2}, \d{4})".to_string(),
            formats: strings(&["%b %d, %Y"]),
        }),
        account: Some(r"(?i)ending\s+in\s+(?P<number>\d{4})".to_string()),
        number_format: NumberFormat::us(),
        currency: "USD".to_string(),
        fraction_digits: None,
    }
}
