//! Row rule driven by a registered layout's patterns.

use regex::Captures;

use super::{char_offset, malformed_line, ColumnOffsets, RowMatch, RowRule};
use crate::layout::Layout;
use crate::types::{AmountText, LineItem};

pub struct LayoutRule<'a> {
    layout: &'a Layout,
}

impl<'a> LayoutRule<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    fn amount(&self, caps: &Captures<'_>, line: &str, columns: Option<&ColumnOffsets>) -> Result<AmountText, String> {
        if let Some(m) = caps.name("amount") {
            let text = m.as_str().trim().to_string();
            if self.layout.columns.is_none() {
                return Ok(AmountText::Signed(text));
            }
            let Some(cols) = columns else {
                return Err("amount column unknown: no column header before this row".to_string());
            };
            let end = char_offset(line, m.end()) as i64;
            let to_debit = (end - cols.debit_end as i64).abs();
            let to_credit = (end - cols.credit_end as i64).abs();
            return Ok(if to_debit <= to_credit {
                AmountText::Debit(text)
            } else {
                AmountText::Credit(text)
            });
        }

        let debit = caps.name("debit").map(|m| m.as_str().trim()).filter(|s| !s.is_empty());
        let credit = caps.name("credit").map(|m| m.as_str().trim()).filter(|s| !s.is_empty());
        match (debit, credit) {
            (Some(d), None) => Ok(AmountText::Debit(d.to_string())),
            (None, Some(c)) => Ok(AmountText::Credit(c.to_string())),
            (Some(_), Some(_)) => Err("amount in both debit and credit columns".to_string()),
            (None, None) => Err("no amount in debit or credit column".to_string()),
        }
    }
}

impl RowRule for LayoutRule<'_> {
    fn is_candidate(&self, line: &str) -> bool {
        self.layout.row_start.is_match(line)
    }

    fn match_row(&self, line: &str, columns: Option<&ColumnOffsets>) -> RowMatch {
        let Some(caps) = self.layout.row.captures(line) else {
            return RowMatch::Malformed(malformed_line(
                format!("line does not match the {} row layout", self.layout.id()),
                line,
            ));
        };

        let amount = match self.amount(&caps, line, columns) {
            Ok(a) => a,
            Err(message) => return RowMatch::Malformed(malformed_line(message, line)),
        };
        let group = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());

        RowMatch::Item(LineItem {
            page: 0,
            line: 0,
            date: caps["date"].trim().to_string(),
            description: group("desc").unwrap_or_default(),
            amount,
            currency_hint: None,
            raw_line: line.to_string(),
        })
    }
}
