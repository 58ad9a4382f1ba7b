//! RFC 4180 CSV: quote only when needed, CRLF line ends, header always present.

use ::csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use spendscan_core::money::in_range;
use spendscan_core::{ExpenseRecord, MoneyPolicy};
use std::str::FromStr;

use super::{ExportError, COLUMNS};

pub fn write_csv(records: &[ExpenseRecord], money: &MoneyPolicy) -> Result<String, ExportError> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    wtr.write_record(COLUMNS)?;
    for r in records {
        wtr.write_record([
            r.date.format("%Y-%m-%d").to_string().as_str(),
            r.description.as_str(),
            money.format(r.amount).as_str(),
            r.currency.as_str(),
            r.category.as_deref().unwrap_or(""),
            r.source_account.as_deref().unwrap_or(""),
            r.source_file.as_str(),
        ])?;
    }

    let bytes = wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn optional(field: &str) -> Option<String> {
    if field.is_empty() { None } else { Some(field.to_string()) }
}

/// Read a file produced by `write_csv` back into records (without `raw_line`).
pub fn read_csv(text: &str) -> Result<Vec<ExpenseRecord>, ExportError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    if !headers.iter().eq(COLUMNS.iter().copied()) {
        return Err(ExportError::Header {
            expected: COLUMNS.join(","),
            found: headers.iter().collect::<Vec<_>>().join(","),
        });
    }

    let mut out = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let line = i + 1;
        let field = |idx: usize| row.get(idx).unwrap_or("");
        let bad = |field: &'static str, reason: String| ExportError::Row { row: line, field, reason };

        let date = NaiveDate::parse_from_str(field(0), "%Y-%m-%d").map_err(|e| bad("date", e.to_string()))?;
        let amount = Decimal::from_str(field(2)).map_err(|e| bad("amount", e.to_string()))?;
        if !in_range(amount) {
            return Err(bad("amount", "is out of range".to_string()));
        }

        out.push(ExpenseRecord {
            date,
            description: field(1).to_string(),
            amount,
            currency: field(3).to_string(),
            category: optional(field(4)),
            source_account: optional(field(5)),
            source_file: field(6).to_string(),
            raw_line: None,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rec(desc: &str, amount: Decimal, category: Option<&str>) -> ExpenseRecord {
        ExpenseRecord {
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            description: desc.to_string(),
            amount,
            currency: "USD".to_string(),
            category: category.map(str::to_string),
            source_account: None,
            source_file: "april.pdf".to_string(),
            raw_line: None,
        }
    }

    #[test]
    fn test_header_and_crlf() {
        let out = write_csv(&[], &MoneyPolicy::default()).unwrap();
        assert_eq!(out, "date,description,amount,currency,category,source_account,source_file\r\n");
    }

    #[test]
    fn test_quoting_only_when_needed() {
        let out = write_csv(
            &[
                rec("GROCERY MART #221", dec!(-54.32), Some("groceries")),
                rec("ACME, \"THE\" STORE", dec!(10), None),
            ],
            &MoneyPolicy::default(),
        )
        .unwrap();
        let lines: Vec<_> = out.split("\r\n").collect();
        assert_eq!(lines[1], "2024-04-01,GROCERY MART #221,-54.32,USD,groceries,,april.pdf");
        assert_eq!(lines[2], "2024-04-01,\"ACME, \"\"THE\"\" STORE\",10.00,USD,,,april.pdf");
    }

    #[test]
    fn test_half_up_amounts() {
        let out = write_csv(&[rec("x", dec!(10.005), None)], &MoneyPolicy::default()).unwrap();
        assert!(out.contains(",10.01,"));
    }

    #[test]
    fn test_round_trip() {
        let records = vec![
            rec("GROCERY MART #221", dec!(-54.32), Some("groceries")),
            rec("multi\nline, \"quoted\"", dec!(2500.00), None),
            ExpenseRecord {
                source_account: Some("****6789".to_string()),
                currency: "PLN".to_string(),
                ..rec("ZAKUP KARTĄ", dec!(-45.99), Some("shopping"))
            },
        ];
        let text = write_csv(&records, &MoneyPolicy::default()).unwrap();
        assert_eq!(read_csv(&text).unwrap(), records);
    }

    #[test]
    fn test_rejects_foreign_csv() {
        let err = read_csv("Date,Description,Amount\r\n04/01/2024,Coffee,-3.50\r\n").unwrap_err();
        assert!(matches!(err, ExportError::Header { .. }));
        let bad = "date,description,amount,currency,category,source_account,source_file\r\n2024-04-01,x,abc,USD,,,a.pdf\r\n";
        assert!(matches!(read_csv(bad).unwrap_err(), ExportError::Row { row: 1, field: "amount", .. }));
        let huge = "date,description,amount,currency,category,source_account,source_file\r\n\
                    2024-04-01,x,50000000000000000000000000000,USD,,,a.pdf\r\n";
        assert!(matches!(read_csv(huge).unwrap_err(), ExportError::Row { row: 1, field: "amount", .. }));
    }
}
