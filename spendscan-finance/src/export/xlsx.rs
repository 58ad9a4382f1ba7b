//! Single-sheet workbook. Amounts are written as numbers so spreadsheets can
//! sum them; dates stay ISO text to match the CSV export.

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook};
use spendscan_core::{ExpenseRecord, MoneyPolicy};

use super::{ExportError, COLUMNS};

const SHEET_NAME: &str = "Expenses";

fn number_format(fraction_digits: u32) -> String {
    if fraction_digits == 0 {
        "0".to_string()
    } else {
        format!("0.{}", "0".repeat(fraction_digits as usize))
    }
}

pub fn write_xlsx(records: &[ExpenseRecord], money: &MoneyPolicy) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let amount_format = Format::new().set_num_format(number_format(money.fraction_digits));

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (i, r) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        let rounded = money.round(r.amount);
        let amount = rounded.to_f64().ok_or_else(|| ExportError::Amount(rounded.to_string()))?;

        sheet.write_string(row, 0, r.date.format("%Y-%m-%d").to_string())?;
        sheet.write_string(row, 1, &r.description)?;
        sheet.write_number_with_format(row, 2, amount, &amount_format)?;
        sheet.write_string(row, 3, &r.currency)?;
        if let Some(category) = &r.category {
            sheet.write_string(row, 4, category)?;
        }
        if let Some(account) = &r.source_account {
            sheet.write_string(row, 5, account)?;
        }
        sheet.write_string(row, 6, &r.source_file)?;
    }

    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(1, 40)?;
    sheet.set_column_width(2, 12)?;
    sheet.set_column_width(6, 24)?;

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn read_back(bytes: Vec<u8>) -> (Vec<String>, calamine::Range<Data>) {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let names = workbook.sheet_names();
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        (names, range)
    }

    #[test]
    fn test_number_format() {
        assert_eq!(number_format(2), "0.00");
        assert_eq!(number_format(0), "0");
        assert_eq!(number_format(3), "0.000");
    }

    #[test]
    fn test_writes_zip_container() {
        let records = vec![ExpenseRecord {
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            description: "GROCERY MART #221".to_string(),
            amount: dec!(-54.32),
            currency: "USD".to_string(),
            category: Some("groceries".to_string()),
            source_account: None,
            source_file: "april.pdf".to_string(),
            raw_line: None,
        }];
        let bytes = write_xlsx(&records, &MoneyPolicy::default()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_cells_read_back_in_column_order() {
        let records = vec![
            ExpenseRecord {
                date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                description: "GROCERY MART #221".to_string(),
                amount: dec!(-54.32),
                currency: "USD".to_string(),
                category: Some("groceries".to_string()),
                source_account: None,
                source_file: "april.pdf".to_string(),
                raw_line: None,
            },
            ExpenseRecord {
                date: NaiveDate::from_ymd_opt(2024, 4, 3).unwrap(),
                description: "SALARY, ACME \"INC\"".to_string(),
                amount: dec!(10.005),
                currency: "USD".to_string(),
                category: None,
                source_account: Some("****6789".to_string()),
                source_file: "april.pdf".to_string(),
                raw_line: None,
            },
        ];
        let (names, range) = read_back(write_xlsx(&records, &MoneyPolicy::default()).unwrap());

        assert_eq!(names, vec![SHEET_NAME.to_string()]);
        assert_eq!(range.height(), 3);
        let header: Vec<String> = (0..COLUMNS.len()).map(|c| range.get((0, c)).unwrap().to_string()).collect();
        assert_eq!(header, COLUMNS);

        assert_eq!(range.get((1, 0)), Some(&Data::String("2024-04-01".to_string())));
        assert_eq!(range.get((1, 1)), Some(&Data::String("GROCERY MART #221".to_string())));
        assert_eq!(range.get((1, 2)), Some(&Data::Float(-54.32)));
        assert_eq!(range.get((1, 3)), Some(&Data::String("USD".to_string())));
        assert_eq!(range.get((1, 4)), Some(&Data::String("groceries".to_string())));
        assert!(matches!(range.get((1, 5)), None | Some(Data::Empty)));
        assert_eq!(range.get((1, 6)), Some(&Data::String("april.pdf".to_string())));

        assert_eq!(range.get((2, 1)), Some(&Data::String("SALARY, ACME \"INC\"".to_string())));
        // rounded half-up before it becomes a number
        assert_eq!(range.get((2, 2)), Some(&Data::Float(10.01)));
        assert!(matches!(range.get((2, 4)), None | Some(Data::Empty)));
        assert_eq!(range.get((2, 5)), Some(&Data::String("****6789".to_string())));
    }

    #[test]
    fn test_empty_export_still_has_header_sheet() {
        let bytes = write_xlsx(&[], &MoneyPolicy::default()).unwrap();
        assert!(bytes.starts_with(b"PK"));
        let (names, range) = read_back(bytes);
        assert_eq!(names, vec![SHEET_NAME.to_string()]);
        assert_eq!(range.height(), 1);
        assert_eq!(range.get((0, 2)), Some(&Data::String("amount".to_string())));
    }
}
