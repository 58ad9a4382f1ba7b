//! Polish bank statement ("wyciąg"): DD.MM.YYYY dates, comma decimals,
//! space or dot thousands, signed amounts, multi-line titles.
//!
//!   Data operacji  Opis operacji                     Kwota        Saldo
//!   05.03.2024     ZAKUP KARTĄ BIEDRONKA 1234       -45,99     1 954,01
//!                  WARSZAWA
//!
//! Columns are separated by at least two spaces so trailing numbers in a
//! title are not read as the amount.

use spendscan_core::{DateOrder, NumberFormat};

use super::strings;
use crate::layout::LayoutSpec;
use crate::types::StatementKind;

pub fn spec() -> LayoutSpec {
    LayoutSpec {
        id: "pl_bank_statement".to_string(),
        name: "Polish bank statement".to_string(),
        kind: StatementKind::BankAccount,
        anchors: strings(&[r"(?i)wyci[aą]g", r"(?i)data\s+operacji"]),
        header_window: 40,
        section_start: Some(r"(?i)data\s+operacji".to_string()),
        section_end: Some(r"(?i)^\s*saldo\s+ko[nń]cowe".to_string()),
        ignore: strings(&[r"(?i)saldo\s+pocz[aą]tkowe", r"(?i)^\s*strona\s+\d+"]),
        row_start: r"^\s*\d{2}\.\d{2}\.\d{4}\s".to_string(),
        row: concat!(
            r"^\s*(?P<date>\d{2}\.\d{2}\.\d{4})\s+",
            r"(?:(?P<desc>.+?)\s{2,})?",
            r"(?P<amount>[-+]?\d[\d \x{A0}.]*,\d+)\s{2,}",
            r"(?P<balance>-?\d[\d \x{A0}.]*,\d+)\s*$"
        )
        .to_string(),
        columns: None,
        date_formats: strings(&["%d.%m.%Y"]),
        date_order: Some(DateOrder::DayFirst),
        period: None,
        account: Some(r"(?i)nr\s+rachunku:?\s*(?:PL)?(?P<number>\d[\d ]{9,}\d)".to_string()),
        number_format: NumberFormat::continental(),
        currency: "PLN".to_string(),
        fraction_digits: None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use spendscan_core::{ErrorKind, ParseStatus};

    use crate::engine::StatementEngine;

    const STATEMENT: &str = "
Bank Przykładowy S.A.
Wyciąg z rachunku nr 3/2024
Nr rachunku: PL61 1090 1014 0000 0712 1981 2874

Data operacji  Opis operacji                        Kwota          Saldo
               Saldo początkowe                                 2 000,00
05.03.2024     ZAKUP KARTĄ BIEDRONKA 1234          -45,99       1 954,01
               WARSZAWA
07.03.2024     WYNAGRODZENIE ZA LUTY            5 250,00       7 204,01
09.03.2024     PRZELEW 500                      -1.200,00      6 004,01
Strona 1 z 1
Saldo końcowe                                                  6 004,01
";

    #[test]
    fn test_parses_continental_rows() {
        let engine = StatementEngine::with_defaults().unwrap();
        let result = engine.parse_pages("wyciag_marzec.pdf", &[STATEMENT.to_string()]);

        assert_eq!(result.detected_format(), "pl_bank_statement");
        assert_eq!(result.status(), ParseStatus::Success);
        let txns = result.records();
        assert_eq!(txns.len(), 3);
        assert_eq!(txns[0].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(txns[0].description, "ZAKUP KARTĄ BIEDRONKA 1234 WARSZAWA");
        assert_eq!(txns[0].amount, dec!(-45.99));
        assert_eq!(txns[0].category.as_deref(), Some("groceries"));
        assert_eq!(txns[1].amount, dec!(5250.00));
        assert_eq!(txns[1].category.as_deref(), Some("income"));
        assert_eq!(txns[2].description, "PRZELEW 500");
        assert_eq!(txns[2].amount, dec!(-1200.00));
        assert!(txns.iter().all(|t| t.currency == "PLN"));
        assert_eq!(txns[0].source_account.as_deref(), Some("****2874"));
    }

    #[test]
    fn test_nbsp_grouped_amounts() {
        let text = STATEMENT.replace(
            "09.03.2024     PRZELEW 500                      -1.200,00      6 004,01",
            "09.03.2024     CZYNSZ MARZEC                 -12\u{a0}345,00     1\u{a0}954,01",
        );
        let engine = StatementEngine::with_defaults().unwrap();
        let result = engine.parse_pages("wyciag_marzec.pdf", &[text]);
        assert_eq!(result.status(), ParseStatus::Success);
        let last = &result.records()[2];
        assert_eq!(last.description, "CZYNSZ MARZEC");
        assert_eq!(last.amount, dec!(-12345.00));
        assert_eq!(last.category.as_deref(), Some("housing"));
    }

    #[test]
    fn test_impossible_date_is_malformed_line() {
        let text = STATEMENT.replace("07.03.2024", "31.02.2024");
        let engine = StatementEngine::with_defaults().unwrap();
        let result = engine.parse_pages("wyciag_marzec.pdf", &[text]);
        assert_eq!(result.status(), ParseStatus::Partial);
        assert_eq!(result.records().len(), 2);
        assert_eq!(result.first_error_kind(), Some(ErrorKind::MalformedLine));
    }
}
