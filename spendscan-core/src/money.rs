//! Fixed-point money: locale-aware amount parsing, rounding and formatting.
//!
//! Amounts are `rust_decimal::Decimal` end to end. Nothing in the pipeline
//! goes through `f64` except the numeric cells of the spreadsheet encoder.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// How amounts are rounded to the configured number of fractional digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Midpoint away from zero: 10.005 -> 10.01, -10.005 -> -10.01
    #[default]
    HalfUp,
    /// Banker's rounding: 10.005 -> 10.00
    HalfEven,
    /// Drop extra digits: 10.009 -> 10.00
    Truncate,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
            Rounding::Truncate => RoundingStrategy::ToZero,
        }
    }
}

/// Fixed-point policy applied to every stored amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoneyPolicy {
    pub fraction_digits: u32,
    pub rounding: Rounding,
}

impl Default for MoneyPolicy {
    fn default() -> Self {
        Self {
            fraction_digits: 2,
            rounding: Rounding::HalfUp,
        }
    }
}

impl MoneyPolicy {
    pub fn with_fraction_digits(self, fraction_digits: u32) -> Self {
        Self {
            fraction_digits,
            ..self
        }
    }

    /// Round to `fraction_digits` and pin the scale so `10` prints as `10.00`.
    pub fn round(&self, amount: Decimal) -> Decimal {
        let mut out = amount.round_dp_with_strategy(self.fraction_digits, self.rounding.strategy());
        out.rescale(self.fraction_digits);
        if out.is_zero() {
            out.set_sign_positive(true);
        }
        out
    }

    /// Locale-neutral text form (`-54.32`), always with the fixed digit count.
    pub fn format(&self, amount: Decimal) -> String {
        self.round(amount).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("no digits in amount '{0}'")]
    NoDigits(String),
    #[error("unexpected character '{ch}' in amount '{raw}'")]
    UnexpectedChar { raw: String, ch: char },
    #[error("bad digit grouping in amount '{0}'")]
    BadGrouping(String),
    #[error("more than one decimal separator in amount '{0}'")]
    MultipleDecimalSeparators(String),
    #[error("conflicting sign markers in amount '{0}'")]
    ConflictingSign(String),
    #[error("amount '{0}' is out of range")]
    OutOfRange(String),
}

/// Decimal and grouping separators of a statement's number format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub decimal: char,
    pub grouping: Vec<char>,
}

impl NumberFormat {
    /// `1,234.56`
    pub fn us() -> Self {
        Self {
            decimal: '.',
            grouping: vec![','],
        }
    }

    /// `1 234,56` or `1.234,56`
    pub fn continental() -> Self {
        Self {
            decimal: ',',
            grouping: vec![' ', '\u{a0}', '.'],
        }
    }

    /// Guess the format from a single token, for statements of unknown layout.
    ///
    /// The rightmost separator is the decimal one when both `.` and `,`
    /// appear, or when it is followed by exactly two digits.
    pub fn infer(token: &str) -> Self {
        let last_dot = token.rfind('.');
        let last_comma = token.rfind(',');
        match (last_dot, last_comma) {
            (Some(d), Some(c)) if c > d => Self::continental(),
            (Some(_), Some(_)) => Self::us(),
            (None, Some(c)) if trailing_digits(&token[c + 1..]) == 2 => Self::continental(),
            (None, Some(_)) => Self::us(),
            (Some(d), None) if trailing_digits(&token[d + 1..]) != 2 && token.matches('.').count() > 1 => {
                Self::continental()
            }
            _ => Self::us(),
        }
    }
}

fn trailing_digits(s: &str) -> usize {
    s.chars().take_while(|c| c.is_ascii_digit()).count()
}

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹'];

/// Parse a printed amount into an exact decimal, without rounding.
///
/// Understands leading/trailing `+`/`-`, `(1.00)` accounting negatives,
/// trailing `CR`/`DR` markers, currency symbols and 3-letter codes.
pub fn parse_amount(raw: &str, format: &NumberFormat) -> Result<Decimal, AmountError> {
    let original = raw.trim();
    if original.is_empty() {
        return Err(AmountError::Empty);
    }

    let mut s = original.to_string();
    let mut negative: Option<bool> = None;
    let mut set_sign = |neg: bool, s: &str| -> Result<(), AmountError> {
        match negative {
            Some(prev) if prev != neg => Err(AmountError::ConflictingSign(s.to_string())),
            _ => {
                negative = Some(neg);
                Ok(())
            }
        }
    };

    if let Some(rest) = strip_suffix_ci(&s, "CR") {
        s = rest.trim().to_string();
        set_sign(false, original)?;
    } else if let Some(rest) = strip_suffix_ci(&s, "DR") {
        s = rest.trim().to_string();
        set_sign(true, original)?;
    }

    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        s = s[1..s.len() - 1].trim().to_string();
        set_sign(true, original)?;
    }

    s = strip_currency(&s);

    if let Some(rest) = s.strip_prefix('-') {
        s = rest.trim_start().to_string();
        set_sign(true, original)?;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start().to_string();
        set_sign(false, original)?;
    }
    if let Some(rest) = s.strip_suffix('-') {
        s = rest.trim_end().to_string();
        set_sign(true, original)?;
    }

    // "- $14.05" puts the symbol after the sign
    s = strip_currency(&s);

    let canonical = canonical_digits(&s, format, original)?;
    let value = Decimal::from_str(&canonical).map_err(|_| AmountError::OutOfRange(original.to_string()))?;
    if !in_range(value) {
        return Err(AmountError::OutOfRange(original.to_string()));
    }
    Ok(if negative == Some(true) { -value } else { value })
}

/// Largest magnitude accepted for a single amount: 10^15. Sums over any
/// realistic number of records stay far below `Decimal::MAX`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

pub fn in_range(amount: Decimal) -> bool {
    amount.abs() <= MAX_AMOUNT
}

/// Case-insensitive `strip_suffix` that only cuts on char boundaries.
fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let n = suffix.chars().count();
    let (cut, _) = s.char_indices().rev().nth(n.checked_sub(1)?)?;
    let tail = &s[cut..];
    (tail.to_lowercase() == suffix.to_lowercase()).then(|| &s[..cut])
}

fn is_iso_code(part: &str) -> bool {
    part.len() == 3 && part.chars().all(|c| c.is_ascii_uppercase())
}

fn strip_currency(s: &str) -> String {
    let mut out = s.trim().trim_matches(|c| CURRENCY_SYMBOLS.contains(&c)).trim().to_string();
    if let Some(rest) = strip_suffix_ci(&out, "zł") {
        out = rest.trim().to_string();
    }
    // 3-letter ISO code before or after the number
    if out.chars().count() > 3 {
        if let Some(tail) = out.get(3..).filter(|_| out.get(..3).is_some_and(is_iso_code)) {
            out = tail.trim().to_string();
        }
    }
    if out.chars().count() > 3 {
        let cut = out.len() - 3;
        if let Some(head) = out.get(..cut).filter(|_| out.get(cut..).is_some_and(is_iso_code)) {
            out = head.trim().to_string();
        }
    }
    out.trim_matches(|c| CURRENCY_SYMBOLS.contains(&c)).trim().to_string()
}

/// Reduce `s` to `[digits][.digits]`, validating grouping per `format`.
fn canonical_digits(s: &str, format: &NumberFormat, original: &str) -> Result<String, AmountError> {
    let (int_part, frac_part) = match s.split_once(format.decimal) {
        Some((int_part, frac)) => {
            if frac.contains(format.decimal) {
                return Err(AmountError::MultipleDecimalSeparators(original.to_string()));
            }
            (int_part, Some(frac))
        }
        None => (s, None),
    };

    if let Some(frac) = frac_part {
        if let Some(ch) = frac.chars().find(|c| !c.is_ascii_digit()) {
            return Err(AmountError::UnexpectedChar {
                raw: original.to_string(),
                ch,
            });
        }
    }

    let groups: Vec<&str> = int_part.split(|c| format.grouping.contains(&c)).collect();
    for group in &groups {
        if let Some(ch) = group.chars().find(|c| !c.is_ascii_digit()) {
            return Err(AmountError::UnexpectedChar {
                raw: original.to_string(),
                ch,
            });
        }
    }
    if groups.len() > 1 {
        let first_ok = (1..=3).contains(&groups[0].len());
        let rest_ok = groups[1..].iter().all(|g| g.len() == 3);
        if !first_ok || !rest_ok {
            return Err(AmountError::BadGrouping(original.to_string()));
        }
    }

    let digits: String = groups.concat();
    let frac = frac_part.unwrap_or("");
    if digits.is_empty() && frac.is_empty() {
        return Err(AmountError::NoDigits(original.to_string()));
    }
    let int_digits = if digits.is_empty() { "0" } else { digits.as_str() };
    if frac.is_empty() {
        Ok(int_digits.to_string())
    } else {
        Ok(format!("{int_digits}.{frac}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_half_up_rounding() {
        let policy = MoneyPolicy::default();
        assert_eq!(policy.format(dec!(10.005)), "10.01");
        assert_eq!(policy.format(dec!(-10.005)), "-10.01");
        assert_eq!(policy.format(dec!(10)), "10.00");
        assert_eq!(policy.format(dec!(-0.001)), "0.00");
    }

    #[test]
    fn test_other_rounding_rules() {
        let even = MoneyPolicy {
            fraction_digits: 2,
            rounding: Rounding::HalfEven,
        };
        assert_eq!(even.format(dec!(10.005)), "10.00");
        let trunc = MoneyPolicy {
            fraction_digits: 2,
            rounding: Rounding::Truncate,
        };
        assert_eq!(trunc.format(dec!(10.009)), "10.00");
        assert_eq!(MoneyPolicy::default().with_fraction_digits(3).format(dec!(1.5)), "1.500");
    }

    #[test]
    fn test_parse_us_amounts() {
        let us = NumberFormat::us();
        assert_eq!(parse_amount("-54.32", &us).unwrap(), dec!(-54.32));
        assert_eq!(parse_amount("$1,234.56", &us).unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("- $14.05", &us).unwrap(), dec!(-14.05));
        assert_eq!(parse_amount("(20.00)", &us).unwrap(), dec!(-20.00));
        assert_eq!(parse_amount("15.00 CR", &us).unwrap(), dec!(15.00));
        assert_eq!(parse_amount("15.00DR", &us).unwrap(), dec!(-15.00));
        assert_eq!(parse_amount("12.50-", &us).unwrap(), dec!(-12.50));
        assert_eq!(parse_amount("USD 7.10", &us).unwrap(), dec!(7.10));
    }

    #[test]
    fn test_parse_continental_amounts() {
        let eu = NumberFormat::continental();
        assert_eq!(parse_amount("-1 234,56", &eu).unwrap(), dec!(-1234.56));
        assert_eq!(parse_amount("1.234,56 zł", &eu).unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("€12,00", &eu).unwrap(), dec!(12.00));
        assert_eq!(parse_amount("99,99 PLN", &eu).unwrap(), dec!(99.99));
    }

    #[test]
    fn test_nbsp_grouping_next_to_cut_points() {
        let eu = NumberFormat::continental();
        assert_eq!(parse_amount("-12\u{a0}345,00", &eu).unwrap(), dec!(-12345.00));
        assert_eq!(parse_amount("12\u{a0}345,67", &eu).unwrap(), dec!(12345.67));
        assert_eq!(parse_amount("1\u{a0}954,01", &eu).unwrap(), dec!(1954.01));
        assert_eq!(parse_amount("1\u{a0}234\u{a0}567,89 PLN", &eu).unwrap(), dec!(1234567.89));
        assert_eq!(parse_amount("12\u{a0}345,00 zł", &eu).unwrap(), dec!(12345.00));
        assert_eq!(parse_amount("5\u{a0}000,00 cr", &eu).unwrap(), dec!(5000.00));
        // multi-byte chars where CR/DR or a currency code could sit
        assert!(parse_amount("1,00ł", &eu).is_err());
        assert!(parse_amount("ŁÓDŹ 1,00", &eu).is_err());
    }

    #[test]
    fn test_out_of_range_amounts() {
        let us = NumberFormat::us();
        assert_eq!(parse_amount("999999999999999.99", &us).unwrap(), dec!(999999999999999.99));
        assert!(matches!(
            parse_amount("50000000000000000000000000000", &us),
            Err(AmountError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_amount("-1,000,000,000,000,000.01", &us),
            Err(AmountError::OutOfRange(_))
        ));
        assert_eq!(MAX_AMOUNT, dec!(1000000000000000));
        assert!(in_range(-MAX_AMOUNT));
        assert!(!in_range(MAX_AMOUNT + dec!(0.01)));
    }

    #[test]
    fn test_malformed_amounts() {
        let us = NumberFormat::us();
        assert!(matches!(
            parse_amount("1.234.56", &us),
            Err(AmountError::MultipleDecimalSeparators(_))
        ));
        assert!(matches!(parse_amount("12,34.56", &us), Err(AmountError::BadGrouping(_))));
        assert!(matches!(parse_amount("12.3O", &us), Err(AmountError::UnexpectedChar { .. })));
        assert!(matches!(parse_amount("$", &us), Err(AmountError::NoDigits(_))));
        assert!(matches!(parse_amount("-(5.00) CR", &us), Err(AmountError::ConflictingSign(_))));
        assert!(matches!(parse_amount("  ", &us), Err(AmountError::Empty)));
    }

    #[test]
    fn test_infer_format() {
        assert_eq!(NumberFormat::infer("1,234.56"), NumberFormat::us());
        assert_eq!(NumberFormat::infer("1.234,56"), NumberFormat::continental());
        assert_eq!(NumberFormat::infer("54,32"), NumberFormat::continental());
        assert_eq!(NumberFormat::infer("-54.32"), NumberFormat::us());
    }
}
