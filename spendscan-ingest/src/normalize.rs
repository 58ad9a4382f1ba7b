//! LineItem -> ExpenseRecord: dates, signed amounts, currency, category, account.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use spendscan_core::money::{parse_amount, AmountError};
use spendscan_core::{Categorizer, DateOrder, ErrorKind, ExpenseRecord, MoneyPolicy, NumberFormat, ParseError};
use std::sync::OnceLock;

use crate::types::{AmountText, LineItem, StatementKind};

/// Per-document settings the normalizer needs; built once per file.
#[derive(Debug, Clone)]
pub struct StatementContext {
    pub source_file: String,
    pub kind: StatementKind,
    pub date_formats: Vec<String>,
    pub date_order: Option<DateOrder>,
    /// Statement period, for year-less dates
    pub period: Option<(NaiveDate, NaiveDate)>,
    /// `None` infers the format per amount token
    pub number_format: Option<NumberFormat>,
    /// Layout currency; `None` falls back to row hint, then `document_currency`
    pub currency: Option<String>,
    pub document_currency: Option<String>,
    pub default_currency: String,
    /// Already masked
    pub account: Option<String>,
    pub money: MoneyPolicy,
}

pub fn normalize(
    item: &LineItem,
    ctx: &StatementContext,
    categorizer: &Categorizer,
) -> Result<ExpenseRecord, ParseError> {
    let raw = item.raw_line.as_str();
    let date = parse_date(&item.date, &ctx.date_formats, ctx.date_order, ctx.period)
        .map_err(|e| e.with_line(raw.trim()))?;
    let amount = signed_amount(&item.amount, ctx).map_err(|e| {
        ParseError::new(ErrorKind::MalformedAmount, e.to_string()).with_line(raw.trim())
    })?;

    let description = item.description.split_whitespace().collect::<Vec<_>>().join(" ");
    let category = categorizer.categorize(&description);

    Ok(ExpenseRecord {
        date,
        description,
        amount,
        currency: resolve_currency(item, ctx),
        category,
        source_account: ctx.account.clone(),
        source_file: ctx.source_file.clone(),
        raw_line: Some(item.raw_line.clone()),
    })
}

fn signed_amount(amount: &AmountText, ctx: &StatementContext) -> Result<Decimal, AmountError> {
    let text = amount.text();
    let format = match &ctx.number_format {
        Some(f) => f.clone(),
        None => NumberFormat::infer(text),
    };
    let value = parse_amount(text, &format)?;
    let value = match amount {
        AmountText::Signed(_) => value,
        AmountText::Debit(_) => -value.abs(),
        AmountText::Credit(_) => value.abs(),
    };
    // Card statements print charges positive and payments negative
    let value = match (ctx.kind, amount) {
        (StatementKind::CreditCard, AmountText::Signed(_)) => -value,
        _ => value,
    };
    Ok(ctx.money.round(value))
}

fn resolve_currency(item: &LineItem, ctx: &StatementContext) -> String {
    if let Some(c) = &ctx.currency {
        return c.clone();
    }
    item.currency_hint
        .as_deref()
        .and_then(currency_code)
        .map(str::to_string)
        .or_else(|| ctx.document_currency.clone())
        .unwrap_or_else(|| ctx.default_currency.clone())
}

/// Recognised currencies, in lookup order.
const CURRENCIES: &[(&str, &[&str])] = &[
    ("PLN", &["zł", "zl"]),
    ("EUR", &["€"]),
    ("GBP", &["£"]),
    ("USD", &["$"]),
    ("JPY", &["¥"]),
    ("CHF", &[]),
    ("CAD", &[]),
    ("AUD", &[]),
];

/// ISO code for a printed symbol or code.
pub fn currency_code(token: &str) -> Option<&'static str> {
    let token = token.trim();
    let upper = token.to_uppercase();
    CURRENCIES
        .iter()
        .find(|(code, symbols)| *code == upper || symbols.iter().any(|s| s.eq_ignore_ascii_case(token)))
        .map(|(code, _)| *code)
}

fn currency_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(PLN|EUR|GBP|USD|JPY|CHF|CAD|AUD)\b").expect("valid currency regex"))
}

/// Currency printed in a statement header: an ISO code first, then a symbol.
pub fn detect_currency(text: &str) -> Option<String> {
    if let Some(m) = currency_code_re().find(text) {
        return Some(m.as_str().to_string());
    }
    CURRENCIES
        .iter()
        .find(|(_, symbols)| symbols.iter().any(|s| s.chars().count() == 1 && text.contains(s)))
        .map(|(code, _)| code.to_string())
        .or_else(|| text.to_lowercase().contains("zł").then(|| "PLN".to_string()))
}

/// `000123456789` -> `****6789`
pub fn mask_account(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let tail = &digits[digits.len().saturating_sub(4)..];
    Some(format!("****{tail}"))
}

/// Formats tried when the layout's own formats do not match.
const COMMON_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

fn numeric_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[./-](\d{1,2})[./-](\d{4}|\d{2})$").expect("valid numeric date regex"))
}

fn has_year(format: &str) -> bool {
    format.contains("%Y") || format.contains("%y")
}

/// Parse a printed date.
///
/// Errors: `AmbiguousDate` when day and month cannot be told apart (or the
/// year is missing and no statement period is known), `MalformedLine` for
/// impossible or unrecognised dates.
pub fn parse_date(
    text: &str,
    formats: &[String],
    order: Option<DateOrder>,
    period: Option<(NaiveDate, NaiveDate)>,
) -> Result<NaiveDate, ParseError> {
    let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");

    for fmt in formats {
        if has_year(fmt) {
            if let Ok(d) = NaiveDate::parse_from_str(&clean, fmt) {
                return Ok(d);
            }
        } else if let Some(d) = parse_yearless(&clean, fmt, period)? {
            return Ok(d);
        }
    }

    for fmt in COMMON_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&clean, fmt) {
            return Ok(d);
        }
    }

    if let Some(caps) = numeric_date_re().captures(&clean) {
        return numeric_date(&clean, &caps[1], &caps[2], &caps[3], order);
    }

    Err(ParseError::new(ErrorKind::MalformedLine, format!("unrecognised date '{clean}'")))
}

fn numeric_date(
    clean: &str,
    first: &str,
    second: &str,
    year: &str,
    order: Option<DateOrder>,
) -> Result<NaiveDate, ParseError> {
    let invalid = || ParseError::new(ErrorKind::MalformedLine, format!("invalid calendar date '{clean}'"));
    let a: u32 = first.parse().map_err(|_| invalid())?;
    let b: u32 = second.parse().map_err(|_| invalid())?;
    let mut y: i32 = year.parse().map_err(|_| invalid())?;
    if year.len() == 2 {
        y = expand_two_digit_year(y);
    }

    let order = match order {
        Some(o) => o,
        None if a > 12 => DateOrder::DayFirst,
        None if b > 12 => DateOrder::MonthFirst,
        // 04/04/2024 reads the same either way
        None if a == b => DateOrder::DayFirst,
        None => {
            return Err(ParseError::new(
                ErrorKind::AmbiguousDate,
                format!("cannot tell day from month in '{clean}'"),
            ));
        }
    };
    let (day, month) = match order {
        DateOrder::DayFirst => (a, b),
        DateOrder::MonthFirst => (b, a),
    };
    NaiveDate::from_ymd_opt(y, month, day).ok_or_else(invalid)
}

/// Same pivot as chrono's `%y`: 00-69 -> 20xx, 70-99 -> 19xx.
fn expand_two_digit_year(yy: i32) -> i32 {
    if yy < 70 { 2000 + yy } else { 1900 + yy }
}

/// `Ok(None)` when `fmt` does not describe `clean` at all.
fn parse_yearless(
    clean: &str,
    fmt: &str,
    period: Option<(NaiveDate, NaiveDate)>,
) -> Result<Option<NaiveDate>, ParseError> {
    let with_year = format!("{fmt} %Y");
    let attempt = |year: i32| NaiveDate::parse_from_str(&format!("{clean} {year}"), &with_year).ok();

    // A leap year accepts every day/month the format can describe
    if attempt(2000).is_none() {
        return Ok(None);
    }

    let Some((start, end)) = period else {
        return Err(ParseError::new(
            ErrorKind::AmbiguousDate,
            format!("date '{clean}' has no year and the statement period is unknown"),
        ));
    };

    match attempt(end.year()) {
        Some(d) if d <= end || start.year() == end.year() => Ok(Some(d)),
        _ => attempt(start.year())
            .map(Some)
            .ok_or_else(|| ParseError::new(ErrorKind::MalformedLine, format!("invalid calendar date '{clean}'"))),
    }
}
