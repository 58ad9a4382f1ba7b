//! Fallback row rule for statements no registered layout recognises.
//!
//! A candidate is a line with a date token followed by a trailing run of
//! money tokens:
//!   01/04/2024   GROCERY MART #221        -54.32
//!   2024-04-03   SALARY ACME              2,500.00     3,120.45
//! With two or more trailing amounts the last one is the running balance.

use regex::Regex;
use std::sync::OnceLock;

use super::{ColumnOffsets, RowMatch, RowRule};
use crate::normalize::currency_code;
use crate::types::{AmountText, LineItem};

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?:^|\s)(?P<date>",
            r"\d{4}-\d{2}-\d{2}",
            r"|\d{1,2}[./-]\d{1,2}[./-](?:\d{4}|\d{2})",
            r"|\d{1,2}\s+(?i:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[A-Za-z]*\.?\s+\d{4}",
            r")(?:\s|$)"
        ))
        .expect("valid generic date regex")
    })
}

fn money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[-+(]{0,2}(?P<pre>[$€£¥])?[-+]?\d[\d,.\x{A0}]*[.,]\d{2}\)?(?P<post>zł|€)?(?:-|CR|DR)?$")
            .expect("valid generic money regex")
    })
}

/// Leading group of a space-grouped amount: `-1` in `-1 234,56`
fn lead_group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?(?:[$€£¥])?\d{1,3}$").expect("valid lead group regex"))
}

/// A comma-decimal token that continues a space-grouped amount: `234,56`,
/// or a middle group `234`.
fn continues_group(token: &str) -> bool {
    let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    digits == 3 && (token.len() == 3 || token[3..].starts_with(','))
}

/// Standalone tokens that may precede an amount: `- $14.05`, `USD 7.10`
fn is_prefix(token: &str) -> bool {
    matches!(token, "-" | "+" | "-$" | "$" | "€" | "£" | "¥") || is_code(token)
}

/// Standalone tokens that may follow an amount: `99,99 PLN`, `15.00 CR`
fn is_suffix(token: &str) -> bool {
    matches!(token, "CR" | "DR" | "zł") || is_code(token)
}

fn is_code(token: &str) -> bool {
    token.len() == 3 && token.chars().all(|c| c.is_ascii_uppercase()) && currency_code(token).is_some()
}

fn generic_ignores() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            r"(?i)^\s*page\s+\d+(\s+of\s+\d+)?\s*$",
            r"(?i)\b(opening|closing|beginning|ending|previous|new)\s+balance\b",
            r"(?i)\bbalance\s+(brought|carried)\s+forward\b",
            r"(?i)^\s*(sub)?total\b",
            r"(?i)\bsaldo\s+(początkowe|poczatkowe|końcowe|koncowe)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid generic ignore regex"))
        .collect()
    })
}

pub fn ignore_patterns() -> &'static [Regex] {
    generic_ignores()
}

/// Byte spans of whitespace-separated tokens. NBSP stays inside a token
/// (`1\u{a0}234,56`).
fn token_spans(line: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        if c.is_whitespace() && c != '\u{a0}' {
            if let Some(s) = start.take() {
                out.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, line.len()));
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MoneyToken {
    start: usize,
    end: usize,
    currency: Option<String>,
}

/// Money tokens at the end of `line`, in line order, ignoring text before `from`.
fn trailing_money(line: &str, from: usize) -> Vec<MoneyToken> {
    let spans: Vec<_> = token_spans(line).into_iter().filter(|(s, _)| *s >= from).collect();
    let tok = |k: usize| &line[spans[k].0..spans[k].1];

    let mut run = Vec::new();
    let mut i = spans.len();
    while i > 0 {
        let end = spans[i - 1].1;
        let mut k = i - 1;
        let mut currency = None;
        if is_suffix(tok(k)) && k > 0 {
            currency = currency_code(tok(k)).map(str::to_string);
            k -= 1;
        }
        let Some(caps) = money_re().captures(tok(k)) else {
            break;
        };
        currency = currency.or_else(|| {
            caps.name("pre")
                .or_else(|| caps.name("post"))
                .and_then(|m| currency_code(m.as_str()))
                .map(str::to_string)
        });
        // "1 234,56" arrives as two tokens; the decimal comma is required so
        // "STORE 12 345.67" keeps 12 in the description
        if tok(k).contains(',') {
            while k > 0 && continues_group(tok(k)) && lead_group_re().is_match(tok(k - 1)) {
                k -= 1;
                if !continues_group(tok(k)) {
                    break;
                }
            }
        }
        let mut start = spans[k].0;
        while k > 0 && is_prefix(tok(k - 1)) {
            k -= 1;
            start = spans[k].0;
            if currency.is_none() {
                currency = currency_code(tok(k).trim_start_matches(['-', '+'])).map(str::to_string);
            }
        }
        run.push(MoneyToken { start, end, currency });
        i = k;
    }
    run.reverse();
    run
}

/// True when the line's last token is an amount.
pub fn ends_with_money(line: &str) -> bool {
    !trailing_money(line, 0).is_empty()
}

pub fn contains_date(line: &str) -> bool {
    date_re().is_match(line)
}

pub struct GenericRule;

impl GenericRule {
    fn split(line: &str) -> Option<(regex::Match<'_>, Vec<MoneyToken>)> {
        let date = date_re().captures(line)?.name("date")?;
        let money = trailing_money(line, date.end());
        if money.is_empty() { None } else { Some((date, money)) }
    }
}

impl RowRule for GenericRule {
    fn is_candidate(&self, line: &str) -> bool {
        Self::split(line).is_some()
    }

    fn match_row(&self, line: &str, _columns: Option<&ColumnOffsets>) -> RowMatch {
        let Some((date, money)) = Self::split(line) else {
            return RowMatch::NotARow;
        };
        let amount = match money.as_slice() {
            [only] => only,
            [.., amount, _balance] => amount,
            [] => return RowMatch::NotARow,
        };

        RowMatch::Item(LineItem {
            page: 0,
            line: 0,
            date: date.as_str().to_string(),
            description: line[date.end()..amount.start].trim().to_string(),
            amount: AmountText::Signed(line[amount.start..amount.end].to_string()),
            currency_hint: amount.currency.clone(),
            raw_line: line.to_string(),
        })
    }
}
