//! Converts untyped expense JSON from callers into `ExpenseRecord`s, once.
//!
//! Accepts a bare array or the `{"expenses": [...]}` envelope. The whole
//! input is checked before anything is returned, so encoders never see a
//! half-valid set.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::error::{ValidationError, ValidationResult};
use crate::expense::ExpenseRecord;
use crate::money::in_range;

pub fn expenses_from_json(value: &Value, config: &EngineConfig) -> ValidationResult<Vec<ExpenseRecord>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("expenses") {
            Some(Value::Array(items)) => items,
            _ => return Err(ValidationError::NotAnArray),
        },
        _ => return Err(ValidationError::NotAnArray),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| expense_from_value(index, item, config))
        .collect()
}

fn expense_from_value(index: usize, item: &Value, config: &EngineConfig) -> ValidationResult<ExpenseRecord> {
    let obj = item.as_object().ok_or(ValidationError::NotAnObject { index })?;

    let date_text = required_str(obj, index, "date")?;
    let date = NaiveDate::parse_from_str(date_text.trim(), "%Y-%m-%d").map_err(|e| ValidationError::InvalidField {
        index,
        field: "date",
        reason: format!("is not a YYYY-MM-DD date ({e})"),
    })?;

    let description = required_str(obj, index, "description")?.to_string();
    let amount = config.money.round(amount_field(obj, index)?);

    let currency = optional_str(obj, index, "currency")?
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| config.default_currency.clone());

    Ok(ExpenseRecord {
        date,
        description,
        amount,
        currency,
        category: non_empty(optional_str(obj, index, "category")?),
        source_account: non_empty(optional_str(obj, index, "source_account")?),
        source_file: optional_str(obj, index, "source_file")?.unwrap_or_default().to_string(),
        raw_line: non_empty(optional_str(obj, index, "raw_line")?),
    })
}

fn required_str<'a>(obj: &'a Map<String, Value>, index: usize, field: &'static str) -> ValidationResult<&'a str> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField { index, field }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::InvalidField {
            index,
            field,
            reason: "must be a string".to_string(),
        }),
    }
}

fn optional_str<'a>(obj: &'a Map<String, Value>, index: usize, field: &'static str) -> ValidationResult<Option<&'a str>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ValidationError::InvalidField {
            index,
            field,
            reason: "must be a string or null".to_string(),
        }),
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// JSON numbers go through their shortest text form, so `10.005` stays
/// `10.005` instead of the nearest binary float.
fn amount_field(obj: &Map<String, Value>, index: usize) -> ValidationResult<Decimal> {
    let invalid = |reason: &str| ValidationError::InvalidField {
        index,
        field: "amount",
        reason: reason.to_string(),
    };
    let amount = match obj.get("amount") {
        None | Some(Value::Null) => Err(ValidationError::MissingField { index, field: "amount" }),
        Some(Value::Number(n)) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|_| invalid("is out of range"))
        }
        Some(Value::String(s)) => {
            let text = s.trim();
            Decimal::from_str(text).map_err(|_| invalid("is not numeric"))
        }
        Some(_) => Err(invalid("must be a number or numeric string")),
    }?;
    if in_range(amount) {
        Ok(amount)
    } else {
        Err(invalid("is out of range"))
    }
}
