//! Aggregation of an expense set into totals and grouped subtotals.
//!
//! Pure: the output depends only on the records and the money policy.
//! Grouping maps are `BTreeMap`s so keys serialize in ascending order.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::expense::ExpenseRecord;
use crate::money::MoneyPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestDebit {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub record_count: usize,
    /// Sum of negative amounts (<= 0)
    pub total_debit: Decimal,
    /// Sum of positive amounts (>= 0)
    pub total_credit: Decimal,
    pub net: Decimal,
    pub by_category: BTreeMap<String, Decimal>,
    pub category_counts: BTreeMap<String, usize>,
    /// Keyed by calendar month, `YYYY-MM`
    pub by_period: BTreeMap<String, Decimal>,
    pub by_currency: BTreeMap<String, Decimal>,
    pub date_range: Option<DateRange>,
    pub average_amount: Option<Decimal>,
    pub largest_debit: Option<LargestDebit>,
}

pub fn period_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Amounts are expected within `money::MAX_AMOUNT`, which PDF rows, JSON
/// input and CSV input all enforce; the sums then cannot overflow.
pub fn analyze(records: &[ExpenseRecord], money: &MoneyPolicy) -> AnalysisSummary {
    let zero = money.round(Decimal::ZERO);
    let mut total_debit = zero;
    let mut total_credit = zero;
    let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_period: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut by_currency: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut largest: Option<&ExpenseRecord> = None;
    let mut range: Option<DateRange> = None;

    for r in records {
        if r.amount.is_sign_negative() {
            total_debit += r.amount;
        } else {
            total_credit += r.amount;
        }

        *by_category.entry(r.category_label().to_string()).or_insert(zero) += r.amount;
        *category_counts.entry(r.category_label().to_string()).or_insert(0) += 1;
        *by_period.entry(period_key(r.date)).or_insert(zero) += r.amount;
        *by_currency.entry(r.currency.clone()).or_insert(zero) += r.amount;

        // Ties keep the earliest record in input order
        if r.is_debit() && largest.is_none_or(|l| r.amount < l.amount) {
            largest = Some(r);
        }

        range = Some(match range {
            None => DateRange { from: r.date, to: r.date },
            Some(d) => DateRange {
                from: d.from.min(r.date),
                to: d.to.max(r.date),
            },
        });
    }

    let net = total_debit + total_credit;
    let average_amount = if records.is_empty() {
        None
    } else {
        Some(money.round(net / Decimal::from(records.len())))
    };

    AnalysisSummary {
        record_count: records.len(),
        total_debit,
        total_credit,
        net,
        by_category,
        category_counts,
        by_period,
        by_currency,
        date_range: range,
        average_amount,
        largest_debit: largest.map(|r| LargestDebit {
            date: r.date,
            description: r.description.clone(),
            amount: r.amount,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rec(date: (i32, u32, u32), amount: Decimal, category: Option<&str>, currency: &str) -> ExpenseRecord {
        ExpenseRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            description: format!("txn {amount}"),
            amount,
            currency: currency.to_string(),
            category: category.map(str::to_string),
            source_account: None,
            source_file: "s.pdf".to_string(),
            raw_line: None,
        }
    }

    fn sample() -> Vec<ExpenseRecord> {
        vec![
            rec((2024, 4, 1), dec!(-54.32), Some("groceries"), "USD"),
            rec((2024, 4, 3), dec!(2500.00), Some("income"), "USD"),
            rec((2024, 3, 30), dec!(-12.10), None, "USD"),
            rec((2024, 5, 2), dec!(-0.01), Some("groceries"), "EUR"),
            rec((2024, 4, 15), dec!(-120.00), None, "USD"),
        ]
    }

    #[test]
    fn test_totals_are_exact() {
        let records = sample();
        let s = analyze(&records, &MoneyPolicy::default());
        let sum: Decimal = records.iter().map(|r| r.amount).sum();
        assert_eq!(s.total_debit + s.total_credit, sum);
        assert_eq!(s.net, sum);
        assert_eq!(s.total_debit, dec!(-186.43));
        assert_eq!(s.total_credit, dec!(2500.00));
    }

    #[test]
    fn test_groupings_sum_to_net() {
        let s = analyze(&sample(), &MoneyPolicy::default());
        let by_cat: Decimal = s.by_category.values().copied().sum();
        let by_period: Decimal = s.by_period.values().copied().sum();
        assert_eq!(by_cat, s.net);
        assert_eq!(by_period, s.net);
        assert_eq!(s.by_category["uncategorized"], dec!(-132.10));
        assert_eq!(s.category_counts["groceries"], 2);
        let periods: Vec<_> = s.by_period.keys().cloned().collect();
        assert_eq!(periods, vec!["2024-03", "2024-04", "2024-05"]);
        assert_eq!(s.by_currency["EUR"], dec!(-0.01));
    }

    #[test]
    fn test_extras() {
        let s = analyze(&sample(), &MoneyPolicy::default());
        assert_eq!(s.record_count, 5);
        let range = s.date_range.unwrap();
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2024, 3, 30).unwrap());
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(s.largest_debit.unwrap().amount, dec!(-120.00));
        // 2313.57 / 5 = 462.714
        assert_eq!(s.average_amount, Some(dec!(462.71)));
    }

    #[test]
    fn test_empty_input() {
        let s = analyze(&[], &MoneyPolicy::default());
        assert_eq!(s.record_count, 0);
        assert!(s.net.is_zero());
        assert!(s.total_debit.is_zero() && s.total_credit.is_zero());
        assert!(s.by_category.is_empty() && s.by_period.is_empty());
        assert_eq!(s.by_category.values().copied().sum::<Decimal>(), s.net);
        assert!(s.date_range.is_none() && s.average_amount.is_none() && s.largest_debit.is_none());
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["net"], "0.00");
    }
}
