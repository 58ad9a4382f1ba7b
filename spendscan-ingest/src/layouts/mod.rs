//! Built-in statement layouts, most specific first.

pub mod capital_one_card;
pub mod chase_checking;
pub mod pl_bank_statement;
pub mod uk_current_account;

use crate::layout::LayoutSpec;

pub fn builtin_specs() -> Vec<LayoutSpec> {
    vec![
        chase_checking::spec(),
        capital_one_card::spec(),
        uk_current_account::spec(),
        pl_bank_statement::spec(),
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
