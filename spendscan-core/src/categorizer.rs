//! Keyword-table categorization of transaction descriptions.
//!
//! Rules are tried in order; the first rule with a keyword appearing as a
//! whole word (or phrase) in the case-folded description wins. No match means
//! uncategorized, never an error.

use serde::{Deserialize, Serialize};

/// One row of the keyword -> category table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Compiled, read-only categorizer built from a rule table.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<(String, Vec<String>)>,
}

impl Categorizer {
    pub fn new(rules: &[CategoryRule]) -> Self {
        let rules = rules
            .iter()
            .map(|r| {
                let keywords = r
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (r.category.clone(), keywords)
            })
            .collect();
        Self { rules }
    }

    pub fn categorize(&self, description: &str) -> Option<String> {
        let desc = description.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| contains_word(&desc, k)))
            .map(|(category, _)| category.clone())
    }
}

/// `keyword` occurs in `text` with no letter or digit directly before or
/// after it: "rent" matches "MAY RENT" but not "CURRENT".
fn contains_word(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(at, found)| {
        let before = text[..at].chars().next_back();
        let after = text[at + found.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(&default_rules())
    }
}

/// Built-in table. Order matters: more specific merchants first.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "income",
            &["payroll", "salary", "direct dep", "wynagrodzenie", "interest paid"],
        ),
        CategoryRule::new(
            "transfers",
            &["zelle", "venmo", "transfer", "przelew", "remitly", "western union", "wise.com"],
        ),
        CategoryRule::new(
            "credit_card",
            &["credit card", "card payment", "autopay", "amex", "american express", "e-payment"],
        ),
        CategoryRule::new(
            "subscriptions",
            &[
                "netflix", "spotify", "hulu", "youtube", "apple.com/bill", "icloud", "openai",
                "github", "notion", "figma", "microsoft",
            ],
        ),
        CategoryRule::new(
            "groceries",
            &["grocery", "supermarket", "market", "h-e-b", "whole foods", "trader joe", "biedronka", "lidl", "tesco"],
        ),
        CategoryRule::new(
            "dining",
            &["restaurant", "cafe", "coffee", "starbucks", "pizza", "doordash", "uber eats", "lunch"],
        ),
        CategoryRule::new(
            "transport",
            &["uber", "lyft", "taxi", "parking", "fuel", "shell", "chevron", "airline", "train", "clipper", "paliwo"],
        ),
        CategoryRule::new(
            "housing",
            &["rent", "lease", "apartment", "landlord", "mortgage", "czynsz"],
        ),
        CategoryRule::new(
            "utilities",
            &["electric", "water bill", "utility", "comcast", "verizon", "t-mobile", "internet"],
        ),
        CategoryRule::new(
            "education",
            &["tuition", "university", "student", "registrar"],
        ),
        CategoryRule::new(
            "shopping",
            &["amazon", "walmart", "target", "store", "shop", "sklep"],
        ),
        CategoryRule::new(
            "fees",
            &["fee", "commission", "prowizja", "opłata", "overdraft"],
        ),
    ]
}
