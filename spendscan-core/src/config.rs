//! Engine configuration: money policy, defaults, category table, batch limits.
//!
//! Everything here is plain serde data so the CLI can load it from
//! `config.toml`; a missing file means `EngineConfig::default()`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::categorizer::{default_rules, CategoryRule};
use crate::money::MoneyPolicy;

/// Day/month ordering for slashed or dotted numeric dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// 03/04/2024 is 3 April
    DayFirst,
    /// 03/04/2024 is 4 March
    MonthFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub money: MoneyPolicy,
    pub default_currency: String,
    /// Date order for statements of unknown layout. `None` reports
    /// ambiguous dates instead of guessing.
    pub fallback_date_order: Option<DateOrder>,
    pub categories: Vec<CategoryRule>,
    pub batch: BatchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            money: MoneyPolicy::default(),
            default_currency: "USD".to_string(),
            fallback_date_order: None,
            categories: default_rules(),
            batch: BatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker count; `None` uses the number of available cores.
    pub max_workers: Option<usize>,
    pub per_file_timeout_secs: u64,
    pub batch_timeout_secs: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            per_file_timeout_secs: 30,
            batch_timeout_secs: None,
        }
    }
}

impl BatchConfig {
    pub fn workers(&self) -> usize {
        self.max_workers
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
    }

    pub fn per_file_timeout(&self) -> Duration {
        Duration::from_secs(self.per_file_timeout_secs.max(1))
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.money.fraction_digits, 2);
        assert_eq!(cfg.default_currency, "USD");
        assert!(cfg.fallback_date_order.is_none());
        assert!(!cfg.categories.is_empty());
        assert!(cfg.batch.workers() >= 1);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"default_currency":"PLN","batch":{"max_workers":2}}"#).unwrap();
        assert_eq!(cfg.default_currency, "PLN");
        assert_eq!(cfg.batch.workers(), 2);
        assert_eq!(cfg.batch.per_file_timeout_secs, 30);
        assert_eq!(cfg.money, MoneyPolicy::default());
    }

    #[test]
    fn test_zero_workers_falls_back_to_cores() {
        let batch = BatchConfig {
            max_workers: Some(0),
            ..BatchConfig::default()
        };
        assert!(batch.workers() >= 1);
    }
}
