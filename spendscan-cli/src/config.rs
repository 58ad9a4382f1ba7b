use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spendscan_core::EngineConfig;
use spendscan_ingest::{LayoutRegistry, LayoutSpec, StatementEngine};
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of `config.toml`: engine settings at the top level plus any
/// extra statement layouts as `[[layouts]]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub engine: EngineConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layouts: Vec<LayoutSpec>,
}

impl Config {
    /// Custom layouts are tried before the built-in ones.
    pub fn build_engine(&self) -> Result<StatementEngine> {
        let registry = LayoutRegistry::with_custom(self.layouts.clone()).context("compile layouts")?;
        Ok(StatementEngine::new(registry, self.engine.clone()))
    }
}

pub fn spendscan_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".spendscan"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(spendscan_home()?.join("config.toml"))
}

pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_path(),
    }
}

/// A missing file is not an error; it means defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    save_config(path, &Config::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_survive_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.engine, EngineConfig::default());
        assert!(back.layouts.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
default_currency = "EUR"
fallback_date_order = "day_first"

[batch]
per_file_timeout_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(cfg.engine.default_currency, "EUR");
        assert_eq!(cfg.engine.batch.per_file_timeout_secs, 5);
        assert_eq!(cfg.engine.money.fraction_digits, 2);
        assert!(!cfg.engine.categories.is_empty());
    }

    #[test]
    fn test_custom_layout_from_toml() {
        let cfg: Config = toml::from_str(
            r#"
[[layouts]]
id = "acme_us"
name = "Acme US checking"
anchors = ["ACME SAVINGS BANK"]
row_start = '^\s*\d{2}/\d{2}/\d{4}\s'
row = '^\s*(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<desc>.+?)\s+(?P<amount>-?[\d,]*\.\d{2})\s*$'
date_formats = ["%m/%d/%Y"]
date_order = "month_first"
currency = "USD"
"#,
        )
        .unwrap();
        let engine = cfg.build_engine().unwrap();
        assert_eq!(engine.registry().layouts().next().map(|l| l.id()), Some("acme_us"));

        let pages = vec!["ACME SAVINGS BANK\n04/01/2024  GROCERY MART #221   -54.32\n".to_string()];
        let result = engine.parse_pages("april.pdf", &pages);
        assert_eq!(result.records()[0].description, "GROCERY MART #221");
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let cfg = load_config(Path::new("/nonexistent/spendscan/config.toml")).unwrap();
        assert_eq!(cfg.engine, EngineConfig::default());
    }
}
