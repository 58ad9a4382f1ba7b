//! Single-file pipeline: extract -> detect -> parse rows -> normalize.

use chrono::NaiveDate;
use spendscan_core::{Categorizer, EngineConfig, ErrorKind, ParseError, ParseResult, UNKNOWN_FORMAT};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};

use crate::extract::extract_pages;
use crate::layout::{Layout, LayoutError, LayoutRegistry};
use crate::normalize::{detect_currency, mask_account, normalize, StatementContext};
use crate::parsers;
use crate::types::{Candidate, StatementKind, StopFlag};

/// Parses statements against a fixed layout registry and configuration.
///
/// Holds no mutable state; one engine can serve any number of threads.
#[derive(Debug, Clone)]
pub struct StatementEngine {
    registry: LayoutRegistry,
    config: EngineConfig,
    categorizer: Categorizer,
}

impl StatementEngine {
    pub fn new(registry: LayoutRegistry, config: EngineConfig) -> Self {
        let categorizer = Categorizer::new(&config.categories);
        Self {
            registry,
            config,
            categorizer,
        }
    }

    /// Built-in layouts, default configuration.
    pub fn with_defaults() -> Result<Self, LayoutError> {
        Ok(Self::new(LayoutRegistry::builtin()?, EngineConfig::default()))
    }

    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parse_pdf(&self, source_file: &str, bytes: &[u8]) -> ParseResult {
        self.parse_pdf_until(source_file, bytes, &StopFlag::new())
    }

    /// Like `parse_pdf`, giving up with `Cancelled` once `stop` is raised.
    ///
    /// A panic anywhere in the pipeline is reported as `UnreadablePdf` for
    /// this file instead of unwinding into the caller.
    pub fn parse_pdf_until(&self, source_file: &str, bytes: &[u8], stop: &StopFlag) -> ParseResult {
        isolate(source_file, || {
            if stop.is_stopped() {
                return stopped(source_file);
            }
            match extract_pages(bytes) {
                Ok(pages) => self.parse_pages_until(source_file, &pages, stop),
                Err(e) => {
                    warn!(file = source_file, error = %e, "unreadable pdf");
                    ParseResult::failed(
                        source_file,
                        UNKNOWN_FORMAT,
                        ParseError::new(ErrorKind::UnreadablePdf, e.to_string()),
                    )
                }
            }
        })
    }

    /// Parse already-extracted page text.
    pub fn parse_pages(&self, source_file: &str, pages: &[String]) -> ParseResult {
        self.parse_pages_until(source_file, pages, &StopFlag::new())
    }

    pub fn parse_pages_until(&self, source_file: &str, pages: &[String], stop: &StopFlag) -> ParseResult {
        let layout = self.registry.detect(pages);
        let candidates = match layout {
            Some(l) => parsers::parse_with_layout(pages, l, stop),
            None => parsers::parse_generic(pages, stop),
        };
        if stop.is_stopped() {
            return stopped(source_file);
        }
        debug!(file = source_file, candidates = candidates.len(), "parsed line items");

        let ctx = self.context(source_file, pages, layout);
        let mut records = Vec::new();
        let mut errors = Vec::new();
        for candidate in candidates {
            if stop.is_stopped() {
                return stopped(source_file);
            }
            match candidate {
                Candidate::Row(item) => match normalize(&item, &ctx, &self.categorizer) {
                    Ok(record) => records.push(record),
                    Err(e) => errors.push(e),
                },
                Candidate::Rejected(e) => errors.push(e),
            }
        }

        if layout.is_none() && records.is_empty() && errors.is_empty() {
            errors.push(ParseError::new(
                ErrorKind::UnknownFormat,
                "no registered layout matched and no transaction rows were recognised",
            ));
        }

        let result = ParseResult::from_parts(
            source_file,
            layout.map(|l| l.id()).unwrap_or(UNKNOWN_FORMAT),
            records,
            errors,
        );
        info!(
            file = source_file,
            format = result.detected_format(),
            status = ?result.status(),
            records = result.records().len(),
            errors = result.errors().len(),
            "parsed statement"
        );
        result
    }

    fn context(&self, source_file: &str, pages: &[String], layout: Option<&Layout>) -> StatementContext {
        let first_page = pages.iter().find(|p| !p.trim().is_empty()).map(String::as_str).unwrap_or("");
        match layout {
            Some(layout) => {
                let spec = layout.spec();
                let money = match spec.fraction_digits {
                    Some(digits) => self.config.money.with_fraction_digits(digits),
                    None => self.config.money,
                };
                StatementContext {
                    source_file: source_file.to_string(),
                    kind: spec.kind,
                    date_formats: spec.date_formats.clone(),
                    date_order: spec.date_order,
                    period: statement_period(layout, pages),
                    number_format: Some(spec.number_format.clone()),
                    currency: Some(spec.currency.clone()),
                    document_currency: None,
                    default_currency: self.config.default_currency.clone(),
                    account: layout
                        .account
                        .as_ref()
                        .and_then(|re| pages.iter().find_map(|p| re.captures(p)))
                        .and_then(|caps| mask_account(&caps["number"])),
                    money,
                }
            }
            None => StatementContext {
                source_file: source_file.to_string(),
                kind: StatementKind::BankAccount,
                date_formats: Vec::new(),
                date_order: self.config.fallback_date_order,
                period: None,
                number_format: None,
                currency: None,
                document_currency: detect_currency(first_page),
                default_currency: self.config.default_currency.clone(),
                account: None,
                money: self.config.money,
            },
        }
    }
}

fn stopped(source_file: &str) -> ParseResult {
    debug!(file = source_file, "parse stopped");
    ParseResult::failed(
        source_file,
        UNKNOWN_FORMAT,
        ParseError::new(ErrorKind::Cancelled, "parsing stopped before the file was finished"),
    )
}

/// Run one file's parse, turning a panic into a failed result for that file.
fn isolate(source_file: &str, parse: impl FnOnce() -> ParseResult) -> ParseResult {
    catch_unwind(AssertUnwindSafe(parse)).unwrap_or_else(|panic| {
        let message = panic_message(panic.as_ref());
        warn!(file = source_file, error = %message, "parser panicked");
        ParseResult::failed(
            source_file,
            UNKNOWN_FORMAT,
            ParseError::new(ErrorKind::UnreadablePdf, format!("parser crashed: {message}")),
        )
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Start and end of the statement period, if the layout prints one.
fn statement_period(layout: &Layout, pages: &[String]) -> Option<(NaiveDate, NaiveDate)> {
    let re = layout.period.as_ref()?;
    let formats = &layout.spec().period.as_ref()?.formats;
    let caps = pages.iter().find_map(|p| re.captures(p))?;
    let parse = |text: &str| {
        let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");
        formats.iter().find_map(|f| NaiveDate::parse_from_str(&clean, f).ok())
    };
    let period = (parse(&caps["start"])?, parse(&caps["end"])?);
    debug!(layout = layout.id(), start = %period.0, end = %period.1, "statement period");
    Some(period)
}
