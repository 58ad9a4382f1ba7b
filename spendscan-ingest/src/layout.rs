//! Statement layouts: plain-data descriptors, compiled once into a registry.
//!
//! A layout says how to recognise a bank's statement (anchors), where its
//! transaction rows live (section markers, ignore patterns), what a row looks
//! like (row regex with named groups) and how to read dates and amounts.
//! Adding a bank means registering another `LayoutSpec`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use spendscan_core::{DateOrder, NumberFormat};
use thiserror::Error;
use tracing::debug;

use crate::layouts;
use crate::types::StatementKind;

fn default_header_window() -> usize {
    40
}

fn default_number_format() -> NumberFormat {
    NumberFormat::us()
}

/// Debit / credit column headers for statements that print unsigned amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub debit_header: String,
    pub credit_header: String,
}

/// Where the statement period is printed, for rows that omit the year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSpec {
    /// Regex with named groups `start` and `end`
    pub pattern: String,
    /// chrono formats tried on the captured dates
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: StatementKind,
    /// All must match within the first `header_window` non-blank lines
    pub anchors: Vec<String>,
    #[serde(default = "default_header_window")]
    pub header_window: usize,
    #[serde(default)]
    pub section_start: Option<String>,
    #[serde(default)]
    pub section_end: Option<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Prefix marking a candidate row (usually the date token)
    pub row_start: String,
    /// Full row; groups: `date`, `amount` or `debit`/`credit`, optional
    /// `desc`. Other groups (`post_date`, `balance`) only shape the match.
    pub row: String,
    #[serde(default)]
    pub columns: Option<ColumnSpec>,
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub date_order: Option<DateOrder>,
    #[serde(default)]
    pub period: Option<PeriodSpec>,
    /// Regex with a named group `number`
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default = "default_number_format")]
    pub number_format: NumberFormat,
    pub currency: String,
    #[serde(default)]
    pub fraction_digits: Option<u32>,
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout '{layout}': invalid {field} pattern: {source}")]
    InvalidPattern {
        layout: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("layout '{layout}': {field} pattern needs a `{group}` group")]
    MissingGroup {
        layout: String,
        field: &'static str,
        group: &'static str,
    },
    #[error("layout '{0}' has no anchors")]
    NoAnchors(String),
    #[error("layout '{0}' is already registered")]
    DuplicateId(String),
}

/// A `LayoutSpec` with its patterns compiled.
#[derive(Debug, Clone)]
pub struct Layout {
    spec: LayoutSpec,
    anchors: Vec<Regex>,
    pub(crate) section_start: Option<Regex>,
    pub(crate) section_end: Option<Regex>,
    pub(crate) ignore: Vec<Regex>,
    pub(crate) row_start: Regex,
    pub(crate) row: Regex,
    pub(crate) columns: Option<(Regex, Regex)>,
    pub(crate) period: Option<Regex>,
    pub(crate) account: Option<Regex>,
}

fn compile(layout: &str, field: &'static str, pattern: &str) -> Result<Regex, LayoutError> {
    Regex::new(pattern).map_err(|source| LayoutError::InvalidPattern {
        layout: layout.to_string(),
        field,
        source,
    })
}

fn has_group(re: &Regex, group: &str) -> bool {
    re.capture_names().flatten().any(|n| n == group)
}

impl Layout {
    pub fn compile(spec: LayoutSpec) -> Result<Self, LayoutError> {
        let id = spec.id.clone();
        if spec.anchors.is_empty() {
            return Err(LayoutError::NoAnchors(id));
        }
        let anchors = spec
            .anchors
            .iter()
            .map(|a| compile(&id, "anchor", a))
            .collect::<Result<Vec<_>, _>>()?;
        let ignore = spec
            .ignore
            .iter()
            .map(|p| compile(&id, "ignore", p))
            .collect::<Result<Vec<_>, _>>()?;
        let section_start = spec.section_start.as_deref().map(|p| compile(&id, "section_start", p)).transpose()?;
        let section_end = spec.section_end.as_deref().map(|p| compile(&id, "section_end", p)).transpose()?;
        let row_start = compile(&id, "row_start", &spec.row_start)?;
        let row = compile(&id, "row", &spec.row)?;

        let missing = |group| LayoutError::MissingGroup {
            layout: id.clone(),
            field: "row",
            group,
        };
        if !has_group(&row, "date") {
            return Err(missing("date"));
        }
        let split_columns = has_group(&row, "debit") && has_group(&row, "credit");
        if !has_group(&row, "amount") && !split_columns {
            return Err(missing("amount"));
        }

        let columns = match &spec.columns {
            Some(c) => Some((
                compile(&id, "columns.debit_header", &c.debit_header)?,
                compile(&id, "columns.credit_header", &c.credit_header)?,
            )),
            None => None,
        };

        let period = match &spec.period {
            Some(p) => {
                let re = compile(&id, "period", &p.pattern)?;
                for group in ["start", "end"] {
                    if !has_group(&re, group) {
                        return Err(LayoutError::MissingGroup {
                            layout: id.clone(),
                            field: "period",
                            group,
                        });
                    }
                }
                Some(re)
            }
            None => None,
        };

        let account = match spec.account.as_deref() {
            Some(p) => {
                let re = compile(&id, "account", p)?;
                if !has_group(&re, "number") {
                    return Err(LayoutError::MissingGroup {
                        layout: id.clone(),
                        field: "account",
                        group: "number",
                    });
                }
                Some(re)
            }
            None => None,
        };

        Ok(Self {
            spec,
            anchors,
            section_start,
            section_end,
            ignore,
            row_start,
            row,
            columns,
            period,
            account,
        })
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &LayoutSpec {
        &self.spec
    }

    /// True when every anchor matches somewhere in the header window.
    pub fn matches_header(&self, header: &str) -> bool {
        self.anchors.iter().all(|a| a.is_match(header))
    }
}

/// Ordered set of layouts; read-only once built.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    layouts: Vec<Layout>,
}

impl LayoutRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in bank layouts, most specific first.
    pub fn builtin() -> Result<Self, LayoutError> {
        Self::with_custom(Vec::new())
    }

    /// Caller-supplied layouts take precedence over the built-in ones.
    pub fn with_custom(custom: Vec<LayoutSpec>) -> Result<Self, LayoutError> {
        let mut registry = Self::empty();
        for spec in custom.into_iter().chain(layouts::builtin_specs()) {
            registry.register(spec)?;
        }
        Ok(registry)
    }

    /// Append a layout; it is tried after everything already registered.
    pub fn register(&mut self, spec: LayoutSpec) -> Result<(), LayoutError> {
        if self.get(&spec.id).is_some() {
            return Err(LayoutError::DuplicateId(spec.id));
        }
        self.layouts.push(Layout::compile(spec)?);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.id() == id)
    }

    pub fn layouts(&self) -> impl Iterator<Item = &Layout> {
        self.layouts.iter()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// First layout whose anchors all match the top of the statement.
    pub fn detect(&self, pages: &[String]) -> Option<&Layout> {
        let first_page = pages.iter().find(|p| !p.trim().is_empty())?;
        let detected = self
            .layouts
            .iter()
            .find(|layout| layout.matches_header(&header_window(first_page, layout.spec.header_window)));
        debug!(layout = detected.map(|l| l.id()).unwrap_or("unknown"), "format detection");
        detected
    }
}

fn header_window(page: &str, lines: usize) -> String {
    page.lines()
        .filter(|l| !l.trim().is_empty())
        .take(lines)
        .collect::<Vec<_>>()
        .join("\n")
}
