//! Line-item parsing: page text -> candidate rows in document order.
//!
//! The scanning loop (sections, ignored lines, column headers, multi-line
//! descriptions) is shared; what counts as a row is decided by a `RowRule`,
//! either a registered layout's row pattern or the generic fallback.

pub mod generic;
pub mod layout_rows;

use regex::Regex;
use spendscan_core::{ErrorKind, ParseError};

use crate::layout::Layout;
use crate::types::{Candidate, LineItem, StopFlag};

/// End offsets (in chars) of the debit and credit column headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnOffsets {
    pub debit_end: usize,
    pub credit_end: usize,
}

pub enum RowMatch {
    Item(LineItem),
    Malformed(ParseError),
    /// Not a transaction candidate after all
    NotARow,
}

pub trait RowRule {
    /// Cheap check: could this line start a transaction row?
    fn is_candidate(&self, line: &str) -> bool;

    fn match_row(&self, line: &str, columns: Option<&ColumnOffsets>) -> RowMatch;
}

/// Everything around the rows: where they start and stop, what to skip.
#[derive(Debug, Default)]
pub struct Framing<'a> {
    pub section_start: Option<&'a Regex>,
    pub section_end: Option<&'a Regex>,
    pub ignore: &'a [Regex],
    pub column_headers: Option<(&'a Regex, &'a Regex)>,
    /// Scanning ends early once this is raised
    pub stop: Option<&'a StopFlag>,
}

impl<'a> Framing<'a> {
    pub fn for_layout(layout: &'a Layout) -> Self {
        Self {
            section_start: layout.section_start.as_ref(),
            section_end: layout.section_end.as_ref(),
            ignore: &layout.ignore,
            column_headers: layout.columns.as_ref().map(|(d, c)| (d, c)),
            stop: None,
        }
    }

    pub fn with_stop(self, stop: &'a StopFlag) -> Self {
        Self {
            stop: Some(stop),
            ..self
        }
    }

    fn stopped(&self) -> bool {
        self.stop.is_some_and(StopFlag::is_stopped)
    }

    fn header_offsets(&self, line: &str) -> Option<ColumnOffsets> {
        let (debit, credit) = self.column_headers?;
        let d = debit.find(line)?;
        let c = credit.find(line)?;
        Some(ColumnOffsets {
            debit_end: char_offset(line, d.end()),
            credit_end: char_offset(line, c.end()),
        })
    }

    fn is_ignored(&self, line: &str) -> bool {
        self.ignore.iter().any(|re| re.is_match(line))
    }
}

pub(crate) fn char_offset(line: &str, byte_offset: usize) -> usize {
    line[..byte_offset].chars().count()
}

/// Parse pages with a registered layout.
pub fn parse_with_layout(pages: &[String], layout: &Layout, stop: &StopFlag) -> Vec<Candidate> {
    let rule = layout_rows::LayoutRule::new(layout);
    scan(pages, &rule, &Framing::for_layout(layout).with_stop(stop))
}

/// Parse pages of an unrecognised statement.
pub fn parse_generic(pages: &[String], stop: &StopFlag) -> Vec<Candidate> {
    let ignore = generic::ignore_patterns();
    let framing = Framing {
        ignore,
        ..Framing::default()
    }
    .with_stop(stop);
    scan(pages, &generic::GenericRule, &framing)
}

pub fn scan<R: RowRule>(pages: &[String], rule: &R, framing: &Framing<'_>) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();
    let mut in_section = framing.section_start.is_none();
    let mut columns: Option<ColumnOffsets> = None;

    'pages: for (page_idx, page) in pages.iter().enumerate() {
        // index into `out` of the row that may still take continuation lines
        let mut open: Option<usize> = None;

        for (line_idx, raw) in page.lines().enumerate() {
            if framing.stopped() {
                break 'pages;
            }
            let line = raw.trim_end();
            if line.trim().is_empty() {
                open = None;
                continue;
            }

            let starts_section = framing.section_start.is_some_and(|re| re.is_match(line));
            if starts_section {
                in_section = true;
            }
            if let Some(offsets) = framing.header_offsets(line) {
                columns = Some(offsets);
                open = None;
                continue;
            }
            if starts_section {
                open = None;
                continue;
            }
            if !in_section {
                continue;
            }
            if framing.section_end.is_some_and(|re| re.is_match(line)) {
                in_section = false;
                open = None;
                continue;
            }
            if framing.is_ignored(line) {
                open = None;
                continue;
            }

            if rule.is_candidate(line) {
                match rule.match_row(line, columns.as_ref()) {
                    RowMatch::Item(mut item) => {
                        item.page = page_idx + 1;
                        item.line = line_idx + 1;
                        out.push(Candidate::Row(item));
                        open = Some(out.len() - 1);
                    }
                    RowMatch::Malformed(err) => {
                        out.push(Candidate::Rejected(err));
                        open = None;
                    }
                    RowMatch::NotARow => open = None,
                }
                continue;
            }

            // Continuation: no date, no trailing amount, directly under a row
            match open {
                Some(idx) if !generic::contains_date(line) && !generic::ends_with_money(line) => {
                    if let Some(Candidate::Row(item)) = out.get_mut(idx) {
                        item.append_continuation(line);
                    }
                }
                _ => open = None,
            }
        }
    }

    out
}

pub(crate) fn malformed_line(message: impl Into<String>, line: &str) -> ParseError {
    ParseError::new(ErrorKind::MalformedLine, message).with_line(line.trim())
}
