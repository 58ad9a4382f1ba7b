//! spendscan-ingest: statement PDF text extraction, layout registry and
//! detection, line-item parsers and normalization into expense records.

pub mod engine;
pub mod extract;
pub mod layout;
pub mod layouts;
pub mod normalize;
pub mod parsers;
pub mod types;

pub use engine::StatementEngine;
pub use extract::{extract_pages, ExtractError};
pub use layout::{ColumnSpec, Layout, LayoutError, LayoutRegistry, LayoutSpec, PeriodSpec};
pub use types::{AmountText, Candidate, LineItem, StatementKind, StopFlag};
