//! spendscan-core: expense model, fixed-point money, configuration,
//! categorization and analysis shared by the ingest and finance crates.

pub mod analysis;
pub mod categorizer;
pub mod config;
pub mod error;
pub mod expense;
pub mod money;
pub mod outcome;
pub mod validate;

pub use analysis::{analyze, AnalysisSummary};
pub use categorizer::{Categorizer, CategoryRule};
pub use config::{BatchConfig, DateOrder, EngineConfig};
pub use error::ValidationError;
pub use expense::ExpenseRecord;
pub use money::{MoneyPolicy, NumberFormat, Rounding};
pub use outcome::{BatchSummary, ErrorKind, ParseError, ParseResult, ParseStatus, UNKNOWN_FORMAT};
pub use validate::expenses_from_json;
