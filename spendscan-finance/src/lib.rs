//! spendscan-finance: batch orchestrator, CSV/XLSX encoders and the boundary
//! operations built on top of them.

pub mod api;
pub mod batch;
pub mod export;

pub use api::{analyze, export_csv, export_excel, parse_multiple_pdfs, parse_pdf, ApiError, CsvExport, ExcelExport};
pub use batch::{parse_batch, BatchError, BatchOptions, BatchReport, CancelToken, InputFile};
pub use export::{read_csv, write_csv, write_xlsx, ExportError};
