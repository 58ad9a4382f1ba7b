//! Boundary operations. Input is untyped JSON or raw file bytes; everything is
//! validated once here and handed to the typed pipeline.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spendscan_core::{expenses_from_json, AnalysisSummary, EngineConfig, ExpenseRecord, ParseResult, ValidationError};
use spendscan_ingest::StatementEngine;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::{parse_batch, BatchError, BatchOptions, BatchReport, CancelToken, InputFile};
use crate::export::{write_csv, write_xlsx, ExportError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvExport {
    pub csv_content: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcelExport {
    /// Base64, standard alphabet.
    pub excel_content: String,
    pub filename: String,
}

pub fn parse_pdf(engine: &StatementEngine, name: &str, bytes: &[u8]) -> ParseResult {
    engine.parse_pdf(name, bytes)
}

/// Batch parse using the engine's configured worker and timeout limits.
pub async fn parse_multiple_pdfs(
    engine: Arc<StatementEngine>,
    files: Vec<InputFile>,
    cancel: &CancelToken,
) -> Result<BatchReport, BatchError> {
    let options = BatchOptions::from(&engine.config().batch);
    parse_batch(engine, files, &options, cancel).await
}

fn validated(expenses: &Value, config: &EngineConfig, op: &str) -> Result<Vec<ExpenseRecord>, ValidationError> {
    expenses_from_json(expenses, config).inspect_err(|e| {
        warn!(op, kind = %e.kind(), index = ?e.index(), error = %e, "rejected expense input");
    })
}

pub fn export_csv(expenses: &Value, config: &EngineConfig) -> Result<CsvExport, ApiError> {
    let records = validated(expenses, config, "export_csv")?;
    let csv_content = write_csv(&records, &config.money)?;
    let filename = export_filename("csv");
    info!(records = records.len(), filename = %filename, "csv export");
    Ok(CsvExport { csv_content, filename })
}

pub fn export_excel(expenses: &Value, config: &EngineConfig) -> Result<ExcelExport, ApiError> {
    let records = validated(expenses, config, "export_excel")?;
    let bytes = write_xlsx(&records, &config.money)?;
    let filename = export_filename("xlsx");
    info!(records = records.len(), bytes = bytes.len(), filename = %filename, "excel export");
    Ok(ExcelExport {
        excel_content: STANDARD.encode(bytes),
        filename,
    })
}

pub fn analyze(expenses: &Value, config: &EngineConfig) -> Result<AnalysisSummary, ValidationError> {
    let records = validated(expenses, config, "analyze")?;
    Ok(spendscan_core::analyze(&records, &config.money))
}

pub fn export_filename(ext: &str) -> String {
    export_filename_at(ext, Utc::now(), Uuid::new_v4())
}

/// `expenses_YYYYMMDD_HHMMSS_<first 8 hex of id>.<ext>`
pub fn export_filename_at(ext: &str, at: DateTime<Utc>, id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("expenses_{}_{}.{ext}", at.format("%Y%m%d_%H%M%S"), &hex[..8])
}
