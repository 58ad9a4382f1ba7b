//! Batch orchestrator: one blocking task per file, bounded by a semaphore,
//! merged back into input order after every task settles.
//!
//! A worker permit is held by the blocking parse itself, so a file that timed
//! out or was cancelled keeps its slot until the parser notices its stop flag.

use serde::{Deserialize, Serialize};
use spendscan_core::{BatchConfig, BatchSummary, ErrorKind, ParseError, ParseResult, UNKNOWN_FORMAT};
use spendscan_ingest::{StatementEngine, StopFlag};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One uploaded statement.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub workers: usize,
    pub per_file_timeout: Duration,
    pub batch_timeout: Option<Duration>,
}

impl From<&BatchConfig> for BatchOptions {
    fn from(cfg: &BatchConfig) -> Self {
        Self {
            workers: cfg.workers(),
            per_file_timeout: cfg.per_file_timeout(),
            batch_timeout: cfg.batch_timeout(),
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

/// Caller-side cancellation, e.g. when the client disconnects.
///
/// Clones share state; cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives as long as self, so changed() only errors if it is dropped
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no files supplied")]
    NoFiles,
}

/// `parse_multiple_pdfs` response: one result per input, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<ParseResult>,
    pub summary: BatchSummary,
}

/// Raises the file's stop flag when its task ends for any reason: finished,
/// timed out, cancelled, or aborted by the batch deadline.
struct StopOnDrop(StopFlag);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}

fn failed(name: &str, kind: ErrorKind, message: impl Into<String>) -> ParseResult {
    ParseResult::failed(name, UNKNOWN_FORMAT, ParseError::new(kind, message))
}

/// Parse every file independently; a failing file never affects the others.
pub async fn parse_batch(
    engine: Arc<StatementEngine>,
    files: Vec<InputFile>,
    options: &BatchOptions,
    cancel: &CancelToken,
) -> Result<BatchReport, BatchError> {
    if files.is_empty() {
        return Err(BatchError::NoFiles);
    }

    let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
    let deadline = options.batch_timeout.map(|d| Instant::now() + d);
    info!(files = files.len(), workers = options.workers, "starting batch");

    let mut tasks = JoinSet::new();
    for (index, file) in files.into_iter().enumerate() {
        let engine = Arc::clone(&engine);
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        let per_file = options.per_file_timeout;

        tasks.spawn(async move {
            let name = file.name.clone();
            let permit = tokio::select! {
                permit = semaphore.acquire_owned() => permit,
                _ = cancel.cancelled() => {
                    return (index, failed(&name, ErrorKind::Cancelled, "batch cancelled before the file was parsed"));
                }
            };
            let Ok(permit) = permit else {
                return (index, failed(&name, ErrorKind::Cancelled, "worker pool closed"));
            };
            if cancel.is_cancelled() {
                return (index, failed(&name, ErrorKind::Cancelled, "batch cancelled before the file was parsed"));
            }

            let stop = StopFlag::new();
            let _stop_on_exit = StopOnDrop(stop.clone());
            let job = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                engine.parse_pdf_until(&file.name, &file.bytes, &stop)
            });
            let result = tokio::select! {
                outcome = tokio::time::timeout(per_file, job) => match outcome {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        warn!(file = %name, error = %e, "parser task panicked");
                        failed(&name, ErrorKind::UnreadablePdf, format!("parser crashed: {e}"))
                    }
                    Err(_) => {
                        warn!(file = %name, timeout = ?per_file, "file timed out");
                        failed(&name, ErrorKind::Timeout, format!("parsing exceeded {per_file:?}"))
                    }
                },
                _ = cancel.cancelled() => failed(&name, ErrorKind::Cancelled, "batch cancelled while the file was being parsed"),
            };
            (index, result)
        });
    }

    let mut slots: Vec<Option<ParseResult>> = vec![None; names.len()];
    let mut expired = false;
    loop {
        let next = match deadline {
            Some(at) => {
                let waited = if Instant::now() < at {
                    tokio::time::timeout_at(at, tasks.join_next()).await.ok()
                } else {
                    None
                };
                match waited {
                    Some(next) => next,
                    None => {
                        warn!(pending = tasks.len(), "batch timeout elapsed");
                        expired = true;
                        tasks.abort_all();
                        // keep whatever finished before the abort landed
                        while let Some(joined) = tasks.join_next().await {
                            if let Ok((index, result)) = joined {
                                slots[index] = Some(result);
                            }
                        }
                        break;
                    }
                }
            }
            None => tasks.join_next().await,
        };
        match next {
            Some(Ok((index, result))) => {
                debug!(file = result.source_file(), status = ?result.status(), "file settled");
                slots[index] = Some(result);
            }
            Some(Err(e)) => warn!(error = %e, "batch task ended without a result"),
            None => break,
        }
    }

    let results: Vec<ParseResult> = slots
        .into_iter()
        .zip(&names)
        .map(|(slot, name)| {
            slot.unwrap_or_else(|| {
                if expired {
                    failed(name, ErrorKind::Timeout, "batch timeout elapsed before the file finished")
                } else {
                    failed(name, ErrorKind::Cancelled, "file was not parsed")
                }
            })
        })
        .collect();

    let summary = BatchSummary::from_results(&results);
    info!(
        total = summary.total_files,
        succeeded = summary.succeeded,
        partial = summary.partial,
        failed = summary.failed,
        records = summary.total_records,
        "batch finished"
    );
    Ok(BatchReport { results, summary })
}
