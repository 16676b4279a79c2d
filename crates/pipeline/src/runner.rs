//! Batch runner: processes many inputs with per-item failure isolation.
//!
//! Each item is loaded, validated, processed, has its raw artifacts copied
//! and its record written, independently of every other item. Any item
//! error becomes a `failed` outcome and the batch moves on. The only fatal
//! error is an output directory that cannot be created.
//!
//! Items run through an ordered buffer of `max_concurrency` futures, so the
//! report always lists outcomes in input order. Every item owns its output
//! directory: a second item with the same label fails instead of writing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::StreamExt;
use sessiondigest_core::error::{Error, IoError, ProcessingError};
use sessiondigest_core::record::{BatchOutcome, RunReport};
use sessiondigest_core::storage::Storage;
use tracing::{info, warn};
use uuid::Uuid;

use crate::artifacts::copy_artifacts;
use crate::discovery::{InputItem, InputKind};
use crate::processor::Processor;

/// File name of each processed record inside its item directory.
pub const RECORD_FILE: &str = "analysis_result.json";
/// File name of the run report at the output root.
pub const REPORT_FILE: &str = "run_report.json";
/// Subdirectory of an item directory that receives copied artifacts.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Errors that abort a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("cannot prepare output directory: {0}")]
    OutputRoot(#[source] IoError),
}

/// Runs batches of inputs through a [`Processor`].
pub struct BatchRunner {
    processor: Processor,
    storage: Arc<dyn Storage>,
    output_root: PathBuf,
    max_concurrency: usize,
    stop: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(
        processor: Processor,
        storage: Arc<dyn Storage>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            processor,
            storage,
            output_root: output_root.into(),
            max_concurrency: 1,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Process up to `n` items at once (`1` = sequential).
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    /// Share an externally owned stop flag.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Handle for requesting a stop. Items not yet started when it is
    /// raised are reported as skipped; in-flight items finish.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Run every item and return the report.
    ///
    /// The report is also written to `<output_root>/run_report.json`.
    pub async fn run(&self, items: &[InputItem]) -> Result<RunReport, BatchError> {
        self.storage
            .create_dir_all(&self.output_root)
            .await
            .map_err(BatchError::OutputRoot)?;

        let run_id = Uuid::new_v4().to_string();
        info!(
            run_id = %run_id,
            items = items.len(),
            concurrency = self.max_concurrency,
            output = %self.output_root.display(),
            "Batch started"
        );

        let mut report = RunReport::new(run_id, Utc::now());

        let mut claimed = HashSet::new();
        let duplicates: Vec<bool> = items
            .iter()
            .map(|item| {
                !matches!(item.kind, InputKind::Skipped { .. }) && !claimed.insert(&item.label)
            })
            .collect();

        let outcomes: Vec<BatchOutcome> = futures::stream::iter(items.iter().zip(duplicates))
            .map(|(item, duplicate)| self.run_item(item, duplicate))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }
        report.finish(Utc::now());

        info!(
            run_id = %report.run_id,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Batch finished"
        );

        self.write_report(&report).await;
        Ok(report)
    }

    async fn run_item(&self, item: &InputItem, duplicate: bool) -> BatchOutcome {
        let input = item.display_name();

        if self.stop.load(Ordering::SeqCst) {
            return BatchOutcome::Skipped {
                input,
                reason: "stop requested".into(),
            };
        }

        if let InputKind::Skipped { reason, .. } = &item.kind {
            info!(input = %input, reason = %reason, "Skipping input");
            return BatchOutcome::Skipped {
                input,
                reason: reason.clone(),
            };
        }

        let result = if duplicate {
            Err(IoError::OutputClaimed {
                path: self.output_root.join(&item.label),
            }
            .into())
        } else {
            self.process_item(item).await
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(input = %input, kind = %e.kind(), error = %e, "Item failed");
                BatchOutcome::Failed {
                    input,
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }

    async fn process_item(&self, item: &InputItem) -> Result<BatchOutcome, Error> {
        let storage = self.storage.as_ref();
        let loaded = item.load(storage).await?;
        let record = self.processor.process_session(&loaded.session).await?;

        let item_dir = self.output_root.join(&item.label);
        let copied = copy_artifacts(
            storage,
            &item.label,
            &loaded.artifacts,
            &item_dir.join(ARTIFACTS_DIR),
            &self.output_root,
        )
        .await?;

        let enrichment = record.enrichment.status();
        let record = record
            .with_source_refs(copied.copied.clone())
            .with_analysis_logs(loaded.analysis_logs);
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
        let output_path = item_dir.join(RECORD_FILE);
        storage.write(&output_path, &bytes).await?;

        Ok(BatchOutcome::Succeeded {
            input: item.display_name(),
            output_path,
            enrichment,
            source_refs: copied.copied,
            copy_warnings: copied.warnings,
        })
    }

    async fn write_report(&self, report: &RunReport) {
        let path = self.output_root.join(REPORT_FILE);
        let bytes = match serde_json::to_vec_pretty(report) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode run report");
                return;
            }
        };
        if let Err(e) = self.storage.write(&path, &bytes).await {
            warn!(error = %e, "Failed to write run report");
        }
    }
}
