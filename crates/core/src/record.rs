//! Processed output records and the batch run report.
//!
//! Everything here is derived from a validated [`SessionData`](crate::SessionData)
//! and serialized to the output directory.

use crate::error::ErrorKind;
use crate::message::Role;
use crate::session::UserMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// --- Formatted conversation ---

/// One rendered conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedLine {
    /// 1-based position in the source conversation
    pub turn: usize,
    pub role: Role,
    /// Display label, a fixed function of `role`
    pub label: String,
    pub content: String,
}

/// Simple statistics over a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_turns: usize,
    pub user_turns: usize,
    pub assistant_turns: usize,
    pub system_turns: usize,
    pub total_chars: usize,
    /// Mean content length in characters, rounded to 2 decimals
    pub avg_length: f64,
}

/// Human-readable rendering of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedConversation {
    pub lines: Vec<FormattedLine>,
    /// `label: content` lines joined by newlines; empty for an empty conversation
    pub transcript: String,
    pub stats: ConversationStats,
}

impl FormattedConversation {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// --- Assessment summary ---

/// Aggregates for one assessment instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSummary {
    /// Instrument identifier, e.g. `phq9`
    pub instrument: String,
    /// Metadata key the responses were read from
    pub source_key: String,
    /// Entries included in the aggregates
    pub answered: u32,
    /// Entries excluded because of invalid values
    pub excluded: u32,
    pub total_score: u32,
    /// Item maximum times `answered`
    pub max_possible_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Total as stated by the source file, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_total: Option<i64>,
}

/// An assessment entry left out of the aggregates, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryWarning {
    pub instrument: String,
    pub entry: String,
    pub reason: String,
}

/// Statistical summary of the assessment data in a session's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub scales: Vec<ScaleSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<EntryWarning>,
}

impl AssessmentSummary {
    pub fn scale(&self, instrument: &str) -> Option<&ScaleSummary> {
        self.scales.iter().find(|s| s.instrument == instrument)
    }
}

// --- Analysis logs ---

/// A line of an analysis log left out of the aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineWarning {
    /// 1-based line number in the log file
    pub line: usize,
    pub reason: String,
}

/// Aggregates over one JSONL analysis log of a session folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisLogSummary {
    /// Log file name, e.g. `phq_analysis.jsonl`
    pub source: String,
    /// Non-blank lines
    pub total_rows: u32,
    /// `total_rows` minus the metadata entry
    pub data_rows: u32,
    /// First entry with `"type": "metadata"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Frame entries aggregated below
    pub frame_count: u32,
    pub emotion_distribution: BTreeMap<String, u32>,
    /// Per action unit: sum over frames divided by `frame_count`, 4 decimals
    pub average_au_intensities: BTreeMap<String, f64>,
    /// Matching statistics block from the session's `metadata.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_stats: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LineWarning>,
}

impl AnalysisLogSummary {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            total_rows: 0,
            data_rows: 0,
            metadata: None,
            frame_count: 0,
            emotion_distribution: BTreeMap::new(),
            average_au_intensities: BTreeMap::new(),
            analysis_stats: None,
            warnings: Vec::new(),
        }
    }
}

// --- Enrichment ---

/// What an LLM call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionResult {
    /// A JSON payload that passed shape validation
    Structured { payload: serde_json::Value },
    /// Free text
    Text { text: String },
}

/// The LLM-derived part of a processed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Enrichment {
    /// Enrichment is disabled
    Absent,
    /// Enrichment was attempted and failed; the record is degraded
    Unavailable { reason: String },
    Present {
        provider: String,
        model: String,
        result: CompletionResult,
    },
}

impl Enrichment {
    pub fn status(&self) -> EnrichmentStatus {
        match self {
            Enrichment::Absent => EnrichmentStatus::Absent,
            Enrichment::Unavailable { .. } => EnrichmentStatus::Unavailable,
            Enrichment::Present { .. } => EnrichmentStatus::Present,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Absent,
    Unavailable,
    Present,
}

// --- Artifacts ---

/// A raw source artifact copied next to the processed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// File name of the artifact
    pub name: String,
    /// Where it was copied from
    pub source: PathBuf,
    /// Where it was copied to, relative to the output root
    pub copied_to: PathBuf,
}

/// A designated artifact that could not be copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyWarning {
    pub source: PathBuf,
    pub reason: String,
}

// --- Processed record ---

/// The output of processing exactly one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub user: UserMetadata,
    pub processed_at: DateTime<Utc>,
    pub formatted_conversation: FormattedConversation,
    /// `null` when the session carries no assessment data
    pub summary: Option<AssessmentSummary>,
    pub enrichment: Enrichment,
    #[serde(default)]
    pub source_refs: Vec<SourceRef>,
    /// Summaries of the session folder's analysis logs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analysis_logs: Vec<AnalysisLogSummary>,
}

impl ProcessedRecord {
    /// Attach the artifacts copied for this record.
    pub fn with_source_refs(mut self, source_refs: Vec<SourceRef>) -> Self {
        self.source_refs = source_refs;
        self
    }

    pub fn with_analysis_logs(mut self, analysis_logs: Vec<AnalysisLogSummary>) -> Self {
        self.analysis_logs = analysis_logs;
        self
    }
}

// --- Batch reporting ---

/// The result of one batch input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Succeeded {
        input: String,
        output_path: PathBuf,
        enrichment: EnrichmentStatus,
        source_refs: Vec<SourceRef>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        copy_warnings: Vec<CopyWarning>,
    },
    Failed {
        input: String,
        kind: ErrorKind,
        message: String,
    },
    Skipped {
        input: String,
        reason: String,
    },
}

impl BatchOutcome {
    pub fn input(&self) -> &str {
        match self {
            BatchOutcome::Succeeded { input, .. }
            | BatchOutcome::Failed { input, .. }
            | BatchOutcome::Skipped { input, .. } => input,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, BatchOutcome::Failed { .. })
    }
}

/// Ordered outcomes of a batch run plus aggregate counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<BatchOutcome>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at,
            finished_at: None,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            outcomes: Vec::new(),
        }
    }

    /// Append an outcome and update the counts.
    pub fn record(&mut self, outcome: BatchOutcome) {
        match &outcome {
            BatchOutcome::Succeeded { .. } => self.succeeded += 1,
            BatchOutcome::Failed { .. } => self.failed += 1,
            BatchOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.finished_at = Some(at);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// A run succeeds when no item failed. Skips do not count as failures.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }
}
