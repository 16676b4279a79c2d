//! Analysis log summarizer.
//!
//! Session folders can carry JSONL logs of the facial-expression analysis
//! captured while the session ran, one frame per line plus an optional
//! `"type": "metadata"` header. Each log is reduced to row counts, its
//! metadata entry, an emotion distribution and mean action-unit (AU)
//! intensities.
//!
//! Lines that are not JSON objects, and AU values that are not numbers, are
//! left out of the aggregates and reported as warnings.

use std::collections::BTreeMap;

use serde_json::Value;
use sessiondigest_core::record::{AnalysisLogSummary, LineWarning};

use crate::summarizer::kind_of;

/// A JSONL log a session folder may hold.
#[derive(Debug)]
pub struct AnalysisLog {
    pub file: &'static str,
    /// Key of the matching statistics block in `metadata.json`
    pub stats_key: &'static str,
}

pub const PHQ_ANALYSIS: AnalysisLog = AnalysisLog {
    file: "phq_analysis.jsonl",
    stats_key: "phq_analysis",
};

pub const LLM_ANALYSIS: AnalysisLog = AnalysisLog {
    file: "llm_analysis.jsonl",
    stats_key: "llm_analysis",
};

/// Every log summarized for a session folder, in output order.
pub const ANALYSIS_LOGS: &[AnalysisLog] = &[PHQ_ANALYSIS, LLM_ANALYSIS];

/// Summarize the text of one analysis log.
///
/// `source` is recorded as the summary's file name.
pub fn summarize_log(source: &str, text: &str) -> AnalysisLogSummary {
    let mut summary = AnalysisLogSummary::new(source);
    let mut au_sums: BTreeMap<String, f64> = BTreeMap::new();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        summary.total_rows += 1;

        let entry = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(entry)) => entry,
            Ok(other) => {
                summary.warnings.push(LineWarning {
                    line: line_no,
                    reason: format!("expected an object, found {}", kind_of(&other)),
                });
                continue;
            }
            Err(e) => {
                summary.warnings.push(LineWarning {
                    line: line_no,
                    reason: format!("malformed JSON: {e}"),
                });
                continue;
            }
        };

        match entry.get("type").and_then(Value::as_str) {
            Some("metadata") => {
                if summary.metadata.is_none() {
                    summary.metadata = Some(Value::Object(entry));
                }
                continue;
            }
            Some("summary") => continue,
            _ => {}
        }

        summary.frame_count += 1;
        let analysis = entry.get("analysis").and_then(Value::as_object);

        let expression = analysis
            .and_then(|a| a.get("facial_expression"))
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty());
        if let Some(expression) = expression {
            *summary
                .emotion_distribution
                .entry(expression.to_string())
                .or_insert(0) += 1;
        }

        let intensities = analysis
            .and_then(|a| a.get("au_intensities"))
            .and_then(Value::as_object);
        for (au, value) in intensities.into_iter().flatten() {
            match value.as_f64() {
                Some(v) => *au_sums.entry(au.clone()).or_insert(0.0) += v,
                None => summary.warnings.push(LineWarning {
                    line: line_no,
                    reason: format!("action unit '{au}' is {}, not a number", kind_of(value)),
                }),
            }
        }
    }

    summary.data_rows = summary
        .total_rows
        .saturating_sub(u32::from(summary.metadata.is_some()));

    if summary.frame_count > 0 {
        let frames = f64::from(summary.frame_count);
        summary.average_au_intensities = au_sums
            .into_iter()
            .map(|(au, total)| (au, round4(total / frames)))
            .collect();
    }

    summary
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
