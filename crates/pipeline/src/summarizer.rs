//! Assessment summarizer.
//!
//! Derives per-instrument aggregates from a session's metadata. Pure and
//! deterministic: no clock, no LLM, and `serde_json::Map` iterates in key
//! order.
//!
//! Entries that are not integers, or fall outside the instrument's item
//! range, are excluded from the aggregates and reported as warnings. The
//! same rule applies to every instrument.

use serde_json::{Map, Value};
use sessiondigest_core::record::{AssessmentSummary, EntryWarning, ScaleSummary};

use crate::formatter::round2;

/// A questionnaire the summarizer knows how to score.
#[derive(Debug)]
pub struct Instrument {
    /// Identifier written to the summary
    pub id: &'static str,
    /// Metadata key holding the responses
    pub key: &'static str,
    /// Highest score a single item can take (lowest is 0)
    pub item_max: u32,
    /// Upper-inclusive severity bands, ascending
    pub bands: &'static [(u32, &'static str)],
    /// Severity above the last band
    pub top_band: &'static str,
}

impl Instrument {
    pub fn severity(&self, total: u32) -> &'static str {
        self.bands
            .iter()
            .find(|(upper, _)| total <= *upper)
            .map(|(_, name)| *name)
            .unwrap_or(self.top_band)
    }
}

pub const PHQ9: Instrument = Instrument {
    id: "phq9",
    key: "phq_responses",
    item_max: 3,
    bands: &[
        (4, "minimal"),
        (9, "mild"),
        (14, "moderate"),
        (19, "moderately_severe"),
    ],
    top_band: "severe",
};

pub const GAD7: Instrument = Instrument {
    id: "gad7",
    key: "gad_responses",
    item_max: 3,
    bands: &[(4, "minimal"), (9, "mild"), (14, "moderate")],
    top_band: "severe",
};

/// Every instrument recognized in metadata, in output order.
pub const INSTRUMENTS: &[Instrument] = &[PHQ9, GAD7];

/// Summarize the assessment data in `metadata`.
///
/// Returns `None` when no recognized instrument key is present (or its value
/// is null). A recognized key with all-zero answers yields a summary with
/// zero totals, which is distinct from `None`.
pub fn summarize(metadata: &Map<String, Value>) -> Option<AssessmentSummary> {
    let mut scales = Vec::new();
    let mut warnings = Vec::new();

    for instrument in INSTRUMENTS {
        match metadata.get(instrument.key) {
            None | Some(Value::Null) => continue,
            Some(value) => scales.push(summarize_scale(instrument, value, &mut warnings)),
        }
    }

    if scales.is_empty() {
        None
    } else {
        Some(AssessmentSummary { scales, warnings })
    }
}

fn summarize_scale(
    instrument: &Instrument,
    value: &Value,
    warnings: &mut Vec<EntryWarning>,
) -> ScaleSummary {
    let mut warn = |entry: String, reason: String| {
        warnings.push(EntryWarning {
            instrument: instrument.id.to_string(),
            entry,
            reason,
        })
    };

    // Either a `{responses?, total_score?, ...}` wrapper or the responses
    // themselves.
    let (responses, reported_total) = match value {
        Value::Object(obj) if is_wrapper(obj) => (
            obj.get("responses"),
            obj.get("total_score").and_then(Value::as_i64),
        ),
        other => (Some(other), None),
    };

    let entries: Vec<(String, &Value)> = match responses {
        Some(Value::Object(items)) => items.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("[{i}]"), v))
            .collect(),
        None => {
            warn("responses".to_string(), "no responses recorded".to_string());
            Vec::new()
        }
        _ => {
            warn(
                "responses".to_string(),
                "expected an object or array of responses".to_string(),
            );
            Vec::new()
        }
    };

    let mut answered = 0u32;
    let mut excluded = 0u32;
    let mut total = 0u32;

    for (entry, raw) in entries {
        match entry_score(raw, instrument.item_max) {
            Ok(score) => {
                answered += 1;
                total += score;
            }
            Err(reason) => {
                excluded += 1;
                warn(entry, reason);
            }
        }
    }

    if let Some(reported) = reported_total {
        if reported != i64::from(total) {
            warn(
                "total_score".to_string(),
                format!("reported total {reported} differs from computed total {total}"),
            );
        }
    }

    let (mean_score, severity) = if answered > 0 {
        (
            Some(round2(f64::from(total) / f64::from(answered))),
            Some(instrument.severity(total).to_string()),
        )
    } else {
        (None, None)
    };

    ScaleSummary {
        instrument: instrument.id.to_string(),
        source_key: instrument.key.to_string(),
        answered,
        excluded,
        total_score: total,
        max_possible_score: instrument.item_max * answered,
        mean_score,
        severity,
        reported_total,
    }
}

fn is_wrapper(obj: &Map<String, Value>) -> bool {
    obj.contains_key("responses") || obj.contains_key("total_score")
}

/// Score of one response entry, or the reason it is excluded.
fn entry_score(value: &Value, item_max: u32) -> Result<u32, String> {
    let number = match value {
        Value::Object(obj) => match obj.get("score").or_else(|| obj.get("value")) {
            Some(inner) => inner,
            None => return Err("object entry has no 'score' or 'value'".to_string()),
        },
        other => other,
    };

    let Value::Number(n) = number else {
        return Err(format!("expected a number, found {}", kind_of(number)));
    };

    let score = if let Some(i) = n.as_i64() {
        i
    } else {
        match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.is_finite() => f as i64,
            _ => return Err(format!("expected an integer score, found {n}")),
        }
    };

    match u32::try_from(score) {
        Ok(s) if s <= item_max => Ok(s),
        _ => Err(format!("score {score} outside 0..={item_max}")),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
