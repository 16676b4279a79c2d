//! Reply normalization and shape validation.

use serde_json::{Value, json};
use sessiondigest_core::error::AdapterError;
use std::collections::HashSet;

/// Highest `score.phq` an indicator can take.
pub const PHQ_ITEM_MAX: u64 = 3;

/// Remove a surrounding markdown code fence (```` ```json ... ``` ````).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) on the opening line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.trim_end().trim_end_matches('`').trim()
}

/// Collapse every run of whitespace into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a structured reply and check it has the indicator-analysis shape.
///
/// On success the payload gains a computed `total_phq`.
pub fn parse_structured(raw: &str) -> Result<Value, AdapterError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(AdapterError::MalformedPayload("empty reply".into()));
    }

    let payload: Value = serde_json::from_str(body)
        .map_err(|e| AdapterError::MalformedPayload(format!("reply is not JSON: {e}")))?;

    validate_analysis(payload)
}

/// Validate `{ analysis: [{ indicator, context|evidence, score: { phq } }], notes? }`.
pub fn validate_analysis(mut payload: Value) -> Result<Value, AdapterError> {
    let mismatch = |msg: String| AdapterError::SchemaMismatch(msg);

    let obj = payload
        .as_object()
        .ok_or_else(|| mismatch("expected a JSON object".into()))?;

    let items = obj
        .get("analysis")
        .and_then(Value::as_array)
        .ok_or_else(|| mismatch("'analysis' must be an array".into()))?;

    let mut seen = HashSet::new();
    let mut total = 0u64;

    for (i, item) in items.iter().enumerate() {
        let path = format!("analysis[{i}]");

        let indicator = item
            .get("indicator")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| mismatch(format!("{path}.indicator must be a non-empty string")))?;

        if !seen.insert(indicator.to_string()) {
            return Err(mismatch(format!("{path}: indicator '{indicator}' appears twice")));
        }

        let has_context = ["context", "evidence"]
            .iter()
            .any(|k| item.get(*k).is_some_and(Value::is_string));
        if !has_context {
            return Err(mismatch(format!("{path} needs a 'context' or 'evidence' string")));
        }

        let score = item
            .get("score")
            .and_then(|s| s.get("phq"))
            .and_then(Value::as_u64)
            .filter(|n| *n <= PHQ_ITEM_MAX)
            .ok_or_else(|| {
                mismatch(format!("{path}.score.phq must be an integer 0..={PHQ_ITEM_MAX}"))
            })?;

        total += score;
    }

    match obj.get("notes") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => return Err(mismatch("'notes' must be a string".into())),
    }

    if let Some(map) = payload.as_object_mut() {
        map.insert("total_phq".into(), json!(total));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "analysis": [
            {"indicator": "Fatigue", "context": "says they are always tired", "score": {"phq": 2}},
            {"indicator": "Anhedonia", "evidence": "nothing is fun", "score": {"phq": 1}}
        ],
        "notes": "limited data"
    }"#;

    #[test]
    fn fence_is_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[1]```"), "[1]");
        assert_eq!(strip_code_fence("  plain  "), "plain");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(collapse_whitespace(" a\n\n b\tc "), "a b c");
    }

    #[test]
    fn valid_payload_gets_total() {
        let payload = parse_structured(VALID).unwrap();
        assert_eq!(payload["total_phq"], 3);
        assert_eq!(payload["notes"], "limited data");
    }

    #[test]
    fn fenced_payload_parses() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_structured(&fenced).is_ok());
    }

    #[test]
    fn prose_is_malformed() {
        let err = parse_structured("I think the user is fine.").unwrap_err();
        assert!(matches!(err, AdapterError::MalformedPayload(_)));
    }

    #[test]
    fn out_of_range_score_is_a_mismatch() {
        let raw = r#"{"analysis": [{"indicator": "Fatigue", "context": "x", "score": {"phq": 4}}]}"#;
        let err = parse_structured(raw).unwrap_err();
        assert!(matches!(err, AdapterError::SchemaMismatch(ref m) if m.contains("analysis[0].score.phq")));
    }

    #[test]
    fn missing_analysis_is_a_mismatch() {
        let err = parse_structured(r#"{"notes": "none"}"#).unwrap_err();
        assert!(matches!(err, AdapterError::SchemaMismatch(_)));
    }

    #[test]
    fn duplicate_indicator_is_a_mismatch() {
        let raw = r#"{"analysis": [
            {"indicator": "Fatigue", "context": "a", "score": {"phq": 1}},
            {"indicator": "Fatigue", "context": "b", "score": {"phq": 1}}
        ]}"#;
        assert!(matches!(
            parse_structured(raw).unwrap_err(),
            AdapterError::SchemaMismatch(_)
        ));
    }

    #[test]
    fn missing_context_is_a_mismatch() {
        let raw = r#"{"analysis": [{"indicator": "Fatigue", "score": {"phq": 1}}]}"#;
        assert!(parse_structured(raw).is_err());
    }
}
