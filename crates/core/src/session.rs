//! Session input records and the validation pass that builds them.
//!
//! A [`SessionData`] can only be obtained through [`SessionData::parse`] (or
//! [`SessionData::from_slice`]), so holding one means the record already
//! passed validation. Validation is strict: values are never coerced across
//! JSON types, and every issue found is reported, not just the first.

use crate::error::{FieldIssue, ValidationError};
use crate::message::Role;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of the user and session a record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub user_id: String,
    pub session_id: String,
}

/// A single turn of the recorded LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,

    /// Ordinal from the source export, when it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            turn_number: None,
            timestamp: None,
        }
    }
}

/// One validated processing unit.
///
/// Fields are private: the record is immutable once validated and consumers
/// derive new records from it instead of editing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionData {
    user: UserMetadata,
    llm_conversation: Vec<ConversationTurn>,
    metadata: Map<String, Value>,
}

impl SessionData {
    /// Validate raw JSON bytes into a session record.
    ///
    /// Bytes that are not JSON at all are a validation failure too.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ValidationError::single("$", format!("malformed JSON: {e}")))?;
        Self::parse(&value)
    }

    /// Validate a parsed JSON value into a session record.
    pub fn parse(value: &Value) -> Result<Self, ValidationError> {
        let Some(root) = value.as_object() else {
            return Err(ValidationError::single(
                "$",
                format!("expected an object, found {}", type_name(value)),
            ));
        };

        let mut issues = Vec::new();
        let user = parse_user(root.get("user"), &mut issues);
        let llm_conversation = parse_conversation(root.get("llm_conversation"), &mut issues);
        let metadata = match root.get("metadata") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                issues.push(FieldIssue::new(
                    "metadata",
                    format!("expected an object, found {}", type_name(other)),
                ));
                Map::new()
            }
        };

        match user {
            Some(user) if issues.is_empty() => Ok(Self {
                user,
                llm_conversation,
                metadata,
            }),
            _ => Err(ValidationError::new(issues)),
        }
    }

    pub fn user(&self) -> &UserMetadata {
        &self.user
    }

    /// The conversation in chronological order.
    pub fn conversation(&self) -> &[ConversationTurn] {
        &self.llm_conversation
    }

    /// Free-form metadata, including any assessment responses.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

fn parse_user(value: Option<&Value>, issues: &mut Vec<FieldIssue>) -> Option<UserMetadata> {
    let obj = match value {
        Some(Value::Object(obj)) => obj,
        None | Some(Value::Null) => {
            issues.push(FieldIssue::new("user", "is required"));
            return None;
        }
        Some(other) => {
            issues.push(FieldIssue::new(
                "user",
                format!("expected an object, found {}", type_name(other)),
            ));
            return None;
        }
    };

    let user_id = required_id(obj, "user_id", "user.user_id", issues);
    let session_id = required_id(obj, "session_id", "user.session_id", issues);
    Some(UserMetadata {
        user_id: user_id?,
        session_id: session_id?,
    })
}

/// Identifiers must be non-empty strings; numbers are not stringified.
fn required_id(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            issues.push(FieldIssue::new(path, "must not be empty"));
            None
        }
        None | Some(Value::Null) => {
            issues.push(FieldIssue::new(path, "is required"));
            None
        }
        Some(other) => {
            issues.push(FieldIssue::new(
                path,
                format!("expected a string, found {}", type_name(other)),
            ));
            None
        }
    }
}

fn parse_conversation(value: Option<&Value>, issues: &mut Vec<FieldIssue>) -> Vec<ConversationTurn> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            issues.push(FieldIssue::new(
                "llm_conversation",
                format!("expected an array, found {}", type_name(other)),
            ));
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| parse_turn(item, &format!("llm_conversation[{i}]"), issues))
        .collect()
}

fn parse_turn(value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Option<ConversationTurn> {
    let Some(obj) = value.as_object() else {
        issues.push(FieldIssue::new(
            path,
            format!("expected an object, found {}", type_name(value)),
        ));
        return None;
    };

    let role = match obj.get("role") {
        Some(Value::String(name)) => match Role::parse(name) {
            Some(role) => Some(role),
            None => {
                issues.push(FieldIssue::new(
                    format!("{path}.role"),
                    format!("unrecognized role '{name}' (expected user, assistant or system)"),
                ));
                None
            }
        },
        None | Some(Value::Null) => {
            issues.push(FieldIssue::new(format!("{path}.role"), "is required"));
            None
        }
        Some(other) => {
            issues.push(FieldIssue::new(
                format!("{path}.role"),
                format!("expected a string, found {}", type_name(other)),
            ));
            None
        }
    };

    let content = match obj.get("content") {
        Some(Value::String(s)) => Some(s.clone()),
        None | Some(Value::Null) => {
            issues.push(FieldIssue::new(format!("{path}.content"), "is required"));
            None
        }
        Some(other) => {
            issues.push(FieldIssue::new(
                format!("{path}.content"),
                format!("expected a string, found {}", type_name(other)),
            ));
            None
        }
    };

    let turn_number = match obj.get("turn_number") {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) => Some(n),
            None => {
                issues.push(FieldIssue::new(
                    format!("{path}.turn_number"),
                    format!("expected a non-negative integer, found {}", type_name(v)),
                ));
                None
            }
        },
    };

    let timestamp = match obj.get("timestamp") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            issues.push(FieldIssue::new(
                format!("{path}.timestamp"),
                format!("expected a string, found {}", type_name(other)),
            ));
            None
        }
    };

    Some(ConversationTurn {
        role: role?,
        content: content?,
        turn_number,
        timestamp,
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_session() {
        let value = json!({
            "user": {"user_id": "u1", "session_id": "s1"},
            "llm_conversation": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ],
            "metadata": {}
        });
        let session = SessionData::parse(&value).unwrap();
        assert_eq!(session.user().user_id, "u1");
        assert_eq!(session.conversation().len(), 2);
        assert_eq!(session.conversation()[0].role, Role::User);
        assert_eq!(session.conversation()[1].content, "hello");
        assert!(session.metadata().is_empty());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let value = json!({
            "user": {"user_id": "u1", "session_id": "s1"},
            "llm_conversation": [{"role": "narrator", "content": "Once upon a time"}]
        });
        let err = SessionData::parse(&value).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "llm_conversation[0].role");
        assert!(err.issues[0].message.contains("narrator"));
    }

    #[test]
    fn numeric_id_is_not_stringified() {
        let value = json!({"user": {"user_id": 42, "session_id": "s1"}});
        let err = SessionData::parse(&value).unwrap_err();
        assert_eq!(err.issues[0].path, "user.user_id");
        assert!(err.issues[0].message.contains("number"));
    }

    #[test]
    fn collects_every_issue() {
        let value = json!({
            "user": {"user_id": "", "session_id": null},
            "llm_conversation": [{"role": "user"}, "oops"],
            "metadata": []
        });
        let err = SessionData::parse(&value).unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "user.user_id",
                "user.session_id",
                "llm_conversation[0].content",
                "llm_conversation[1]",
                "metadata"
            ]
        );
    }

    #[test]
    fn missing_user_is_required() {
        let err = SessionData::parse(&json!({"llm_conversation": []})).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::new("user", "is required")]);
    }

    #[test]
    fn optional_sections_default_to_empty() {
        let session =
            SessionData::parse(&json!({"user": {"user_id": "u", "session_id": "s"}})).unwrap();
        assert!(session.conversation().is_empty());
        assert!(session.metadata().is_empty());
    }

    #[test]
    fn malformed_bytes_are_a_validation_error() {
        let err = SessionData::from_slice(b"{\"user\": ").unwrap_err();
        assert_eq!(err.issues[0].path, "$");
        assert!(err.issues[0].message.starts_with("malformed JSON"));
    }

    #[test]
    fn turn_number_must_be_non_negative_integer() {
        let value = json!({
            "user": {"user_id": "u", "session_id": "s"},
            "llm_conversation": [{"role": "ai", "content": "x", "turn_number": -1}]
        });
        let err = SessionData::parse(&value).unwrap_err();
        assert_eq!(err.issues[0].path, "llm_conversation[0].turn_number");
    }

    #[test]
    fn parse_is_deterministic() {
        let bytes = br#"{"user":{"user_id":"u","session_id":"s"},"llm_conversation":[{"role":"ai","content":"hey","turn_number":1}]}"#;
        let a = SessionData::from_slice(bytes).unwrap();
        let b = SessionData::from_slice(bytes).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.conversation()[0].role, Role::Assistant);
        assert_eq!(a.conversation()[0].turn_number, Some(1));
    }
}
