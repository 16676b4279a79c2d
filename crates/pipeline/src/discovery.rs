//! Input discovery and loading.
//!
//! A batch input is either a JSON session record or a session folder: a raw
//! export directory named `<user>_<session>` that holds
//! `llm_conversation.json` plus optional assessment sidecars.

use serde_json::{Map, Value, json};
use sessiondigest_core::error::{Error, FieldIssue, IoError, ValidationError};
use sessiondigest_core::record::AnalysisLogSummary;
use sessiondigest_core::session::SessionData;
use sessiondigest_core::storage::Storage;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::analysis::{ANALYSIS_LOGS, LLM_ANALYSIS, PHQ_ANALYSIS, summarize_log};

/// Conversation file every session folder must contain.
pub const CONVERSATION_FILE: &str = "llm_conversation.json";
pub const PHQ_RESPONSES_FILE: &str = "phq_responses.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Files copied alongside the output of a session folder, in copy order.
pub const FOLDER_ARTIFACTS: &[&str] = &[
    CONVERSATION_FILE,
    PHQ_RESPONSES_FILE,
    METADATA_FILE,
    PHQ_ANALYSIS.file,
    LLM_ANALYSIS.file,
];

/// What kind of input an item is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// A JSON document in the session record layout
    Record(PathBuf),
    /// A raw export folder
    SessionFolder(PathBuf),
    /// Found during discovery but not processable
    Skipped { path: PathBuf, reason: String },
}

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    /// Output subdirectory name: the file stem or folder name, suffixed
    /// `-2`, `-3`, ... by [`discover`] when another input already claimed it
    pub label: String,
    pub kind: InputKind,
}

/// A validated session plus the raw files to copy next to its output.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub session: SessionData,
    pub artifacts: Vec<PathBuf>,
    /// Summaries of the analysis logs found in a session folder
    pub analysis_logs: Vec<AnalysisLogSummary>,
}

impl InputItem {
    pub fn record(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            label: label_of(&path, true),
            kind: InputKind::Record(path),
        }
    }

    pub fn session_folder(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            label: label_of(&dir, false),
            kind: InputKind::SessionFolder(dir),
        }
    }

    pub fn skipped(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            label: label_of(&path, false),
            kind: InputKind::Skipped {
                path,
                reason: reason.into(),
            },
        }
    }

    pub fn path(&self) -> &Path {
        match &self.kind {
            InputKind::Record(path)
            | InputKind::SessionFolder(path)
            | InputKind::Skipped { path, .. } => path,
        }
    }

    /// The identifier used in batch outcomes.
    pub fn display_name(&self) -> String {
        self.path().display().to_string()
    }

    /// Read and validate the session this item refers to.
    pub async fn load(&self, storage: &dyn Storage) -> Result<LoadedSession, Error> {
        match &self.kind {
            InputKind::Record(path) => {
                let bytes = storage.read(path).await?;
                let session = SessionData::from_slice(&bytes)?;
                Ok(LoadedSession {
                    session,
                    artifacts: vec![path.clone()],
                    analysis_logs: Vec::new(),
                })
            }
            InputKind::SessionFolder(dir) => load_session_folder(storage, dir).await,
            InputKind::Skipped { path, reason } => Err(Error::Validation(ValidationError::single(
                path.display().to_string(),
                reason.clone(),
            ))),
        }
    }
}

fn label_of(path: &Path, stem: bool) -> String {
    let name = if stem {
        path.file_stem()
    } else {
        path.file_name()
    };
    name.map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string())
}

/// Expand an input path into batch items.
///
/// A file is one item. A directory holding `llm_conversation.json` is one
/// session folder. Any other directory yields each `*.json` file directly
/// inside it plus each subdirectory, sorted by name; subdirectories without
/// a conversation file are reported as skipped. Processable items get
/// distinct labels, so no two of them share an output directory.
pub async fn discover(path: &Path) -> Result<Vec<InputItem>, IoError> {
    let list_err = |e: std::io::Error| IoError::List {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let meta = tokio::fs::metadata(path).await.map_err(list_err)?;
    if meta.is_file() {
        return Ok(vec![InputItem::record(path)]);
    }
    if has_conversation(path).await {
        return Ok(vec![InputItem::session_folder(path)]);
    }

    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(path).await.map_err(list_err)?;
    while let Some(entry) = dir.next_entry().await.map_err(list_err)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type().await.map_err(list_err)?;
        entries.push((name, entry.path(), file_type.is_dir()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut items = Vec::new();
    for (_, entry_path, is_dir) in entries {
        if is_dir {
            if has_conversation(&entry_path).await {
                items.push(InputItem::session_folder(entry_path));
            } else {
                items.push(InputItem::skipped(
                    entry_path,
                    format!("no {CONVERSATION_FILE} in folder"),
                ));
            }
        } else if entry_path.extension().is_some_and(|ext| ext == "json") {
            items.push(InputItem::record(entry_path));
        }
    }
    make_labels_unique(&mut items);

    debug!(path = %path.display(), items = items.len(), "Discovered inputs");
    Ok(items)
}

/// Suffix repeated labels with `-2`, `-3`, ... in item order. Skipped items
/// write nothing and claim no label.
fn make_labels_unique(items: &mut [InputItem]) {
    let mut claimed = HashSet::new();
    for item in items.iter_mut() {
        if matches!(item.kind, InputKind::Skipped { .. }) {
            continue;
        }
        if !claimed.contains(&item.label) {
            claimed.insert(item.label.clone());
            continue;
        }
        let base = item.label.clone();
        let mut n = 2;
        while claimed.contains(&format!("{base}-{n}")) {
            n += 1;
        }
        item.label = format!("{base}-{n}");
        debug!(path = %item.path().display(), label = %item.label, "Renamed colliding output label");
        claimed.insert(item.label.clone());
    }
}

async fn has_conversation(dir: &Path) -> bool {
    tokio::fs::try_exists(dir.join(CONVERSATION_FILE))
        .await
        .unwrap_or(false)
}

/// Split a folder name `<user>_<session>` at its last underscore.
pub fn split_folder_name(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('_')
        .filter(|(user, session)| !user.is_empty() && !session.is_empty())
}

/// Load a raw export folder into a validated session.
pub async fn load_session_folder(storage: &dyn Storage, dir: &Path) -> Result<LoadedSession, Error> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some((user_id, session_id)) = split_folder_name(&name) else {
        return Err(ValidationError::single(
            "user",
            format!("folder name '{name}' is not of the form <user>_<session>"),
        )
        .into());
    };

    let raw_conversation = read_json(storage, &dir.join(CONVERSATION_FILE), CONVERSATION_FILE).await?;
    let turns = expand_raw_conversation(&raw_conversation)?;

    let mut metadata = Map::new();
    let phq_path = dir.join(PHQ_RESPONSES_FILE);
    if storage.exists(&phq_path).await {
        metadata.insert(
            "phq_responses".into(),
            read_json(storage, &phq_path, PHQ_RESPONSES_FILE).await?,
        );
    }
    let meta_path = dir.join(METADATA_FILE);
    if storage.exists(&meta_path).await {
        metadata.insert(
            "session_metadata".into(),
            read_json(storage, &meta_path, METADATA_FILE).await?,
        );
    }

    let mut analysis_logs = Vec::new();
    for log in ANALYSIS_LOGS {
        let path = dir.join(log.file);
        if !storage.exists(&path).await {
            continue;
        }
        let bytes = storage.read(&path).await?;
        let mut summary = summarize_log(log.file, &String::from_utf8_lossy(&bytes));
        summary.analysis_stats = metadata
            .get("session_metadata")
            .and_then(|m| m.get(log.stats_key))
            .cloned();
        analysis_logs.push(summary);
    }

    let record = json!({
        "user": {"user_id": user_id, "session_id": session_id},
        "llm_conversation": turns,
        "metadata": metadata,
    });
    let session = SessionData::parse(&record)?;

    Ok(LoadedSession {
        session,
        artifacts: FOLDER_ARTIFACTS.iter().map(|f| dir.join(f)).collect(),
        analysis_logs,
    })
}

async fn read_json(storage: &dyn Storage, path: &Path, label: &str) -> Result<Value, Error> {
    let bytes = storage.read(path).await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ValidationError::single(label, format!("malformed JSON: {e}")).into()
    })
}

/// Expand `{"conversations": [{turn_number, ai_message, user_message}]}` into
/// session turns: the assistant message first, then the user reply. Messages
/// that are blank after trimming are dropped, matching the formatter.
pub fn expand_raw_conversation(raw: &Value) -> Result<Vec<Value>, ValidationError> {
    let Some(root) = raw.as_object() else {
        return Err(ValidationError::single(CONVERSATION_FILE, "expected an object"));
    };

    let items = match root.get("conversations") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ValidationError::single(
                "conversations",
                "expected an array",
            ));
        }
    };

    let mut issues = Vec::new();
    let mut turns = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let path = format!("conversations[{i}]");
        let Some(obj) = item.as_object() else {
            issues.push(FieldIssue::new(path, "expected an object"));
            continue;
        };

        let turn_number = obj.get("turn_number").cloned().unwrap_or(Value::Null);
        let timestamp = obj.get("timestamp").cloned().unwrap_or(Value::Null);

        for (key, role) in [("ai_message", "assistant"), ("user_message", "user")] {
            match obj.get(key) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) if s.trim().is_empty() => {}
                Some(Value::String(s)) => turns.push(json!({
                    "role": role,
                    "content": s,
                    "turn_number": turn_number,
                    "timestamp": timestamp,
                })),
                Some(_) => issues.push(FieldIssue::new(
                    format!("{path}.{key}"),
                    "expected a string",
                )),
            }
        }
    }

    if issues.is_empty() {
        Ok(turns)
    } else {
        Err(ValidationError::new(issues))
    }
}
