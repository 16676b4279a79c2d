//! Raw artifact copying.
//!
//! Copies a session's source files next to its processed output. Only an
//! uncreatable destination is an error; a missing or unreadable source is
//! recorded as a warning and the rest are still copied.

use sessiondigest_core::error::IoError;
use sessiondigest_core::record::{CopyWarning, SourceRef};
use sessiondigest_core::storage::Storage;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files copied for one session, plus the ones that could not be.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyResult {
    /// Copied artifacts, in input order
    pub copied: Vec<SourceRef>,
    pub warnings: Vec<CopyWarning>,
}

/// Copy `sources` into `destination`.
///
/// `copied_to` in each [`SourceRef`] is relative to `output_root` when the
/// destination lives under it.
pub async fn copy_artifacts(
    storage: &dyn Storage,
    session: &str,
    sources: &[PathBuf],
    destination: &Path,
    output_root: &Path,
) -> Result<CopyResult, IoError> {
    storage.create_dir_all(destination).await?;

    let mut result = CopyResult::default();

    for source in sources {
        let Some(name) = source.file_name() else {
            result.warnings.push(CopyWarning {
                source: source.clone(),
                reason: "path has no file name".into(),
            });
            continue;
        };

        if !storage.exists(source).await {
            warn!(session, source = %source.display(), "Artifact missing, skipping");
            result.warnings.push(CopyWarning {
                source: source.clone(),
                reason: "file not found".into(),
            });
            continue;
        }

        let target = destination.join(name);
        match storage.copy(source, &target).await {
            Ok(bytes) => {
                debug!(session, source = %source.display(), bytes, "Artifact copied");
                let copied_to = target
                    .strip_prefix(output_root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| target.clone());
                result.copied.push(SourceRef {
                    name: name.to_string_lossy().into_owned(),
                    source: source.clone(),
                    copied_to,
                });
            }
            Err(e) => {
                warn!(session, error = %e, "Artifact copy failed");
                result.warnings.push(CopyWarning {
                    source: source.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;

    #[tokio::test]
    async fn copies_present_files_and_warns_on_missing() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let a = src.path().join("llm_conversation.json");
        let b = src.path().join("phq_responses.json");
        tokio::fs::write(&a, b"{}").await.unwrap();

        let dest = out.path().join("u1_s1/artifacts");
        let result = copy_artifacts(&FsStorage, "u1_s1", &[a.clone(), b.clone()], &dest, out.path())
            .await
            .unwrap();

        assert_eq!(result.copied.len(), 1);
        assert_eq!(result.copied[0].name, "llm_conversation.json");
        assert_eq!(
            result.copied[0].copied_to,
            PathBuf::from("u1_s1/artifacts/llm_conversation.json")
        );
        assert!(dest.join("llm_conversation.json").exists());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].source, b);
    }

    #[tokio::test]
    async fn copy_order_follows_input() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let names = ["z.json", "a.json", "m.json"];
        let mut sources = Vec::new();
        for name in names {
            let path = src.path().join(name);
            tokio::fs::write(&path, name).await.unwrap();
            sources.push(path);
        }
        let result = copy_artifacts(&FsStorage, "s", &sources, &out.path().join("x"), out.path())
            .await
            .unwrap();
        let copied: Vec<&str> = result.copied.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(copied, names);
    }

    #[tokio::test]
    async fn uncreatable_destination_is_an_error() {
        let out = tempfile::tempdir().unwrap();
        let blocker = out.path().join("file");
        tokio::fs::write(&blocker, b"x").await.unwrap();
        let err = copy_artifacts(&FsStorage, "s", &[], &blocker.join("sub"), out.path())
            .await
            .unwrap_err();
        assert!(matches!(err, IoError::CreateDir { .. }));
    }
}
