//! End-to-end batch runs against a temporary directory.

use std::path::Path;
use std::sync::Arc;

use sessiondigest_config::EnrichmentMode;
use sessiondigest_core::error::{ErrorKind, ProviderError};
use sessiondigest_core::provider::{Provider, ProviderRequest, ProviderResponse};
use sessiondigest_core::record::{BatchOutcome, EnrichmentStatus};
use sessiondigest_pipeline::{BatchRunner, Enricher, FsStorage, InputItem, Processor, discover};

struct DownProvider;

#[async_trait::async_trait]
impl Provider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

struct EchoProvider;

#[async_trait::async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            content: "```json\n{\"analysis\": [{\"indicator\": \"Fatigue\", \"context\": \"tired\", \"score\": {\"phq\": 1}}]}\n```".into(),
            usage: None,
            model: "echo-1".into(),
        })
    }
}

const HI_HELLO: &str = r#"{
    "user": {"user_id": "u1", "session_id": "s1"},
    "llm_conversation": [
        {"role": "user", "content": "hi"},
        {"role": "assistant", "content": "hello"}
    ],
    "metadata": {}
}"#;

const NARRATOR: &str = r#"{
    "user": {"user_id": "u2", "session_id": "s2"},
    "llm_conversation": [{"role": "narrator", "content": "Once upon a time"}]
}"#;

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn runner(processor: Processor, out: &Path) -> BatchRunner {
    BatchRunner::new(processor, Arc::new(FsStorage), out)
}

#[tokio::test]
async fn plain_session_without_enrichment() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "s1.json", HI_HELLO);
    let out = dir.path().join("out");

    let report = runner(Processor::new(), &out)
        .run(&[InputItem::record(&input)])
        .await
        .unwrap();
    assert_eq!(report.succeeded, 1);

    let record = read_json(&out.join("s1/analysis_result.json"));
    let lines = record["formatted_conversation"]["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["label"], "user");
    assert_eq!(lines[1]["label"], "assistant");
    assert!(record["summary"].is_null());
    assert_eq!(record["enrichment"]["status"], "absent");
}

#[tokio::test]
async fn malformed_item_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(dir.path(), "a_bad.json", NARRATOR);
    let good = write(dir.path(), "b_good.json", HI_HELLO);
    let broken = write(dir.path(), "c_broken.json", "{ not json");
    let out = dir.path().join("out");

    let items = vec![
        InputItem::record(&bad),
        InputItem::record(&good),
        InputItem::record(&broken),
    ];
    let report = runner(Processor::new(), &out).run(&items).await.unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 2);
    assert!(!report.is_success());

    match &report.outcomes[0] {
        BatchOutcome::Failed { kind, message, .. } => {
            assert_eq!(*kind, ErrorKind::Validation);
            assert!(message.contains("narrator"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(matches!(report.outcomes[1], BatchOutcome::Succeeded { .. }));
    assert!(matches!(
        report.outcomes[2],
        BatchOutcome::Failed {
            kind: ErrorKind::Validation,
            ..
        }
    ));
    assert!(!out.join("a_bad").join("analysis_result.json").exists());

    let on_disk = read_json(&out.join("run_report.json"));
    assert_eq!(on_disk["failed"], 2);
    assert_eq!(on_disk["outcomes"][1]["status"], "succeeded");
}

#[tokio::test]
async fn failing_adapter_degrades_when_not_required() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "s1.json", HI_HELLO);
    let out = dir.path().join("out");

    let processor = Processor::new().with_enricher(Enricher::new(Arc::new(DownProvider), "m"), false);
    let report = runner(processor, &out)
        .run(&[InputItem::record(&input)])
        .await
        .unwrap();

    match &report.outcomes[0] {
        BatchOutcome::Succeeded { enrichment, .. } => {
            assert_eq!(*enrichment, EnrichmentStatus::Unavailable)
        }
        other => panic!("expected success, got {other:?}"),
    }
    let record = read_json(&out.join("s1/analysis_result.json"));
    assert_eq!(record["enrichment"]["status"], "unavailable");
    assert!(
        record["enrichment"]["reason"]
            .as_str()
            .unwrap()
            .contains("connection refused")
    );
}

#[tokio::test]
async fn failing_adapter_fails_item_when_required() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "s1.json", HI_HELLO);

    let processor = Processor::new().with_enricher(Enricher::new(Arc::new(DownProvider), "m"), true);
    let report = runner(processor, &dir.path().join("out"))
        .run(&[InputItem::record(&input)])
        .await
        .unwrap();

    assert!(matches!(
        report.outcomes[0],
        BatchOutcome::Failed {
            kind: ErrorKind::Processing,
            ..
        }
    ));
}

#[tokio::test]
async fn concurrent_run_keeps_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut items = Vec::new();
    for i in 0..6 {
        let body = HI_HELLO.replace("\"s1\"", &format!("\"s{i}\""));
        items.push(InputItem::record(write(dir.path(), &format!("item{i}.json"), &body)));
    }

    let processor = Processor::new()
        .with_enricher(Enricher::new(Arc::new(EchoProvider), "m").with_mode(EnrichmentMode::Structured), true);
    let report = runner(processor, &dir.path().join("out"))
        .with_concurrency(3)
        .run(&items)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 6);
    let inputs: Vec<&str> = report.outcomes.iter().map(|o| o.input()).collect();
    let expected: Vec<String> = items.iter().map(|i| i.display_name()).collect();
    assert_eq!(inputs, expected.iter().map(String::as_str).collect::<Vec<_>>());

    let record = read_json(&dir.path().join("out/item4/analysis_result.json"));
    assert_eq!(record["user"]["session_id"], "s4");
    assert_eq!(record["enrichment"]["result"]["kind"], "structured");
    assert_eq!(record["enrichment"]["result"]["payload"]["total_phq"], 1);
}

#[tokio::test]
async fn session_folders_are_discovered_and_copied() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let folder = data.join("alice_07");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::create_dir_all(data.join("empty_01")).unwrap();
    write(
        &folder,
        "llm_conversation.json",
        r#"{"conversations": [{"turn_number": 1, "ai_message": "How was your week?", "user_message": "Exhausting."}]}"#,
    );
    write(&folder, "phq_responses.json", r#"{"responses": {"q1": 2, "q2": 3}, "total_score": 5}"#);
    write(&folder, "phq_analysis.jsonl", "{\"type\": \"metadata\"}\n");

    let out = dir.path().join("out");
    let items = discover(&data).await.unwrap();
    assert_eq!(items.len(), 2);

    let report = runner(Processor::new(), &out).run(&items).await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.is_success());

    let record = read_json(&out.join("alice_07/analysis_result.json"));
    assert_eq!(record["user"]["user_id"], "alice");
    assert_eq!(
        record["formatted_conversation"]["transcript"],
        "assistant: How was your week?\nuser: Exhausting."
    );
    assert_eq!(record["summary"]["scales"][0]["total_score"], 5);
    assert_eq!(record["summary"]["scales"][0]["severity"], "minimal");
    assert_eq!(record["source_refs"].as_array().unwrap().len(), 3);
    assert!(out.join("alice_07/artifacts/phq_analysis.jsonl").exists());
    assert_eq!(record["analysis_logs"][0]["source"], "phq_analysis.jsonl");
    assert_eq!(record["analysis_logs"][0]["total_rows"], 1);
    assert_eq!(record["analysis_logs"][0]["data_rows"], 0);

    match &report.outcomes[0] {
        BatchOutcome::Succeeded { copy_warnings, .. } => assert_eq!(copy_warnings.len(), 2),
        other => panic!("expected success, got {other:?}"),
    }
}

fn artifact_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn record_and_folder_with_same_name_get_separate_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let folder = data.join("alice_07");
    std::fs::create_dir_all(&folder).unwrap();
    write(
        &folder,
        "llm_conversation.json",
        r#"{"conversations": [{"turn_number": 1, "ai_message": "Hello Alice", "user_message": "hi"}]}"#,
    );
    write(
        &data,
        "alice_07.json",
        &HI_HELLO.replace("\"u1\"", "\"bob\"").replace("\"s1\"", "\"99\""),
    );

    let out = dir.path().join("out");
    let items = discover(&data).await.unwrap();
    let report = runner(Processor::new(), &out)
        .with_concurrency(2)
        .run(&items)
        .await
        .unwrap();
    assert_eq!(report.succeeded, 2);

    let paths: Vec<&Path> = report
        .outcomes
        .iter()
        .map(|o| match o {
            BatchOutcome::Succeeded { output_path, .. } => output_path.as_path(),
            other => panic!("expected success, got {other:?}"),
        })
        .collect();
    assert_ne!(paths[0], paths[1]);

    let folder_record = read_json(&out.join("alice_07/analysis_result.json"));
    assert_eq!(folder_record["user"]["user_id"], "alice");
    let file_record = read_json(&out.join("alice_07-2/analysis_result.json"));
    assert_eq!(file_record["user"]["user_id"], "bob");

    assert_eq!(
        artifact_names(&out.join("alice_07/artifacts")),
        vec!["llm_conversation.json"]
    );
    assert_eq!(
        artifact_names(&out.join("alice_07-2/artifacts")),
        vec!["alice_07.json"]
    );
}
