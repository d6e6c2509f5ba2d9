mod common;

use std::fs;
use std::sync::Arc;

use common::{sample_records, HashEmbedder, ScriptedLlm, StaticKnowledge};
use triage_core::ChunkWindow;
use triage_rag::config::{CorrelationConfig, ExtractionConfig};
use triage_rag::correlator::LogCorrelator;
use triage_rag::extractor::DocumentExtractor;
use triage_rag::pipeline::{CaseOutcome, TriagePipeline};
use triage_rag::retriever::{KnowledgeRetriever, RetrieverSettings};
use triage_rag::store::MemoryStore;
use triage_rag::TriageError;

const TWO_CASES: &str = r#"{"cases": [
  {"id": "TC-01", "title": "Gate in not reflected", "summary": "GATE_IN for MSCU1234567 missing", "signals": ["MSCU1234567", "GATE_IN"], "category": "CNTR", "rationale": "container gate in event missing"},
  {"id": "TC-02", "title": "Berth clash", "summary": "Two vessels share berth 4", "signals": ["berth 4"], "category": "VS", "rationale": "vessel berth overlap"}
]}"#;

const GATE_IN_VERDICT: &str = r#"{"refers_to_logs": true, "signals": ["GATE_IN"], "matched_logs": [{"file": "container_service.log", "confidence": 0.9, "reasons": ["GATE_IN seen"]}]}"#;

const NO_MATCH: &str = r#"{"refers_to_logs": false, "signals": [], "matched_logs": []}"#;

fn pipeline(llm: Arc<ScriptedLlm>, log_dir: &tempfile::TempDir) -> TriagePipeline {
    let extractor = DocumentExtractor::new(llm.clone(), ExtractionConfig::default());
    let correlator = LogCorrelator::new(
        llm.clone(),
        CorrelationConfig {
            log_dir: log_dir.path().to_path_buf(),
            ..Default::default()
        },
    );
    let retriever = KnowledgeRetriever::new(
        Arc::new(StaticKnowledge::new(sample_records(), "Replay gate events from the container service.")),
        Arc::new(HashEmbedder::new()),
        Arc::new(MemoryStore::new()),
        llm,
        RetrieverSettings {
            window: ChunkWindow::new(500, 50).unwrap(),
            top_k: 5,
            max_tokens: 250,
            batch_size: 16,
        },
    );
    TriagePipeline::new(extractor, correlator, Arc::new(retriever))
}

fn log_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("container_service.log"),
        "2024-05-01T08:14:02Z INFO GATE_IN cntr_no=MSCU1234567\n",
    )
    .unwrap();
    dir
}

#[tokio::test]
async fn test_upload_processes_every_case() {
    let dir = log_dir();
    let llm = Arc::new(
        ScriptedLlm::new()
            .respond_reply(TWO_CASES)
            .respond_reply(GATE_IN_VERDICT)
            .respond_reply(NO_MATCH)
            .chat_reply("- Replay GATE_IN")
            .chat_reply("- Re-plan berth 4"),
    );
    let pipeline = pipeline(llm.clone(), &dir);

    let report = pipeline
        .process_upload("application/pdf", b"%PDF-1.4".to_vec())
        .await
        .unwrap();

    assert!(report.ok);
    assert_eq!(report.count, 2);
    assert_eq!(report.failed(), 0);

    match &report.results[0].outcome {
        CaseOutcome::Completed { verdict, suggestion } => {
            assert!(verdict.refers_to_logs);
            assert_eq!(verdict.matched_log_files(), vec!["container_service.log"]);
            assert_eq!(suggestion.suggestion, "- Replay GATE_IN");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    match &report.results[1].outcome {
        CaseOutcome::Completed { verdict, .. } => assert!(!verdict.refers_to_logs),
        other => panic!("unexpected outcome: {other:?}"),
    }

    // the correlation text carries the flattened case
    let correlation = &llm.respond_calls()[1];
    let texts: Vec<String> = correlation
        .parts
        .iter()
        .filter_map(|p| match p {
            triage_rag::InputPart::Text(t) => Some(t.clone()),
            _ => None,
        })
        .collect();
    assert!(texts.iter().any(|t| t.contains("TC-01\nGate in not reflected")));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["count"], 2);
    assert_eq!(json["results"][0]["status"], "completed");
}

#[tokio::test]
async fn test_failed_case_does_not_abort_the_rest() {
    let dir = log_dir();
    let llm = Arc::new(
        ScriptedLlm::new()
            .respond_reply(TWO_CASES)
            .respond_reply("cannot tell")
            .respond_reply(NO_MATCH)
            .chat_reply("- Re-plan berth 4"),
    );
    let pipeline = pipeline(llm.clone(), &dir);

    let report = pipeline
        .process_upload("application/octet-stream", b"%PDF-1.4".to_vec())
        .await
        .unwrap();

    assert_eq!(report.count, 2);
    assert_eq!(report.failed(), 1);
    match &report.results[0].outcome {
        CaseOutcome::Failed { kind, .. } => assert_eq!(*kind, "correlation_parse_failure"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(matches!(report.results[1].outcome, CaseOutcome::Completed { .. }));
    assert_eq!(llm.chat_count(), 1);
}

#[tokio::test]
async fn test_zero_cases_is_no_cases_detected() {
    let dir = log_dir();
    let llm = Arc::new(ScriptedLlm::new().respond_reply("some text {\"cases\": []} trailing"));
    let pipeline = pipeline(llm.clone(), &dir);

    let err = pipeline
        .process_upload("application/pdf", b"%PDF-1.4".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, TriageError::NoCasesDetected));
    assert_eq!(err.status_code(), 422);
    assert_eq!(llm.respond_count(), 1);
}

#[tokio::test]
async fn test_unsupported_content_type() {
    let dir = log_dir();
    let llm = Arc::new(ScriptedLlm::new());
    let pipeline = pipeline(llm.clone(), &dir);

    let err = pipeline
        .process_upload("image/png", vec![1, 2, 3])
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 415);
    assert_eq!(llm.respond_count() + llm.chat_count(), 0);
}
