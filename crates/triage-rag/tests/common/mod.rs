// Test doubles shared by the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use triage_core::{ChunkSource, IncidentRecord};
use triage_rag::embedder::{EmbedError, Embedder};
use triage_rag::knowledge::KnowledgeSource;
use triage_rag::llm_client::{ChatRequest, InputPart, LlmClient, LlmError, ResponseRequest};
use triage_rag::store::{IndexedChunk, MemoryStore, ScoredChunk, StoreError, VectorStore};
use triage_rag::TriageError;

/// LLM double that replays queued replies and records every request
#[derive(Default)]
pub struct ScriptedLlm {
    chat_replies: Mutex<VecDeque<Result<String, LlmError>>>,
    respond_replies: Mutex<VecDeque<Result<String, LlmError>>>,
    chat_calls: Mutex<Vec<ChatRequest>>,
    respond_calls: Mutex<Vec<ResponseRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat_reply(self, reply: &str) -> Self {
        self.chat_replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn chat_error(self, error: LlmError) -> Self {
        self.chat_replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn respond_reply(self, reply: &str) -> Self {
        self.respond_replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn respond_error(self, error: LlmError) -> Self {
        self.respond_replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn chat_count(&self) -> usize {
        self.chat_calls.lock().unwrap().len()
    }

    pub fn respond_count(&self) -> usize {
        self.respond_calls.lock().unwrap().len()
    }

    pub fn chat_calls(&self) -> Vec<ChatRequest> {
        self.chat_calls.lock().unwrap().clone()
    }

    pub fn respond_calls(&self) -> Vec<ResponseRequest> {
        self.respond_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.chat_calls.lock().unwrap().push(request.clone());
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::RequestFailed("no scripted chat reply".into())))
    }

    async fn respond(&self, request: &ResponseRequest) -> Result<String, LlmError> {
        self.respond_calls.lock().unwrap().push(request.clone());
        self.respond_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::RequestFailed("no scripted responses reply".into())))
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn provider(&self) -> &str {
        "test"
    }
}

pub fn timeout() -> LlmError {
    LlmError::RequestFailed("operation timed out".into())
}

pub fn server_error() -> LlmError {
    LlmError::ApiError {
        status: 500,
        body: "internal error".into(),
    }
}

/// File names attached to a multi-part request
pub fn attached_files(request: &ResponseRequest) -> Vec<String> {
    request
        .parts
        .iter()
        .filter_map(|p| match p {
            InputPart::File { name, .. } => Some(name.clone()),
            InputPart::Text(_) => None,
        })
        .collect()
}

/// Deterministic bag-of-words embedder, optionally slow or failing on one call
pub struct HashEmbedder {
    dimension: usize,
    calls: AtomicUsize,
    // 1-based call number that fails
    fail_on: Option<usize>,
    delay: Option<Duration>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: 32,
            calls: AtomicUsize::new(0),
            fail_on: None,
            delay: None,
        }
    }

    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let mut hash: u32 = 2166136261;
            for b in word.to_lowercase().bytes() {
                hash ^= b as u32;
                hash = hash.wrapping_mul(16777619);
            }
            v[hash as usize % self.dimension] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on == Some(call) {
            return Err(EmbedError::RequestFailed("connection reset".into()));
        }
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Knowledge source whose content can change between ingests
pub struct StaticKnowledge {
    records: Mutex<Vec<IncidentRecord>>,
    guidance: Mutex<String>,
    loads: AtomicUsize,
}

impl StaticKnowledge {
    pub fn new(records: Vec<IncidentRecord>, guidance: &str) -> Self {
        Self {
            records: Mutex::new(records),
            guidance: Mutex::new(guidance.to_string()),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn set_guidance(&self, guidance: &str) {
        *self.guidance.lock().unwrap() = guidance.to_string();
    }

    pub fn set_records(&self, records: Vec<IncidentRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeSource for StaticKnowledge {
    async fn incident_records(&self) -> Result<Vec<IncidentRecord>, TriageError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().clone())
    }

    async fn guidance_text(&self) -> Result<String, TriageError> {
        Ok(self.guidance.lock().unwrap().clone())
    }
}

pub fn record(alert: &str, problem: &str, solution: &str, category: &str) -> IncidentRecord {
    IncidentRecord {
        alert: Some(alert.to_string()),
        problem_statement: Some(problem.to_string()),
        solution: Some(solution.to_string()),
        category: Some(category.to_string()),
    }
}

pub fn sample_records() -> Vec<IncidentRecord> {
    vec![
        record(
            "COARRI not received",
            "EDI ack missing for vessel discharge",
            "Resend COARRI after fixing segment count",
            "EDI_ERRORS",
        ),
        record(
            "Gate in stuck",
            "Container MSCU1234567 gate in event not reflected",
            "Replay GATE_IN from container service",
            "BUSINESS_LOGIC",
        ),
    ]
}

/// A store that never reports an existing collection or any chunk
pub struct NeverReadyStore {
    inner: MemoryStore,
}

impl NeverReadyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
        }
    }
}

#[async_trait]
impl VectorStore for NeverReadyStore {
    async fn exists(&self) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(0)
    }

    async fn create(&self, dimension: usize) -> Result<(), StoreError> {
        self.inner.create(dimension).await
    }

    async fn upsert(&self, chunks: Vec<IndexedChunk>) -> Result<(), StoreError> {
        self.inner.upsert(chunks).await
    }

    async fn prune(&self, source: ChunkSource, keep: usize) -> Result<(), StoreError> {
        self.inner.prune(source, keep).await
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        self.inner.search(vector, limit).await
    }

    fn name(&self) -> &str {
        "never-ready"
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}

/// Single-page PDF showing `line` in Helvetica, with a correct xref table
pub fn text_pdf(line: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 712 Td ({}) Tj ET", line);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_at = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{:010} 00000 n \n", offset));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    pdf.into_bytes()
}
