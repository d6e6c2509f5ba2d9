// Document extractor
// Turns an uploaded document into structured incident cases.
//
// PDFs go to the model as an attached file first. If that request fails the
// text is pulled out locally and resubmitted as plain chat.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use triage_core::{salvage_object, truncate_chars, IncidentCase};

use crate::config::ExtractionConfig;
use crate::error::TriageError;
use crate::llm_client::{ChatMessage, ChatRequest, LlmClient, ResponseRequest};
use crate::prompts;

#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Pdf(Vec<u8>),
    Text(String),
}

impl Document {
    pub fn len(&self) -> usize {
        match self {
            Document::Pdf(bytes) => bytes.len(),
            Document::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct DocumentExtractor {
    llm: Arc<dyn LlmClient>,
    config: ExtractionConfig,
}

impl DocumentExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, config: ExtractionConfig) -> Self {
        Self { llm, config }
    }

    pub fn max_document_bytes(&self) -> usize {
        self.config.max_document_bytes
    }

    pub async fn extract(&self, document: &Document) -> Result<Vec<IncidentCase>, TriageError> {
        if document.len() > self.config.max_document_bytes {
            return Err(TriageError::InputTooLarge {
                size: document.len(),
                limit: self.config.max_document_bytes,
            });
        }

        match document {
            Document::Pdf(bytes) => self.extract_pdf(bytes).await,
            Document::Text(text) => self.extract_text(text).await,
        }
    }

    async fn extract_pdf(&self, bytes: &[u8]) -> Result<Vec<IncidentCase>, TriageError> {
        let request = ResponseRequest::new()
            .text(prompts::EXTRACTION_PROMPT)
            .file("document.pdf", "application/pdf", bytes.to_vec())
            .temperature(0.0)
            .json_output();

        let primary = match self.llm.respond(&request).await {
            Ok(reply) => {
                let cases = parse_cases(&reply)?;
                info!(cases = cases.len(), path = "file", "extracted cases");
                return Ok(cases);
            }
            Err(e) => e,
        };

        warn!(provider = %self.llm.provider(), error = %primary, "file extraction failed, falling back to local PDF text");

        let text = pdf_text(bytes.to_vec()).await.map_err(|reason| TriageError::PdfText {
            primary: primary.to_string(),
            reason,
        })?;

        self.extract_text(&text).await
    }

    async fn extract_text(&self, text: &str) -> Result<Vec<IncidentCase>, TriageError> {
        let text = truncate_chars(text, self.config.max_text_chars);
        let request = ChatRequest::new(vec![
            ChatMessage::system(prompts::EXTRACTION_SYSTEM),
            ChatMessage::user(format!(
                "{}\n\n--- DOCUMENT TEXT START ---\n{}\n--- DOCUMENT TEXT END ---",
                prompts::EXTRACTION_PROMPT,
                text
            )),
        ])
        .temperature(0.0)
        .json_output();

        let reply = self.llm.chat(&request).await?;
        let cases = parse_cases(&reply)?;
        info!(cases = cases.len(), path = "text", "extracted cases");
        Ok(cases)
    }
}

// pdf-extract is blocking and may panic on malformed input; a panic surfaces
// as a join error
async fn pdf_text(bytes: Vec<u8>) -> Result<String, String> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| format!("PDF text extraction aborted: {}", e))?
        .map_err(|e| e.to_string())?;

    if text.trim().is_empty() {
        return Err("PDF contains no extractable text".to_string());
    }
    Ok(text)
}

/// Parse an extraction reply. The salvaged object must carry a `cases` array;
/// an empty array is valid. Cases without an id get `TC-<n>`.
pub fn parse_cases(reply: &str) -> Result<Vec<IncidentCase>, TriageError> {
    let mut object = salvage_object(reply)
        .map_err(|e| TriageError::ExtractionSchemaViolation(e.to_string()))?;

    let items = match object.remove("cases") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(TriageError::ExtractionSchemaViolation(
                "'cases' is not an array".to_string(),
            ))
        }
        None => {
            return Err(TriageError::ExtractionSchemaViolation(
                "reply has no 'cases' array".to_string(),
            ))
        }
    };

    let mut cases = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            return Err(TriageError::ExtractionSchemaViolation(format!(
                "case {} is not an object",
                i + 1
            )));
        }
        let mut case: IncidentCase = serde_json::from_value(item)
            .map_err(|e| TriageError::ExtractionSchemaViolation(format!("case {}: {}", i + 1, e)))?;
        if case.id.trim().is_empty() {
            case.id = format!("TC-{:02}", i + 1);
        }
        cases.push(case);
    }
    Ok(cases)
}
