// Pipeline error type and its HTTP status mapping

use thiserror::Error;

use crate::config::ConfigError;
use crate::embedder::EmbedError;
use crate::llm_client::LlmError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("document is {size} bytes, limit is {limit}")]
    InputTooLarge { size: usize, limit: usize },

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("extraction reply violates the case schema: {0}")]
    ExtractionSchemaViolation(String),

    #[error("could not parse correlation reply: {0}")]
    CorrelationParseFailure(String),

    #[error("No test cases detected in PDF.")]
    NoCasesDetected,

    #[error("model call failed: {0}")]
    Transport(#[from] LlmError),

    #[error("knowledge index is not ready: {0}")]
    IndexNotReady(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("vector store failed: {0}")]
    Store(#[from] StoreError),

    #[error("multi-part extraction failed ({primary}) and local PDF text extraction failed too: {reason}")]
    PdfText { primary: String, reason: String },

    #[error("knowledge source error: {0}")]
    KnowledgeSource(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TriageError {
    /// Stable snake-case name, used in per-case failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            TriageError::InputTooLarge { .. } => "input_too_large",
            TriageError::UnsupportedContentType(_) => "unsupported_content_type",
            TriageError::ExtractionSchemaViolation(_) => "extraction_schema_violation",
            TriageError::CorrelationParseFailure(_) => "correlation_parse_failure",
            TriageError::NoCasesDetected => "no_cases_detected",
            TriageError::Transport(_) => "transport",
            TriageError::IndexNotReady(_) => "index_not_ready",
            TriageError::Embedding(_) => "embedding",
            TriageError::Store(_) => "store",
            TriageError::PdfText { .. } => "pdf_text",
            TriageError::KnowledgeSource(_) => "knowledge_source",
            TriageError::Config(_) => "config",
            TriageError::Io(_) => "io",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            TriageError::InputTooLarge { .. } => 413,
            TriageError::UnsupportedContentType(_) => 415,
            TriageError::NoCasesDetected => 422,
            TriageError::ExtractionSchemaViolation(_)
            | TriageError::CorrelationParseFailure(_)
            | TriageError::Transport(_) => 502,
            TriageError::IndexNotReady(_) => 503,
            _ => 500,
        }
    }
}
