// Incident triage engine - model-backed extraction, log correlation and
// knowledge retrieval

pub mod azure_client;
pub mod classifier;
pub mod config;
pub mod correlator;
pub mod embedder;
pub mod error;
pub mod extractor;
pub mod knowledge;
pub mod llm_client;
pub mod ollama_client;
pub mod pipeline;
pub mod prompts;
pub mod qdrant_store;
pub mod retriever;
pub mod secrets;
pub mod setup;
pub mod store;

pub use azure_client::AzureOpenAiClient;
pub use classifier::{Classification, ClassificationMethod, IncidentClassifier};
pub use config::{load_config, ConfigError, TriageConfig};
pub use correlator::{LogCandidate, LogCorrelator, LogHits};
pub use embedder::{AzureEmbedder, EmbedError, Embedder, FastEmbedder};
pub use error::TriageError;
pub use extractor::{Document, DocumentExtractor};
pub use knowledge::{FileKnowledgeSource, KnowledgeSource};
pub use llm_client::{ChatMessage, ChatRequest, InputPart, LlmClient, LlmError, ResponseRequest, Role};
pub use ollama_client::OllamaClient;
pub use pipeline::{CaseOutcome, CaseResult, PipelineReport, TriagePipeline};
pub use qdrant_store::QdrantStore;
pub use retriever::{IngestReport, KnowledgeRetriever, RetrieverSettings};
pub use secrets::{EnvSecrets, SecretSource, StaticSecrets};
pub use store::{IndexedChunk, MemoryStore, ScoredChunk, StoreError, VectorStore};
