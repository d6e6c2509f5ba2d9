//! Configuration for the triage pipeline, loaded from TOML.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration. Credentials never appear here: fields ending in `_secret`
//! name a secret that is resolved through a [`SecretSource`](crate::secrets::SecretSource).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use triage_core::{CategoryLogMap, ChunkWindow, ChunkingError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid chunking settings: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("secret {0} is not set")]
    MissingSecret(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub extraction: ExtractionConfig,
    pub correlation: CorrelationConfig,
    pub retrieval: RetrievalConfig,
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Azure,
    Ollama,
}

// chat + responses deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,

    // resource endpoint; empty means resolve `endpoint_secret`
    pub endpoint: String,
    pub endpoint_secret: String,

    pub deployment: String,
    pub api_version: String,
    pub api_key_secret: String,

    // per-call network timeout, applies to every model request
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Azure,
            endpoint: String::new(),
            endpoint_secret: "AZURE_OPENAI_ENDPOINT".to_string(),
            deployment: "gpt-4o".to_string(),
            api_version: "2025-01-01-preview".to_string(),
            api_key_secret: "AZURE_OPENAI_API_KEY".to_string(),
            timeout_seconds: 180,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// fastembed, runs in-process
    #[default]
    Local,
    Azure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    // azure only; endpoint and key come from [llm]
    pub deployment: String,
    pub api_version: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            deployment: "text-embedding-3-small".to_string(),
            api_version: "2023-05-15".to_string(),
            dimension: 1536,
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub url: String,
    pub collection: String,
    // optional; unset means an unauthenticated instance
    pub api_key_secret: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Qdrant,
            url: "http://localhost:6334".to_string(),
            collection: "incident_knowledge".to_string(),
            api_key_secret: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub max_document_bytes: usize,
    // cap on locally extracted PDF text, in characters
    pub max_text_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: 15 * 1024 * 1024,
            max_text_chars: 200_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub log_dir: PathBuf,
    // per-file read cap, and cap on the consolidated fallback section
    pub max_log_bytes: usize,
    pub max_incident_chars: usize,
    /// Matching lines kept per file by the hint search
    pub max_hit_lines: usize,
    pub log_map: CategoryLogMap,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            max_log_bytes: 400_000,
            max_incident_chars: 200_000,
            max_hit_lines: 200,
            log_map: CategoryLogMap::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_tokens: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 5,
            max_tokens: 250,
        }
    }
}

impl RetrievalConfig {
    pub fn chunk_window(&self) -> Result<ChunkWindow, ConfigError> {
        Ok(ChunkWindow::new(self.chunk_size, self.chunk_overlap)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    // categorized incident log, JSON array of records
    pub incidents: PathBuf,
    // guidance document, .docx or plain text
    pub guidance: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            incidents: PathBuf::from("data/incidents.json"),
            guidance: PathBuf::from("data/guidelines.docx"),
        }
    }
}

impl TriageConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: TriageConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retrieval.chunk_window()?;
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be at least 1".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::Invalid("embedding.batch_size must be at least 1".into()));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("llm.timeout_seconds must be at least 1".into()));
        }
        Ok(())
    }
}

// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TriageConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    TriageConfig::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::Category;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TriageConfig::from_toml("").unwrap();
        assert_eq!(config, TriageConfig::default());
        assert_eq!(config.llm.timeout(), Duration::from_secs(180));
        assert_eq!(config.extraction.max_document_bytes, 15 * 1024 * 1024);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(
            config.correlation.log_map.candidates(Category::Container),
            ["container_service.log"]
        );
    }

    #[test]
    fn test_load_config() {
        let toml_content = r#"
[llm]
provider = "ollama"
timeout_seconds = 30

[ollama]
model = "qwen2.5:7b"

[index]
backend = "memory"

[correlation]
log_dir = "/var/log/terminal"

[correlation.log_map]
CNTR = ["gate.log", "yard.log"]

[retrieval]
chunk_size = 800
chunk_overlap = 100
"#;
        let config = TriageConfig::from_toml(toml_content).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.deployment, "gpt-4o");
        assert_eq!(config.ollama.model, "qwen2.5:7b");
        assert_eq!(config.index.backend, IndexBackend::Memory);
        assert_eq!(config.correlation.log_dir, PathBuf::from("/var/log/terminal"));
        assert_eq!(
            config.correlation.log_map.candidates(Category::Container),
            ["gate.log", "yard.log"]
        );
        // a custom table replaces the default one
        assert!(config.correlation.log_map.candidates(Category::Vessel).is_empty());
        assert_eq!(config.retrieval.chunk_window().unwrap().size(), 800);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let err = TriageConfig::from_toml("[retrieval]\nchunk_size = 50\nchunk_overlap = 50\n").unwrap_err();
        assert!(matches!(err, ConfigError::Chunking(_)));
    }

    #[test]
    fn test_misspelled_log_map_category_is_rejected() {
        let err = TriageConfig::from_toml("[correlation.log_map]\nCTNR = [\"container_service.log\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = TriageConfig::from_toml("[llm]\nprovider = \"bard\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config("/nonexistent/triage.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
