// Build every pipeline component from configuration

use std::sync::Arc;

use tracing::info;

use crate::azure_client::AzureOpenAiClient;
use crate::classifier::IncidentClassifier;
use crate::config::{ConfigError, EmbeddingProvider, IndexBackend, LlmProvider, TriageConfig};
use crate::correlator::LogCorrelator;
use crate::embedder::{AzureEmbedder, Embedder, FastEmbedder};
use crate::error::TriageError;
use crate::extractor::DocumentExtractor;
use crate::knowledge::FileKnowledgeSource;
use crate::llm_client::LlmClient;
use crate::ollama_client::OllamaClient;
use crate::pipeline::TriagePipeline;
use crate::qdrant_store::QdrantStore;
use crate::retriever::{KnowledgeRetriever, RetrieverSettings};
use crate::secrets::SecretSource;
use crate::store::{MemoryStore, VectorStore};

fn azure_endpoint(config: &TriageConfig, secrets: &dyn SecretSource) -> Result<String, ConfigError> {
    if config.llm.endpoint.trim().is_empty() {
        secrets.require(&config.llm.endpoint_secret)
    } else {
        Ok(config.llm.endpoint.clone())
    }
}

pub fn build_llm(config: &TriageConfig, secrets: &dyn SecretSource) -> Result<Arc<dyn LlmClient>, TriageError> {
    let client: Arc<dyn LlmClient> = match config.llm.provider {
        LlmProvider::Azure => Arc::new(AzureOpenAiClient::new(
            azure_endpoint(config, secrets)?,
            &config.llm.deployment,
            &config.llm.api_version,
            secrets.require(&config.llm.api_key_secret)?,
            config.llm.timeout(),
        )?),
        LlmProvider::Ollama => Arc::new(OllamaClient::new(
            &config.ollama.base_url,
            &config.ollama.model,
            config.llm.timeout(),
        )?),
    };
    info!(provider = %client.provider(), model = %client.model(), "LLM client ready");
    Ok(client)
}

pub fn build_embedder(config: &TriageConfig, secrets: &dyn SecretSource) -> Result<Arc<dyn Embedder>, TriageError> {
    let embedder: Arc<dyn Embedder> = match config.embedding.provider {
        EmbeddingProvider::Local => {
            info!("Loading embedding model...");
            Arc::new(FastEmbedder::new()?)
        }
        EmbeddingProvider::Azure => Arc::new(AzureEmbedder::new(
            &azure_endpoint(config, secrets)?,
            &config.embedding.deployment,
            &config.embedding.api_version,
            secrets.require(&config.llm.api_key_secret)?,
            config.embedding.dimension,
            config.llm.timeout(),
        )?),
    };
    Ok(embedder)
}

pub fn build_store(config: &TriageConfig, secrets: &dyn SecretSource) -> Result<Arc<dyn VectorStore>, TriageError> {
    let store: Arc<dyn VectorStore> = match config.index.backend {
        IndexBackend::Qdrant => {
            let api_key = match &config.index.api_key_secret {
                Some(name) => Some(secrets.require(name)?),
                None => None,
            };
            Arc::new(QdrantStore::connect(&config.index.url, api_key, &config.index.collection)?)
        }
        IndexBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

pub fn build_retriever(
    config: &TriageConfig,
    secrets: &dyn SecretSource,
    llm: Arc<dyn LlmClient>,
) -> Result<KnowledgeRetriever, TriageError> {
    let settings = RetrieverSettings {
        window: config.retrieval.chunk_window()?,
        top_k: config.retrieval.top_k,
        max_tokens: config.retrieval.max_tokens,
        batch_size: config.embedding.batch_size,
    };
    let source = Arc::new(FileKnowledgeSource::new(
        &config.knowledge.incidents,
        &config.knowledge.guidance,
    ));

    Ok(KnowledgeRetriever::new(
        source,
        build_embedder(config, secrets)?,
        build_store(config, secrets)?,
        llm,
        settings,
    ))
}

pub fn build_classifier(config: &TriageConfig, secrets: &dyn SecretSource) -> Result<IncidentClassifier, TriageError> {
    Ok(IncidentClassifier::new(build_llm(config, secrets)?))
}

/// Construct the full pipeline. Components share one LLM client.
pub fn build_pipeline(config: &TriageConfig, secrets: &dyn SecretSource) -> Result<TriagePipeline, TriageError> {
    config.validate()?;
    let llm = build_llm(config, secrets)?;

    let extractor = DocumentExtractor::new(llm.clone(), config.extraction.clone());
    let correlator = LogCorrelator::new(llm.clone(), config.correlation.clone());
    let retriever = build_retriever(config, secrets, llm)?;

    Ok(TriagePipeline::new(extractor, correlator, Arc::new(retriever)))
}
