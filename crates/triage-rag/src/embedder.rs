// Text embedding providers

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    RequestFailed(String),

    #[error("embedding API returned status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("embedding model error: {0}")]
    Model(String),

    #[error("expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}

/// Local fastembed model (all-MiniLM-L6-v2)
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    pub const DIMENSION: usize = 384;

    pub fn new() -> Result<Self, EmbedError> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| EmbedError::Model(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbedError::Model("embedding model lock poisoned".to_string()))?;
        let vectors = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbedError::Model(e.to_string()))?;
        check_count(texts.len(), vectors)
    }

    fn dimension(&self) -> usize {
        Self::DIMENSION
    }

    fn name(&self) -> &str {
        "fastembed/all-minilm-l6-v2"
    }
}

/// Azure OpenAI embeddings deployment
#[derive(Debug, Clone)]
pub struct AzureEmbedder {
    client: Client,
    url: String,
    api_key: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl AzureEmbedder {
    pub fn new(
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        api_key: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbedError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            url: format!(
                "{}/openai/deployments/{}/embeddings?api-version={}",
                endpoint.trim_end_matches('/'),
                deployment,
                api_version
            ),
            api_key: api_key.into(),
            dimension,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Embedder for AzureEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input: texts })
            .send()
            .await
            .map_err(|e| EmbedError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let mut result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::RequestFailed(format!("Failed to parse response: {}", e)))?;
        result.data.sort_by_key(|d| d.index);
        check_count(texts.len(), result.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "azure-openai"
    }
}

fn check_count(expected: usize, vectors: Vec<Vec<f32>>) -> Result<Vec<Vec<f32>>, EmbedError> {
    if vectors.len() != expected {
        return Err(EmbedError::CountMismatch {
            expected,
            got: vectors.len(),
        });
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_azure_embeddings_url() {
        let embedder = AzureEmbedder::new(
            "https://example.openai.azure.com/",
            "text-embedding-3-small",
            "2023-05-15",
            "key",
            1536,
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(
            embedder.url(),
            "https://example.openai.azure.com/openai/deployments/text-embedding-3-small/embeddings?api-version=2023-05-15"
        );
        assert_eq!(embedder.dimension(), 1536);
    }

    #[test]
    fn test_count_mismatch() {
        let err = check_count(2, vec![vec![0.0]]).unwrap_err();
        assert!(matches!(err, EmbedError::CountMismatch { expected: 2, got: 1 }));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let embedder = AzureEmbedder::new("http://127.0.0.1:9", "d", "v", "k", 8, Duration::from_secs(1)).unwrap();
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }
}
