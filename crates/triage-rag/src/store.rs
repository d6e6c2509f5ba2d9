// Vector store abstraction and an in-memory implementation

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use triage_core::{ChunkSource, KnowledgeChunk};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("vector store error: {0}")]
    Backend(String),

    #[error("collection does not exist")]
    MissingCollection,

    #[error("vector has {got} dimensions, collection expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub chunk: KnowledgeChunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

/// A single collection of knowledge chunks keyed by chunk id.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn exists(&self) -> Result<bool, StoreError>;

    /// Number of stored chunks; 0 when the collection is missing
    async fn count(&self) -> Result<usize, StoreError>;

    /// Create the collection if it is missing; a no-op otherwise
    async fn create(&self, dimension: usize) -> Result<(), StoreError>;

    /// Insert or replace chunks by id
    async fn upsert(&self, chunks: Vec<IndexedChunk>) -> Result<(), StoreError>;

    /// Remove chunks of `source` whose ordinal is >= `keep`
    async fn prune(&self, source: ChunkSource, keep: usize) -> Result<(), StoreError>;

    /// Nearest chunks by cosine similarity, best first
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    fn name(&self) -> &str;
}

struct Collection {
    dimension: usize,
    chunks: HashMap<String, IndexedChunk>,
}

/// Brute-force store held in process memory
#[derive(Default)]
pub struct MemoryStore {
    collection: RwLock<Option<Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.collection
            .read()
            .await
            .as_ref()
            .map(|c| c.chunks.len())
            .unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sorted ids of every stored chunk
    pub async fn ids(&self) -> Vec<String> {
        let guard = self.collection.read().await;
        let mut ids: Vec<String> = guard
            .as_ref()
            .map(|c| c.chunks.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn exists(&self) -> Result<bool, StoreError> {
        Ok(self.collection.read().await.is_some())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.len().await)
    }

    async fn create(&self, dimension: usize) -> Result<(), StoreError> {
        let mut guard = self.collection.write().await;
        if guard.is_none() {
            *guard = Some(Collection {
                dimension,
                chunks: HashMap::new(),
            });
        }
        Ok(())
    }

    async fn upsert(&self, chunks: Vec<IndexedChunk>) -> Result<(), StoreError> {
        let mut guard = self.collection.write().await;
        let collection = guard.as_mut().ok_or(StoreError::MissingCollection)?;

        if let Some(bad) = chunks.iter().find(|c| c.vector.len() != collection.dimension) {
            return Err(StoreError::DimensionMismatch {
                expected: collection.dimension,
                got: bad.vector.len(),
            });
        }
        for chunk in chunks {
            collection.chunks.insert(chunk.chunk.id.clone(), chunk);
        }
        Ok(())
    }

    async fn prune(&self, source: ChunkSource, keep: usize) -> Result<(), StoreError> {
        let mut guard = self.collection.write().await;
        let collection = guard.as_mut().ok_or(StoreError::MissingCollection)?;
        collection
            .chunks
            .retain(|_, c| c.chunk.source != source || c.chunk.ordinal < keep);
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let guard = self.collection.read().await;
        let collection = guard.as_ref().ok_or(StoreError::MissingCollection)?;

        let mut scored: Vec<ScoredChunk> = collection
            .chunks
            .values()
            .map(|c| ScoredChunk {
                chunk: c.chunk.clone(),
                score: cosine_similarity(vector, &c.vector),
            })
            .collect();

        // ties broken by id so results are deterministic
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
