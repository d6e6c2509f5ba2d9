// Qdrant-backed vector store
// Point ids are UUID v5 of the chunk id, so re-upserting a chunk replaces it.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct, Range,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::info;
use uuid::Uuid;

use triage_core::{ChunkSource, KnowledgeChunk};

use crate::store::{IndexedChunk, ScoredChunk, StoreError, VectorStore};

pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    pub fn connect(url: &str, api_key: Option<String>, collection: impl Into<String>) -> Result<Self, StoreError> {
        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .build()
            .map_err(backend)?;
        Ok(Self {
            client,
            collection: collection.into(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

pub fn point_id(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
}

fn payload(chunk: &KnowledgeChunk) -> HashMap<String, QdrantValue> {
    let mut payload = HashMap::new();
    payload.insert("chunk_id".to_string(), chunk.id.clone().into());
    payload.insert("source".to_string(), chunk.source.as_str().to_string().into());
    payload.insert("category".to_string(), chunk.category.clone().into());
    payload.insert("ordinal".to_string(), (chunk.ordinal as i64).into());
    payload.insert("text".to_string(), chunk.text.clone().into());
    payload
}

// Helper to extract string from payload
fn get_string(payload: &HashMap<String, QdrantValue>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .unwrap_or_default()
}

fn chunk_from_payload(payload: &HashMap<String, QdrantValue>) -> Option<KnowledgeChunk> {
    let source = ChunkSource::from_str(&get_string(payload, "source"))?;
    let ordinal = payload.get("ordinal").and_then(|v| v.as_integer())?;
    Some(KnowledgeChunk {
        id: get_string(payload, "chunk_id"),
        source,
        category: get_string(payload, "category"),
        ordinal: usize::try_from(ordinal).ok()?,
        text: get_string(payload, "text"),
    })
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn exists(&self) -> Result<bool, StoreError> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(backend)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        if !self.exists().await? {
            return Ok(0);
        }
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(backend)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn create(&self, dimension: usize) -> Result<(), StoreError> {
        if self.exists().await? {
            return Ok(());
        }
        info!(collection = %self.collection, dimension, "creating collection");
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn upsert(&self, chunks: Vec<IndexedChunk>) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let points: Vec<PointStruct> = chunks
            .into_iter()
            .map(|c| PointStruct::new(point_id(&c.chunk.id), c.vector, payload(&c.chunk)))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn prune(&self, source: ChunkSource, keep: usize) -> Result<(), StoreError> {
        let filter = Filter::must([
            Condition::matches("source", source.as_str().to_string()),
            Condition::range(
                "ordinal",
                Range {
                    gte: Some(keep as f64),
                    ..Default::default()
                },
            ),
        ]);

        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(filter).wait(true))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit as u64).with_payload(true),
            )
            .await
            .map_err(backend)?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                chunk_from_payload(&point.payload).map(|chunk| ScoredChunk {
                    chunk,
                    score: point.score,
                })
            })
            .collect())
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
