// Knowledge retriever
// Builds the similarity index from incident history plus the guidance
// document, and answers remediation questions from its nearest chunks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use triage_core::{split_windows, ChunkSource, ChunkWindow, KnowledgeChunk, RetrievalResult};

use crate::embedder::{EmbedError, Embedder};
use crate::error::TriageError;
use crate::knowledge::KnowledgeSource;
use crate::llm_client::{ChatMessage, ChatRequest, LlmClient};
use crate::prompts;
use crate::store::{IndexedChunk, VectorStore};

#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub window: ChunkWindow,
    pub top_k: usize,
    pub max_tokens: u32,
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub incident_chunks: usize,
    pub guidance_chunks: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.incident_chunks + self.guidance_chunks
    }
}

pub struct KnowledgeRetriever {
    source: Arc<dyn KnowledgeSource>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    settings: RetrieverSettings,
    // Some(report) when this process ingested, None when a populated index
    // was found; stays empty after a failed attempt
    lazy_ingest: OnceCell<Option<IngestReport>>,
    // set once a lazy attempt has started; after that a non-empty store is
    // no longer trusted, it may hold a partial ingestion
    lazy_attempted: AtomicBool,
}

impl KnowledgeRetriever {
    pub fn new(
        source: Arc<dyn KnowledgeSource>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmClient>,
        settings: RetrieverSettings,
    ) -> Self {
        Self {
            source,
            embedder,
            store,
            llm,
            settings,
            lazy_ingest: OnceCell::new(),
            lazy_attempted: AtomicBool::new(false),
        }
    }

    /// Every chunk the knowledge sources currently produce, incidents first
    pub async fn collect_chunks(&self) -> Result<(Vec<KnowledgeChunk>, Vec<KnowledgeChunk>), TriageError> {
        let incidents: Vec<KnowledgeChunk> = self
            .source
            .incident_records()
            .await?
            .iter()
            .enumerate()
            .map(|(row, record)| KnowledgeChunk::incident(row, record))
            .collect();

        let guidance_text = self.source.guidance_text().await?;
        let guidance: Vec<KnowledgeChunk> = split_windows(&guidance_text, self.settings.window)
            .iter()
            .map(KnowledgeChunk::guidance)
            .collect();

        Ok((incidents, guidance))
    }

    /// Embed and upsert all chunks, then drop ordinals the sources no longer
    /// produce. Running it twice on the same input leaves the same index.
    pub async fn ingest(&self) -> Result<IngestReport, TriageError> {
        let (incidents, guidance) = self.collect_chunks().await?;
        let report = IngestReport {
            incident_chunks: incidents.len(),
            guidance_chunks: guidance.len(),
        };

        self.store.create(self.embedder.dimension()).await?;

        let chunks: Vec<KnowledgeChunk> = incidents.into_iter().chain(guidance).collect();
        for batch in chunks.chunks(self.settings.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            let indexed: Vec<IndexedChunk> = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| IndexedChunk { chunk, vector })
                .collect();
            self.store.upsert(indexed).await?;
            debug!(chunks = batch.len(), "batch indexed");
        }

        self.store
            .prune(ChunkSource::IncidentLog, report.incident_chunks)
            .await?;
        self.store
            .prune(ChunkSource::KnowledgeBase, report.guidance_chunks)
            .await?;

        info!(
            store = %self.store.name(),
            incidents = report.incident_chunks,
            guidance = report.guidance_chunks,
            "knowledge index ingested"
        );
        Ok(report)
    }

    async fn ingest_once(&self) -> Result<Option<IngestReport>, TriageError> {
        let first_attempt = !self.lazy_attempted.swap(true, Ordering::SeqCst);
        if first_attempt && self.store.count().await? > 0 {
            debug!("knowledge index already populated");
            return Ok(None);
        }
        info!("knowledge index not ready, ingesting before first query");
        self.ingest().await.map(Some)
    }

    /// Concurrent first queries wait on the same ingestion; none of them
    /// searches before it has finished.
    async fn ensure_index(&self) -> Result<(), TriageError> {
        self.lazy_ingest.get_or_try_init(|| self.ingest_once()).await?;

        if self.store.count().await? == 0 {
            return Err(TriageError::IndexNotReady(
                "index still empty after ingestion".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn suggest(&self, query: &str) -> Result<RetrievalResult, TriageError> {
        self.ensure_index().await?;

        let vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbedError::CountMismatch { expected: 1, got: 0 })?;

        let hits = self.store.search(&vector, self.settings.top_k).await?;
        debug!(hits = hits.len(), "nearest chunks");

        let context = hits
            .iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut sources: Vec<String> = Vec::new();
        for hit in &hits {
            let source = hit.chunk.source.as_str().to_string();
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        let request = ChatRequest::new(vec![
            ChatMessage::system(prompts::SUGGEST_SYSTEM),
            ChatMessage::user(prompts::suggestion_prompt(query, &context)),
        ])
        .max_tokens(self.settings.max_tokens);

        let suggestion = self.llm.chat(&request).await?;

        Ok(RetrievalResult {
            suggestion: suggestion.trim().to_string(),
            sources,
            chunk_ids: hits.into_iter().map(|h| h.chunk.id).collect(),
        })
    }
}
