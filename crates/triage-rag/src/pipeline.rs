// Orchestrator: upload -> cases -> per-case correlation and suggestions

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use triage_core::{CorrelationVerdict, IncidentCase, RetrievalResult};

use crate::correlator::LogCorrelator;
use crate::error::TriageError;
use crate::extractor::{Document, DocumentExtractor};
use crate::retriever::KnowledgeRetriever;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub ok: bool,
    pub count: usize,
    pub results: Vec<CaseResult>,
    pub processed_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, CaseOutcome::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub case: IncidentCase,
    #[serde(flatten)]
    pub outcome: CaseOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    Completed {
        verdict: CorrelationVerdict,
        suggestion: RetrievalResult,
    },
    Failed {
        kind: &'static str,
        message: String,
    },
}

pub struct TriagePipeline {
    extractor: DocumentExtractor,
    correlator: LogCorrelator,
    retriever: Arc<KnowledgeRetriever>,
}

impl TriagePipeline {
    pub fn new(extractor: DocumentExtractor, correlator: LogCorrelator, retriever: Arc<KnowledgeRetriever>) -> Self {
        Self {
            extractor,
            correlator,
            retriever,
        }
    }

    pub fn extractor(&self) -> &DocumentExtractor {
        &self.extractor
    }

    pub fn correlator(&self) -> &LogCorrelator {
        &self.correlator
    }

    pub fn retriever(&self) -> &KnowledgeRetriever {
        &self.retriever
    }

    /// Accept an upload by declared content type.
    pub async fn process_upload(&self, content_type: &str, bytes: Vec<u8>) -> Result<PipelineReport, TriageError> {
        let document = document_for(content_type, bytes)?;
        self.process(&document).await
    }

    pub async fn process(&self, document: &Document) -> Result<PipelineReport, TriageError> {
        let cases = self.extractor.extract(document).await?;
        if cases.is_empty() {
            return Err(TriageError::NoCasesDetected);
        }
        info!(cases = cases.len(), "processing extracted cases");

        // strictly sequential; one failing case never aborts the others
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            let outcome = match self.process_case(&case).await {
                Ok((verdict, suggestion)) => CaseOutcome::Completed { verdict, suggestion },
                Err(e) => {
                    warn!(case_id = %case.id, kind = e.kind(), error = %e, "case failed");
                    CaseOutcome::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };
            results.push(CaseResult { case, outcome });
        }

        Ok(PipelineReport {
            ok: true,
            count: results.len(),
            results,
            processed_at: Utc::now(),
        })
    }

    async fn process_case(&self, case: &IncidentCase) -> Result<(CorrelationVerdict, RetrievalResult), TriageError> {
        info!(case_id = %case.id, category = %case.category, "correlating case");
        let verdict = self
            .correlator
            .correlate(case.category, &case.correlation_text(), self.correlator.log_dir())
            .await?;

        let suggestion = self.retriever.suggest(case.retrieval_query()).await?;
        info!(
            case_id = %case.id,
            refers_to_logs = verdict.refers_to_logs,
            sources = suggestion.sources.len(),
            "case complete"
        );
        Ok((verdict, suggestion))
    }
}

/// Map a declared content type to a document kind. Parameters such as
/// `; charset=utf-8` are ignored.
pub fn document_for(content_type: &str, bytes: Vec<u8>) -> Result<Document, TriageError> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "application/pdf" | "application/octet-stream" => Ok(Document::Pdf(bytes)),
        "text/plain" => Ok(Document::Text(String::from_utf8_lossy(&bytes).into_owned())),
        _ => Err(TriageError::UnsupportedContentType(content_type.to_string())),
    }
}
