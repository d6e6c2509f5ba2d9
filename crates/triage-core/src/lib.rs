//! Core types for the incident triage pipeline
//! Shared data structures used by the extractor, correlator, retriever and CLI.
pub mod categorizer;
pub mod chunking;
pub mod hints;
pub mod lenient;
pub mod log_map;
pub mod salvage;

pub use categorizer::KeywordCategorizer;
pub use chunking::{split_windows, ChunkWindow, ChunkingError, TextWindow};
pub use hints::{category_hints, LineHints};
pub use log_map::CategoryLogMap;
pub use salvage::{salvage_object, salvage_parse, SalvageError};

use serde::{Deserialize, Serialize};
use std::fmt;

// CATEGORY //

/// Root-cause domain of an incident.
///
/// Two label families live here side by side: the keyword categorizer labels
/// (`EDI_ERRORS`, `DATA_SYNC`, ...) and the module labels the extractor and
/// the log mapping use (`CNTR`, `VS`, `EA`). No translation between the two
/// families is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    EdiErrors,
    DataSync,
    ApiFailures,
    VesselConflicts,
    BusinessLogic,
    Container,
    Vessel,
    EdiApi,
    #[default]
    Unknown,
}

impl Category {
    /// Labels the keyword categorizer (and its model fallback) may assign.
    pub const KEYWORD_LABELS: [Category; 5] = [
        Category::EdiErrors,
        Category::DataSync,
        Category::ApiFailures,
        Category::VesselConflicts,
        Category::BusinessLogic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::EdiErrors => "EDI_ERRORS",
            Category::DataSync => "DATA_SYNC",
            Category::ApiFailures => "API_FAILURES",
            Category::VesselConflicts => "VESSEL_CONFLICTS",
            Category::BusinessLogic => "BUSINESS_LOGIC",
            Category::Container => "CNTR",
            Category::Vessel => "VS",
            Category::EdiApi => "EA",
            Category::Unknown => "UNKNOWN",
        }
    }

    /// Parse a label (case-insensitive, surrounding whitespace ignored)
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "EDI_ERRORS" => Some(Self::EdiErrors),
            "DATA_SYNC" => Some(Self::DataSync),
            "API_FAILURES" => Some(Self::ApiFailures),
            "VESSEL_CONFLICTS" => Some(Self::VesselConflicts),
            "BUSINESS_LOGIC" => Some(Self::BusinessLogic),
            "CNTR" => Some(Self::Container),
            "VS" => Some(Self::Vessel),
            "EA" => Some(Self::EdiApi),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn is_keyword_label(&self) -> bool {
        Self::KEYWORD_LABELS.contains(self)
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::from_label(&s).unwrap_or(Category::Unknown)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.label().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Join labels the way the categorized incident log stores them ("A, B").
pub fn join_labels(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// INCIDENT CASE (extractor output) //

/// A test case / incident extracted from a source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentCase {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,

    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: String,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub signals: Vec<String>,

    #[serde(default, deserialize_with = "lenient::category")]
    pub category: Category,

    /// Retrieval-oriented restatement of the case, used as the knowledge query
    #[serde(default, deserialize_with = "lenient::text")]
    pub rationale: String,
}

impl IncidentCase {
    /// Flatten the case into the text handed to the log correlator.
    /// Empty fields are skipped; signals are comma-joined on one line.
    pub fn correlation_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for field in [&self.id, &self.title, &self.summary] {
            if !field.trim().is_empty() {
                parts.push(field.clone());
            }
        }
        if !self.signals.is_empty() {
            parts.push(self.signals.join(", "));
        }
        parts.join("\n")
    }

    pub fn retrieval_query(&self) -> &str {
        if self.rationale.trim().is_empty() {
            &self.title
        } else {
            &self.rationale
        }
    }
}

// INCIDENT RECORD (categorized incident log row) //

/// One row of the categorized incident log, as exported from the spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    #[serde(rename = "Alert / Email", alias = "alert", default, deserialize_with = "lenient::opt_text")]
    pub alert: Option<String>,

    #[serde(rename = "Problem Statements", alias = "problem_statement", default, deserialize_with = "lenient::opt_text")]
    pub problem_statement: Option<String>,

    #[serde(rename = "Solution", alias = "solution", default, deserialize_with = "lenient::opt_text")]
    pub solution: Option<String>,

    /// Comma-joined category labels
    #[serde(rename = "Category", alias = "category", default, deserialize_with = "lenient::opt_text")]
    pub category: Option<String>,
}

impl IncidentRecord {
    /// Alert, problem statement and solution joined by single spaces;
    /// missing cells count as empty.
    pub fn incident_text(&self) -> String {
        format!(
            "{} {} {}",
            self.alert.as_deref().unwrap_or(""),
            self.problem_statement.as_deref().unwrap_or(""),
            self.solution.as_deref().unwrap_or("")
        )
    }

    pub fn categories(&self) -> Vec<Category> {
        self.category
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| Category::from_label(s).unwrap_or(Category::Unknown))
            .collect()
    }
}

// CORRELATION VERDICT //

/// One log file the model matched against an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMatch {
    #[serde(default, deserialize_with = "lenient::text")]
    pub file: String,

    #[serde(default, deserialize_with = "lenient::score")]
    pub confidence: f64,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub reasons: Vec<String>,
}

/// The decision exactly as the correlation model states it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDecision {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub refers_to_logs: bool,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub signals: Vec<String>,

    #[serde(default)]
    pub matched_logs: Vec<LogMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationVerdict {
    pub refers_to_logs: bool,
    pub matched_logs: Vec<LogMatch>,
    pub signals: Vec<String>,
    /// Model reply as parsed, before any consistency checks
    pub raw: serde_json::Value,
}

impl CorrelationVerdict {
    /// Build the verdict from the model's decision.
    ///
    /// Matches without a file name are dropped and confidences clamped to
    /// [0, 1]. The overall verdict holds only when the model says so AND names
    /// at least one file; a bare `true` with nothing matched is false.
    pub fn from_decision(decision: ModelDecision, raw: serde_json::Value) -> Self {
        let matched_logs: Vec<LogMatch> = decision
            .matched_logs
            .into_iter()
            .filter(|m| !m.file.trim().is_empty())
            .map(|m| LogMatch {
                file: m.file.trim().to_string(),
                confidence: if m.confidence.is_finite() {
                    m.confidence.clamp(0.0, 1.0)
                } else {
                    0.0
                },
                reasons: m.reasons,
            })
            .collect();

        Self {
            refers_to_logs: decision.refers_to_logs && !matched_logs.is_empty(),
            matched_logs,
            signals: decision.signals,
            raw,
        }
    }

    pub fn matched_log_files(&self) -> Vec<String> {
        self.matched_logs.iter().map(|m| m.file.clone()).collect()
    }
}

// KNOWLEDGE CHUNKS (similarity index units) //

/// Category tag applied to every knowledge-document window.
pub const GENERAL_GUIDELINES: &str = "GENERAL_GUIDELINES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkSource {
    #[serde(rename = "incident_log")]
    IncidentLog,
    #[serde(rename = "kb_doc")]
    KnowledgeBase,
}

impl ChunkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkSource::IncidentLog => "incident_log",
            ChunkSource::KnowledgeBase => "kb_doc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "incident_log" => Some(Self::IncidentLog),
            "kb_doc" => Some(Self::KnowledgeBase),
            _ => None,
        }
    }
}

/// A unit of indexed text. Identifiers depend only on position in the input,
/// so re-ingesting identical input produces identical ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub source: ChunkSource,
    pub category: String,
    pub ordinal: usize,
    pub text: String,
}

impl KnowledgeChunk {
    pub fn incident(row: usize, record: &IncidentRecord) -> Self {
        let category = record
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(Category::Unknown.label())
            .to_string();
        Self {
            id: format!("incident_{}", row),
            source: ChunkSource::IncidentLog,
            category,
            ordinal: row,
            text: record.incident_text(),
        }
    }

    pub fn guidance(window: &TextWindow) -> Self {
        Self {
            id: format!("kb_{}", window.ordinal),
            source: ChunkSource::KnowledgeBase,
            category: GENERAL_GUIDELINES.to_string(),
            ordinal: window.ordinal,
            text: window.text.clone(),
        }
    }
}

// RETRIEVAL RESULT //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub suggestion: String,
    /// Distinct chunk sources, in order of first appearance
    pub sources: Vec<String>,
    pub chunk_ids: Vec<String>,
}
