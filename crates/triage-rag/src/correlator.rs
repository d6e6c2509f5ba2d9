// Log correlator
// Decides whether an incident refers to events recorded in the candidate log
// files of its category.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

use triage_core::{salvage_object, truncate_chars, Category, CorrelationVerdict, LineHints, ModelDecision};

use crate::config::CorrelationConfig;
use crate::error::TriageError;
use crate::llm_client::{ChatMessage, ChatRequest, LlmClient, ResponseRequest};
use crate::prompts;

#[derive(Debug, Clone, PartialEq)]
pub struct LogCandidate {
    pub file: String,
    pub content: String,
}

/// Lines of one candidate file that matched the category hints or the
/// incident's identifier-like signals. Missing files have no lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogHits {
    pub file: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Unresolved,
    CandidatesGathered,
    VerdictParsed,
    ParseFailed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Unresolved => "unresolved",
            Stage::CandidatesGathered => "candidates_gathered",
            Stage::VerdictParsed => "verdict_parsed",
            Stage::ParseFailed => "parse_failed",
        };
        f.write_str(name)
    }
}

pub struct LogCorrelator {
    llm: Arc<dyn LlmClient>,
    config: CorrelationConfig,
}

impl LogCorrelator {
    pub fn new(llm: Arc<dyn LlmClient>, config: CorrelationConfig) -> Self {
        Self { llm, config }
    }

    /// Directory the pipeline correlates against
    pub fn log_dir(&self) -> &Path {
        &self.config.log_dir
    }

    /// Read the candidate files of a category from `base_dir`, each capped at
    /// `max_log_bytes`. Files that do not exist are skipped.
    pub async fn gather_candidates(&self, category: Category, base_dir: &Path) -> Vec<LogCandidate> {
        let mut candidates = Vec::new();

        for name in self.config.log_map.candidates(category) {
            let path = base_dir.join(name);
            match read_capped(&path, self.config.max_log_bytes).await {
                Ok(content) => candidates.push(LogCandidate {
                    file: name.clone(),
                    content,
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(file = %path.display(), "candidate log missing, skipped");
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "candidate log unreadable, skipped");
                }
            }
        }

        candidates
    }

    /// Regex pre-filter over the candidate files, see [`find_hits`].
    pub async fn find_hits(&self, category: Category, signals: &[String], base_dir: &Path) -> Vec<LogHits> {
        find_hits(&self.config, category, signals, base_dir).await
    }

    pub async fn correlate(
        &self,
        category: Category,
        incident: &str,
        base_dir: &Path,
    ) -> Result<CorrelationVerdict, TriageError> {
        debug!(stage = %Stage::Unresolved, category = %category, "correlating incident");

        let candidates = self.gather_candidates(category, base_dir).await;
        info!(
            stage = %Stage::CandidatesGathered,
            category = %category,
            files = candidates.len(),
            "candidate logs gathered"
        );

        let incident = truncate_chars(incident, self.config.max_incident_chars);

        let reply = match self.llm.respond(&self.multipart_request(incident, &candidates)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    provider = %self.llm.provider(),
                    error = %e,
                    "multi-part correlation failed, retrying as one chat request"
                );
                self.llm
                    .chat(&self.consolidated_request(incident, &candidates))
                    .await?
            }
        };

        match parse_verdict(&reply) {
            Ok(verdict) => {
                info!(
                    stage = %Stage::VerdictParsed,
                    category = %category,
                    refers_to_logs = verdict.refers_to_logs,
                    matched = verdict.matched_logs.len(),
                    "correlation verdict"
                );
                Ok(verdict)
            }
            Err(e) => {
                warn!(stage = %Stage::ParseFailed, category = %category, error = %e, "correlation reply unusable");
                Err(e)
            }
        }
    }

    fn multipart_request(&self, incident: &str, candidates: &[LogCandidate]) -> ResponseRequest {
        let mut request = ResponseRequest::new()
            .text(prompts::CORRELATION_PROMPT)
            .text(format!("INCIDENT REPORT:\n{}", incident));

        for candidate in candidates {
            request = request
                .text(format!("LOG FILE: {}", candidate.file))
                .file(candidate.file.clone(), "text/plain", candidate.content.as_bytes().to_vec());
        }

        request.temperature(0.0).json_output()
    }

    fn consolidated_request(&self, incident: &str, candidates: &[LogCandidate]) -> ChatRequest {
        let mut logs = String::new();
        for candidate in candidates {
            logs.push_str(&format!("\n\n===== {} =====\n", candidate.file));
            logs.push_str(&candidate.content);
        }
        let logs = truncate_chars(&logs, self.config.max_log_bytes);

        ChatRequest::new(vec![
            ChatMessage::system(prompts::CORRELATION_SYSTEM),
            ChatMessage::user(prompts::CORRELATION_PROMPT),
            ChatMessage::user(format!("INCIDENT REPORT:\n{}", incident)),
            ChatMessage::user(format!("LOG FILES:\n{}", logs)),
        ])
        .temperature(0.0)
        .json_output()
    }
}

async fn read_capped(path: &Path, cap: usize) -> std::io::Result<String> {
    let file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::new();
    file.take(cap as u64).read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Every mapped file of `category` gets an entry holding at most
/// `max_hit_lines` matching lines, in file order. No model call is made.
pub async fn find_hits(
    config: &CorrelationConfig,
    category: Category,
    signals: &[String],
    base_dir: &Path,
) -> Vec<LogHits> {
    let hints = LineHints::new(category, signals);
    let mut hits = Vec::new();

    for name in config.log_map.candidates(category) {
        let path = base_dir.join(name);
        let lines = match matching_lines(&path, &hints, config.max_hit_lines).await {
            Ok(lines) => lines,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %path.display(), "candidate log missing, no hits");
                Vec::new()
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "candidate log unreadable, no hits");
                Vec::new()
            }
        };
        debug!(file = %name, hits = lines.len(), "hint search");
        hits.push(LogHits {
            file: name.clone(),
            lines,
        });
    }

    hits
}

async fn matching_lines(path: &Path, hints: &LineHints, max_lines: usize) -> std::io::Result<Vec<String>> {
    let mut reader = BufReader::new(tokio::fs::File::open(path).await?);
    let mut matches = Vec::new();
    let mut buf = Vec::new();

    while matches.len() < max_lines {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if hints.matches(line) {
            matches.push(line.to_string());
        }
    }

    Ok(matches)
}

/// Parse a correlation reply into a verdict; unparseable replies are a
/// `CorrelationParseFailure`, never a silent "no match".
pub fn parse_verdict(reply: &str) -> Result<CorrelationVerdict, TriageError> {
    let object = salvage_object(reply).map_err(|e| TriageError::CorrelationParseFailure(e.to_string()))?;
    let raw = Value::Object(object);
    let decision: ModelDecision = serde_json::from_value(raw.clone())
        .map_err(|e| TriageError::CorrelationParseFailure(e.to_string()))?;
    Ok(CorrelationVerdict::from_decision(decision, raw))
}
