// Knowledge sources: the categorized incident log and the guidance document

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;

use triage_core::IncidentRecord;

use crate::error::TriageError;

// word/document.xml of a guidance document is far below this
const MAX_DOCX_XML_BYTES: u64 = 64 * 1024 * 1024;

#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn incident_records(&self) -> Result<Vec<IncidentRecord>, TriageError>;

    async fn guidance_text(&self) -> Result<String, TriageError>;
}

/// Incident records from a JSON file, guidance from a .docx or text file
#[derive(Debug, Clone)]
pub struct FileKnowledgeSource {
    incidents: PathBuf,
    guidance: PathBuf,
}

impl FileKnowledgeSource {
    pub fn new(incidents: impl Into<PathBuf>, guidance: impl Into<PathBuf>) -> Self {
        Self {
            incidents: incidents.into(),
            guidance: guidance.into(),
        }
    }
}

// file reads and docx parsing run on the blocking pool
#[async_trait]
impl KnowledgeSource for FileKnowledgeSource {
    async fn incident_records(&self) -> Result<Vec<IncidentRecord>, TriageError> {
        let path = self.incidents.clone();
        blocking(move || load_incident_records(&path)).await
    }

    async fn guidance_text(&self) -> Result<String, TriageError> {
        let path = self.guidance.clone();
        blocking(move || load_guidance(&path)).await
    }
}

async fn blocking<T, F>(load: F) -> Result<T, TriageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TriageError> + Send + 'static,
{
    tokio::task::spawn_blocking(load)
        .await
        .map_err(|e| TriageError::KnowledgeSource(format!("knowledge loading aborted: {}", e)))?
}

fn source_error(path: &Path, e: impl std::fmt::Display) -> TriageError {
    TriageError::KnowledgeSource(format!("{}: {}", path.display(), e))
}

pub fn load_incident_records(path: &Path) -> Result<Vec<IncidentRecord>, TriageError> {
    let content = fs::read_to_string(path).map_err(|e| source_error(path, e))?;
    serde_json::from_str(&content).map_err(|e| source_error(path, e))
}

pub fn save_incident_records(path: &Path, records: &[IncidentRecord]) -> Result<(), TriageError> {
    let json = serde_json::to_string_pretty(records).map_err(|e| source_error(path, e))?;
    fs::write(path, json)?;
    Ok(())
}

/// Guidance text. `.docx` yields one line per non-blank paragraph; any other
/// file is read as UTF-8 text.
pub fn load_guidance(path: &Path) -> Result<String, TriageError> {
    let is_docx = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("docx"))
        .unwrap_or(false);

    if is_docx {
        let bytes = fs::read(path).map_err(|e| source_error(path, e))?;
        docx_text(&bytes).map_err(|e| source_error(path, e))
    } else {
        fs::read_to_string(path).map_err(|e| source_error(path, e))
    }
}

pub fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| format!("not a Word document: {}", e))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_DOCX_XML_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| e.to_string())?;

    paragraphs(&xml)
}

// text of w:t runs, grouped by w:p paragraph
fn paragraphs(xml: &[u8]) -> Result<String, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !current.trim().is_empty() {
                        lines.push(current.trim().to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"tab" => current.push('\t'),
            Ok(Event::Text(t)) if in_text => {
                current.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    if !current.trim().is_empty() {
        lines.push(current.trim().to_string());
    }
    Ok(lines.join("\n"))
}
