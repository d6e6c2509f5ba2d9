// Prompt text sent to the model

use triage_core::Category;

pub const EXTRACTION_PROMPT: &str = r#"The attached document contains product support test cases or incident reports.

Identify every distinct case and answer with a single JSON object and nothing else:

{
  "cases": [
    {
      "id": "TC-01",
      "title": "short title, 3 to 10 words",
      "summary": "1 to 3 sentences: the scenario and the expected behavior",
      "signals": ["concrete tokens such as container numbers, EDI message types, 'berth', 'gate in', 'load', 'discharge'"],
      "category": "CNTR|VS|EA",
      "rationale": "a natural-language search query combining the description, category context and key signals, suitable for retrieving related incidents, fixes or procedures"
    }
  ]
}

Category rules:
- CNTR (container services): containers or cntr_no, yard, gate-in/gate-out, load/discharge, container status, size or hazard.
- VS (vessel): vessel or IMO number, berth and berthing, vessel advice, system_vessel_name, flag state, port program.
- EA (EDI/API services): EDI types (COPARN, COARRI, CODECO, IFTMIN, IFTMCS), API events, HTTP status or payload, correlation_id.

Do not write any text outside the JSON object."#;

pub const EXTRACTION_SYSTEM: &str = "You are a precise extractor that outputs strict JSON only.";

pub const CORRELATION_PROMPT: &str = r#"You correlate incident reports with application logs.

Input:
- an INCIDENT REPORT (plain text)
- zero or more LOG FILES, each labeled with its file name

Decide whether the incident refers to events that actually appear in any of the log files.

An incident refers to a log when:
- it names specific identifiers or phrases that occur in the log (container numbers, vessel names, EDI references such as REF-IFT-0007, IMO numbers, correlation ids), timestamps, event types (GATE_IN, LOAD, DISCHARGE) or error strings; or
- its narrative clearly describes an event the log records, even if the identifier is only implied.
Topic similarity alone is not a match; there must be a plausible concrete occurrence.

Answer with a single JSON object of exactly this shape:
{
  "refers_to_logs": true | false,
  "signals": ["key", "tokens", "from", "the", "report", "or", "logs"],
  "matched_logs": [
    { "file": "file_name.log", "confidence": 0.0, "reasons": ["short", "bullets"] }
  ]
}

Rules:
- When no log plausibly matches, set "refers_to_logs" to false and leave "matched_logs" empty.
- "confidence" is between 0.0 and 1.0.
- Keep reasons brief."#;

pub const CORRELATION_SYSTEM: &str = "You are a precise cross-referencer. Output strict JSON only.";

pub const CATEGORIZE_SYSTEM: &str = "You are a helpful incident categorization assistant.";

pub const SUGGEST_SYSTEM: &str =
    "You are an experienced L2 support engineer providing troubleshooting suggestions.";

/// User message for the categorizer fallback
pub fn categorize_prompt(text: &str) -> String {
    let labels: Vec<&str> = Category::KEYWORD_LABELS.iter().map(|c| c.label()).collect();
    format!(
        "Categorize this incident into one or more of: {}. Reply with the labels only, separated by commas.\n\nIncident text: {}",
        labels.join(", "),
        text
    )
}

/// User message for remediation suggestions
pub fn suggestion_prompt(query: &str, context: &str) -> String {
    format!(
        "Given the following context from incident logs and the knowledge base, give short, actionable bullet-point suggestions to resolve this issue.\n\n\
         Issue: {}\n\n\
         Context:\n{}\n\n\
         Keep the suggestions concise but specific (2-4 bullet points).",
        query, context
    )
}
