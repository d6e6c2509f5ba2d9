// Line hints - regex pre-filter over log lines
//
// Each module category carries a fixed set of case-insensitive patterns.
// Signals that look like identifiers (container numbers, EDI references,
// message types) are added as literal patterns.

use regex::{Regex, RegexBuilder};

use crate::Category;

const CONTAINER_HINTS: &[&str] = &[
    r"\bcontainer\b",
    r"\bcntr[_-]?no\b",
    r"\bstatus\b",
    r"\bgate[_ -]?in\b",
    r"\bgate[_ -]?out\b",
    r"\bload(ed|ing)?\b",
    r"\bdischarge(d|ing)?\b",
];

const VESSEL_HINTS: &[&str] = &[
    r"\bvessel\b",
    r"\bIMO\b",
    r"\bvessel[_ -]?advice\b",
    r"\bberth\b",
    r"\bsystem[_ -]?vessel[_ -]?name\b",
];

const EDI_API_HINTS: &[&str] = &[
    r"\bEDI\b",
    r"\bCOPARN\b",
    r"\bCOARRI\b",
    r"\bCODECO\b",
    r"\bIFTMIN\b",
    r"\bIFTMCS\b",
    r"\bapi[-_\s]?event\b",
    r"\bhttp\b",
    r"\bcorrelation\b",
];

/// Longest signal still treated as an identifier
const MAX_SIGNAL_LEN: usize = 64;

/// Fixed patterns for a category; keyword labels and UNKNOWN have none.
pub fn category_hints(category: Category) -> &'static [&'static str] {
    match category {
        Category::Container => CONTAINER_HINTS,
        Category::Vessel => VESSEL_HINTS,
        Category::EdiApi => EDI_API_HINTS,
        _ => &[],
    }
}

fn case_insensitive(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern).case_insensitive(true).build().ok()
}

/// Compiled line filter for one incident
pub struct LineHints {
    patterns: Vec<Regex>,
}

impl LineHints {
    pub fn new(category: Category, signals: &[String]) -> Self {
        let id_like = case_insensitive(r"[A-Z]{3,}\w*\d+|REF-|IFT|COPARN|CODECO|COARRI|IMO|MV");

        let mut patterns: Vec<Regex> = category_hints(category)
            .iter()
            .filter_map(|p| case_insensitive(p))
            .collect();

        for signal in signals {
            let len = signal.chars().count();
            let looks_like_id = id_like.as_ref().is_some_and(|re| re.is_match(signal));
            if len > 1 && len <= MAX_SIGNAL_LEN && looks_like_id {
                if let Some(re) = case_insensitive(&regex::escape(signal)) {
                    patterns.push(re);
                }
            }
        }

        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, line: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(line))
    }

    /// First `max_lines` matching lines of `text`, in file order
    pub fn matching_lines(&self, text: &str, max_lines: usize) -> Vec<String> {
        text.lines()
            .filter(|line| self.matches(line))
            .take(max_lines)
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_hints_match_gate_events() {
        let hints = LineHints::new(Category::Container, &[]);
        assert!(hints.matches("2024-05-01T08:14:02Z INFO GATE_IN cntr_no=MSCU1234567"));
        assert!(hints.matches("gate out lane 2"));
        assert!(!hints.matches("heartbeat ok"));
    }

    #[test]
    fn test_id_like_signals_are_added_literally() {
        let signals = vec![
            "MSCU1234567".to_string(),
            "REF-IFT-0007".to_string(),
            "berth".to_string(),
            "x".to_string(),
        ];
        let hints = LineHints::new(Category::Unknown, &signals);
        // "berth" and "x" are not identifiers
        assert_eq!(hints.len(), 2);
        assert!(hints.matches("ack for ref-ift-0007 received"));
        assert!(!hints.matches("berth 4 allocated"));
    }

    #[test]
    fn test_signal_metacharacters_are_escaped() {
        let hints = LineHints::new(Category::Unknown, &["IMO(9876543)".to_string()]);
        assert!(hints.matches("vessel IMO(9876543) arrived"));
        assert!(!hints.matches("vessel IMO9876543 arrived"));
    }

    #[test]
    fn test_matching_lines_are_capped() {
        let hints = LineHints::new(Category::EdiApi, &[]);
        let text = "COARRI sent\nnoise\nCODECO sent\nhttp 502\n";
        assert_eq!(hints.matching_lines(text, 2), vec!["COARRI sent", "CODECO sent"]);
    }

    #[test]
    fn test_keyword_labels_have_no_hints() {
        assert!(category_hints(Category::EdiErrors).is_empty());
        assert!(LineHints::new(Category::Unknown, &[]).is_empty());
    }
}
