// Keyword categorizer - regex pre-filter over incident text
//
// Each category owns one pattern group. Text is lower-cased before matching.
// No match at all returns None, which tells the caller to ask the model.

use regex::Regex;

use crate::lenient;
use crate::Category;

pub struct KeywordCategorizer {
    rules: Vec<(Category, Regex)>,
}

impl KeywordCategorizer {
    pub fn new() -> Self {
        let rules = vec![
            (
                Category::EdiErrors,
                Regex::new(r"\bedi|edifact|codeco|coarri|segment|ack\b").unwrap(),
            ),
            (
                Category::DataSync,
                Regex::new(r"\bmismatch|duplicate|inconsistent|drift|desync|out-of-order\b").unwrap(),
            ),
            (
                Category::ApiFailures,
                Regex::new(r"\btimeout|4\d\d|5\d\d|api|endpoint|request failed|gateway\b").unwrap(),
            ),
            (
                Category::VesselConflicts,
                Regex::new(r"\bvessel|voyage|berth|eta|schedule|overlap\b").unwrap(),
            ),
            (
                Category::BusinessLogic,
                Regex::new(r"\bfree day|policy|rule|link missing|booking|business\b").unwrap(),
            ),
        ];

        Self { rules }
    }

    /// Categories whose pattern group matches, in rule order.
    /// `None` when nothing matches (never an empty vec).
    pub fn match_rules(&self, text: &str) -> Option<Vec<Category>> {
        let lowered = text.to_lowercase();

        let mut found: Vec<Category> = Vec::new();
        for (category, pattern) in &self.rules {
            if pattern.is_match(&lowered) && !found.contains(category) {
                found.push(*category);
            }
        }

        if found.is_empty() {
            None
        } else {
            Some(found)
        }
    }

    /// Same as [`match_rules`](Self::match_rules) for a cell of arbitrary JSON
    /// type; the value is coerced to its string form first.
    pub fn match_value(&self, value: &serde_json::Value) -> Option<Vec<Category>> {
        self.match_rules(&lenient::to_text(value))
    }
}

impl Default for KeywordCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_category() {
        let categorizer = KeywordCategorizer::new();
        let result = categorizer.match_rules("Vessel voyage overlap at berth 4");
        assert_eq!(result, Some(vec![Category::VesselConflicts]));
    }

    #[test]
    fn test_case_insensitive() {
        let categorizer = KeywordCategorizer::new();
        let result = categorizer.match_rules("COARRI message REJECTED").unwrap();
        assert!(result.contains(&Category::EdiErrors));
    }

    #[test]
    fn test_no_match_is_absence_marker() {
        let categorizer = KeywordCategorizer::new();
        assert_eq!(categorizer.match_rules("Printer on level 3 is out of toner"), None);
        assert_eq!(categorizer.match_rules(""), None);
    }

    #[test]
    fn test_numeric_cell_is_coerced() {
        let categorizer = KeywordCategorizer::new();
        let result = categorizer.match_value(&serde_json::json!(504));
        assert_eq!(result, Some(vec![Category::ApiFailures]));
        assert_eq!(categorizer.match_value(&serde_json::Value::Null), None);
    }
}
