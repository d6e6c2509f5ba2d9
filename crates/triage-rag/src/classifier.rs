// Incident classifier: keyword rules first, one model call when nothing matches

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use triage_core::{join_labels, Category, IncidentRecord, KeywordCategorizer};

use crate::llm_client::{ChatMessage, ChatRequest, LlmClient};
use crate::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    /// Keyword rules matched
    Rules,
    /// Model reply named at least one known label
    Model,
    /// Model failed or answered with nothing usable
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub categories: Vec<Category>,
    pub method: ClassificationMethod,
}

pub struct IncidentClassifier {
    rules: KeywordCategorizer,
    llm: Arc<dyn LlmClient>,
}

impl IncidentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            rules: KeywordCategorizer::new(),
            llm,
        }
    }

    pub async fn classify(&self, text: &str) -> Classification {
        if let Some(categories) = self.rules.match_rules(text) {
            return Classification {
                categories,
                method: ClassificationMethod::Rules,
            };
        }
        self.ask_model(text).await
    }

    async fn ask_model(&self, text: &str) -> Classification {
        let request = ChatRequest::new(vec![
            ChatMessage::system(prompts::CATEGORIZE_SYSTEM),
            ChatMessage::user(prompts::categorize_prompt(text)),
        ])
        .max_tokens(60);

        let unknown = Classification {
            categories: vec![Category::Unknown],
            method: ClassificationMethod::Fallback,
        };

        match self.llm.chat(&request).await {
            Ok(reply) => {
                let categories = parse_label_reply(&reply);
                if categories.is_empty() {
                    debug!(reply = %reply, "model named no known category");
                    unknown
                } else {
                    Classification {
                        categories,
                        method: ClassificationMethod::Model,
                    }
                }
            }
            Err(e) => {
                warn!(provider = %self.llm.provider(), error = %e, "categorization call failed");
                unknown
            }
        }
    }

    /// Fill the `Category` column of every record from its incident text.
    pub async fn categorize_records(&self, records: &mut [IncidentRecord]) -> Vec<Classification> {
        let mut results = Vec::with_capacity(records.len());
        for record in records.iter_mut() {
            let classification = self.classify(&record.incident_text()).await;
            record.category = Some(join_labels(&classification.categories));
            results.push(classification);
        }
        results
    }
}

/// Comma-separated model reply -> known keyword labels, deduplicated.
pub fn parse_label_reply(reply: &str) -> Vec<Category> {
    let mut found = Vec::new();
    for token in reply.split(',') {
        let token = token.trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | '"' | '\'' | '`'));
        if let Some(category) = Category::from_label(token) {
            if category.is_keyword_label() && !found.contains(&category) {
                found.push(category);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_reply() {
        assert_eq!(
            parse_label_reply(" API_FAILURES, data_sync ,API_FAILURES."),
            vec![Category::ApiFailures, Category::DataSync]
        );
    }

    #[test]
    fn test_parse_label_reply_drops_unknown_tokens() {
        assert!(parse_label_reply("I think it is networking").is_empty());
        // module labels are not keyword labels
        assert!(parse_label_reply("CNTR, UNKNOWN").is_empty());
        assert_eq!(parse_label_reply("\"BUSINESS_LOGIC\""), vec![Category::BusinessLogic]);
    }
}
