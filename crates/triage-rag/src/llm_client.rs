// LLM client abstraction
// Chat completions and multi-part "responses" requests behind one trait

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("API returned status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("could not decode model response: {0}")]
    InvalidResponse(String),

    #[error("{provider} does not support {operation} requests")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },

    #[error("model returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    /// HTTP status of an API error, if the call got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::RequestFailed(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object reply
    pub json_output: bool,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// One part of a multi-part request
#[derive(Debug, Clone, PartialEq)]
pub enum InputPart {
    Text(String),
    File {
        name: String,
        mime_type: String,
        data: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseRequest {
    pub parts: Vec<InputPart>,
    pub temperature: Option<f32>,
    pub json_output: bool,
}

impl ResponseRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(InputPart::Text(text.into()));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.parts.push(InputPart::File {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    pub fn file_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, InputPart::File { .. }))
            .count()
    }
}

/// Common interface for LLM providers
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Chat completion; returns the assistant message text
    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError>;

    /// Multi-part request (text + attached files); returns the reply text
    async fn respond(&self, request: &ResponseRequest) -> Result<String, LlmError>;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the provider name
    fn provider(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_builder() {
        let request = ChatRequest::new(vec![ChatMessage::system("s"), ChatMessage::user("u")])
            .temperature(0.0)
            .max_tokens(60)
            .json_output();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.max_tokens, Some(60));
        assert!(request.json_output);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_response_request_parts() {
        let request = ResponseRequest::new()
            .text("prompt")
            .file("a.log", "text/plain", b"line".to_vec())
            .text("label");
        assert_eq!(request.parts.len(), 3);
        assert_eq!(request.file_count(), 1);
    }

    #[test]
    fn test_error_status() {
        let err = LlmError::ApiError {
            status: 429,
            body: "slow down".into(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(LlmError::EmptyResponse.status(), None);
    }
}
