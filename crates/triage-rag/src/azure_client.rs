// Azure OpenAI client
// Chat completions and the responses API for one deployment

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::llm_client::{ChatMessage, ChatRequest, InputPart, LlmClient, LlmError, ResponseRequest};

#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    client: Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl AzureOpenAiClient {
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            deployment: deployment.into(),
            api_version: api_version.into(),
            api_key: api_key.into(),
        })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    fn responses_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/responses?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    fn chat_body(&self, request: &ChatRequest) -> Result<Value, LlmError> {
        let body = ChatBody {
            model: &self.deployment,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_output
                .then(|| json!({ "type": "json_object" })),
        };
        serde_json::to_value(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn responses_body(&self, request: &ResponseRequest) -> Value {
        let content: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                InputPart::Text(text) => json!({ "type": "input_text", "text": text }),
                InputPart::File {
                    name,
                    mime_type,
                    data,
                } => json!({
                    "type": "input_file",
                    "filename": name,
                    "file_data": format!("data:{};base64,{}", mime_type, STANDARD.encode(data)),
                }),
            })
            .collect();

        let mut body = json!({
            "model": self.deployment,
            "input": [{ "role": "user", "content": content }],
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if request.json_output {
            body["text"] = json!({ "format": { "type": "json_object" } });
        }
        body
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, LlmError> {
        let response = self
            .client
            .post(url)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }
}

/// Reply text of a responses-API payload: the `output_text` convenience field,
/// else the concatenated text parts of the output items.
pub(crate) fn response_text(payload: &Value) -> Option<String> {
    if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.to_string());
        }
    }

    let items: Vec<&Value> = match payload.get("output") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    };

    let mut text = String::new();
    for item in items {
        let Some(Value::Array(parts)) = item.get("content") else {
            continue;
        };
        for part in parts {
            let kind = part.get("type").and_then(Value::as_str);
            if matches!(kind, Some("output_text") | Some("text")) {
                if let Some(t) = part.get("text").and_then(Value::as_str) {
                    text.push_str(t);
                }
            }
        }
    }

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl LlmClient for AzureOpenAiClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = self.chat_body(request)?;
        let payload = self.post(&self.chat_url(), &body).await?;
        let result: ChatResponse =
            serde_json::from_value(payload).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    async fn respond(&self, request: &ResponseRequest) -> Result<String, LlmError> {
        let body = self.responses_body(request);
        let payload = self.post(&self.responses_url(), &body).await?;
        response_text(&payload).ok_or(LlmError::EmptyResponse)
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    fn provider(&self) -> &str {
        "azure-openai"
    }
}
