use serde::Deserialize;
use serde_json::json;

use super::backend::{BackendFuture, BackendRequest, LlmBackend, LlmError};
use super::openai::error_message;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Backend for the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl AnthropicBackend {
    pub fn new(client: reqwest::Client, api_key: Option<String>, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn send_once(&self, request: &BackendRequest) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingCredential("ANTHROPIC_API_KEY"))?;

        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": [
                { "role": "user", "content": request.user_prompt }
            ],
        });
        if let Some(system) = &request.system_prompt {
            body["system"] = json!(system);
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::Upstream(err.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|err| LlmError::Upstream(err.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Upstream(format!(
                "status={} message={}",
                status.as_u16(),
                error_message(&payload)
            )));
        }

        let parsed: MessageResponse = serde_json::from_str(&payload)
            .map_err(|err| LlmError::Upstream(format!("invalid response envelope: {err}")))?;

        let text = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

impl LlmBackend for AnthropicBackend {
    fn generate<'a>(&'a self, request: BackendRequest) -> BackendFuture<'a> {
        Box::pin(async move { self.send_once(&request).await })
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
