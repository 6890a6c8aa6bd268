use serde::Deserialize;
use serde_json::{Value, json};

use super::backend::{BackendFuture, BackendRequest, LlmBackend, LlmError};

/// Backend for the OpenAI-compatible chat-completions wire format. This is
/// the default provider; `base_url` may point at any compatible host.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        base_url: String,
        model: String,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    async fn send_once(&self, request: &BackendRequest) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingCredential("AI_API_KEY"))?;

        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.user_prompt }));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
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

        let parsed: ChatCompletionsResponse = serde_json::from_str(&payload)
            .map_err(|err| LlmError::Upstream(format!("invalid response envelope: {err}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }
}

impl LlmBackend for OpenAiBackend {
    fn generate<'a>(&'a self, request: BackendRequest) -> BackendFuture<'a> {
        Box::pin(async move { self.send_once(&request).await })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Pulls `error.message` out of a provider error body, falling back to the
/// raw payload.
pub(super) fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: Option<ErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: Option<Value>,
    }

    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    match parsed.and_then(|envelope| envelope.error).and_then(|details| details.message) {
        Some(Value::String(message)) => message,
        Some(other) => other.to_string(),
        None => body.trim().to_string(),
    }
}
