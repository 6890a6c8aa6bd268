use serde::Deserialize;
use serde_json::json;

use super::backend::{BackendFuture, BackendRequest, LlmBackend, LlmError};
use super::openai::error_message;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Backend for the Google Generative Language API. The wire format has no
/// separate system role here; the system prompt is folded into the single
/// user text part.
#[derive(Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiBackend {
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
            .ok_or(LlmError::MissingCredential("GEMINI_API_KEY"))?;

        let text = match &request.system_prompt {
            Some(system) => format!("{system}\n\n{}", request.user_prompt),
            None => request.user_prompt.clone(),
        };

        let body = json!({
            "contents": [
                { "parts": [ { "text": text } ] }
            ],
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
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

        let parsed: GenerateContentResponse = serde_json::from_str(&payload)
            .map_err(|err| LlmError::Upstream(format!("invalid response envelope: {err}")))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

impl LlmBackend for GeminiBackend {
    fn generate<'a>(&'a self, request: BackendRequest) -> BackendFuture<'a> {
        Box::pin(async move { self.send_once(&request).await })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}
