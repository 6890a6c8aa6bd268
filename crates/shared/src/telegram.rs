use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;

const API_BASE: &str = "https://api.telegram.org";

/// Long-poll wait passed to getUpdates; the http client timeout must sit
/// above it.
pub const POLL_TIMEOUT_SECS: u64 = 50;
const CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

/// Hard cap on outbound message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 3800;
const TRUNCATION_MARKER: &str = "\n\n[message truncated]";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Transport(String),
    #[error("telegram api error status={status}: {description}")]
    Api { status: u16, description: String },
    #[error("telegram response envelope was invalid: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl User {
    /// Display handle for prompts: username first, else first name.
    pub fn display_name(&self) -> Option<&str> {
        self.username
            .as_deref()
            .or(self.first_name.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
            token,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let mut body = json!({ "timeout": POLL_TIMEOUT_SECS });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        let updates: Option<Vec<Update>> = self.call("getUpdates", &body).await?;
        Ok(updates.unwrap_or_default())
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        disable_web_page_preview: bool,
    ) -> Result<(), TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": disable_web_page_preview,
        });
        self.call::<serde_json::Value>("sendMessage", &body).await?;
        Ok(())
    }

    pub async fn send_typing(&self, chat_id: i64) -> Result<(), TelegramError> {
        let body = json!({ "chat_id": chat_id, "action": "typing" });
        self.call::<bool>("sendChatAction", &body).await?;
        Ok(())
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<Option<T>, TelegramError> {
        let url = format!("{}/bot{}/{method}", self.base_url, self.token);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| TelegramError::Transport(err.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|err| TelegramError::Transport(err.to_string()))?;

        let envelope: ApiEnvelope<T> = serde_json::from_str(&payload)
            .map_err(|err| TelegramError::InvalidPayload(err.to_string()))?;

        if !envelope.ok {
            return Err(TelegramError::Api {
                status: envelope.error_code.unwrap_or(status.as_u16()),
                description: envelope
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(envelope.result)
    }
}

/// Caps an outbound message at [`MAX_MESSAGE_CHARS`] characters. When the
/// input is longer, the result ends with the truncation marker and is
/// exactly the maximum length, marker included.
pub fn trim_for_chat(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }

    let keep = MAX_MESSAGE_CHARS - TRUNCATION_MARKER.chars().count();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Splits `/name optional argument text` into a lowercased command name and
/// the trimmed remainder. Non-command text yields `None`.
pub fn parse_command(text: &str) -> Option<(String, Option<String>)> {
    let trimmed = text.trim();
    let rest = trimmed.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let name = name.to_ascii_lowercase();
    let arg = if arg.is_empty() {
        None
    } else {
        Some(arg.to_string())
    };
    Some((name, arg))
}
