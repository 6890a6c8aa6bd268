use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::config_env::{env_or, optional_trimmed_env};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";

pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;

/// One prompt sent to whichever provider is active. Each backend picks the
/// parameters its wire format supports: the OpenAI-compatible backend sends
/// `temperature`, the Anthropic backend sends `max_tokens`, the Gemini
/// backend folds the system prompt into the user text.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing required environment variable {0}")]
    MissingCredential(&'static str),
    #[error("llm provider request failed: {0}")]
    Upstream(String),
    #[error("llm provider returned no text content")]
    EmptyResponse,
    #[error("llm output could not be parsed as structured data")]
    UnparseableOutput,
}

/// A text-generation provider. Exactly one network call per `generate`;
/// retries and repair live above this trait.
pub trait LlmBackend: Send + Sync {
    fn generate<'a>(&'a self, request: BackendRequest) -> BackendFuture<'a>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    /// Case-insensitive alias match; unrecognized identifiers fall back to
    /// the OpenAI-compatible default.
    pub fn from_identifier(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Self::Anthropic,
            "gemini" | "google" => Self::Gemini,
            _ => Self::OpenAi,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Raw provider identifier as configured; resolved via
    /// [`ProviderKind::from_identifier`].
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl LlmConfig {
    /// Reads provider settings. Nothing here is required: credentials are
    /// checked lazily when the selected backend is actually invoked.
    pub fn from_env() -> Self {
        Self {
            provider: env_or("AI_PROVIDER", "openai"),
            openai_api_key: optional_trimmed_env("AI_API_KEY"),
            openai_base_url: env_or("AI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: env_or("AI_MODEL", DEFAULT_OPENAI_MODEL),
            anthropic_api_key: optional_trimmed_env("ANTHROPIC_API_KEY"),
            anthropic_model: env_or("ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL),
            gemini_api_key: optional_trimmed_env("GEMINI_API_KEY"),
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        }
    }

    pub fn provider_kind(&self) -> ProviderKind {
        ProviderKind::from_identifier(&self.provider)
    }

    /// Env var the active backend needs but does not have, if any. Used for
    /// the startup warning; the hard failure stays lazy, per call.
    pub fn missing_active_credential(&self) -> Option<&'static str> {
        match self.provider_kind() {
            ProviderKind::OpenAi if self.openai_api_key.is_none() => Some("AI_API_KEY"),
            ProviderKind::Anthropic if self.anthropic_api_key.is_none() => {
                Some("ANTHROPIC_API_KEY")
            }
            ProviderKind::Gemini if self.gemini_api_key.is_none() => Some("GEMINI_API_KEY"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LlmConfig, ProviderKind};

    #[test]
    fn provider_aliases_resolve_case_insensitively() {
        assert_eq!(
            ProviderKind::from_identifier("claude"),
            ProviderKind::Anthropic
        );
        assert_eq!(
            ProviderKind::from_identifier("Anthropic"),
            ProviderKind::Anthropic
        );
        assert_eq!(ProviderKind::from_identifier("GOOGLE"), ProviderKind::Gemini);
        assert_eq!(ProviderKind::from_identifier("gemini"), ProviderKind::Gemini);
        assert_eq!(ProviderKind::from_identifier("openai"), ProviderKind::OpenAi);
    }

    #[test]
    fn unrecognized_identifier_falls_back_to_default_backend() {
        assert_eq!(
            ProviderKind::from_identifier("some-new-provider"),
            ProviderKind::OpenAi
        );
        assert_eq!(ProviderKind::from_identifier(""), ProviderKind::OpenAi);
    }

    #[test]
    fn missing_credential_reported_for_active_backend_only() {
        let config = LlmConfig {
            provider: "claude".to_string(),
            openai_api_key: Some("set".to_string()),
            anthropic_api_key: None,
            ..LlmConfig::default()
        };
        assert_eq!(config.missing_active_credential(), Some("ANTHROPIC_API_KEY"));

        let config = LlmConfig {
            provider: "claude".to_string(),
            anthropic_api_key: Some("set".to_string()),
            ..LlmConfig::default()
        };
        assert_eq!(config.missing_active_credential(), None);
    }
}
