use thiserror::Error;

use crate::config_env::{env_or, parse_i64_list_env, require_any_env};
use crate::github::RepoSettings;
use crate::llm::LlmConfig;

const TELEGRAM_TOKEN_VARS: &[&str] = &["TELEGRAM_BOT_TOKEN", "TELEGRAM_TOKEN", "BOT_TOKEN"];

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful growth operations assistant. Keep replies short and to the point.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(String),
    #[error("missing required environment variable (any of): {}", .0.join(", "))]
    MissingAnyVar(&'static [&'static str]),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    /// Empty means every sender is allowed.
    pub allowed_user_ids: Vec<i64>,
    pub system_prompt: String,
    pub llm: LlmConfig,
    pub pages_repo: RepoSettings,
    pub pages_base_url_override: Option<String>,
    pub code_repo: RepoSettings,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            telegram_token: require_any_env(TELEGRAM_TOKEN_VARS)?,
            allowed_user_ids: parse_i64_list_env("TELEGRAM_ALLOWED_USER_IDS"),
            system_prompt: env_or("AI_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            llm: LlmConfig::from_env(),
            pages_repo: RepoSettings::pages_from_env(),
            pages_base_url_override: crate::config_env::optional_trimmed_env(
                "GITHUB_PAGES_BASE_URL",
            ),
            code_repo: RepoSettings::code_from_env(),
        })
    }

    /// Base URL the published landings are served from: the explicit override,
    /// else the conventional Pages URL for the configured content repo.
    pub fn pages_base_url(&self) -> Option<String> {
        if let Some(base) = &self.pages_base_url_override {
            return Some(base.trim_end_matches('/').to_string());
        }

        match (&self.pages_repo.owner, &self.pages_repo.repo) {
            (Some(owner), Some(repo)) => Some(format!("https://{owner}.github.io/{repo}")),
            _ => None,
        }
    }
}
