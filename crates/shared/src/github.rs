use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;
use crate::config_env::{env_or, optional_trimmed_env};

const API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("github request failed: {0}")]
    Transport(String),
    #[error("github api error status={status}: {message}")]
    Api { status: u16, message: String },
}

/// Raw (possibly incomplete) repo settings read at startup. Presence of the
/// individual variables is only enforced when a command actually needs the
/// repo, via [`RepoSettings::require`].
#[derive(Debug, Clone)]
pub struct RepoSettings {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: String,
    pub token_var: &'static str,
    pub owner_var: &'static str,
    pub repo_var: &'static str,
}

impl RepoSettings {
    /// Settings for the Pages content repo (landings, redirects).
    pub fn pages_from_env() -> Self {
        Self {
            token: optional_trimmed_env("GITHUB_TOKEN"),
            owner: optional_trimmed_env("GITHUB_OWNER"),
            repo: optional_trimmed_env("GITHUB_REPO"),
            branch: env_or("GITHUB_BRANCH", "main"),
            token_var: "GITHUB_TOKEN",
            owner_var: "GITHUB_OWNER",
            repo_var: "GITHUB_REPO",
        }
    }

    /// Settings for the repo hosting this bot's own source (`dev_*`).
    pub fn code_from_env() -> Self {
        Self {
            token: optional_trimmed_env("CODE_GITHUB_TOKEN"),
            owner: optional_trimmed_env("CODE_GITHUB_OWNER"),
            repo: optional_trimmed_env("CODE_GITHUB_REPO"),
            branch: env_or("CODE_GITHUB_BRANCH", "main"),
            token_var: "CODE_GITHUB_TOKEN",
            owner_var: "CODE_GITHUB_OWNER",
            repo_var: "CODE_GITHUB_REPO",
        }
    }

    pub fn require(&self) -> Result<RepoConfig, ConfigError> {
        let missing = |var: &'static str| ConfigError::MissingVar(var.to_string());
        Ok(RepoConfig {
            token: self.token.clone().ok_or_else(|| missing(self.token_var))?,
            owner: self.owner.clone().ok_or_else(|| missing(self.owner_var))?,
            repo: self.repo.clone().ok_or_else(|| missing(self.repo_var))?,
            branch: self.branch.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RepoConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

/// Key-addressed upsert store over the GitHub contents API.
#[derive(Clone)]
pub struct GithubContentClient {
    client: reqwest::Client,
    base_url: String,
    config: RepoConfig,
}

impl GithubContentClient {
    pub fn new(config: RepoConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .user_agent(concat!("growthbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
            config,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn owner(&self) -> &str {
        &self.config.owner
    }

    pub fn repo(&self) -> &str {
        &self.config.repo
    }

    /// Current blob sha for `path` on the configured branch, `None` when the
    /// path does not exist yet.
    pub async fn get_file_sha(&self, path: &str) -> Result<Option<String>, GithubError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{path}?ref={}",
            self.base_url, self.config.owner, self.config.repo, self.config.branch
        );

        let response = self
            .client
            .get(url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|err| GithubError::Transport(err.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|err| GithubError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(api_error(status, &payload));
        }

        let entry: ContentEntry = serde_json::from_str(&payload)
            .map_err(|err| GithubError::Transport(format!("invalid contents payload: {err}")))?;
        Ok(Some(entry.sha))
    }

    /// Creates or replaces `path` with `content`. The existing revision sha
    /// is looked up first and included only when the path already exists.
    pub async fn upsert_file(
        &self,
        path: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<(), GithubError> {
        let sha = self.get_file_sha(path).await?;

        let mut body = json!({
            "message": commit_message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": self.config.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let url = format!(
            "{}/repos/{}/{}/contents/{path}",
            self.base_url, self.config.owner, self.config.repo
        );

        let response = self
            .client
            .put(url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await
            .map_err(|err| GithubError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let payload = response.text().await.unwrap_or_default();
            return Err(api_error(status, &payload));
        }

        Ok(())
    }

    fn headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            reqwest::header::HeaderValue::from_static(API_VERSION),
        );
        if let Ok(value) =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", self.config.token))
        {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        headers
    }
}

fn api_error(status: StatusCode, payload: &str) -> GithubError {
    #[derive(Deserialize)]
    struct ApiErrorBody {
        message: Option<String>,
    }

    let message = serde_json::from_str::<ApiErrorBody>(payload)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| payload.trim().to_string());

    GithubError::Api {
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}
