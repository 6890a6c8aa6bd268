use shared::config::{BotConfig, ConfigError};
use shared::github::GithubContentClient;
use shared::llm::LlmGateway;
use shared::sheets::SheetsClient;
use shared::telegram::{TelegramClient, User};
use tokio::sync::Mutex;
use tracing::warn;

use crate::proposal::DevProposal;

/// Everything a handler needs. One instance for the process lifetime; the
/// proposal slot is the only mutable piece.
pub struct BotContext {
    pub config: BotConfig,
    pub telegram: TelegramClient,
    pub llm: LlmGateway,
    pub sheets: Option<SheetsClient>,
    pub proposal: Mutex<Option<DevProposal>>,
}

impl BotContext {
    pub fn new(
        config: BotConfig,
        telegram: TelegramClient,
        llm: LlmGateway,
        sheets: Option<SheetsClient>,
    ) -> Self {
        Self {
            config,
            telegram,
            llm,
            sheets,
            proposal: Mutex::new(None),
        }
    }

    /// An empty allowlist admits everyone; otherwise the sender id must
    /// match.
    pub fn is_allowed(&self, user: Option<&User>) -> bool {
        if self.config.allowed_user_ids.is_empty() {
            return true;
        }
        user.is_some_and(|user| self.config.allowed_user_ids.contains(&user.id))
    }

    pub fn pages_client(&self) -> Result<GithubContentClient, ConfigError> {
        GithubContentClient::new(self.config.pages_repo.require()?)
    }

    pub fn code_client(&self) -> Result<GithubContentClient, ConfigError> {
        GithubContentClient::new(self.config.code_repo.require()?)
    }

    /// Instrumentation appends: failures are logged, never surfaced, and a
    /// missing sheets integration is a no-op.
    pub async fn append_row_best_effort(&self, table: &str, values: Vec<String>) {
        let Some(sheets) = &self.sheets else {
            return;
        };
        if let Err(err) = sheets.append_row(table, &values).await {
            warn!("best-effort append to {table} failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use shared::config::BotConfig;
    use shared::github::RepoSettings;
    use shared::llm::{LlmConfig, LlmGateway};
    use shared::telegram::{TelegramClient, User};

    use super::BotContext;

    fn context_with_allowlist(allowed_user_ids: Vec<i64>) -> BotContext {
        let config = BotConfig {
            telegram_token: "test-token".to_string(),
            allowed_user_ids,
            system_prompt: "persona".to_string(),
            llm: LlmConfig::default(),
            pages_repo: RepoSettings::pages_from_env(),
            pages_base_url_override: None,
            code_repo: RepoSettings::code_from_env(),
        };
        let telegram =
            TelegramClient::new(config.telegram_token.clone()).expect("client should build");
        let llm = LlmGateway::from_config(&config.llm).expect("gateway should build");
        BotContext::new(config, telegram, llm, None)
    }

    fn user(id: i64) -> User {
        User {
            id,
            username: None,
            first_name: None,
        }
    }

    #[test]
    fn empty_allowlist_admits_everyone() {
        let ctx = context_with_allowlist(Vec::new());
        assert!(ctx.is_allowed(Some(&user(1))));
        assert!(ctx.is_allowed(None));
    }

    #[test]
    fn allowlist_gates_on_sender_id() {
        let ctx = context_with_allowlist(vec![55]);
        assert!(ctx.is_allowed(Some(&user(55))));
        assert!(!ctx.is_allowed(Some(&user(56))));
        assert!(!ctx.is_allowed(None));
    }
}
