mod context;
mod dispatch;
mod handlers;
mod proposal;

use shared::config::BotConfig;
use shared::llm::LlmGateway;
use shared::sheets::{SheetsClient, SheetsConfig};
use shared::telegram::TelegramClient;
use tokio::signal;
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

use crate::context::BotContext;

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "bot=info,shared=info".to_string()),
        )
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to read bot config: {err}");
            std::process::exit(1);
        }
    };

    if let Some(var) = config.llm.missing_active_credential() {
        warn!(
            provider = config.llm.provider_kind().as_str(),
            "active provider has no credential; set {var} before running generation commands"
        );
    }

    let llm = match LlmGateway::from_config(&config.llm) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to build llm gateway: {err}");
            std::process::exit(1);
        }
    };

    let telegram = match TelegramClient::new(config.telegram_token.clone()) {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build telegram client: {err}");
            std::process::exit(1);
        }
    };

    let sheets = init_sheets().await;

    info!(
        provider = llm.provider().as_str(),
        "bot started; polling for updates"
    );

    let ctx = BotContext::new(config, telegram, llm, sheets);
    let mut offset: Option<i64> = None;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            batch = ctx.telegram.get_updates(offset) => {
                match batch {
                    Ok(updates) => {
                        for update in updates {
                            offset = Some(update.update_id + 1);
                            if let Some(message) = update.message {
                                dispatch::handle_message(&ctx, message).await;
                            }
                        }
                    }
                    Err(err) => {
                        error!("polling failed: {err}");
                        sleep(POLL_RETRY_DELAY).await;
                    }
                }
            }
        }
    }
}

/// The record store is optional at startup: disabled when unconfigured,
/// logged (not fatal) when configuration or the first round trip fails.
async fn init_sheets() -> Option<SheetsClient> {
    let config = match SheetsConfig::from_env() {
        Ok(Some(config)) => config,
        Ok(None) => {
            info!(
                "sheets integration disabled (no GOOGLE_SHEET_ID / GOOGLE_SERVICE_ACCOUNT_JSON_B64)"
            );
            return None;
        }
        Err(err) => {
            error!("sheets init failed: {err}");
            return None;
        }
    };

    let client = match SheetsClient::connect(&config) {
        Ok(client) => client,
        Err(err) => {
            error!("sheets init failed: {err}");
            return None;
        }
    };

    match client.ensure_tables().await {
        Ok(()) => {
            info!("sheets integration ready");
            Some(client)
        }
        Err(err) => {
            error!("sheets init failed: {err}");
            None
        }
    }
}
