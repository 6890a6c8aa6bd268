pub mod chat;
pub mod content;
pub mod dev;
pub mod hypotheses;
pub mod landing;
pub mod offers;
pub mod utm;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use shared::config::ConfigError;
use shared::github::GithubError;
use shared::llm::LlmError;
use shared::sheets::{SheetsClient, SheetsError};
use shared::telegram::{TelegramError, trim_for_chat};
use thiserror::Error;

use crate::context::BotContext;

/// Everything a command handler can fail with. Dispatch catches all of
/// these, logs them, and surfaces a truncated message to the chat; the
/// process never crashes on a handler error.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error(transparent)]
    Github(#[from] GithubError),
    #[error(transparent)]
    Telegram(#[from] TelegramError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(
        "google sheets is not ready; set GOOGLE_SHEET_ID and GOOGLE_SERVICE_ACCOUNT_JSON_B64 and restart"
    )]
    SheetsNotReady,
    #[error("github pages base url is not configured")]
    PagesBaseUrlMissing,
    #[error("no dev proposal is staged; run /dev_request first")]
    EmptyProposal,
    #[error("dev request returned no allowlisted files")]
    NoAllowlistedFiles,
    #[error("refusing to write empty file: {0}")]
    EmptyProposedFile(String),
    #[error("provider returned no {0}")]
    EmptyGeneration(&'static str),
    #[error("failed to access local file {path}: {message}")]
    LocalFile { path: String, message: String },
}

pub type HandlerResult = Result<(), HandlerError>;

pub(crate) fn require_sheets(ctx: &BotContext) -> Result<&SheetsClient, HandlerError> {
    ctx.sheets.as_ref().ok_or(HandlerError::SheetsNotReady)
}

/// Row timestamp, ISO 8601 with milliseconds.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Scalar field as cell text; missing or structured values become the empty
/// string, so rows always fill their fixed columns.
pub(crate) fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

/// Like [`text_field`] but with a fallback for missing or empty values.
pub(crate) fn text_field_or(value: &Value, key: &str, default: &str) -> String {
    let field = text_field(value, key);
    if field.trim().is_empty() {
        default.to_string()
    } else {
        field
    }
}

pub(crate) async fn reply(
    ctx: &BotContext,
    chat_id: i64,
    text: &str,
) -> Result<(), TelegramError> {
    ctx.telegram
        .send_message(chat_id, &trim_for_chat(text), false)
        .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{text_field, text_field_or};

    #[test]
    fn scalar_fields_become_cell_text() {
        let value = json!({ "name": "Acme", "payout": 12.5, "active": true });
        assert_eq!(text_field(&value, "name"), "Acme");
        assert_eq!(text_field(&value, "payout"), "12.5");
        assert_eq!(text_field(&value, "active"), "true");
    }

    #[test]
    fn missing_and_structured_fields_default_to_empty() {
        let value = json!({ "nested": { "a": 1 }, "list": [1, 2] });
        assert_eq!(text_field(&value, "nested"), "");
        assert_eq!(text_field(&value, "list"), "");
        assert_eq!(text_field(&value, "absent"), "");
    }

    #[test]
    fn fallback_applies_to_missing_and_blank_values() {
        let value = json!({ "priority": "", "headline": "Go fast" });
        assert_eq!(text_field_or(&value, "priority", "medium"), "medium");
        assert_eq!(text_field_or(&value, "absent", "medium"), "medium");
        assert_eq!(text_field_or(&value, "headline", "fallback"), "Go fast");
    }
}
