use serde_json::Value;
use shared::telegram::Message;

use super::{HandlerError, HandlerResult, now_iso, reply, require_sheets, text_field, text_field_or};
use crate::context::BotContext;

const HYPOTHESIS_SCHEMA_HINT: &str = r#"{"items":[{"offer_name":"","platform":"","audience":"","angle":"","content_type":"","priority":"low|medium|high","notes":""}]}"#;

const MAX_ROWS: usize = 30;

pub async fn hypotheses_generate(
    ctx: &BotContext,
    message: &Message,
    arg: Option<&str>,
) -> HandlerResult {
    let chat_id = message.chat.id;
    let vertical = arg.unwrap_or("B2B");

    ctx.telegram.send_typing(chat_id).await?;

    let data = ctx
        .llm
        .generate_structured(
            &format!(
                "Generate 12 growth/affiliate hypotheses for vertical={vertical} targeting EN \
                 market. Each hypothesis should include platform in [X, LinkedIn, TikTok, \
                 Telegram] and a clear angle and audience. Keep them whitehat."
            ),
            Some(HYPOTHESIS_SCHEMA_HINT),
        )
        .await?;

    let items = data
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if items.is_empty() {
        return Err(HandlerError::EmptyGeneration("hypotheses"));
    }

    let sheets = require_sheets(ctx)?;
    let mut added = 0usize;
    for item in items.iter().take(MAX_ROWS) {
        sheets
            .append_row(
                "Hypotheses",
                &[
                    now_iso(),
                    text_field(item, "offer_name"),
                    text_field(item, "platform"),
                    text_field(item, "audience"),
                    text_field(item, "angle"),
                    text_field(item, "content_type"),
                    "new".to_string(),
                    text_field_or(item, "priority", "medium"),
                    text_field(item, "notes"),
                ],
            )
            .await?;
        added += 1;
    }

    reply(
        ctx,
        chat_id,
        &format!("Added {added} hypotheses to sheet ({vertical})."),
    )
    .await?;
    Ok(())
}
