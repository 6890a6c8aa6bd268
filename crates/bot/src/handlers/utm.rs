use serde_json::Value;
use shared::telegram::Message;

use super::{HandlerError, HandlerResult, now_iso, reply, require_sheets, text_field};
use crate::context::BotContext;

const UTM_SCHEMA_HINT: &str = r#"{"base_url":"","items":[{"utm_source":"","utm_medium":"","utm_campaign":"","utm_content":""}]}"#;

const MAX_ROWS: usize = 10;

pub async fn utm_create(ctx: &BotContext, message: &Message, arg: Option<&str>) -> HandlerResult {
    let chat_id = message.chat.id;
    let Some(raw) = arg else {
        reply(
            ctx,
            chat_id,
            "Usage: /utm_create <base_url or landing_url> [optional notes]",
        )
        .await?;
        return Ok(());
    };

    ctx.telegram.send_typing(chat_id).await?;

    let data = ctx
        .llm
        .generate_structured(
            "Create 3 UTM templates for organic posting on X, LinkedIn, TikTok. Return items \
             with utm_source/utm_medium/utm_campaign/utm_content. utm_campaign should be short \
             slug-like.",
            Some(&format!("{UTM_SCHEMA_HINT}\nInput: {raw}")),
        )
        .await?;

    let base_url = {
        let from_provider = text_field(&data, "base_url");
        let trimmed = from_provider.trim();
        if trimmed.is_empty() {
            raw.trim().to_string()
        } else {
            trimmed.to_string()
        }
    };

    let items = data
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if items.is_empty() {
        return Err(HandlerError::EmptyGeneration("utm items"));
    }

    let sheets = require_sheets(ctx)?;
    for item in items.iter().take(MAX_ROWS) {
        let source = text_field(item, "utm_source");
        let medium = text_field(item, "utm_medium");
        let campaign = text_field(item, "utm_campaign");
        let content = text_field(item, "utm_content");

        let separator = if base_url.contains('?') { '&' } else { '?' };
        let full_url = format!(
            "{base_url}{separator}utm_source={}&utm_medium={}&utm_campaign={}&utm_content={}",
            encode(&source),
            encode(&medium),
            encode(&campaign),
            encode(&content),
        );

        sheets
            .append_row(
                "UTM_Templates",
                &[
                    now_iso(),
                    base_url.clone(),
                    source,
                    medium,
                    campaign,
                    content,
                    full_url,
                    String::new(),
                ],
            )
            .await?;
    }

    reply(ctx, chat_id, "UTM templates saved to sheet: UTM_Templates").await?;
    Ok(())
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::encode;

    #[test]
    fn query_values_are_percent_encoded() {
        assert_eq!(encode("b2b saas"), "b2b+saas");
        assert_eq!(encode("a&b=c"), "a%26b%3Dc");
        assert_eq!(encode("plain-slug_1"), "plain-slug_1");
    }
}
