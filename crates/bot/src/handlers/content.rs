use serde_json::Value;
use shared::telegram::Message;

use super::{HandlerResult, now_iso, reply, require_sheets, text_field};
use crate::context::BotContext;

const CONTENT_PACK_SCHEMA_HINT: &str = r#"{"x":{"hook":"","primary_text":"","cta":"","landing_outline":""},"linkedin":{"hook":"","primary_text":"","cta":"","landing_outline":""},"tiktok":{"hook":"","primary_text":"","cta":"","landing_outline":""}}"#;

const FORMATS: &[(&str, &str)] = &[("x", "X"), ("linkedin", "LinkedIn"), ("tiktok", "TikTok")];

pub async fn content_pack(ctx: &BotContext, message: &Message, arg: Option<&str>) -> HandlerResult {
    let chat_id = message.chat.id;
    let Some(topic) = arg else {
        reply(ctx, chat_id, "Usage: /content_pack <topic or angle>").await?;
        return Ok(());
    };

    ctx.telegram.send_typing(chat_id).await?;

    let pack = ctx
        .llm
        .generate_structured(
            "Create an EN content pack for affiliate/growth testing. Return variants for X, \
             LinkedIn, TikTok. Keep it whitehat and professional. Provide hook, body, cta, and a \
             short landing outline.",
            Some(&format!("{CONTENT_PACK_SCHEMA_HINT}\nTopic: {topic}")),
        )
        .await?;

    let sheets = require_sheets(ctx)?;
    for (key, format_name) in FORMATS {
        let variant = pack.get(*key).cloned().unwrap_or(Value::Null);
        sheets
            .append_row(
                "Creatives",
                &[
                    now_iso(),
                    topic.to_string(),
                    (*format_name).to_string(),
                    text_field(&variant, "hook"),
                    text_field(&variant, "primary_text"),
                    text_field(&variant, "cta"),
                    text_field(&variant, "landing_outline"),
                    String::new(),
                ],
            )
            .await?;
    }

    reply(
        ctx,
        chat_id,
        "Content pack generated and saved to Creatives (X/LinkedIn/TikTok).",
    )
    .await?;
    Ok(())
}
