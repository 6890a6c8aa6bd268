use shared::telegram::Message;

use super::{HandlerResult, now_iso, reply, require_sheets, text_field};
use crate::context::BotContext;

const OFFER_SCHEMA_HINT: &str = r#"{"source_url":"","network":"","offer_name":"","vertical":"","geo":"","payout":"","currency":"","allowed_sources":"","restrictions":"","notes":""}"#;

pub async fn offer_add(ctx: &BotContext, message: &Message, arg: Option<&str>) -> HandlerResult {
    let chat_id = message.chat.id;
    let Some(raw) = arg else {
        reply(ctx, chat_id, "Usage: /offer_add <link or description>").await?;
        return Ok(());
    };

    ctx.telegram.send_typing(chat_id).await?;

    let offer = ctx
        .llm
        .generate_structured(
            "Extract an affiliate/partner offer from the following text/link and normalize \
             fields. If unknown, use empty string. Vertical must be one of: B2B, Mobile apps, \
             iGaming. Geo should be short like US, UK, WW. Allowed_sources is comma-separated.",
            Some(&format!("{OFFER_SCHEMA_HINT}\nInput: {raw}")),
        )
        .await?;

    let sheets = require_sheets(ctx)?;
    sheets
        .append_row(
            "Offers",
            &[
                now_iso(),
                text_field(&offer, "source_url"),
                text_field(&offer, "network"),
                text_field(&offer, "offer_name"),
                text_field(&offer, "vertical"),
                text_field(&offer, "geo"),
                text_field(&offer, "payout"),
                text_field(&offer, "currency"),
                text_field(&offer, "allowed_sources"),
                text_field(&offer, "restrictions"),
                "new".to_string(),
                text_field(&offer, "notes"),
            ],
        )
        .await?;

    let offer_name = text_field(&offer, "offer_name");
    let display = if offer_name.is_empty() {
        "(no name)".to_string()
    } else {
        offer_name
    };
    reply(ctx, chat_id, &format!("Added to Offers sheet: {display}")).await?;
    Ok(())
}
