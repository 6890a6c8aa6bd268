use chrono::Utc;
use serde_json::Value;
use shared::landing::{LandingContent, render_landing_html, render_redirect_html, slugify};
use shared::telegram::Message;

use super::{HandlerError, HandlerResult, now_iso, reply, require_sheets, text_field, text_field_or};
use crate::context::BotContext;

const LANDING_SCHEMA_HINT: &str = r#"{"title":"","headline":"","subheadline":"","bullets":[""],"cta_text":"","disclaimer":""}"#;

const MAX_BULLETS: usize = 6;

pub async fn landing_create(
    ctx: &BotContext,
    message: &Message,
    arg: Option<&str>,
) -> HandlerResult {
    let chat_id = message.chat.id;
    let Some(raw) = arg else {
        reply(
            ctx,
            chat_id,
            "Usage: /landing_create <topic> OR /landing_create <redirect_url> | <topic>",
        )
        .await?;
        return Ok(());
    };

    let parts: Vec<&str> = raw
        .split('|')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    let (redirect_url, topic) = if parts.len() >= 2 {
        (Some(parts[0]), parts[1..].join(" | "))
    } else {
        (None, raw.to_string())
    };

    let pages = ctx.pages_client()?;
    ctx.telegram.send_typing(chat_id).await?;

    let base_url = ctx
        .config
        .pages_base_url()
        .ok_or(HandlerError::PagesBaseUrlMissing)?;

    let data = ctx
        .llm
        .generate_structured(
            "Generate a simple, compliant EN landing page content for organic testing. Avoid \
             prohibited claims. Keep it suitable for B2B/Mobile apps. Return short punchy copy.",
            Some(&format!("{LANDING_SCHEMA_HINT}\nTopic: {topic}")),
        )
        .await?;

    let slug = slugify(&format!("{topic}-{}", Utc::now().timestamp_millis()));
    let cta_url = if redirect_url.is_some() {
        format!("{base_url}/go/{slug}")
    } else {
        base_url.clone()
    };

    let bullets: Vec<String> = data
        .get("bullets")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .take(MAX_BULLETS)
                .collect()
        })
        .unwrap_or_default();

    let html = render_landing_html(&LandingContent {
        title: text_field_or(&data, "title", "Landing"),
        headline: text_field_or(&data, "headline", &topic),
        subheadline: text_field(&data, "subheadline"),
        bullets,
        cta_text: text_field_or(&data, "cta_text", "Learn more"),
        cta_url,
        disclaimer: text_field_or(
            &data,
            "disclaimer",
            "This page is for informational purposes only.",
        ),
    });

    let landing_path = format!("landings/{slug}/index.html");
    pages
        .upsert_file(&landing_path, &html, &format!("Add landing {slug}"))
        .await?;

    if let Some(redirect) = redirect_url {
        pages
            .upsert_file(
                &format!("go/{slug}.html"),
                &render_redirect_html(redirect),
                &format!("Add redirect {slug}"),
            )
            .await?;
    }

    let landing_url = format!("{base_url}/landings/{slug}/");
    let sheets = require_sheets(ctx)?;
    sheets
        .append_row(
            "Landings",
            &[
                now_iso(),
                topic,
                slug,
                landing_url.clone(),
                "published".to_string(),
                redirect_url
                    .map(|redirect| format!("redirect_url={redirect}"))
                    .unwrap_or_default(),
            ],
        )
        .await?;

    reply(ctx, chat_id, &format!("Landing published: {landing_url}")).await?;
    Ok(())
}
