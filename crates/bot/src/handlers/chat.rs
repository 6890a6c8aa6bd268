use shared::llm::prompts;
use shared::telegram::{Message, trim_for_chat};

use super::HandlerResult;
use crate::context::BotContext;

/// Plain, non-command text: one freeform generation with the configured
/// persona, reply truncated, link previews off.
pub async fn handle(ctx: &BotContext, message: &Message, text: &str) -> HandlerResult {
    let chat_id = message.chat.id;
    ctx.telegram.send_typing(chat_id).await?;

    let username = message.from.as_ref().and_then(|user| user.display_name());
    let context_block = prompts::chat_context_prompt(username, chat_id, text);

    let reply = ctx
        .llm
        .generate_freeform(&ctx.config.system_prompt, &context_block)
        .await?;

    ctx.telegram
        .send_message(chat_id, &trim_for_chat(&reply), true)
        .await?;
    Ok(())
}
