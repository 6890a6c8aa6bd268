use std::future::Future;

use shared::telegram::{Message, parse_command, trim_for_chat};
use tracing::{debug, error};

use crate::context::BotContext;
use crate::handlers::{self, HandlerResult};

const GREETING: &str =
    "Hi. I am a growth ops assistant. Send me a message and I will reply, or use a /command.";

/// One inbound message, handled to completion. Every handler failure is
/// caught here, logged, and surfaced to the chat truncated.
pub async fn handle_message(ctx: &BotContext, message: Message) {
    let Some(text) = message.text.clone() else {
        return;
    };

    match parse_command(&text) {
        Some((name, arg)) => handle_command(ctx, &message, &name, arg.as_deref()).await,
        None => {
            run(ctx, &message, "message", handlers::chat::handle(ctx, &message, &text)).await;
        }
    }
}

async fn handle_command(ctx: &BotContext, message: &Message, name: &str, arg: Option<&str>) {
    let chat_id = message.chat.id;

    // The greeting is the only command open to everyone.
    if matches!(name, "start" | "help") {
        if let Err(err) = ctx.telegram.send_message(chat_id, GREETING, false).await {
            error!("failed to send greeting: {err}");
        }
        return;
    }

    if !ctx.is_allowed(message.from.as_ref()) {
        debug!(command = name, "ignoring command from non-allowlisted sender");
        return;
    }

    match name {
        "my_id" => {
            let sender_id = message
                .from
                .as_ref()
                .map(|user| user.id.to_string())
                .unwrap_or_default();
            if let Err(err) = ctx.telegram.send_message(chat_id, &sender_id, false).await {
                error!("failed to send sender id: {err}");
            }
        }
        "offer_add" => run(ctx, message, name, handlers::offers::offer_add(ctx, message, arg)).await,
        "hypotheses_generate" => {
            run(
                ctx,
                message,
                name,
                handlers::hypotheses::hypotheses_generate(ctx, message, arg),
            )
            .await;
        }
        "content_pack" => {
            run(ctx, message, name, handlers::content::content_pack(ctx, message, arg)).await;
        }
        "landing_create" => {
            run(ctx, message, name, handlers::landing::landing_create(ctx, message, arg)).await;
        }
        "utm_create" => run(ctx, message, name, handlers::utm::utm_create(ctx, message, arg)).await,
        "dev_bootstrap" => run(ctx, message, name, handlers::dev::dev_bootstrap(ctx, message)).await,
        "dev_request" => {
            run(ctx, message, name, handlers::dev::dev_request(ctx, message, arg)).await;
        }
        "dev_diff" => run(ctx, message, name, handlers::dev::dev_diff(ctx, message)).await,
        "dev_apply" => run(ctx, message, name, handlers::dev::dev_apply(ctx, message)).await,
        other => debug!(command = other, "ignoring unknown command"),
    }
}

async fn run<F>(ctx: &BotContext, message: &Message, name: &str, handler: F)
where
    F: Future<Output = HandlerResult>,
{
    let Err(err) = handler.await else {
        return;
    };

    error!("/{name} error: {err}");
    let text = trim_for_chat(&format!("Error: {err}"));
    if let Err(send_err) = ctx.telegram.send_message(message.chat.id, &text, false).await {
        error!("failed to send error reply: {send_err}");
    }
}
