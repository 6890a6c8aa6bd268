use chrono::Utc;
use serde_json::{Value, json};
use shared::telegram::Message;

use super::{HandlerError, HandlerResult, now_iso, reply, text_field};
use crate::context::BotContext;
use crate::proposal::{DEV_ALLOWLIST, DevProposal, filter_allowlisted, is_allowlisted};

const DEV_REQUEST_TASK: &str =
    "You are implementing changes in a Rust Telegram bot project. Return a JSON object with \
     updated file contents for an allowlist of files only. You MUST preserve all existing \
     functionality unless asked. Never include secrets; never add code that prints environment \
     variables. Allowed files: crates/bot/src/main.rs, crates/bot/Cargo.toml.";

const PROPOSAL_SCHEMA_HINT: &str = r#"{"reason":"","files":{"crates/bot/src/main.rs":"<full file text>","crates/bot/Cargo.toml":"<full file text>"}}"#;

/// Pushes the current local source artifacts to the code repo as-is.
pub async fn dev_bootstrap(ctx: &BotContext, message: &Message) -> HandlerResult {
    let chat_id = message.chat.id;
    let code = ctx.code_client()?;
    ctx.telegram.send_typing(chat_id).await?;

    for path in DEV_ALLOWLIST {
        let content = read_local(path).await?;
        code.upsert_file(path, &content, &format!("Bootstrap {path}"))
            .await?;
    }

    reply(
        ctx,
        chat_id,
        &format!(
            "Bootstrapped code repo: https://github.com/{}/{}",
            code.owner(),
            code.repo()
        ),
    )
    .await?;
    Ok(())
}

/// Asks the provider for replacement contents of the allowlisted files and
/// stages the result. Nothing is written until /dev_apply.
pub async fn dev_request(ctx: &BotContext, message: &Message, arg: Option<&str>) -> HandlerResult {
    let chat_id = message.chat.id;
    let Some(request) = arg else {
        reply(ctx, chat_id, "Usage: /dev_request <what to change>").await?;
        return Ok(());
    };

    ctx.telegram.send_typing(chat_id).await?;

    let mut hint = String::from(PROPOSAL_SCHEMA_HINT);
    hint.push_str(&format!("\nRequest: {request}\n"));
    for path in DEV_ALLOWLIST {
        let content = read_local(path).await?;
        hint.push_str(&format!("\nCurrent {path}:\n{content}\n"));
    }

    let proposed = ctx
        .llm
        .generate_structured(DEV_REQUEST_TASK, Some(&hint))
        .await?;

    let files = filter_allowlisted(proposed.get("files").unwrap_or(&Value::Null));
    if files.is_empty() {
        return Err(HandlerError::NoAllowlistedFiles);
    }

    let reason = {
        let from_provider = text_field(&proposed, "reason");
        if from_provider.trim().is_empty() {
            request.to_string()
        } else {
            from_provider
        }
    };

    let file_list = json!({ "files": files.keys().collect::<Vec<_>>() }).to_string();
    *ctx.proposal.lock().await = Some(DevProposal {
        created_at: Utc::now(),
        reason: reason.clone(),
        files,
    });

    ctx.append_row_best_effort(
        "Tasks",
        vec![
            now_iso(),
            "dev_proposal".to_string(),
            reason,
            file_list,
            "pending".to_string(),
            String::new(),
        ],
    )
    .await;

    reply(ctx, chat_id, "Dev proposal prepared. Use /dev_diff then /dev_apply.").await?;
    Ok(())
}

pub async fn dev_diff(ctx: &BotContext, message: &Message) -> HandlerResult {
    let summary = {
        let staged = ctx.proposal.lock().await;
        staged
            .as_ref()
            .ok_or(HandlerError::EmptyProposal)?
            .summary()
    };
    reply(ctx, message.chat.id, &summary).await?;
    Ok(())
}

/// Operator confirmation: writes every staged file through the code repo
/// and over the local copy, then clears the slot. A failed write leaves the
/// proposal staged.
pub async fn dev_apply(ctx: &BotContext, message: &Message) -> HandlerResult {
    let chat_id = message.chat.id;
    let staged = ctx.proposal.lock().await.clone();
    let Some(proposal) = staged else {
        return Err(HandlerError::EmptyProposal);
    };

    let code = ctx.code_client()?;
    ctx.telegram.send_typing(chat_id).await?;

    for (path, content) in &proposal.files {
        if !is_allowlisted(path) {
            continue;
        }
        if content.trim().is_empty() {
            return Err(HandlerError::EmptyProposedFile(path.clone()));
        }

        code.upsert_file(path, content, &format!("Apply update to {path}"))
            .await?;
        write_local(path, content).await?;
    }

    ctx.append_row_best_effort(
        "Tasks",
        vec![
            now_iso(),
            "dev_apply".to_string(),
            proposal.reason.clone(),
            json!({ "files": proposal.files.keys().collect::<Vec<_>>() }).to_string(),
            "done".to_string(),
            "restart_required".to_string(),
        ],
    )
    .await;

    *ctx.proposal.lock().await = None;
    reply(
        ctx,
        chat_id,
        "Update applied. Restart the bot process to load it.",
    )
    .await?;
    Ok(())
}

async fn read_local(path: &str) -> Result<String, HandlerError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|err| HandlerError::LocalFile {
            path: path.to_string(),
            message: err.to_string(),
        })
}

async fn write_local(path: &str, content: &str) -> Result<(), HandlerError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|err| HandlerError::LocalFile {
            path: path.to_string(),
            message: err.to_string(),
        })
}
