use std::sync::Arc;

use teloxide::prelude::*;

use tracing::error;

use cambot_core::{
    dispatch::Response,
    domain::{ChatId, UpdateId},
    messaging::types::{ChatAction, ReplyOptions},
};

use crate::router::AppState;

/// Routes one authorized message through the core dispatcher and sends the
/// synchronous reply, if any. Enqueued captures answer later via the capture
/// loop.
pub async fn handle_message(
    update: Update,
    msg: Message,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let Some(username) = msg.from().and_then(|u| u.username.clone()) else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);
    let update_id = UpdateId(update.id as i64);
    let text = msg.text().unwrap_or("");

    let response = match state
        .dispatcher
        .handle_message(&username, chat_id, update_id, text)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!(user = %username, error = %e, "dispatch failed");
            return Ok(());
        }
    };

    match response {
        Response::None | Response::Enqueued => {}
        Response::Reply(text) => {
            let _ = state
                .messenger
                .send_chat_action(chat_id, ChatAction::Typing)
                .await;
            if let Err(e) = state
                .messenger
                .send_text(chat_id, &text, &ReplyOptions::with_command_keyboard())
                .await
            {
                error!(user = %username, error = %e, "failed to send reply");
            }
        }
    }

    Ok(())
}
