//! Telegram update handlers.
//!
//! Every handler authenticates the sender against the whitelist before any
//! session state is touched; rejected actors are logged and dropped without a
//! reply.

use std::sync::Arc;

use teloxide::prelude::*;

use tracing::warn;

use cambot_core::security::is_authorized;

use crate::router::AppState;

mod inline;
mod message;

pub async fn handle_message(
    update: Update,
    msg: Message,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let username = msg.from().and_then(|u| u.username.clone());
    if !is_authorized(username.as_deref(), &state.cfg.allowed_users) {
        warn!(
            user = username.as_deref().unwrap_or("<no username>"),
            "message from unlisted user dropped"
        );
        return Ok(());
    }

    message::handle_message(update, msg, state).await
}

pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let username = q.from.username.clone();
    if !is_authorized(username.as_deref(), &state.cfg.allowed_users) {
        warn!(
            user = username.as_deref().unwrap_or("<no username>"),
            "inline query from unlisted user dropped"
        );
        return Ok(());
    }

    inline::handle_inline_query(bot, q, state).await
}
