use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InlineQueryResult, InlineQueryResultCachedPhoto},
};

use tracing::{error, info};

use crate::router::AppState;

/// Answers an inline query with the user's cached photos, most recent first.
/// This path never touches the camera.
pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let Some(username) = q.from.username.clone() else {
        return Ok(());
    };

    let photos = match state.store.latest(&username, state.cfg.inline_latest_photos) {
        Ok(photos) => photos,
        Err(e) => {
            error!(user = %username, error = %e, "photo lookup failed");
            return Ok(());
        }
    };

    if photos.is_empty() {
        info!(user = %username, "no cached photos for inline query");
        return Ok(());
    }

    let results: Vec<InlineQueryResult> = photos
        .iter()
        .enumerate()
        .map(|(idx, photo)| {
            InlineQueryResult::CachedPhoto(
                InlineQueryResultCachedPhoto::new(idx.to_string(), photo.file_id.clone())
                    .caption(photo.caption.clone()),
            )
        })
        .collect();

    if let Err(e) = bot.answer_inline_query(q.id, results).await {
        error!(user = %username, error = %e, "failed to answer inline query");
    }

    Ok(())
}
