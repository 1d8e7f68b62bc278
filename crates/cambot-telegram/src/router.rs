use std::sync::Arc;

use teloxide::{dptree, prelude::*};

use tokio::sync::mpsc;
use tracing::info;

use cambot_core::{
    camera::StillCamera,
    config::Config,
    dispatch::{self, CaptureRequest, Dispatcher},
    messaging::port::MessagingPort,
    store::PhotoStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<PhotoStore>,
    pub messenger: Arc<dyn MessagingPort>,
}

/// Long-polling entry point: starts the single capture-loop consumer, then
/// dispatches inbound updates until shutdown.
pub async fn run_polling(
    cfg: Arc<Config>,
    dispatcher: Arc<Dispatcher>,
    queue: mpsc::Receiver<CaptureRequest>,
    camera: Arc<dyn StillCamera>,
    store: Arc<PhotoStore>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!(bot = me.username(), "starting bot");
    }
    info!(allowed_users = cfg.allowed_users.len(), "whitelist loaded");

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    // Exactly one consumer drains the capture queue; everything camera-bound
    // happens on this task.
    tokio::spawn(dispatch::run_capture_loop(
        queue,
        camera,
        messenger.clone(),
        store.clone(),
    ));

    let state = Arc::new(AppState {
        cfg,
        dispatcher,
        store,
        messenger,
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_inline_query().endpoint(handlers::handle_inline_query));

    teloxide::dispatching::Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
