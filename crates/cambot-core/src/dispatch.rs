//! Command dispatch and capture serialization.
//!
//! The `Dispatcher` is the single context object wiring the session registry
//! to the bounded capture queue; it is built once at startup and shared by
//! `Arc`. The queue's consumer end is drained by exactly one
//! `run_capture_loop`, which owns the slow, camera-bound side of the bot.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::{
    camera::{CaptureOptions, StillCamera},
    commands::{self, Command},
    config::Config,
    domain::{ChatId, UpdateId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, ReplyOptions},
    },
    registry::{SessionRegistry, UpdateOutcome},
    store::PhotoStore,
    util::{caption_timestamp, format_uptime},
    Result,
};

/// One queued unit of capture work. Built by the dispatcher, consumed exactly
/// once by the capture loop, then dropped.
#[derive(Clone, Debug)]
pub struct CaptureRequest {
    pub user_name: String,
    pub chat_id: ChatId,
    pub image_width: u32,
    pub image_height: u32,
    pub camera_params: Vec<(String, Option<String>)>,
    pub reply_options: ReplyOptions,
}

/// What the transport should do with an inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Nothing to send (duplicate update or missing session).
    None,
    /// Send a text reply.
    Reply(String),
    /// A capture request was enqueued; the photo arrives via the capture
    /// loop, not this path.
    Enqueued,
}

pub struct Dispatcher {
    cfg: Arc<Config>,
    registry: SessionRegistry,
    queue: mpsc::Sender<CaptureRequest>,
    launched: Instant,
}

impl Dispatcher {
    /// Builds the dispatcher and hands back the queue's consumer end for
    /// `run_capture_loop`.
    pub fn new(cfg: Arc<Config>) -> (Self, mpsc::Receiver<CaptureRequest>) {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity);
        let registry = SessionRegistry::new(&cfg.allowed_users);

        (
            Self {
                cfg,
                registry,
                queue: tx,
                launched: Instant::now(),
            },
            rx,
        )
    }

    /// Process one inbound message: dedup + classify under the registry lock,
    /// then act with the lock released.
    ///
    /// The `/capture` enqueue happens here and blocks when the queue is full.
    /// That backpressure is the overload policy; it must never run inside the
    /// registry's critical section.
    pub async fn handle_message(
        &self,
        user_name: &str,
        chat_id: ChatId,
        update_id: UpdateId,
        text: &str,
    ) -> Result<Response> {
        let command = match self.registry.handle_update(user_name, update_id, text).await {
            UpdateOutcome::Duplicate | UpdateOutcome::NoSession => return Ok(Response::None),
            UpdateOutcome::Command(command) => command,
        };

        info!(user_name, command = command.name(), "handling command");

        match command {
            Command::Start => Ok(Response::Reply(commands::MSG_DEFAULT.to_string())),
            Command::Status => Ok(Response::Reply(self.status_text())),
            Command::Help => Ok(Response::Reply(commands::help_text())),
            Command::Unknown { text } => Ok(Response::Reply(commands::unknown_reply(&text))),
            Command::Capture => {
                if self.cfg.maintenance_mode {
                    return Ok(Response::Reply(self.cfg.maintenance_message.clone()));
                }

                let request = CaptureRequest {
                    user_name: user_name.to_string(),
                    chat_id,
                    image_width: self.cfg.image_width,
                    image_height: self.cfg.image_height,
                    camera_params: self.cfg.camera_params.clone(),
                    reply_options: ReplyOptions::with_command_keyboard(),
                };
                self.queue
                    .send(request)
                    .await
                    .map_err(|_| Error::External("capture queue is closed".to_string()))?;

                Ok(Response::Enqueued)
            }
        }
    }

    fn status_text(&self) -> String {
        let max = self.queue.max_capacity();
        let queued = max - self.queue.capacity();

        format!(
            "Uptime: {}\nQueue: *{queued}*/*{max}* capture(s) waiting",
            format_uptime(self.launched.elapsed())
        )
    }
}

/// Drains the capture queue until every sender is gone.
///
/// Exactly one instance of this loop runs; the camera's own exclusivity lock
/// still guarantees single-capture even if that ever changes.
pub async fn run_capture_loop(
    mut queue: mpsc::Receiver<CaptureRequest>,
    camera: Arc<dyn StillCamera>,
    messenger: Arc<dyn MessagingPort>,
    store: Arc<PhotoStore>,
) {
    while let Some(request) = queue.recv().await {
        process_capture(camera.as_ref(), messenger.as_ref(), &store, request).await;
    }
    info!("capture queue closed, stopping capture loop");
}

async fn process_capture(
    camera: &dyn StillCamera,
    messenger: &dyn MessagingPort,
    store: &PhotoStore,
    request: CaptureRequest,
) {
    let _ = messenger
        .send_chat_action(request.chat_id, ChatAction::Typing)
        .await;

    let opts = CaptureOptions {
        width: request.image_width,
        height: request.image_height,
        params: request.camera_params.clone(),
    };
    let bytes = match camera.capture(opts).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(user_name = request.user_name.as_str(), error = %e, "image capture failed");
            let message = format!("image capture failed: {e}");
            if let Err(send_err) = messenger
                .send_text(request.chat_id, &message, &request.reply_options)
                .await
            {
                error!(error = %send_err, "failed to send capture error message");
            }
            return;
        }
    };

    let caption = caption_timestamp();
    let _ = messenger
        .send_chat_action(request.chat_id, ChatAction::UploadPhoto)
        .await;

    match messenger
        .send_photo(request.chat_id, bytes, &caption, &request.reply_options)
        .await
    {
        Ok(photo) => {
            // Best-effort cache; never surfaced to the user.
            if let Err(e) = store.append(&request.user_name, &photo.file_id, &caption) {
                warn!(error = %e, "failed to save photo into local database");
            }
        }
        Err(e) => {
            error!(error = %e, "failed to send photo");
            let message = format!("failed to send photo: {e}");
            let _ = messenger
                .send_text(request.chat_id, &message, &ReplyOptions::default())
                .await;
        }
    }
}
