use async_trait::async_trait;

use crate::{
    domain::ChatId,
    messaging::types::{ChatAction, PhotoRef, ReplyOptions},
    Result,
};

/// Transport port.
///
/// Telegram is the only implementation today; the dispatcher and the capture
/// loop never talk to the transport directly, only to this trait.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str, opts: &ReplyOptions) -> Result<()>;

    /// Delivers the captured image and returns the transport's file
    /// reference for it.
    async fn send_photo(
        &self,
        chat_id: ChatId,
        bytes: Vec<u8>,
        caption: &str,
        opts: &ReplyOptions,
    ) -> Result<PhotoRef>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;
}
