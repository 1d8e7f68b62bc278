//! Telegram adapter (teloxide).
//!
//! This crate implements the `cambot-core` MessagingPort over the Telegram
//! Bot API and hosts the update router.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InputFile, KeyboardButton, KeyboardMarkup, ParseMode, ReplyMarkup},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use cambot_core::{
    commands::{CMD_CAPTURE, CMD_HELP, CMD_STATUS},
    domain::ChatId,
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, PhotoRef, ReplyOptions},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    /// The persistent command keyboard attached to replies.
    fn command_keyboard() -> ReplyMarkup {
        let rows = vec![
            vec![KeyboardButton::new(CMD_CAPTURE)],
            vec![KeyboardButton::new(CMD_STATUS), KeyboardButton::new(CMD_HELP)],
        ];
        ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard(true))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str, opts: &ReplyOptions) -> Result<()> {
        let keyboard = opts.command_keyboard;
        self.with_retry(|| {
            let mut req = self
                .bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
                .parse_mode(ParseMode::Markdown);
            if keyboard {
                req = req.reply_markup(Self::command_keyboard());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        bytes: Vec<u8>,
        caption: &str,
        opts: &ReplyOptions,
    ) -> Result<PhotoRef> {
        let keyboard = opts.command_keyboard;
        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_photo(Self::tg_chat(chat_id), InputFile::memory(bytes.clone()))
                    .caption(caption.to_string());
                if keyboard {
                    req = req.reply_markup(Self::command_keyboard());
                }
                req
            })
            .await?;

        // Telegram orders photo sizes smallest-first; the last one is the
        // reference worth caching.
        let file_id = msg
            .photo()
            .and_then(|sizes| sizes.last())
            .map(|p| p.file.id.clone())
            .ok_or_else(|| Error::External("sent photo has no file reference".to_string()))?;

        Ok(PhotoRef { file_id })
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        let tg_action = match action {
            ChatAction::Typing => teloxide::types::ChatAction::Typing,
            ChatAction::UploadPhoto => teloxide::types::ChatAction::UploadPhoto,
        };
        self.with_retry(|| self.bot.send_chat_action(Self::tg_chat(chat_id), tg_action))
            .await?;
        Ok(())
    }
}
