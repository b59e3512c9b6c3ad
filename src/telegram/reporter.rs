//! Telegram side of generation results

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};
use url::Url;

use super::{keyboards, texts};
use crate::core::error::{AppError, AppResult};
use crate::generation::ResultReporter;
use crate::storage::generations::Generation;

pub struct TelegramReporter {
    bot: Bot,
}

impl TelegramReporter {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Sends the video itself; the cached file id wins over the URL.
    async fn send_video(&self, chat_id: ChatId, generation: &Generation) -> AppResult<Option<String>> {
        let input = match (&generation.telegram_file_id, &generation.video_url) {
            (Some(file_id), _) => InputFile::file_id(FileId(file_id.clone())),
            (None, Some(url)) => InputFile::url(Url::parse(url)?),
            (None, None) => return Err(AppError::Validation(format!("generation {} has no video", generation.id))),
        };

        let sent = self
            .bot
            .send_video(chat_id, input)
            .caption(texts::video_caption(generation))
            .reply_markup(keyboards::generation_result(&generation.id))
            .await?;
        Ok(sent.video().map(|v| v.file.id.0.clone()))
    }
}

#[async_trait]
impl ResultReporter for TelegramReporter {
    async fn generation_started(&self, chat_id: i64, _generation: &Generation) -> AppResult<()> {
        self.bot.send_message(ChatId(chat_id), texts::GENERATION_STARTED).await?;
        Ok(())
    }

    async fn deliver_video(&self, chat_id: i64, generation: &Generation) -> AppResult<Option<String>> {
        let chat = ChatId(chat_id);
        match self.send_video(chat, generation).await {
            Ok(file_id) => {
                log::info!("Delivered generation {} to chat {}", generation.id, chat_id);
                Ok(file_id)
            }
            Err(e) => {
                log::warn!(
                    "Video send failed for generation {}, falling back to a link: {}",
                    generation.id,
                    e
                );
                let url = generation.video_url.as_deref().unwrap_or_default();
                self.bot
                    .send_message(chat, texts::video_link_fallback(generation, url))
                    .reply_markup(keyboards::generation_result(&generation.id))
                    .await?;
                Ok(None)
            }
        }
    }

    async fn report_failure(&self, chat_id: i64, _generation: &Generation) -> AppResult<()> {
        self.bot
            .send_message(ChatId(chat_id), texts::GENERATION_FAILED)
            .reply_markup(keyboards::retry_generation())
            .await?;
        Ok(())
    }

    async fn report_still_processing(&self, chat_id: i64, _generation_id: &str) -> AppResult<()> {
        self.bot
            .send_message(ChatId(chat_id), texts::STILL_PROCESSING)
            .reply_markup(keyboards::menu_only())
            .await?;
        Ok(())
    }
}
