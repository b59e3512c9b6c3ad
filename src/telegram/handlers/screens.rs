//! Screens shared by commands, callbacks and messages

use std::path::Path;

use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};

use super::types::{HandlerDeps, HandlerError};
use crate::core::config;
use crate::core::subscription::{self, channel_link};
use crate::telegram::{keyboards, texts};

pub(super) async fn show_main_menu(bot: &Bot, chat_id: ChatId) -> Result<(), HandlerError> {
    bot.send_message(chat_id, texts::MAIN_MENU)
        .reply_markup(keyboards::main_menu())
        .await?;
    Ok(())
}

/// Welcome for new users: photo when available, one-time START keyboard.
pub(super) async fn show_welcome(bot: &Bot, chat_id: ChatId) -> Result<(), HandlerError> {
    let image = Path::new(config::MEDIA_DIR.as_str()).join("welcome-screen.png");
    if image.exists() {
        let sent = bot
            .send_photo(chat_id, InputFile::file(image.clone()))
            .caption(texts::WELCOME)
            .reply_markup(keyboards::start_keyboard())
            .await;
        match sent {
            Ok(_) => return Ok(()),
            Err(e) => log::warn!("Welcome photo failed, sending text: {}", e),
        }
    }
    bot.send_message(chat_id, texts::WELCOME)
        .reply_markup(keyboards::start_keyboard())
        .await?;
    Ok(())
}

/// Catalog page; edits `message_id` when given.
pub(super) async fn show_catalog(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    page: usize,
    message_id: Option<MessageId>,
) -> Result<(), HandlerError> {
    let catalog = deps.engine.catalog();
    let page = catalog.page(page, config::catalog::PAGE_SIZE);
    let keyboard = keyboards::catalog(&page);

    if let Some(message_id) = message_id {
        let edited = bot
            .edit_message_text(chat_id, message_id, texts::CATALOG_HEADER)
            .reply_markup(keyboard.clone())
            .await;
        match edited {
            Ok(_) => return Ok(()),
            Err(e) => log::debug!("Catalog edit failed, sending a new message: {}", e),
        }
    }
    bot.send_message(chat_id, texts::CATALOG_HEADER)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

pub(super) async fn show_no_quota(bot: &Bot, chat_id: ChatId) -> Result<(), HandlerError> {
    bot.send_message(chat_id, texts::NO_QUOTA)
        .reply_markup(keyboards::no_quota())
        .await?;
    Ok(())
}

/// Whether the user may enter a generation flow.
///
/// Sends the subscribe prompt when the required channel is configured and the
/// user is not in it.
pub(super) async fn passes_gate(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    user_id: i64,
) -> Result<bool, HandlerError> {
    let Some(channel) = deps.required_channel.as_deref() else {
        return Ok(true);
    };
    if subscription::is_subscribed(bot, user_id, channel).await {
        return Ok(true);
    }

    log::info!("User {} is not subscribed to {}", user_id, channel);
    let link = channel_link(channel);
    bot.send_message(chat_id, texts::subscribe_required(channel))
        .reply_markup(keyboards::subscribe(link.as_deref()))
        .await?;
    Ok(false)
}
