//! Handler types, dependencies and the error boundary

use std::sync::Arc;

use teloxide::prelude::*;

use crate::conversation::ConversationEngine;
use crate::core::error_logger::{ErrorLogger, IncidentSource, UserContext};
use crate::storage::db::{DbPool, UserProfile};
use crate::telegram::notifications::AdminNotifier;
use crate::telegram::texts;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by the commerce bot handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub engine: Arc<ConversationEngine>,
    pub error_logger: ErrorLogger,
    pub notifier: AdminNotifier,
    /// Channel users must join before generating
    pub required_channel: Option<String>,
    pub bot_username: String,
}

impl HandlerDeps {
    pub fn new(
        db_pool: Arc<DbPool>,
        engine: Arc<ConversationEngine>,
        notifier: AdminNotifier,
        required_channel: Option<String>,
        bot_username: String,
    ) -> Self {
        Self {
            error_logger: ErrorLogger::new(Arc::clone(&db_pool)),
            db_pool,
            engine,
            notifier,
            required_channel,
            bot_username,
        }
    }
}

/// Context of the user behind a message
pub fn message_context(msg: &Message) -> UserContext {
    match msg.from.as_ref() {
        Some(user) => UserContext {
            user_id: i64::try_from(user.id.0).ok(),
            chat_id: Some(msg.chat.id.0),
            username: user.username.clone(),
        },
        None => UserContext {
            chat_id: Some(msg.chat.id.0),
            ..UserContext::anonymous()
        },
    }
}

/// Context of the user behind a callback query
pub fn callback_context(q: &CallbackQuery) -> UserContext {
    UserContext {
        user_id: i64::try_from(q.from.id.0).ok(),
        chat_id: q.message.as_ref().map(|m| m.chat().id.0),
        username: q.from.username.clone(),
    }
}

pub fn profile_of(user: &teloxide::types::User) -> UserProfile {
    UserProfile::from_telegram(user)
}

/// Last line of defense around a handler.
///
/// Any error is stored as an incident, the admins are notified and the user
/// gets a short message with the incident id. Nothing is propagated.
pub async fn catch_boundary(
    bot: &Bot,
    error_logger: &ErrorLogger,
    notifier: &AdminNotifier,
    source: IncidentSource,
    user: UserContext,
    result: Result<(), HandlerError>,
) {
    let Err(e) = result else {
        return;
    };

    let details = e.to_string();
    let incident_id = error_logger.record(source, &details, &user);
    notifier
        .notify_incident(&incident_id, source.as_str(), user.user_id, &details)
        .await;

    if let Some(chat_id) = user.chat_id {
        if let Err(e) = bot.send_message(ChatId(chat_id), texts::incident(&incident_id)).await {
            log::error!("Failed to report incident {} to chat {}: {}", incident_id, chat_id, e);
        }
    }
}
