//! Dispatcher schema and handler chain builders

use std::time::Instant;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::callbacks::handle_callback;
use super::commands::{handle_create_command, handle_start_command};
use super::inline::handle_inline_query;
use super::messages::handle_text_message;
use super::types::{callback_context, catch_boundary, message_context, HandlerDeps, HandlerError};
use crate::core::error_logger::{IncidentSource, UserContext};
use crate::telegram::bot::Command;

/// Creates the dispatcher schema for the commerce bot.
///
/// Every endpoint runs behind [`catch_boundary`], so handler errors become
/// incidents and never reach the dispatcher.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .inspect(|u: Update| {
            log::debug!("Update {} ({:?})", u.id.0, u.kind);
        })
        .branch(command_handler(deps.clone()))
        .branch(message_handler(deps.clone()))
        .branch(callback_handler(deps.clone()))
        .branch(inline_handler(deps))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                let started = Instant::now();

                let result = match &cmd {
                    Command::Start(payload) => handle_start_command(&bot, &msg, &deps, payload).await,
                    Command::Create => handle_create_command(&bot, &msg, &deps).await,
                };
                log::debug!("Command {:?} handled in {:?}", cmd, started.elapsed());

                catch_boundary(
                    &bot,
                    &deps.error_logger,
                    &deps.notifier,
                    IncidentSource::Command,
                    message_context(&msg),
                    result,
                )
                .await;
                Ok(())
            }
        },
    ))
}

/// Plain text that is not a command
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some_and(|text| !text.starts_with('/')))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let started = Instant::now();
                let result = handle_text_message(&bot, &msg, &deps).await;
                log::debug!("Message in chat {} handled in {:?}", msg.chat.id, started.elapsed());

                catch_boundary(
                    &bot,
                    &deps.error_logger,
                    &deps.notifier,
                    IncidentSource::Message,
                    message_context(&msg),
                    result,
                )
                .await;
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let started = Instant::now();
            let result = handle_callback(&bot, &q, &deps).await;
            log::debug!("Callback {:?} handled in {:?}", q.data, started.elapsed());

            if result.is_err() {
                // The boundary message replaces the toast; stop the spinner anyway.
                let _ = bot.answer_callback_query(q.id.clone()).await;
            }
            catch_boundary(
                &bot,
                &deps.error_logger,
                &deps.notifier,
                IncidentSource::Callback,
                callback_context(&q),
                result,
            )
            .await;
            Ok(())
        }
    })
}

fn inline_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_inline_query().endpoint(move |bot: Bot, q: InlineQuery| {
        let deps = deps.clone();
        async move {
            let result = handle_inline_query(&bot, &q, &deps).await;
            // No chat to answer in: the incident is recorded only
            let user = UserContext {
                user_id: i64::try_from(q.from.id.0).ok(),
                chat_id: None,
                username: q.from.username.clone(),
            };
            catch_boundary(
                &bot,
                &deps.error_logger,
                &deps.notifier,
                IncidentSource::InlineQuery,
                user,
                result,
            )
            .await;
            Ok(())
        }
    })
}
