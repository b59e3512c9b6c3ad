//! Free-text messages

use teloxide::prelude::*;

use super::screens::{show_main_menu, show_no_quota};
use super::types::{profile_of, HandlerDeps, HandlerError};
use crate::conversation::{ConversationState, TextOutcome};
use crate::core::config;
use crate::payments::StartedPayment;
use crate::telegram::{keyboards, texts};

pub(super) async fn handle_text_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let (Some(from), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    let profile = profile_of(from);
    deps.engine.register_user(&profile)?;

    if text.trim() == texts::START_BUTTON {
        return show_main_menu(bot, chat_id).await;
    }

    let outcome = deps.engine.handle_text(chat_id.0, &profile, text).await?;
    log::debug!("Text from {} handled: {:?}", profile.telegram_id, outcome);

    match outcome {
        TextOutcome::Idle => {
            bot.send_message(chat_id, texts::IDLE_HINT)
                .reply_markup(keyboards::main_menu())
                .await?;
        }
        TextOutcome::Invalid { state, error } => {
            let mut reply = texts::validation_error(&error);
            if state == ConversationState::AwaitingName {
                reply.push_str("\n\nНапиши имя ещё раз.");
            }
            bot.send_message(chat_id, reply).await?;
        }
        TextOutcome::AskGender { .. } => {
            bot.send_message(chat_id, texts::ASK_GENDER)
                .reply_markup(keyboards::gender())
                .await?;
        }
        TextOutcome::ExpectingButton(_) => {
            bot.send_message(chat_id, texts::EXPECTING_BUTTON).await?;
        }
        TextOutcome::NoQuota => show_no_quota(bot, chat_id).await?,
        TextOutcome::CreationFailed => {
            bot.send_message(chat_id, texts::CREATION_FAILED)
                .reply_markup(keyboards::retry_generation())
                .await?;
        }
        TextOutcome::PromptAccepted { .. } => {
            bot.send_message(chat_id, texts::PROMPT_ACCEPTED)
                .reply_markup(keyboards::menu_only())
                .await?;
        }
        // The poller already reported the result
        TextOutcome::FreeGenerationFinished { .. } => {}
        TextOutcome::EmailInvalid { .. } => {
            bot.send_message(chat_id, format!("{}\n\n{}", texts::EMAIL_INVALID, texts::ASK_EMAIL))
                .await?;
        }
        TextOutcome::PaymentCreated(payment) => send_card_payment(bot, chat_id, &payment).await?,
        TextOutcome::PaymentFailed => {
            bot.send_message(chat_id, texts::PAYMENT_FAILED)
                .reply_markup(keyboards::support(&config::SUPPORT_USERNAME))
                .await?;
        }
    }
    Ok(())
}

async fn send_card_payment(bot: &Bot, chat_id: ChatId, payment: &StartedPayment) -> Result<(), HandlerError> {
    let support = format!("https://t.me/{}", config::SUPPORT_USERNAME.as_str());
    let legal = [
        ("📄 Оферта", config::payment::OFFER_URL),
        ("🔒 Политика конфиденциальности", config::payment::PRIVACY_URL),
        ("💬 Поддержка", support.as_str()),
    ];
    bot.send_message(chat_id, texts::card_payment_created(payment))
        .reply_markup(keyboards::payment_link(&payment.payment_url, &payment.order_id, &legal))
        .await?;
    Ok(())
}
