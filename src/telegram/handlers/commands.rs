//! Command handler implementations (/start, /create)

use teloxide::prelude::*;

use super::screens::{passes_gate, show_catalog, show_main_menu, show_welcome};
use super::types::{profile_of, HandlerDeps, HandlerError};
use crate::conversation::SessionPatch;
use crate::core::config;
use crate::referral::{self, LinkOutcome, StartPayload};
use crate::storage::db::UserProfile;
use crate::storage::get_connection;
use crate::telegram::texts;

/// Handle /start [payload]
pub(super) async fn handle_start_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    payload: &str,
) -> Result<(), HandlerError> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let profile = profile_of(from);
    let is_new = deps.engine.register_user(&profile)?;
    log::info!(
        "/start by {} payload={:?} new={}",
        profile.telegram_id,
        payload,
        is_new
    );

    let payload = StartPayload::parse(payload);
    apply_payload(bot, deps, msg.chat.id, &profile, is_new, &payload).await?;

    if is_new {
        show_welcome(bot, msg.chat.id).await?;
    }
    if payload == StartPayload::Create {
        return handle_create_command(bot, msg, deps).await;
    }
    if !is_new {
        show_main_menu(bot, msg.chat.id).await?;
    }
    Ok(())
}

/// Handle /create: straight to the catalog
pub(super) async fn handle_create_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let profile = profile_of(from);
    deps.engine.register_user(&profile)?;

    if passes_gate(bot, deps, msg.chat.id, profile.telegram_id).await? {
        show_catalog(bot, deps, msg.chat.id, 0, None).await?;
    }
    Ok(())
}

async fn apply_payload(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    profile: &UserProfile,
    is_new: bool,
    payload: &StartPayload,
) -> Result<(), HandlerError> {
    let outcome = match payload {
        StartPayload::Referral(referrer_id) if *config::referral::ENABLED => {
            let conn = get_connection(&deps.db_pool)?;
            referral::apply_referral(
                &conn,
                profile.telegram_id,
                *referrer_id,
                is_new,
                *config::referral::BONUS,
            )?
        }
        StartPayload::Expert(expert_id) if *config::referral::ENABLED => {
            let conn = get_connection(&deps.db_pool)?;
            referral::apply_expert(&conn, profile.telegram_id, *expert_id)?
        }
        StartPayload::Utm(source) => {
            deps.engine
                .sessions()
                .set(
                    chat_id.0,
                    SessionPatch {
                        utm_source: Some(source.clone()),
                        ..SessionPatch::default()
                    },
                )
                .await;
            LinkOutcome::Ignored
        }
        _ => LinkOutcome::Ignored,
    };

    match outcome {
        LinkOutcome::Referred { referrer_id, bonus } => {
            bot.send_message(chat_id, texts::referral_bonus_received(bonus)).await?;
            if let Err(e) = bot
                .send_message(ChatId(referrer_id), texts::referral_bonus_for_inviter(bonus))
                .await
            {
                log::warn!("Failed to notify referrer {}: {}", referrer_id, e);
            }
        }
        LinkOutcome::ExpertLinked { expert_id } => {
            bot.send_message(chat_id, texts::EXPERT_LINKED).await?;
            if let Err(e) = bot.send_message(ChatId(expert_id), texts::EXPERT_NEW_CLIENT).await {
                log::warn!("Failed to notify expert {}: {}", expert_id, e);
            }
        }
        LinkOutcome::Ignored => {}
    }
    Ok(())
}
