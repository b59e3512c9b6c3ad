//! Callback query dispatch for the commerce bot

use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};
use url::Url;

use super::screens::{passes_gate, show_catalog, show_main_menu, show_no_quota};
use super::types::{profile_of, HandlerDeps, HandlerError};
use crate::catalog::Meme;
use crate::conversation::{ConfirmOutcome, GenderOutcome, SelectOutcome};
use crate::core::config;
use crate::core::subscription;
use crate::payments::{find_crypto, find_package, is_supported_chain, PaymentCheck};
use crate::referral::start_link;
use crate::storage::db::{self, UserProfile};
use crate::storage::generations;
use crate::storage::get_connection;
use crate::telegram::callback::CallbackAction;
use crate::telegram::{keyboards, texts};

/// Callback answer: empty, a toast, or a modal alert
enum Answer {
    Silent,
    Toast(String),
    Alert(String),
}

impl Answer {
    fn toast(text: impl Into<String>) -> Self {
        Self::Toast(text.into())
    }

    fn alert(text: impl Into<String>) -> Self {
        Self::Alert(text.into())
    }
}

pub(super) async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let action = CallbackAction::parse(q.data.as_deref().unwrap_or_default());
    let profile = profile_of(&q.from);
    log::info!("Callback {:?} from {}", action, profile.telegram_id);

    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();
    deps.engine.register_user(&profile)?;

    let answer = dispatch(bot, deps, &action, chat_id, message_id, &profile).await?;

    let request = bot.answer_callback_query(q.id.clone());
    let result = match answer {
        Answer::Silent => request.await,
        Answer::Toast(text) => request.text(text).await,
        Answer::Alert(text) => request.text(text).show_alert(true).await,
    };
    if let Err(e) = result {
        log::debug!("Failed to answer callback {:?}: {}", q.id, e);
    }
    Ok(())
}

async fn dispatch(
    bot: &Bot,
    deps: &HandlerDeps,
    action: &CallbackAction,
    chat_id: ChatId,
    message_id: MessageId,
    profile: &UserProfile,
) -> Result<Answer, HandlerError> {
    let user_id = profile.telegram_id;
    let engine = &deps.engine;

    match action {
        CallbackAction::MainMenu => {
            show_main_menu(bot, chat_id).await?;
        }
        CallbackAction::CreateVideo | CallbackAction::Catalog => {
            if passes_gate(bot, deps, chat_id, user_id).await? {
                show_catalog(bot, deps, chat_id, 0, None).await?;
            }
        }
        CallbackAction::CatalogPage(page) => {
            show_catalog(bot, deps, chat_id, *page, Some(message_id)).await?;
        }
        CallbackAction::Meme(meme_id) => {
            if !passes_gate(bot, deps, chat_id, user_id).await? {
                return Ok(Answer::Silent);
            }
            match engine.select_meme(chat_id.0, user_id, meme_id).await? {
                SelectOutcome::Selected(meme) => send_meme_prompt(bot, chat_id, &meme).await?,
                SelectOutcome::ComingSoon(_) => return Ok(Answer::alert(texts::MEME_SOON)),
                SelectOutcome::NotFound => return Ok(Answer::alert(texts::MEME_NOT_FOUND)),
                SelectOutcome::NoQuota => show_no_quota(bot, chat_id).await?,
            }
        }
        CallbackAction::Gender(gender) => match engine.choose_gender(chat_id.0, *gender).await {
            GenderOutcome::Confirm { meme_name, name, gender } => {
                bot.send_message(chat_id, texts::confirm_generation(&meme_name, &name, gender))
                    .reply_markup(keyboards::confirm_generation())
                    .await?;
            }
            GenderOutcome::NotExpected => return Ok(Answer::alert(texts::MISSING_DATA)),
        },
        CallbackAction::ConfirmGeneration => match engine.confirm_generation(chat_id.0, profile).await? {
            ConfirmOutcome::Started { generation_id } => {
                log::info!("Generation {} started from chat {}", generation_id, chat_id);
            }
            ConfirmOutcome::NoQuota => {
                show_no_quota(bot, chat_id).await?;
                return Ok(Answer::alert(texts::NO_QUOTA));
            }
            ConfirmOutcome::MissingData => return Ok(Answer::alert(texts::MISSING_DATA)),
            ConfirmOutcome::CreationFailed => {
                bot.send_message(chat_id, texts::CREATION_FAILED)
                    .reply_markup(keyboards::retry_generation())
                    .await?;
            }
        },
        CallbackAction::CustomPrompt => {
            if passes_gate(bot, deps, chat_id, user_id).await? {
                let has_quota = engine.quota(user_id)? > 0;
                bot.send_message(chat_id, texts::CUSTOM_PROMPT_MENU)
                    .reply_markup(keyboards::custom_prompt_menu(has_quota))
                    .await?;
            }
        }
        CallbackAction::StartCustomPrompt => {
            if !passes_gate(bot, deps, chat_id, user_id).await? {
                return Ok(Answer::Silent);
            }
            if engine.quota(user_id)? <= 0 {
                show_no_quota(bot, chat_id).await?;
                return Ok(Answer::Silent);
            }
            engine.enter_custom_prompt(chat_id.0).await;
            bot.send_message(chat_id, texts::ask_custom_prompt()).await?;
        }
        CallbackAction::UseFreeGeneration => {
            if !passes_gate(bot, deps, chat_id, user_id).await? {
                return Ok(Answer::Silent);
            }
            if engine.enter_free_prompt(chat_id.0, user_id).await? {
                bot.send_message(chat_id, texts::ask_free_prompt()).await?;
            } else {
                show_no_quota(bot, chat_id).await?;
            }
        }
        CallbackAction::PromptGuide => {
            bot.send_message(chat_id, texts::PROMPT_GUIDE)
                .reply_markup(keyboards::guide())
                .await?;
        }
        CallbackAction::ShowFullGuide => {
            bot.send_message(chat_id, texts::FULL_GUIDE)
                .reply_markup(keyboards::guide())
                .await?;
        }
        CallbackAction::CheckSubscription => {
            let Some(channel) = deps.required_channel.as_deref() else {
                show_main_menu(bot, chat_id).await?;
                return Ok(Answer::Silent);
            };
            if !subscription::is_subscribed(bot, user_id, channel).await {
                return Ok(Answer::alert(texts::SUBSCRIBE_FAIL));
            }
            bot.send_message(chat_id, texts::SUBSCRIBE_OK).await?;
            show_main_menu(bot, chat_id).await?;
        }
        CallbackAction::Buy => {
            let quota = engine.quota(user_id)?;
            bot.send_message(chat_id, texts::packages_screen(quota))
                .reply_markup(keyboards::packages())
                .await?;
        }
        CallbackAction::SelectPackage(key) => {
            let Some(package) = find_package(key) else {
                return Ok(Answer::alert(texts::PAYMENT_NOT_FOUND));
            };
            bot.send_message(chat_id, texts::payment_methods(package))
                .reply_markup(keyboards::payment_methods(package))
                .await?;
        }
        CallbackAction::PayCard(key) => {
            if !engine.enter_email(chat_id.0, key).await {
                return Ok(Answer::alert(texts::PAYMENT_NOT_FOUND));
            }
            bot.send_message(chat_id, texts::ASK_EMAIL).await?;
        }
        CallbackAction::PayCrypto(key) => {
            if find_package(key).is_none() {
                return Ok(Answer::alert(texts::PAYMENT_NOT_FOUND));
            }
            bot.send_message(chat_id, texts::CHOOSE_CRYPTO)
                .reply_markup(keyboards::crypto_assets(key))
                .await?;
        }
        CallbackAction::PayStars(_) => return Ok(Answer::alert(texts::STARS_SOON)),
        CallbackAction::Crypto { symbol, package } => {
            if find_crypto(symbol).is_none() || find_package(package).is_none() {
                return Ok(Answer::alert(texts::PAYMENT_NOT_FOUND));
            }
            bot.send_message(chat_id, texts::choose_chain(symbol))
                .reply_markup(keyboards::crypto_chains(symbol, package))
                .await?;
        }
        CallbackAction::Chain { symbol, chain, package } => {
            if !is_supported_chain(symbol, chain) {
                return Ok(Answer::alert(texts::PAYMENT_NOT_FOUND));
            }
            match engine
                .payments()
                .start_crypto_payment(user_id, package, symbol, chain)
                .await
            {
                Ok(payment) => {
                    bot.send_message(chat_id, texts::crypto_invoice_created(&payment, chain))
                        .reply_markup(keyboards::payment_link(&payment.payment_url, &payment.order_id, &[]))
                        .await?;
                }
                Err(e) => {
                    log::error!("Crypto invoice for user {} failed: {}", user_id, e);
                    bot.send_message(chat_id, texts::PAYMENT_FAILED)
                        .reply_markup(keyboards::support(&config::SUPPORT_USERNAME))
                        .await?;
                }
            }
        }
        CallbackAction::CheckPayment(order_id) => {
            match engine.payments().check_payment(user_id, order_id).await? {
                PaymentCheck::Pending => return Ok(Answer::alert(texts::PAYMENT_PENDING)),
                PaymentCheck::NotFound => return Ok(Answer::alert(texts::PAYMENT_NOT_FOUND)),
                PaymentCheck::Failed => {
                    bot.send_message(chat_id, texts::PAYMENT_DECLINED)
                        .reply_markup(keyboards::packages())
                        .await?;
                }
                PaymentCheck::Paid {
                    generations,
                    newly_credited: true,
                } => {
                    bot.send_message(chat_id, texts::payment_credited(generations))
                        .reply_markup(keyboards::main_menu())
                        .await?;
                }
                PaymentCheck::Paid {
                    newly_credited: false, ..
                } => return Ok(Answer::alert(texts::PAYMENT_ALREADY_CREDITED)),
            }
        }
        CallbackAction::About => {
            bot.send_message(chat_id, texts::ABOUT)
                .reply_markup(keyboards::support(&config::SUPPORT_USERNAME))
                .await?;
        }
        CallbackAction::Profile => {
            let user = db::get_user(&*get_connection(&deps.db_pool)?, user_id)?;
            let Some(user) = user else {
                return Ok(Answer::alert(texts::MISSING_DATA));
            };
            bot.send_message(chat_id, texts::profile(&user))
                .reply_markup(keyboards::profile())
                .await?;
        }
        CallbackAction::ProfileHistory(page) => show_history(bot, deps, chat_id, user_id, *page).await?,
        CallbackAction::Referral => {
            bot.send_message(chat_id, texts::referral_menu(*config::referral::BONUS))
                .reply_markup(keyboards::referral())
                .await?;
        }
        CallbackAction::RefUser => {
            let invited = db::count_referrals(&*get_connection(&deps.db_pool)?, user_id)?;
            let link = start_link(&deps.bot_username, &format!("ref_{}", user_id));
            bot.send_message(chat_id, texts::referral_link(&link, invited))
                .reply_markup(keyboards::menu_only())
                .await?;
        }
        CallbackAction::RefExpert => {
            let (clients, balance) = {
                let conn = get_connection(&deps.db_pool)?;
                let clients = db::count_expert_clients(&conn, user_id)?;
                let balance = db::get_user(&conn, user_id)?.map(|u| u.expert_balance).unwrap_or(0);
                (clients, balance)
            };
            let link = start_link(&deps.bot_username, &format!("expert_{}", user_id));
            bot.send_message(chat_id, texts::expert_link(&link, clients, balance))
                .reply_markup(keyboards::menu_only())
                .await?;
        }
        CallbackAction::ConfirmYes | CallbackAction::ConfirmNo | CallbackAction::Unknown(_) => {
            log::info!("Unhandled callback {:?} from {}", action, user_id);
            return Ok(Answer::toast(texts::IN_DEVELOPMENT));
        }
    }
    Ok(Answer::Silent)
}

/// Example video with the name request; text only when the video fails.
async fn send_meme_prompt(bot: &Bot, chat_id: ChatId, meme: &Meme) -> Result<(), HandlerError> {
    let caption = texts::meme_selected(&meme.name);
    if let Some(url) = meme.video_url.as_deref().and_then(|u| Url::parse(u).ok()) {
        match bot.send_video(chat_id, InputFile::url(url)).caption(caption.clone()).await {
            Ok(_) => return Ok(()),
            Err(e) => log::warn!("Example video for {} failed, sending text: {}", meme.id, e),
        }
    }
    bot.send_message(chat_id, caption).await?;
    Ok(())
}

async fn show_history(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    user_id: i64,
    page: usize,
) -> Result<(), HandlerError> {
    let page_size = config::catalog::HISTORY_PAGE_SIZE;
    let (total, items, page, total_pages) = {
        let conn = get_connection(&deps.db_pool)?;
        let total = generations::count_by_user(&conn, user_id)?;
        let total_pages = (total.max(0) as usize).div_ceil(page_size).max(1);
        let page = page.min(total_pages - 1);
        let items = generations::list_by_user(&conn, user_id, page_size, page * page_size)?;
        (total, items, page, total_pages)
    };

    let mut text = texts::history_header(total, page, total_pages);
    for generation in &items {
        text.push('\n');
        text.push_str(&texts::history_line(generation));
    }
    bot.send_message(chat_id, text)
        .reply_markup(keyboards::history(page, total_pages))
        .await?;
    Ok(())
}
