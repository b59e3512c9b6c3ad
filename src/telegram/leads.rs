//! Lead-capture bot and its admin companion

use std::path::Path;
use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{InputFile, Message, UpdateKind};

use super::bot::{AdminCommand, LeadCommand};
use super::callback::CallbackAction;
use super::handlers::{catch_boundary, HandlerError};
use super::handlers::types::{callback_context, message_context};
use super::notifications::AdminNotifier;
use super::{keyboards, texts};
use crate::core::config;
use crate::core::error_logger::{ErrorLogger, IncidentSource, UserContext};
use crate::core::export::leads_to_csv;
use crate::core::subscription::channel_link;
use crate::core::utils::{is_valid_date, today_string};
use crate::leads::{lead_username, LeadFlow, LeadSubmission};
use crate::storage::db::DbPool;
use crate::storage::get_connection;
use crate::storage::leads;

/// Dependencies of the lead bot
#[derive(Clone)]
pub struct LeadDeps {
    pub flow: Arc<LeadFlow>,
    pub error_logger: ErrorLogger,
    pub notifier: AdminNotifier,
}

impl LeadDeps {
    pub fn new(flow: Arc<LeadFlow>, db_pool: Arc<DbPool>, notifier: AdminNotifier) -> Self {
        Self {
            flow,
            error_logger: ErrorLogger::new(db_pool),
            notifier,
        }
    }
}

/// Dispatcher schema for the lead bot.
pub fn lead_schema(deps: LeadDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callbacks = deps;

    dptree::entry()
        .inspect(|u: Update| log::info!("{}", update_log_line("BOT", &u)))
        .branch(Update::filter_message().branch(dptree::entry().filter_command::<LeadCommand>().endpoint(
            move |bot: Bot, msg: Message, cmd: LeadCommand| {
                let deps = deps_commands.clone();
                async move {
                    let LeadCommand::Start(payload) = cmd;
                    let result = handle_lead_start(&bot, &msg, &deps, &payload).await;
                    lead_boundary(&bot, &deps, message_context(&msg), result).await;
                    Ok(())
                }
            },
        )))
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some_and(|text| !text.starts_with('/')))
                .endpoint(move |bot: Bot, msg: Message| {
                    let deps = deps_messages.clone();
                    async move {
                        let result = handle_lead_text(&bot, &msg, &deps).await;
                        lead_boundary(&bot, &deps, message_context(&msg), result).await;
                        Ok(())
                    }
                }),
        )
        .branch(Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
            let deps = deps_callbacks.clone();
            async move {
                let result = handle_lead_callback(&bot, &q, &deps).await;
                if result.is_err() {
                    let _ = bot.answer_callback_query(q.id.clone()).await;
                }
                lead_boundary(&bot, &deps, callback_context(&q), result).await;
                Ok(())
            }
        }))
}

/// One log line per incoming update: sender and what was sent.
fn update_log_line(bot: &str, update: &Update) -> String {
    let who = update
        .from()
        .map(|u| lead_username(u.username.as_deref(), i64::try_from(u.id.0).unwrap_or_default()))
        .unwrap_or_else(|| "unknown".to_string());
    let what = match &update.kind {
        UpdateKind::Message(msg) => match msg.text() {
            Some(text) => format!("text {:?}", text),
            None => "message".to_string(),
        },
        UpdateKind::CallbackQuery(q) => format!("callback {:?}", q.data.as_deref().unwrap_or_default()),
        _ => "other".to_string(),
    };
    format!("[{}] Update {} from {}: {}", bot, update.id.0, who, what)
}

/// Whether to confirm the subscription before answering the outcome
fn confirms_subscription(via_subscription: bool, submission: &LeadSubmission) -> bool {
    via_subscription
        && matches!(
            submission,
            LeadSubmission::Saved(_) | LeadSubmission::Duplicate | LeadSubmission::AlreadySubmitted
        )
}

async fn lead_boundary(bot: &Bot, deps: &LeadDeps, user: UserContext, result: Result<(), HandlerError>) {
    catch_boundary(bot, &deps.error_logger, &deps.notifier, IncidentSource::LeadBot, user, result).await;
}

async fn handle_lead_start(bot: &Bot, msg: &Message, deps: &LeadDeps, payload: &str) -> Result<(), HandlerError> {
    let who = msg
        .from
        .as_ref()
        .map(|u| lead_username(u.username.as_deref(), i64::try_from(u.id.0).unwrap_or_default()))
        .unwrap_or_default();
    log::info!("[BOT] /start by {} payload={}", who, payload);
    deps.flow.start(msg.chat.id.0, payload).await;

    let image = Path::new(config::MEDIA_DIR.as_str()).join("welcome-screen.png");
    if image.exists() {
        match bot.send_photo(msg.chat.id, InputFile::file(image)).caption(texts::LEAD_WELCOME).await {
            Ok(_) => return Ok(()),
            Err(e) => log::warn!("[BOT] Welcome photo failed, sending text: {}", e),
        }
    }
    bot.send_message(msg.chat.id, texts::LEAD_WELCOME).await?;
    Ok(())
}

async fn handle_lead_text(bot: &Bot, msg: &Message, deps: &LeadDeps) -> Result<(), HandlerError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let who = msg
        .from
        .as_ref()
        .map(|u| lead_username(u.username.as_deref(), i64::try_from(u.id.0).unwrap_or_default()))
        .unwrap_or_default();
    log::info!("[BOT] Name entered by {}: {}", who, text);

    match deps.flow.propose_name(msg.chat.id.0, text).await {
        Some(name) => {
            bot.send_message(msg.chat.id, texts::lead_confirm_name(&name))
                .reply_markup(keyboards::lead_confirm())
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, texts::LEAD_RETYPE).await?;
        }
    }
    Ok(())
}

async fn handle_lead_callback(bot: &Bot, q: &CallbackQuery, deps: &LeadDeps) -> Result<(), HandlerError> {
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let user_id = i64::try_from(q.from.id.0).unwrap_or_default();
    let username = lead_username(q.from.username.as_deref(), user_id);

    let action = CallbackAction::parse(q.data.as_deref().unwrap_or_default());
    let via_subscription = action == CallbackAction::CheckSubscription;
    let submission = match action {
        CallbackAction::ConfirmYes => deps.flow.confirm(chat_id.0, &username).await?,
        CallbackAction::ConfirmNo => {
            deps.flow.reject_name(chat_id.0).await;
            bot.answer_callback_query(q.id.clone()).await?;
            bot.send_message(chat_id, texts::LEAD_RETYPE).await?;
            return Ok(());
        }
        CallbackAction::CheckSubscription => deps.flow.check_subscription(chat_id.0, user_id, &username).await?,
        other => {
            log::info!("[BOT] Ignoring callback {:?} from {}", other, username);
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };

    if submission == LeadSubmission::NotSubscribed {
        bot.answer_callback_query(q.id.clone())
            .text(texts::SUBSCRIBE_FAIL)
            .show_alert(true)
            .await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;

    if confirms_subscription(via_subscription, &submission) {
        bot.send_message(chat_id, texts::SUBSCRIBE_OK).await?;
    }
    match submission {
        LeadSubmission::Saved(lead) => {
            log::info!("[BOT] Lead saved for {} ({})", lead.username, lead.utm_source);
            bot.send_message(chat_id, texts::LEAD_ACCEPTED).await?;
        }
        // A duplicate pair is still a success for the user
        LeadSubmission::Duplicate => {
            bot.send_message(chat_id, texts::LEAD_ACCEPTED).await?;
        }
        LeadSubmission::AlreadySubmitted => {
            bot.send_message(chat_id, texts::LEAD_ALREADY_USED).await?;
        }
        LeadSubmission::NeedsSubscription { channel } => {
            bot.send_message(chat_id, texts::subscribe_required(&channel))
                .reply_markup(keyboards::subscribe(channel_link(&channel).as_deref()))
                .await?;
        }
        LeadSubmission::NoPendingName => {
            bot.send_message(chat_id, texts::LEAD_NO_PENDING).await?;
        }
        LeadSubmission::NotConfigured => {
            bot.send_message(chat_id, texts::LEAD_ERROR).await?;
        }
        LeadSubmission::NotSubscribed => {}
    }
    Ok(())
}

/// Dependencies of the admin bot
#[derive(Clone)]
pub struct AdminDeps {
    pub db_pool: Arc<DbPool>,
    pub error_logger: ErrorLogger,
}

impl AdminDeps {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            error_logger: ErrorLogger::new(Arc::clone(&db_pool)),
            db_pool,
        }
    }
}

fn sender_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok())
}

/// Dispatcher schema for the admin bot. Only ADMIN_IDS get answers.
pub fn admin_schema(deps: AdminDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .inspect(|u: Update| log::info!("{}", update_log_line("ADMIN", &u)))
        .branch(
            Update::filter_message()
                .filter(|msg: Message| !sender_id(&msg).is_some_and(config::admin::is_admin))
                .endpoint(deny_non_admin),
        )
        .branch(Update::filter_message().branch(dptree::entry().filter_command::<AdminCommand>().endpoint(
            move |bot: Bot, msg: Message, cmd: AdminCommand| {
                let deps = deps.clone();
                async move {
                    log::info!("[ADMIN] {:?} from {:?}", cmd, sender_id(&msg));
                    let result = handle_admin_command(&bot, &msg, &deps, cmd).await;
                    catch_boundary(
                        &bot,
                        &deps.error_logger,
                        &AdminNotifier::default(),
                        IncidentSource::AdminBot,
                        message_context(&msg),
                        result,
                    )
                    .await;
                    Ok(())
                }
            },
        )))
}

async fn deny_non_admin(bot: Bot, msg: Message) -> Result<(), HandlerError> {
    log::warn!("[ADMIN] Rejected message from {:?}", sender_id(&msg));
    bot.send_message(msg.chat.id, texts::ADMIN_DENIED).await?;
    Ok(())
}

async fn handle_admin_command(bot: &Bot, msg: &Message, deps: &AdminDeps, cmd: AdminCommand) -> Result<(), HandlerError> {
    let chat_id = msg.chat.id;
    match cmd {
        AdminCommand::Stats => {
            let days = leads::all_dates(&*get_connection(&deps.db_pool)?)?;
            bot.send_message(chat_id, texts::admin_stats(&days)).await?;
        }
        AdminCommand::Today => {
            let today = today_string();
            let list = leads::list_by_date(&*get_connection(&deps.db_pool)?, &today)?;
            bot.send_message(chat_id, texts::admin_today(&today, &list)).await?;
        }
        AdminCommand::Export(arg) => {
            let date = Some(arg.trim()).filter(|d| !d.is_empty());
            if date.is_some_and(|d| !is_valid_date(d)) {
                bot.send_message(chat_id, texts::ADMIN_BAD_DATE).await?;
                return Ok(());
            }
            let list = {
                let conn = get_connection(&deps.db_pool)?;
                match date {
                    Some(d) => leads::list_by_date(&conn, d)?,
                    None => leads::list_all(&conn)?,
                }
            };
            if list.is_empty() {
                bot.send_message(chat_id, texts::admin_export_empty(date)).await?;
                return Ok(());
            }

            let file_name = format!("leads_{}.csv", date.unwrap_or("all"));
            let csv = leads_to_csv(&list)?;
            log::info!("[ADMIN] Exporting {} lead(s) as {}", list.len(), file_name);
            bot.send_document(chat_id, InputFile::memory(csv.into_bytes()).file_name(file_name))
                .caption(texts::admin_export_caption(list.len(), date))
                .await?;
        }
        AdminCommand::Help => {
            bot.send_message(chat_id, texts::ADMIN_HELP).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::leads::Lead;

    fn update(json: &str) -> Update {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_update_log_line_for_text() {
        let u = update(
            r#"{"update_id": 7, "message": {"message_id": 1, "date": 1714557600,
                "chat": {"id": 42, "type": "private", "first_name": "Anna"},
                "from": {"id": 42, "is_bot": false, "first_name": "Anna", "username": "anna"},
                "text": "Анна"}}"#,
        );
        assert_eq!(update_log_line("BOT", &u), "[BOT] Update 7 from @anna: text \"Анна\"");
    }

    #[test]
    fn test_update_log_line_without_username() {
        let u = update(
            r#"{"update_id": 8, "message": {"message_id": 2, "date": 1714557600,
                "chat": {"id": 42, "type": "private", "first_name": "Anna"},
                "from": {"id": 42, "is_bot": false, "first_name": "Anna"},
                "text": "/stats"}}"#,
        );
        assert_eq!(update_log_line("ADMIN", &u), "[ADMIN] Update 8 from id:42: text \"/stats\"");
    }

    #[test]
    fn test_subscription_confirmed_for_every_subscribed_outcome() {
        let lead = Lead {
            date: "2024-05-01".to_string(),
            utm_source: "default".to_string(),
            username: "@anna".to_string(),
            video_generate_name: "Анна".to_string(),
        };
        assert!(confirms_subscription(true, &LeadSubmission::Saved(lead.clone())));
        assert!(confirms_subscription(true, &LeadSubmission::Duplicate));
        assert!(confirms_subscription(true, &LeadSubmission::AlreadySubmitted));

        assert!(!confirms_subscription(true, &LeadSubmission::NotSubscribed));
        assert!(!confirms_subscription(true, &LeadSubmission::NoPendingName));
        assert!(!confirms_subscription(false, &LeadSubmission::Saved(lead)));
        assert!(!confirms_subscription(false, &LeadSubmission::AlreadySubmitted));
    }
}
