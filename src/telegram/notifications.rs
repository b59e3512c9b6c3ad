use teloxide::prelude::*;

use crate::core::config;

/// Sends operational notices to the administrators through the admin bot.
///
/// Without an admin bot token or admin ids every notice is only logged.
#[derive(Clone, Default)]
pub struct AdminNotifier {
    bot: Option<Bot>,
    admin_ids: Vec<i64>,
}

impl AdminNotifier {
    pub fn new(bot: Option<Bot>, admin_ids: Vec<i64>) -> Self {
        Self { bot, admin_ids }
    }

    /// Notifier built from ADMIN_BOT_TOKEN and ADMIN_IDS
    pub fn from_env() -> anyhow::Result<Self> {
        let bot = match config::ADMIN_BOT_TOKEN.as_deref() {
            Some(token) => Some(super::bot::create_bot_with_token(token)?),
            None => None,
        };
        Ok(Self::new(bot, config::admin::ADMIN_IDS.clone()))
    }

    pub fn is_enabled(&self) -> bool {
        self.bot.is_some() && !self.admin_ids.is_empty()
    }

    /// Sends `text` to every admin. Failures are logged and never returned.
    pub async fn notify(&self, text: &str) {
        let Some(bot) = &self.bot else {
            log::debug!("Admin notification skipped (no admin bot): {}", text);
            return;
        };
        for admin_id in &self.admin_ids {
            if let Err(e) = bot.send_message(ChatId(*admin_id), text).await {
                log::error!("Failed to notify admin {}: {}", admin_id, e);
            }
        }
    }

    /// Incident summary for the admins.
    pub async fn notify_incident(&self, incident_id: &str, source: &str, user_id: Option<i64>, details: &str) {
        let text = format!(
            "⚠️ Ошибка {}\n\nИсточник: {}\nПользователь: {}\n\n{}",
            incident_id,
            source,
            user_id.map(|id| id.to_string()).unwrap_or_else(|| "—".to_string()),
            crate::core::utils::truncate_chars(details, 3000)
        );
        self.notify(&text).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_notifier_is_silent() {
        let notifier = AdminNotifier::default();
        assert!(!notifier.is_enabled());
        notifier.notify("test").await;
        notifier.notify_incident("ABCDEF12", "callback", Some(1), "boom").await;
    }
}
