//! Bot construction and command sets
//!
//! This module contains:
//! - Command enums for the commerce, lead and admin bots
//! - Bot instance creation

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Commerce bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "главное меню")]
    Start(String),
    #[command(description = "создать видео")]
    Create,
}

/// Lead bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum LeadCommand {
    #[command(description = "начать")]
    Start(String),
}

/// Admin bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Команды администратора:")]
pub enum AdminCommand {
    #[command(description = "заявки по датам")]
    Stats,
    #[command(description = "заявки за сегодня")]
    Today,
    #[command(description = "выгрузка CSV за дату (YYYY-MM-DD) или за всё время")]
    Export(String),
    #[command(description = "список команд")]
    Help,
}

/// Creates a Bot for `token` with the configured HTTP timeout.
///
/// Honors BOT_API_URL for a local Bot API server.
pub fn create_bot_with_token(token: &str) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(token, client);

    match std::env::var("BOT_API_URL") {
        Ok(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            Ok(bot.set_api_url(url))
        }
        Err(_) => Ok(bot),
    }
}

/// Bot for BOT_TOKEN
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN is not set");
    }
    create_bot_with_token(&config::BOT_TOKEN)
}

/// Sets up the commerce bot commands in the Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![
        BotCommand::new("start", "главное меню"),
        BotCommand::new("create", "создать видео"),
    ])
    .await?;
    Ok(())
}

/// Sets up the admin bot commands in the Telegram UI
pub async fn setup_admin_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(AdminCommand::bot_commands()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_payload_is_parsed() {
        assert_eq!(
            Command::parse("/start ref_42", "meemee_bot").unwrap(),
            Command::Start("ref_42".to_string())
        );
        assert_eq!(Command::parse("/start", "meemee_bot").unwrap(), Command::Start(String::new()));
        assert_eq!(Command::parse("/create", "meemee_bot").unwrap(), Command::Create);
    }

    #[test]
    fn test_admin_export_argument() {
        assert_eq!(
            AdminCommand::parse("/export 2024-05-01", "admin_bot").unwrap(),
            AdminCommand::Export("2024-05-01".to_string())
        );
        assert_eq!(AdminCommand::parse("/export", "admin_bot").unwrap(), AdminCommand::Export(String::new()));
        let descriptions = AdminCommand::descriptions().to_string();
        assert!(descriptions.contains("stats"));
    }
}
