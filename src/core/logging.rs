//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup summary of which optional features are configured

use anyhow::Result;
use simplelog::*;
use std::fs::{self, File};
use std::path::Path;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// Creates the parent directory of `log_file_path` if needed.
///
/// # Arguments
/// * `log_file_path` - Path to the log file
pub fn init_logger(log_file_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| anyhow::anyhow!("Failed to create log directory: {}", e))?;
        }
    }
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "✅"
    } else {
        "➖"
    }
}

/// Logs which optional integrations are configured for the commerce bot
pub fn log_commerce_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🎬 Commerce bot configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Database: {}", *config::DATABASE_PATH);
    log::info!("Generation API: {}", *config::generation::API_URL);
    log::info!("Payment API: {}", *config::payment::API_URL);
    match config::REQUIRED_CHANNEL.as_deref() {
        Some(channel) => log::info!("{} Required channel: {}", on_off(true), channel),
        None => log::info!("{} Required channel: not set", on_off(false)),
    }
    log::info!(
        "{} Referral program (bonus {}, expert cashback {}%)",
        on_off(*config::referral::ENABLED),
        *config::referral::BONUS,
        *config::referral::EXPERT_CASHBACK_PERCENT
    );
    log::info!("{} Admin bot notifications", on_off(config::ADMIN_BOT_TOKEN.is_some()));
    if config::admin::ADMIN_IDS.is_empty() {
        log::warn!("⚠️  ADMIN_IDS is empty: incident notifications will not be delivered");
    }
}

/// Logs the lead bot policy
pub fn log_leads_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📝 Lead bot configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Database: {}", *config::LEADS_DATABASE_PATH);
    log::info!("Default UTM source: {}", *config::leads::UTM_SOURCE);
    log::info!(
        "{} Subscription check ({})",
        on_off(*config::leads::SUBSCRIPTION_CHECK_ENABLED),
        config::leads::SUBSCRIPTION_CHANNEL.as_deref().unwrap_or("no channel")
    );
    log::info!(
        "{} Single submission per user",
        on_off(*config::leads::USER_SINGLE_SUBMISSION_ENFORCE)
    );
    if *config::leads::SUBSCRIPTION_CHECK_ENABLED && config::leads::SUBSCRIPTION_CHANNEL.is_none() {
        log::warn!("⚠️  SUBSCRIPTION_CHECK_ENABLED is set but SUBSCRIPTION_CHANNEL is empty: check is skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn test_init_logger_creates_nested_log_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/logs/app.log");

        // The global logger may already be set by another test; the file is created either way
        let _ = init_logger(path.to_str().unwrap());

        assert!(path.exists());
    }
}
