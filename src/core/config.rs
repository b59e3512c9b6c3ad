use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Reads a boolean flag from the environment ("true"/"1"/"yes", case-insensitive)
fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

/// Reads a trimmed, non-empty string from the environment
fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Commerce bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Admin bot token, used for lead exports and incident notifications
/// Read from ADMIN_BOT_TOKEN (or BOT_TOKEN_ADMIN)
pub static ADMIN_BOT_TOKEN: Lazy<Option<String>> =
    Lazy::new(|| env_non_empty("ADMIN_BOT_TOKEN").or_else(|| env_non_empty("BOT_TOKEN_ADMIN")));

/// Public bot username without '@', used in share captions and deep links
pub static BOT_NAME: Lazy<String> = Lazy::new(|| env::var("BOT_NAME").unwrap_or_else(|_| "meemee_bot".to_string()));

/// Commerce database file path
/// Default: data/meemee.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "data/meemee.sqlite".to_string()));

/// Lead bot database file path
/// Default: data/data.sqlite
pub static LEADS_DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LEADS_DATABASE_PATH").unwrap_or_else(|_| "data/data.sqlite".to_string()));

/// Log file path
/// Default: logs/app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/app.log".to_string()));

/// Directory with welcome images and other static media
pub static MEDIA_DIR: Lazy<String> = Lazy::new(|| env::var("MEDIA_DIR").unwrap_or_else(|_| "data".to_string()));

/// Optional path to a JSON catalog overriding the built-in one
pub static CATALOG_PATH: Lazy<Option<String>> = Lazy::new(|| env_non_empty("CATALOG_PATH"));

/// Channel the commerce bot requires a subscription to (empty = no gate)
pub static REQUIRED_CHANNEL: Lazy<Option<String>> = Lazy::new(|| env_non_empty("REQUIRED_CHANNEL"));

/// Support account shown in error and payment messages, without '@'
pub static SUPPORT_USERNAME: Lazy<String> =
    Lazy::new(|| env::var("SUPPORT_USERNAME").unwrap_or_else(|_| "aiviral_manager".to_string()));

/// Use webhook mode instead of long polling
pub static USE_WEBHOOK: Lazy<bool> = Lazy::new(|| env_flag("USE_WEBHOOK", false));

/// Webhook URL for Telegram updates
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env_non_empty("WEBHOOK_URL"));

/// Port the webhook listener binds to
pub static WEBHOOK_PORT: Lazy<u16> =
    Lazy::new(|| env::var("WEBHOOK_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8443));

/// Generations granted to a user on first contact
pub static FREE_QUOTA: Lazy<i64> =
    Lazy::new(|| env::var("FREE_QUOTA").ok().and_then(|v| v.parse().ok()).unwrap_or(1));

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    /// Telegram ids allowed to use admin commands and receive notifications
    /// Read from ADMIN_IDS as a comma separated list
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split(',').filter_map(|id| id.trim().parse::<i64>().ok()).collect()
    }

    pub fn is_admin(user_id: i64) -> bool {
        ADMIN_IDS.contains(&user_id)
    }
}

/// Lead bot configuration
pub mod leads {
    use super::{env_flag, env_non_empty};
    use once_cell::sync::Lazy;

    /// Gate lead submission on a channel subscription
    /// Default: false
    pub static SUBSCRIPTION_CHECK_ENABLED: Lazy<bool> = Lazy::new(|| env_flag("SUBSCRIPTION_CHECK_ENABLED", false));

    /// Channel users must join before submitting
    pub static SUBSCRIPTION_CHANNEL: Lazy<Option<String>> = Lazy::new(|| env_non_empty("SUBSCRIPTION_CHANNEL"));

    /// Allow only one submission per username across all sources
    /// Default: true
    pub static USER_SINGLE_SUBMISSION_ENFORCE: Lazy<bool> =
        Lazy::new(|| env_flag("USER_SINGLE_SUBMISSION_ENFORCE", true));

    /// UTM source used when /start carried no payload
    pub static UTM_SOURCE: Lazy<String> = Lazy::new(|| env_non_empty("UTM_SOURCE").unwrap_or_else(|| "default".to_string()));
}

/// Generation backend configuration
pub mod generation {
    use once_cell::sync::Lazy;
    use std::env;

    pub static API_URL: Lazy<String> =
        Lazy::new(|| env::var("GENERATION_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()));

    pub static API_KEY: Lazy<Option<String>> = Lazy::new(|| super::env_non_empty("GENERATION_API_KEY"));
}

/// Payment backend configuration
pub mod payment {
    use once_cell::sync::Lazy;
    use std::env;

    pub static API_URL: Lazy<String> =
        Lazy::new(|| env::var("PAYMENT_API_URL").unwrap_or_else(|_| "http://localhost:8081".to_string()));

    pub static API_KEY: Lazy<Option<String>> = Lazy::new(|| super::env_non_empty("PAYMENT_API_KEY"));

    /// Bank identifier sent with card payments
    pub const CARD_BANK: &str = "BANK131";

    pub const OFFER_URL: &str = "https://telegra.ph/Publichnaya-oferta-meemee";
    pub const PRIVACY_URL: &str = "https://telegra.ph/Politika-konfidencialnosti-meemee";
}

/// Referral program configuration
pub mod referral {
    use once_cell::sync::Lazy;
    use std::env;

    pub static ENABLED: Lazy<bool> = Lazy::new(|| super::env_flag("REFERRAL_ENABLED", true));

    /// Generations granted to both the inviter and the invited user
    pub static BONUS: Lazy<i64> =
        Lazy::new(|| env::var("REFERRAL_BONUS").ok().and_then(|v| v.parse().ok()).unwrap_or(1));

    /// Share of each paid order credited to the linked expert
    pub static EXPERT_CASHBACK_PERCENT: Lazy<i64> = Lazy::new(|| {
        env::var("EXPERT_CASHBACK_PERCENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20)
    });
}

/// Generation completion polling
pub mod poll {
    use super::Duration;

    /// Delay before every status query
    pub const INTERVAL_SECS: u64 = 3;

    /// Status queries before giving up and promising a later delivery
    pub const MAX_ATTEMPTS: u32 = 10;

    /// Interval of the background sweeper delivering late generations
    pub const SWEEP_INTERVAL_SECS: u64 = 30;

    pub fn interval() -> Duration {
        Duration::from_secs(INTERVAL_SECS)
    }

    pub fn sweep_interval() -> Duration {
        Duration::from_secs(SWEEP_INTERVAL_SECS)
    }
}

/// Catalog presentation
pub mod catalog {
    /// Memes per catalog page
    pub const PAGE_SIZE: usize = 6;

    /// Generations per history page
    pub const HISTORY_PAGE_SIZE: usize = 5;
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum number of retries for dispatcher reconnection
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher retry attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }

    /// Base for exponential backoff calculation
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Request timeout for generation and payment backends (in seconds)
    pub const BACKEND_TIMEOUT_SECS: u64 = 30;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    pub fn backend_timeout() -> Duration {
        Duration::from_secs(BACKEND_TIMEOUT_SECS)
    }
}
