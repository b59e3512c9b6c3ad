//! Telegram bot integration and handlers

pub mod bot;
pub mod callback;
pub mod handlers;
pub mod keyboards;
pub mod leads;
pub mod notifications;
pub mod reporter;
pub mod texts;

// Re-exports for convenience
pub use bot::{create_bot, create_bot_with_token, setup_admin_commands, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use leads::{admin_schema, lead_schema, AdminDeps, LeadDeps};
pub use notifications::AdminNotifier;
pub use reporter::TelegramReporter;
pub use teloxide::Bot;
