//! MeeMee - Telegram bots for personalized meme videos
//!
//! Two bots share this library: a lead-capture bot (with an admin bot for
//! statistics and CSV exports) and a commerce bot that sells and runs video
//! generations.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, validation and shared helpers
//! - `storage`: SQLite pool, migrations and repositories
//! - `conversation`: per-chat sessions and the generation dialog
//! - `generation`: generation backend client, completion polling and sweeping
//! - `payments`: packages, payment provider client and crediting
//! - `telegram`: bot construction, keyboards, texts and dispatcher schemas

#![allow(clippy::too_many_arguments)]

pub mod catalog;
pub mod cli;
pub mod conversation;
pub mod core;
pub mod generation;
pub mod leads;
pub mod payments;
pub mod referral;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
