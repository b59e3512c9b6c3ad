use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::core::error::{AppError, AppResult};
use crate::storage::migrations;

/// Структура, представляющая пользователя коммерческого бота.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Telegram ID пользователя
    pub telegram_id: i64,
    /// Имя пользователя (username) в Telegram, если доступно
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Оставшиеся генерации, никогда не бывает отрицательным
    pub quota: i64,
    pub successful_generations: i64,
    pub failed_generations: i64,
    /// Кто пригласил пользователя по ссылке `ref_<id>`
    pub referred_by: Option<i64>,
    /// Эксперт, получающий кэшбэк с оплат пользователя
    pub expert_id: Option<i64>,
    /// Накопленный кэшбэк эксперта (в рублях)
    pub expert_balance: i64,
    pub created_at: String,
}

impl User {
    /// Как обращаться к пользователю в сообщениях.
    pub fn display_name(&self) -> String {
        match (&self.username, &self.first_name) {
            (Some(username), _) => format!("@{}", username),
            (None, Some(first_name)) => first_name.clone(),
            (None, None) => format!("id:{}", self.telegram_id),
        }
    }
}

/// Profile fields taken from a Telegram update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserProfile {
    pub fn new(telegram_id: i64) -> Self {
        Self {
            telegram_id,
            ..Self::default()
        }
    }

    pub fn from_telegram(user: &teloxide::types::User) -> Self {
        Self {
            telegram_id: i64::try_from(user.id.0).unwrap_or_default(),
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections in WAL mode and
/// applies the embedded schema migrations.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Example
///
/// ```no_run
/// use meemee::storage::db;
///
/// let pool = db::create_pool("data/meemee.sqlite")?;
/// # Ok::<(), meemee::core::error::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    if let Some(parent) = std::path::Path::new(database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|c| c.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;"));
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    let mut conn = pool.get()?;
    migrations::run_migrations(&mut conn).map_err(AppError::Anyhow)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

fn map_user(row: &rusqlite::Row<'_>) -> Result<User> {
    Ok(User {
        telegram_id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        quota: row.get(4)?,
        successful_generations: row.get(5)?,
        failed_generations: row.get(6)?,
        referred_by: row.get(7)?,
        expert_id: row.get(8)?,
        expert_balance: row.get(9)?,
        created_at: row.get(10)?,
    })
}

const USER_COLUMNS: &str = "telegram_id, username, first_name, last_name, quota, successful_generations, \
     failed_generations, referred_by, expert_id, expert_balance, created_at";

/// Получает пользователя по Telegram ID.
///
/// Возвращает `Ok(None)`, если пользователь ещё не создан.
pub fn get_user(conn: &Connection, telegram_id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE telegram_id = ?1", USER_COLUMNS),
        params![telegram_id],
        map_user,
    )
    .optional()
}

/// Создаёт пользователя со стартовой квотой.
///
/// Returns `true` when a new row was inserted, `false` if the user already existed.
pub fn create_user(conn: &Connection, profile: &UserProfile, initial_quota: i64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO users (telegram_id, username, first_name, last_name, quota)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            profile.telegram_id,
            profile.username,
            profile.first_name,
            profile.last_name,
            initial_quota.max(0)
        ],
    )?;
    Ok(inserted > 0)
}

/// Refreshes username and names if any of them changed.
///
/// Returns `true` if the row was updated.
pub fn update_profile(conn: &Connection, profile: &UserProfile) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE users SET username = ?2, first_name = ?3, last_name = ?4
         WHERE telegram_id = ?1
           AND (username IS NOT ?2 OR first_name IS NOT ?3 OR last_name IS NOT ?4)",
        params![
            profile.telegram_id,
            profile.username,
            profile.first_name,
            profile.last_name
        ],
    )?;
    Ok(updated > 0)
}

/// Списывает одну генерацию.
///
/// Single conditional statement, so the balance never goes below zero.
/// Fails with [`AppError::InsufficientQuota`] when nothing is left (or the user is unknown).
pub fn deduct_quota(conn: &Connection, telegram_id: i64) -> AppResult<()> {
    let updated = conn.execute(
        "UPDATE users SET quota = quota - 1 WHERE telegram_id = ?1 AND quota > 0",
        params![telegram_id],
    )?;
    if updated == 0 {
        return Err(AppError::InsufficientQuota(telegram_id));
    }
    Ok(())
}

/// Возвращает одну генерацию после неудачи.
pub fn refund_quota(conn: &Connection, telegram_id: i64) -> Result<()> {
    add_quota(conn, telegram_id, 1)
}

/// Начисляет генерации (оплата, реферальный бонус).
pub fn add_quota(conn: &Connection, telegram_id: i64, amount: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET quota = quota + ?2 WHERE telegram_id = ?1",
        params![telegram_id, amount.max(0)],
    )?;
    Ok(())
}

pub fn increment_successful_generations(conn: &Connection, telegram_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET successful_generations = successful_generations + 1 WHERE telegram_id = ?1",
        params![telegram_id],
    )?;
    Ok(())
}

pub fn increment_failed_generations(conn: &Connection, telegram_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET failed_generations = failed_generations + 1 WHERE telegram_id = ?1",
        params![telegram_id],
    )?;
    Ok(())
}

/// Привязывает пользователя к пригласившему.
///
/// Only the first link counts and self-invites are ignored. Returns `true` if linked.
pub fn set_referrer(conn: &Connection, telegram_id: i64, referrer_id: i64) -> Result<bool> {
    if telegram_id == referrer_id {
        return Ok(false);
    }
    let updated = conn.execute(
        "UPDATE users SET referred_by = ?2
         WHERE telegram_id = ?1 AND referred_by IS NULL
           AND EXISTS (SELECT 1 FROM users WHERE telegram_id = ?2)",
        params![telegram_id, referrer_id],
    )?;
    Ok(updated > 0)
}

/// Привязывает пользователя к эксперту. Returns `true` if linked.
pub fn set_expert(conn: &Connection, telegram_id: i64, expert_id: i64) -> Result<bool> {
    if telegram_id == expert_id {
        return Ok(false);
    }
    let updated = conn.execute(
        "UPDATE users SET expert_id = ?2
         WHERE telegram_id = ?1 AND expert_id IS NULL
           AND EXISTS (SELECT 1 FROM users WHERE telegram_id = ?2)",
        params![telegram_id, expert_id],
    )?;
    Ok(updated > 0)
}

pub fn add_expert_balance(conn: &Connection, expert_id: i64, amount: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET expert_balance = expert_balance + ?2 WHERE telegram_id = ?1",
        params![expert_id, amount],
    )?;
    Ok(())
}

/// Количество пользователей, приглашённых данным пользователем.
pub fn count_referrals(conn: &Connection, referrer_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE referred_by = ?1",
        params![referrer_id],
        |row| row.get(0),
    )
}

/// Количество клиентов эксперта.
pub fn count_expert_clients(conn: &Connection, expert_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE expert_id = ?1",
        params![expert_id],
        |row| row.get(0),
    )
}
