//! Session stores keyed by chat id.
//!
//! The lead bot keeps sessions in memory (lost on restart); the commerce bot
//! persists them as JSON rows so a restart does not break a half-finished flow.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;

use crate::conversation::session::{Session, SessionField, SessionPatch};
use crate::core::error::AppResult;
use crate::storage::db::{get_connection, DbPool};

/// Storage for per-chat sessions.
///
/// `get` never fails: an absent or unreadable session is returned empty.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, chat_id: i64) -> Session;

    /// Merges `patch` into the stored session, creating it if needed.
    async fn set(&self, chat_id: i64, patch: SessionPatch);

    /// Removes one field.
    async fn clear(&self, chat_id: i64, field: SessionField);

    async fn clear_many(&self, chat_id: i64, fields: &[SessionField]) {
        for field in fields {
            self.clear(chat_id, *field).await;
        }
    }
}

/// Process-local session store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<i64, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, chat_id: i64) -> Session {
        self.sessions.lock().await.get(&chat_id).cloned().unwrap_or_default()
    }

    async fn set(&self, chat_id: i64, patch: SessionPatch) {
        self.sessions.lock().await.entry(chat_id).or_default().apply(patch);
    }

    async fn clear(&self, chat_id: i64, field: SessionField) {
        if let Some(session) = self.sessions.lock().await.get_mut(&chat_id) {
            session.clear(field);
        }
    }
}

/// SQLite-backed session store (one JSON document per chat)
pub struct SqliteSessionStore {
    db_pool: Arc<DbPool>,
}

impl SqliteSessionStore {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    fn load(&self, chat_id: i64) -> AppResult<Session> {
        let conn = get_connection(&self.db_pool)?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM sessions WHERE chat_id = ?1",
                params![chat_id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Session::default()),
        }
    }

    fn save(&self, chat_id: i64, session: &Session) -> AppResult<()> {
        let conn = get_connection(&self.db_pool)?;
        let json = serde_json::to_string(session)?;
        conn.execute(
            "INSERT INTO sessions (chat_id, data, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(chat_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![chat_id, json],
        )?;
        Ok(())
    }

    fn load_or_reset(&self, chat_id: i64) -> Session {
        match self.load(chat_id) {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Session for chat {} is unreadable, starting fresh: {}", chat_id, e);
                Session::default()
            }
        }
    }

    fn update(&self, chat_id: i64, change: impl FnOnce(&mut Session)) {
        let mut session = self.load_or_reset(chat_id);
        change(&mut session);
        if let Err(e) = self.save(chat_id, &session) {
            log::error!("Failed to save session for chat {}: {}", chat_id, e);
        }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, chat_id: i64) -> Session {
        self.load_or_reset(chat_id)
    }

    async fn set(&self, chat_id: i64, patch: SessionPatch) {
        self.update(chat_id, |session| session.apply(patch));
    }

    async fn clear(&self, chat_id: i64, field: SessionField) {
        self.update(chat_id, |session| session.clear(field));
    }

    async fn clear_many(&self, chat_id: i64, fields: &[SessionField]) {
        self.update(chat_id, |session| {
            for field in fields {
                session.clear(*field);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WaitingFor;

    #[tokio::test]
    async fn test_in_memory_get_creates_empty() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get(1).await, Session::default());
    }

    #[tokio::test]
    async fn test_in_memory_set_and_clear() {
        let store = InMemorySessionStore::new();
        store.set(1, SessionPatch::waiting_for(WaitingFor::Name)).await;
        store
            .set(
                1,
                SessionPatch {
                    meme_id: Some("dance".to_string()),
                    ..SessionPatch::default()
                },
            )
            .await;
        store.set(1, SessionPatch::waiting_for(WaitingFor::CustomPrompt)).await;

        let session = store.get(1).await;
        assert_eq!(session.waiting_for, Some(WaitingFor::CustomPrompt));
        assert_eq!(session.meme_id.as_deref(), Some("dance"));

        store.clear(1, SessionField::MemeId).await;
        assert_eq!(store.get(1).await.meme_id, None);
        assert_eq!(store.get(2).await, Session::default());
    }
}
