//! Incident logging
//!
//! Every error that escapes a handler is stored with a short identifier.
//! The user sees only that identifier; the details stay in the log and the database.

use crate::storage::db::{get_connection, DbPool};
use crate::storage::incidents;
use std::sync::Arc;

/// Where an incident happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentSource {
    Command,
    Callback,
    Message,
    InlineQuery,
    LeadBot,
    AdminBot,
}

impl IncidentSource {
    /// Returns the string identifier for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSource::Command => "command",
            IncidentSource::Callback => "callback",
            IncidentSource::Message => "message",
            IncidentSource::InlineQuery => "inline_query",
            IncidentSource::LeadBot => "lead_bot",
            IncidentSource::AdminBot => "admin_bot",
        }
    }
}

/// User context for incident logging
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub username: Option<String>,
}

impl UserContext {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Generates a short, human-quotable incident id (8 upper-case hex chars).
pub fn new_incident_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Error logger that stores incidents in the database
#[derive(Clone)]
pub struct ErrorLogger {
    db_pool: Arc<DbPool>,
}

impl ErrorLogger {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records an incident and returns its identifier.
    ///
    /// Storage failures are only logged; the identifier is returned regardless
    /// so the user always gets something to quote.
    pub fn record(&self, source: IncidentSource, error_message: &str, user: &UserContext) -> String {
        let id = new_incident_id();
        log::error!(
            "Incident {} [{}] user={:?} chat={:?}: {}",
            id,
            source.as_str(),
            user.user_id,
            user.chat_id,
            error_message
        );

        match get_connection(&self.db_pool) {
            Ok(conn) => {
                if let Err(e) = incidents::insert_incident(
                    &conn,
                    &id,
                    source.as_str(),
                    error_message,
                    user.user_id,
                    user.chat_id,
                ) {
                    log::error!("Failed to store incident {}: {}", id, e);
                }
            }
            Err(e) => log::error!("Failed to get DB connection for incident {}: {}", id, e),
        }

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_id_shape() {
        let id = new_incident_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(id, new_incident_id());
    }

    #[test]
    fn test_record_stores_incident() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("incidents.sqlite");
        let pool = Arc::new(crate::storage::create_pool(path.to_str().expect("utf-8 path")).expect("pool"));
        let logger = ErrorLogger::new(Arc::clone(&pool));
        let user = UserContext {
            user_id: Some(7),
            chat_id: None,
            username: Some("anna".to_string()),
        };

        let id = logger.record(IncidentSource::Callback, "boom", &user);

        let conn = crate::storage::get_connection(&pool).expect("connection");
        let stored = incidents::get_incident(&conn, &id).expect("query").expect("incident");
        assert_eq!(stored.source, "callback");
        assert_eq!(stored.message, "boom");
        assert_eq!(stored.user_id, Some(7));
        assert_eq!(stored.chat_id, None);
    }

    #[test]
    fn test_source_as_str() {
        assert_eq!(IncidentSource::InlineQuery.as_str(), "inline_query");
        assert_eq!(IncidentSource::LeadBot.as_str(), "lead_bot");
    }
}
