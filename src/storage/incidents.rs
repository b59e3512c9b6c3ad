use rusqlite::{params, Connection, OptionalExtension, Result};

/// Uncaught handler error recorded under a short identifier users can quote to support
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub id: String,
    pub source: String,
    pub message: String,
    pub user_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub created_at: String,
}

pub fn insert_incident(
    conn: &Connection,
    id: &str,
    source: &str,
    message: &str,
    user_id: Option<i64>,
    chat_id: Option<i64>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO incidents (id, source, message, user_id, chat_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, source, message, user_id, chat_id],
    )?;
    Ok(())
}

pub fn get_incident(conn: &Connection, id: &str) -> Result<Option<Incident>> {
    conn.query_row(
        "SELECT id, source, message, user_id, chat_id, created_at FROM incidents WHERE id = ?1",
        params![id],
        |row| {
            Ok(Incident {
                id: row.get(0)?,
                source: row.get(1)?,
                message: row.get(2)?,
                user_id: row.get(3)?,
                chat_id: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
    .optional()
}
