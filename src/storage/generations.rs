//! Generation records: one row per accepted generation request.

use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::core::types::{Gender, GenerationStatus};

/// Stored generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Identifier assigned by the generation backend
    pub id: String,
    pub user_id: i64,
    pub chat_id: i64,
    pub meme_id: Option<String>,
    pub meme_name: Option<String>,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub custom_prompt: Option<String>,
    pub status: GenerationStatus,
    /// Set only once the status is `Done`
    pub video_url: Option<String>,
    /// Set only once the status is `Failed`
    pub error_id: Option<String>,
    pub telegram_file_id: Option<String>,
    /// Result (or failure) was already reported to the user
    pub delivered: bool,
    pub created_at: String,
}

impl Generation {
    /// Title used in history and inline results.
    pub fn title(&self) -> &str {
        self.meme_name
            .as_deref()
            .or(self.custom_prompt.as_ref().map(|_| "Свой промпт"))
            .unwrap_or("Видео")
    }
}

/// Fields known when a generation is accepted
#[derive(Debug, Clone, Default)]
pub struct NewGeneration {
    pub id: String,
    pub user_id: i64,
    pub chat_id: i64,
    pub meme_id: Option<String>,
    pub meme_name: Option<String>,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub custom_prompt: Option<String>,
}

/// Status update coming from the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: GenerationStatus,
    pub video_url: Option<String>,
    pub error_id: Option<String>,
    pub telegram_file_id: Option<String>,
}

const GENERATION_COLUMNS: &str = "id, user_id, chat_id, meme_id, meme_name, name, gender, custom_prompt, status, \
     video_url, error_id, telegram_file_id, delivered, created_at";

fn map_generation(row: &rusqlite::Row<'_>) -> Result<Generation> {
    Ok(Generation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        chat_id: row.get(2)?,
        meme_id: row.get(3)?,
        meme_name: row.get(4)?,
        name: row.get(5)?,
        gender: row.get(6)?,
        custom_prompt: row.get(7)?,
        status: row.get(8)?,
        video_url: row.get(9)?,
        error_id: row.get(10)?,
        telegram_file_id: row.get(11)?,
        delivered: row.get::<_, i64>(12)? != 0,
        created_at: row.get(13)?,
    })
}

/// Inserts a new pending generation.
pub fn create_generation(conn: &Connection, new: &NewGeneration) -> Result<()> {
    conn.execute(
        "INSERT INTO generations (id, user_id, chat_id, meme_id, meme_name, name, gender, custom_prompt, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending')",
        params![
            new.id,
            new.user_id,
            new.chat_id,
            new.meme_id,
            new.meme_name,
            new.name,
            new.gender,
            new.custom_prompt
        ],
    )?;
    Ok(())
}

pub fn get_generation(conn: &Connection, id: &str) -> Result<Option<Generation>> {
    conn.query_row(
        &format!("SELECT {} FROM generations WHERE id = ?1", GENERATION_COLUMNS),
        params![id],
        map_generation,
    )
    .optional()
}

/// Generations of a user, newest first.
pub fn list_by_user(conn: &Connection, user_id: i64, limit: usize, offset: usize) -> Result<Vec<Generation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM generations WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        GENERATION_COLUMNS
    ))?;
    let rows = stmt.query_map(params![user_id, limit as i64, offset as i64], map_generation)?;
    rows.collect()
}

pub fn count_by_user(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM generations WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

/// Most recent finished generation with a video, optionally a specific one.
pub fn find_shareable(conn: &Connection, user_id: i64, id: Option<&str>) -> Result<Option<Generation>> {
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        let found = conn
            .query_row(
                &format!(
                    "SELECT {} FROM generations
                     WHERE user_id = ?1 AND id = ?2 AND status = 'done' AND video_url IS NOT NULL",
                    GENERATION_COLUMNS
                ),
                params![user_id, id],
                map_generation,
            )
            .optional()?;
        if found.is_some() {
            return Ok(found);
        }
    }

    conn.query_row(
        &format!(
            "SELECT {} FROM generations
             WHERE user_id = ?1 AND status = 'done' AND video_url IS NOT NULL
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            GENERATION_COLUMNS
        ),
        params![user_id],
        map_generation,
    )
    .optional()
}

/// Generations that still need a status refresh or a delivery.
///
/// Rows never checked come first, then the ones checked longest ago, so a
/// batch full of stuck generations cannot hide newer ones.
pub fn list_undelivered(conn: &Connection, limit: usize) -> Result<Vec<Generation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM generations WHERE delivered = 0
         ORDER BY check_round ASC, created_at ASC, rowid ASC LIMIT ?1",
        GENERATION_COLUMNS
    ))?;
    let rows = stmt.query_map(params![limit as i64], map_generation)?;
    rows.collect()
}

/// Applies a backend status update.
///
/// A stored terminal status is never overwritten. Returns `true` if the row changed.
pub fn update_status(conn: &Connection, id: &str, update: &StatusUpdate) -> Result<bool> {
    let Some(current) = get_generation(conn, id)? else {
        return Ok(false);
    };
    if !current.status.can_transition_to(update.status) || current.status.is_terminal() {
        // Only a late telegram file id may still be attached to a finished video
        if current.status == GenerationStatus::Done && update.telegram_file_id.is_some() {
            return set_telegram_file_id(conn, id, update.telegram_file_id.as_deref().unwrap_or_default());
        }
        return Ok(false);
    }

    let (video_url, error_id) = match update.status {
        GenerationStatus::Done => (update.video_url.clone(), None),
        GenerationStatus::Failed => (None, update.error_id.clone()),
        GenerationStatus::Pending => (None, None),
    };

    let updated = conn.execute(
        "UPDATE generations
         SET status = ?2, video_url = ?3, error_id = ?4, telegram_file_id = COALESCE(?5, telegram_file_id)
         WHERE id = ?1 AND status = 'pending'",
        params![id, update.status, video_url, error_id, update.telegram_file_id],
    )?;
    Ok(updated > 0)
}

/// Moves a generation to the back of the sweep rotation.
pub fn mark_checked(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE generations
         SET check_round = (SELECT COALESCE(MAX(check_round), 0) + 1 FROM generations)
         WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

pub fn set_telegram_file_id(conn: &Connection, id: &str, file_id: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE generations SET telegram_file_id = ?2 WHERE id = ?1",
        params![id, file_id],
    )?;
    Ok(updated > 0)
}

/// Marks a terminal generation as reported to the user.
///
/// Only one caller ever gets `true` for a given generation, which keeps the
/// inline poller and the background sweeper from both delivering it.
pub fn claim_delivery(conn: &Connection, id: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE generations SET delivered = 1 WHERE id = ?1 AND delivered = 0 AND status != 'pending'",
        params![id],
    )?;
    Ok(updated > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::run_migrations_for_test;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations_for_test(&mut conn).unwrap();
        conn
    }

    fn new_generation(id: &str) -> NewGeneration {
        NewGeneration {
            id: id.to_string(),
            user_id: 1,
            chat_id: 1,
            meme_id: Some("dance".to_string()),
            meme_name: Some("Танец".to_string()),
            name: Some("Маша".to_string()),
            gender: Some(Gender::Female),
            custom_prompt: None,
        }
    }

    fn done(url: &str) -> StatusUpdate {
        StatusUpdate {
            status: GenerationStatus::Done,
            video_url: Some(url.to_string()),
            ..StatusUpdate::default()
        }
    }

    #[test]
    fn test_create_and_get() {
        let conn = setup();
        create_generation(&conn, &new_generation("g1")).unwrap();
        let generation = get_generation(&conn, "g1").unwrap().unwrap();
        assert_eq!(generation.status, GenerationStatus::Pending);
        assert_eq!(generation.gender, Some(Gender::Female));
        assert!(!generation.delivered);
    }

    #[test]
    fn test_terminal_status_is_not_overwritten() {
        let conn = setup();
        create_generation(&conn, &new_generation("g1")).unwrap();
        assert!(update_status(&conn, "g1", &done("https://cdn/v.mp4")).unwrap());

        let failed = StatusUpdate {
            status: GenerationStatus::Failed,
            error_id: Some("E1".to_string()),
            ..StatusUpdate::default()
        };
        assert!(!update_status(&conn, "g1", &failed).unwrap());

        let generation = get_generation(&conn, "g1").unwrap().unwrap();
        assert_eq!(generation.status, GenerationStatus::Done);
        assert_eq!(generation.video_url.as_deref(), Some("https://cdn/v.mp4"));
        assert_eq!(generation.error_id, None);
    }

    #[test]
    fn test_failed_has_no_video_url() {
        let conn = setup();
        create_generation(&conn, &new_generation("g1")).unwrap();
        let update = StatusUpdate {
            status: GenerationStatus::Failed,
            video_url: Some("https://ignored".to_string()),
            error_id: Some("E42".to_string()),
            telegram_file_id: None,
        };
        assert!(update_status(&conn, "g1", &update).unwrap());
        let generation = get_generation(&conn, "g1").unwrap().unwrap();
        assert_eq!(generation.video_url, None);
        assert_eq!(generation.error_id.as_deref(), Some("E42"));
    }

    #[test]
    fn test_claim_delivery_once() {
        let conn = setup();
        create_generation(&conn, &new_generation("g1")).unwrap();
        assert!(!claim_delivery(&conn, "g1").unwrap(), "pending cannot be claimed");
        update_status(&conn, "g1", &done("https://cdn/v.mp4")).unwrap();
        assert!(claim_delivery(&conn, "g1").unwrap());
        assert!(!claim_delivery(&conn, "g1").unwrap());
        assert!(list_undelivered(&conn, 10).unwrap().is_empty());
    }

    #[test]
    fn test_checked_rows_go_to_the_back() {
        let conn = setup();
        for id in ["g1", "g2", "g3"] {
            create_generation(&conn, &new_generation(id)).unwrap();
        }

        mark_checked(&conn, "g1").unwrap();
        mark_checked(&conn, "g2").unwrap();
        let ids: Vec<String> = list_undelivered(&conn, 10).unwrap().into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec!["g3", "g1", "g2"]);

        mark_checked(&conn, "g3").unwrap();
        mark_checked(&conn, "g1").unwrap();
        let first = list_undelivered(&conn, 1).unwrap();
        assert_eq!(first[0].id, "g2");
    }

    #[test]
    fn test_find_shareable_prefers_requested_id() {
        let conn = setup();
        create_generation(&conn, &new_generation("g1")).unwrap();
        create_generation(&conn, &new_generation("g2")).unwrap();
        create_generation(&conn, &new_generation("g3")).unwrap();
        update_status(&conn, "g1", &done("https://cdn/1.mp4")).unwrap();
        update_status(&conn, "g2", &done("https://cdn/2.mp4")).unwrap();

        let requested = find_shareable(&conn, 1, Some("g1")).unwrap().unwrap();
        assert_eq!(requested.id, "g1");

        let latest = find_shareable(&conn, 1, Some("g3")).unwrap().unwrap();
        assert_eq!(latest.id, "g2");

        assert!(find_shareable(&conn, 2, None).unwrap().is_none());
    }

    #[test]
    fn test_list_by_user_newest_first() {
        let conn = setup();
        create_generation(&conn, &new_generation("g1")).unwrap();
        create_generation(&conn, &new_generation("g2")).unwrap();
        let page = list_by_user(&conn, 1, 10, 0).unwrap();
        assert_eq!(page.iter().map(|g| g.id.as_str()).collect::<Vec<_>>(), vec!["g2", "g1"]);
        assert_eq!(count_by_user(&conn, 1).unwrap(), 2);
        assert_eq!(list_by_user(&conn, 1, 1, 1).unwrap()[0].id, "g1");
    }
}
