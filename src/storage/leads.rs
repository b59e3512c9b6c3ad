//! Lead submissions collected by the lead bot.

use rusqlite::{params, Connection, ErrorCode, Result};
use serde::{Deserialize, Serialize};

/// One submitted name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub date: String,
    pub utm_source: String,
    /// `@username` or `id:<telegram id>`
    pub username: String,
    pub video_generate_name: String,
}

/// Number of submissions for one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCount {
    pub date: String,
    pub count: i64,
}

/// Inserts a lead unless the (utm_source, username) pair already exists.
///
/// A duplicate is reported as `Ok(false)`, never as an error, and leaves the stored row untouched.
pub fn add_lead(conn: &Connection, lead: &Lead) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO leads (utm_source, date, username, video_generate_name) VALUES (?1, ?2, ?3, ?4)",
        params![lead.utm_source, lead.date, lead.username, lead.video_generate_name],
    );

    match result {
        Ok(inserted) => Ok(inserted > 0),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => Ok(false),
        Err(e) => Err(e),
    }
}

/// Whether this username submitted anything under any source.
pub fn has_any_submission(conn: &Connection, username: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM leads WHERE username = ?1)",
        params![username],
        |row| row.get(0),
    )
}

pub fn count_by_date(conn: &Connection, date: &str) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM leads WHERE date = ?1", params![date], |row| row.get(0))
}

fn map_lead(row: &rusqlite::Row<'_>) -> Result<Lead> {
    Ok(Lead {
        date: row.get(0)?,
        utm_source: row.get(1)?,
        username: row.get(2)?,
        video_generate_name: row.get(3)?,
    })
}

pub fn list_by_date(conn: &Connection, date: &str) -> Result<Vec<Lead>> {
    let mut stmt = conn.prepare(
        "SELECT date, utm_source, username, video_generate_name FROM leads WHERE date = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![date], map_lead)?;
    rows.collect()
}

pub fn list_all(conn: &Connection) -> Result<Vec<Lead>> {
    let mut stmt =
        conn.prepare("SELECT date, utm_source, username, video_generate_name FROM leads ORDER BY date ASC, id ASC")?;
    let rows = stmt.query_map([], map_lead)?;
    rows.collect()
}

/// Submission counts per day, newest day first.
pub fn all_dates(conn: &Connection) -> Result<Vec<DateCount>> {
    let mut stmt = conn.prepare("SELECT date, COUNT(*) FROM leads GROUP BY date ORDER BY date DESC")?;
    let rows = stmt.query_map([], |row| {
        Ok(DateCount {
            date: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::run_migrations_for_test;
    use pretty_assertions::assert_eq;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations_for_test(&mut conn).unwrap();
        conn
    }

    fn lead(utm: &str, username: &str, name: &str, date: &str) -> Lead {
        Lead {
            date: date.to_string(),
            utm_source: utm.to_string(),
            username: username.to_string(),
            video_generate_name: name.to_string(),
        }
    }

    #[test]
    fn test_duplicate_is_not_inserted() {
        let conn = setup();
        assert!(add_lead(&conn, &lead("tiktok", "@anna", "Анна", "2024-05-01")).unwrap());
        assert!(!add_lead(&conn, &lead("tiktok", "@anna", "Другое", "2024-05-02")).unwrap());

        let all = list_all(&conn).unwrap();
        assert_eq!(all, vec![lead("tiktok", "@anna", "Анна", "2024-05-01")]);
    }

    #[test]
    fn test_same_user_other_source_is_inserted() {
        let conn = setup();
        assert!(add_lead(&conn, &lead("tiktok", "@anna", "Анна", "2024-05-01")).unwrap());
        assert!(add_lead(&conn, &lead("vk", "@anna", "Анна", "2024-05-01")).unwrap());
        assert!(has_any_submission(&conn, "@anna").unwrap());
        assert!(!has_any_submission(&conn, "@boris").unwrap());
    }

    #[test]
    fn test_counts_and_dates() {
        let conn = setup();
        add_lead(&conn, &lead("a", "@1", "Один", "2024-05-01")).unwrap();
        add_lead(&conn, &lead("a", "@2", "Два", "2024-05-01")).unwrap();
        add_lead(&conn, &lead("a", "@3", "Три", "2024-05-02")).unwrap();

        assert_eq!(count_by_date(&conn, "2024-05-01").unwrap(), 2);
        assert_eq!(list_by_date(&conn, "2024-05-02").unwrap().len(), 1);
        assert_eq!(
            all_dates(&conn).unwrap(),
            vec![
                DateCount {
                    date: "2024-05-02".to_string(),
                    count: 1
                },
                DateCount {
                    date: "2024-05-01".to_string(),
                    count: 2
                },
            ]
        );
    }
}
