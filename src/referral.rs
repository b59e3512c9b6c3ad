//! /start payloads: referral links, expert links and campaign tags.

use rusqlite::Connection;

use crate::storage::db;

/// What a /start payload means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPayload {
    /// `ref_<inviter id>`
    Referral(i64),
    /// `expert_<expert id>`
    Expert(i64),
    /// `create`: open the catalog right away
    Create,
    /// Anything else is kept as a UTM source
    Utm(String),
    Empty,
}

impl StartPayload {
    pub fn parse(payload: &str) -> Self {
        let payload = payload.trim();
        if payload.is_empty() {
            return Self::Empty;
        }
        if payload == "create" {
            return Self::Create;
        }
        if let Some(id) = payload.strip_prefix("ref_").and_then(|id| id.parse().ok()) {
            return Self::Referral(id);
        }
        if let Some(id) = payload.strip_prefix("expert_").and_then(|id| id.parse().ok()) {
            return Self::Expert(id);
        }
        Self::Utm(payload.to_string())
    }
}

/// Result of applying a referral or expert link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Both users received `bonus` generations
    Referred { referrer_id: i64, bonus: i64 },
    ExpertLinked { expert_id: i64 },
    Ignored,
}

/// Links a new user to the inviter and grants both the bonus.
///
/// Only new users can be referred; the link is applied once and never to oneself.
pub fn apply_referral(
    conn: &Connection,
    user_id: i64,
    referrer_id: i64,
    is_new_user: bool,
    bonus: i64,
) -> rusqlite::Result<LinkOutcome> {
    if !is_new_user {
        return Ok(LinkOutcome::Ignored);
    }
    let tx = conn.unchecked_transaction()?;
    if !db::set_referrer(&tx, user_id, referrer_id)? {
        return Ok(LinkOutcome::Ignored);
    }
    db::add_quota(&tx, user_id, bonus)?;
    db::add_quota(&tx, referrer_id, bonus)?;
    tx.commit()?;

    log::info!("User {} referred by {} (+{} each)", user_id, referrer_id, bonus);
    Ok(LinkOutcome::Referred { referrer_id, bonus })
}

/// Attaches the user to an expert, once.
pub fn apply_expert(conn: &Connection, user_id: i64, expert_id: i64) -> rusqlite::Result<LinkOutcome> {
    if db::set_expert(conn, user_id, expert_id)? {
        log::info!("User {} linked to expert {}", user_id, expert_id);
        Ok(LinkOutcome::ExpertLinked { expert_id })
    } else {
        Ok(LinkOutcome::Ignored)
    }
}

/// Deep link carrying `payload`
pub fn start_link(bot_username: &str, payload: &str) -> String {
    format!("https://t.me/{}?start={}", bot_username.trim_start_matches('@'), payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::UserProfile;
    use crate::storage::migrations::run_migrations_for_test;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations_for_test(&mut conn).unwrap();
        db::create_user(&conn, &UserProfile::new(1), 1).unwrap();
        db::create_user(&conn, &UserProfile::new(2), 1).unwrap();
        conn
    }

    #[test]
    fn test_parse_payload() {
        assert_eq!(StartPayload::parse("ref_42"), StartPayload::Referral(42));
        assert_eq!(StartPayload::parse("expert_7"), StartPayload::Expert(7));
        assert_eq!(StartPayload::parse("create"), StartPayload::Create);
        assert_eq!(StartPayload::parse("ref_abc"), StartPayload::Utm("ref_abc".to_string()));
        assert_eq!(StartPayload::parse("  "), StartPayload::Empty);
    }

    #[test]
    fn test_referral_grants_bonus_once() {
        let conn = setup();
        assert_eq!(
            apply_referral(&conn, 2, 1, true, 2).unwrap(),
            LinkOutcome::Referred { referrer_id: 1, bonus: 2 }
        );
        assert_eq!(apply_referral(&conn, 2, 1, true, 2).unwrap(), LinkOutcome::Ignored);
        assert_eq!(db::get_user(&conn, 1).unwrap().unwrap().quota, 3);
        assert_eq!(db::get_user(&conn, 2).unwrap().unwrap().quota, 3);
    }

    #[test]
    fn test_existing_user_and_self_referral_are_ignored() {
        let conn = setup();
        assert_eq!(apply_referral(&conn, 2, 1, false, 1).unwrap(), LinkOutcome::Ignored);
        assert_eq!(apply_referral(&conn, 1, 1, true, 1).unwrap(), LinkOutcome::Ignored);
        assert_eq!(db::get_user(&conn, 1).unwrap().unwrap().quota, 1);
    }

    #[test]
    fn test_expert_link() {
        let conn = setup();
        assert_eq!(
            apply_expert(&conn, 2, 1).unwrap(),
            LinkOutcome::ExpertLinked { expert_id: 1 }
        );
        assert_eq!(apply_expert(&conn, 2, 1).unwrap(), LinkOutcome::Ignored);
        assert_eq!(start_link("@meemee_bot", "expert_1"), "https://t.me/meemee_bot?start=expert_1");
    }
}
