//! Integration tests for the lead-capture flow and lead exports
//!
//! Run with: cargo test --test leads_test

mod common;

use std::sync::Arc;

use common::*;
use meemee::core::export::{leads_to_csv, parse_leads_csv};
use meemee::core::types::MembershipStatus;
use meemee::core::utils::today_string;
use meemee::leads::{LeadFlow, LeadPolicy, LeadSubmission};
use meemee::storage::db::DbPool;
use meemee::storage::leads::{self, Lead};
use meemee::storage::{get_connection, InMemorySessionStore};
use pretty_assertions::assert_eq;

const CHAT: i64 = 300;
const USER: i64 = 300;

fn flow(policy: LeadPolicy, membership: Option<MembershipStatus>) -> (tempfile::TempDir, Arc<DbPool>, LeadFlow) {
    let (dir, pool) = test_pool();
    let flow = LeadFlow::new(
        policy,
        Arc::new(InMemorySessionStore::new()),
        Arc::clone(&pool),
        Arc::new(FakeMembership(membership)),
    );
    (dir, pool, flow)
}

fn stored(pool: &DbPool) -> Vec<Lead> {
    leads::list_all(&get_connection(pool).expect("connection")).expect("list")
}

#[tokio::test]
async fn test_name_is_normalized_and_saved_with_utm() {
    let (_dir, pool, flow) = flow(LeadPolicy::default(), None);

    flow.start(CHAT, "tiktok").await;
    let name = flow.propose_name(CHAT, "  анна-мария  ").await;
    assert_eq!(name.as_deref(), Some("Анна-Мария"));

    let submission = flow.confirm(CHAT, "@anna").await.expect("confirm");
    let expected = Lead {
        date: today_string(),
        utm_source: "tiktok".to_string(),
        username: "@anna".to_string(),
        video_generate_name: "Анна-Мария".to_string(),
    };
    assert_eq!(submission, LeadSubmission::Saved(expected.clone()));
    assert_eq!(stored(&pool), vec![expected]);
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let (_dir, _pool, flow) = flow(LeadPolicy::default(), None);
    assert_eq!(flow.propose_name(CHAT, "   ").await, None);
    assert_eq!(
        flow.confirm(CHAT, "@anna").await.expect("confirm"),
        LeadSubmission::NoPendingName
    );
}

#[tokio::test]
async fn test_default_utm_is_used_without_payload() {
    let (_dir, pool, flow) = flow(LeadPolicy::default().with_default_utm("organic"), None);

    flow.start(CHAT, "").await;
    flow.propose_name(CHAT, "олег").await;
    flow.confirm(CHAT, "id:300").await.expect("confirm");

    assert_eq!(stored(&pool)[0].utm_source, "organic");
}

#[tokio::test]
async fn test_single_submission_policy() {
    let (_dir, pool, flow) = flow(LeadPolicy::default(), None);

    flow.propose_name(CHAT, "олег").await;
    assert!(matches!(
        flow.confirm(CHAT, "@oleg").await.expect("confirm"),
        LeadSubmission::Saved(_)
    ));

    flow.start(CHAT, "another_campaign").await;
    flow.propose_name(CHAT, "олег второй").await;
    assert_eq!(
        flow.confirm(CHAT, "@oleg").await.expect("confirm"),
        LeadSubmission::AlreadySubmitted
    );
    assert_eq!(stored(&pool).len(), 1);
}

#[tokio::test]
async fn test_duplicate_pair_without_single_submission() {
    let (_dir, pool, flow) = flow(LeadPolicy::default().with_single_submission(false), None);

    flow.propose_name(CHAT, "олег").await;
    flow.confirm(CHAT, "@oleg").await.expect("confirm");
    flow.propose_name(CHAT, "олег снова").await;
    assert_eq!(
        flow.confirm(CHAT, "@oleg").await.expect("confirm"),
        LeadSubmission::Duplicate
    );

    flow.start(CHAT, "vk").await;
    flow.propose_name(CHAT, "олег").await;
    assert!(matches!(
        flow.confirm(CHAT, "@oleg").await.expect("confirm"),
        LeadSubmission::Saved(_)
    ));
    assert_eq!(stored(&pool).len(), 2);
}

#[tokio::test]
async fn test_rejected_name_is_forgotten() {
    let (_dir, _pool, flow) = flow(LeadPolicy::default(), None);

    flow.propose_name(CHAT, "олег").await;
    flow.reject_name(CHAT).await;
    assert_eq!(
        flow.confirm(CHAT, "@oleg").await.expect("confirm"),
        LeadSubmission::NoPendingName
    );
}

#[tokio::test]
async fn test_subscription_gate() {
    let policy = LeadPolicy::default().with_subscription_channel("@memes");

    let (_dir, pool, flow) = flow(policy.clone(), Some(MembershipStatus::Left));
    flow.propose_name(CHAT, "олег").await;
    assert_eq!(
        flow.confirm(CHAT, "@oleg").await.expect("confirm"),
        LeadSubmission::NeedsSubscription {
            channel: "@memes".to_string()
        }
    );
    assert_eq!(
        flow.check_subscription(CHAT, USER, "@oleg").await.expect("check"),
        LeadSubmission::NotSubscribed
    );
    assert!(stored(&pool).is_empty());

    let (_dir, pool, flow) = self::flow(policy, Some(MembershipStatus::Restricted));
    flow.propose_name(CHAT, "олег").await;
    assert!(matches!(
        flow.check_subscription(CHAT, USER, "@oleg").await.expect("check"),
        LeadSubmission::Saved(_)
    ));
    assert_eq!(stored(&pool).len(), 1);
}

#[tokio::test]
async fn test_membership_errors_count_as_not_subscribed() {
    for status in [Some(MembershipStatus::Kicked), None] {
        let (_dir, _pool, flow) = flow(LeadPolicy::default().with_subscription_channel("@memes"), status);
        flow.propose_name(CHAT, "олег").await;
        assert_eq!(
            flow.check_subscription(CHAT, USER, "@oleg").await.expect("check"),
            LeadSubmission::NotSubscribed
        );
    }
}

#[tokio::test]
async fn test_subscription_check_without_channel() {
    let (_dir, _pool, flow) = flow(LeadPolicy::default(), Some(MembershipStatus::Member));
    flow.propose_name(CHAT, "олег").await;
    assert_eq!(
        flow.check_subscription(CHAT, USER, "@oleg").await.expect("check"),
        LeadSubmission::NotConfigured
    );
}

#[test]
fn test_csv_export_survives_commas_and_quotes() {
    let rows = vec![
        Lead {
            date: "2024-05-01".to_string(),
            utm_source: "ads,spring".to_string(),
            username: "@anna".to_string(),
            video_generate_name: "Анна \"Солнце\"".to_string(),
        },
        Lead {
            date: "2024-05-02".to_string(),
            utm_source: "default".to_string(),
            username: "id:7".to_string(),
            video_generate_name: "Олег".to_string(),
        },
    ];

    let csv = leads_to_csv(&rows).expect("export");
    assert!(csv.starts_with("date,utm_source,username,video_generate_name\n"));
    assert!(csv.contains("\"ads,spring\""));
    assert_eq!(parse_leads_csv(&csv).expect("parse"), rows);
}

#[tokio::test]
async fn test_daily_statistics() {
    let (_dir, pool, flow) = flow(LeadPolicy::default(), None);
    for (chat, user) in [(1, "@a"), (2, "@b"), (3, "@c")] {
        flow.propose_name(chat, "имя").await;
        flow.confirm(chat, user).await.expect("confirm");
    }

    let conn = get_connection(&pool).expect("connection");
    let today = today_string();
    assert_eq!(leads::count_by_date(&conn, &today).expect("count"), 3);
    assert_eq!(leads::count_by_date(&conn, "2000-01-01").expect("count"), 0);
    let days = leads::all_dates(&conn).expect("dates");
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].count, 3);
    assert_eq!(leads::list_by_date(&conn, &today).expect("list").len(), 3);
}
