//! Integration tests for generation polling, sweeping and the catalog dialog
//!
//! Run with: cargo test --test generation_flow_test

mod common;

use std::sync::Arc;

use common::*;
use meemee::conversation::{ConfirmOutcome, ConversationState, GenderOutcome, SelectOutcome, TextOutcome};
use meemee::core::types::{Gender, GenerationStatus};
use meemee::generation::{PendingGenerationSweeper, PollOutcome};
use meemee::storage::db;
use meemee::storage::generations::{self, NewGeneration};
use meemee::storage::get_connection;
use pretty_assertions::assert_eq;

const CHAT: i64 = 500;
const USER: i64 = 500;

fn store_generation(env: &TestEngine, id: &str) {
    let conn = get_connection(&env.pool).expect("connection");
    generations::create_generation(
        &conn,
        &NewGeneration {
            id: id.to_string(),
            user_id: USER,
            chat_id: CHAT,
            meme_id: Some("birthday_dance".to_string()),
            meme_name: Some("Танцующий именинник".to_string()),
            name: Some("Анна".to_string()),
            ..NewGeneration::default()
        },
    )
    .expect("create generation");
}

// ============================================================================
// Poller
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_poller_delivers_on_fourth_attempt() {
    let env = TestEngine::new(ScriptedGenerationApi::new(vec![
        pending(),
        pending(),
        pending(),
        done("https://cdn.example.com/out.mp4"),
    ]));
    add_user(&env.pool, USER, 0);
    store_generation(&env, "gen-a");

    let outcome = env.poller.await_completion("gen-a", CHAT).await;

    assert_eq!(outcome, PollOutcome::Delivered);
    assert_eq!(env.api.status_calls(), 4);
    assert_eq!(env.reporter.events(), vec![Reported::Video("gen-a".to_string())]);

    let conn = get_connection(&env.pool).expect("connection");
    let stored = generations::get_generation(&conn, "gen-a").expect("query").expect("row");
    assert_eq!(stored.status, GenerationStatus::Done);
    assert!(stored.delivered);
    assert_eq!(stored.telegram_file_id.as_deref(), Some("file-gen-a"));
    let user = db::get_user(&conn, USER).expect("query").expect("user");
    assert_eq!(user.successful_generations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_poller_gives_up_after_max_attempts() {
    let env = TestEngine::new(ScriptedGenerationApi::new(vec![pending()]));
    add_user(&env.pool, USER, 0);
    store_generation(&env, "gen-b");

    let outcome = env.poller.await_completion("gen-b", CHAT).await;

    assert_eq!(outcome, PollOutcome::StillProcessing);
    assert_eq!(env.api.status_calls(), 10);
    assert_eq!(
        env.reporter.events(),
        vec![Reported::StillProcessing("gen-b".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_generation_refunds_quota() {
    let env = TestEngine::new(ScriptedGenerationApi::new(vec![pending(), failed("E42")]));
    // Quota was already deducted when the request was accepted
    add_user(&env.pool, USER, 0);
    store_generation(&env, "gen-c");

    let outcome = env.poller.await_completion("gen-c", CHAT).await;

    assert_eq!(outcome, PollOutcome::Failed);
    assert_eq!(quota_of(&env.pool, USER), 1);
    assert_eq!(env.reporter.events(), vec![Reported::Failure("gen-c".to_string())]);

    let conn = get_connection(&env.pool).expect("connection");
    let user = db::get_user(&conn, USER).expect("query").expect("user");
    assert_eq!(user.failed_generations, 1);
    let stored = generations::get_generation(&conn, "gen-c").expect("query").expect("row");
    assert_eq!(stored.error_id.as_deref(), Some("E42"));
}

// ============================================================================
// Sweeper
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sweeper_delivers_late_result_once() {
    let env = TestEngine::new(ScriptedGenerationApi::new(vec![pending()]));
    add_user(&env.pool, USER, 0);
    store_generation(&env, "gen-d");

    assert_eq!(
        env.poller.await_completion("gen-d", CHAT).await,
        PollOutcome::StillProcessing
    );

    let sweeper = PendingGenerationSweeper::new(Arc::clone(&env.poller), Arc::clone(&env.pool));
    let report = sweeper.sweep_once().await.expect("sweep");
    assert_eq!(report.checked, 1);
    assert_eq!(report.delivered, 0);

    env.api.push(done("https://cdn.example.com/late.mp4"));
    let report = sweeper.sweep_once().await.expect("sweep");
    assert_eq!(report.delivered, 1);

    let report = sweeper.sweep_once().await.expect("sweep");
    assert_eq!(report.checked, 0);

    let videos = env
        .reporter
        .events()
        .into_iter()
        .filter(|e| matches!(e, Reported::Video(_)))
        .count();
    assert_eq!(videos, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_rotates_past_stuck_generations() {
    let env = TestEngine::new(ScriptedGenerationApi::new(vec![pending()]));
    add_user(&env.pool, USER, 0);
    for n in 0..4 {
        store_generation(&env, &format!("stuck-{}", n));
    }
    store_generation(&env, "fresh");
    env.api.set_status_for("fresh", done("https://cdn.example.com/fresh.mp4"));

    let sweeper = PendingGenerationSweeper::new(Arc::clone(&env.poller), Arc::clone(&env.pool)).with_batch_size(3);

    // Batch is full of stuck rows; the fresh one waits
    let report = sweeper.sweep_once().await.expect("sweep");
    assert_eq!(report.checked, 3);
    assert_eq!(report.delivered, 0);

    let report = sweeper.sweep_once().await.expect("sweep");
    assert_eq!(report.checked, 3);
    assert_eq!(report.delivered, 1);
    assert_eq!(env.reporter.events(), vec![Reported::Video("fresh".to_string())]);

    let conn = get_connection(&env.pool).expect("connection");
    let left = generations::list_undelivered(&conn, 10).expect("query");
    assert_eq!(left.len(), 4);
    assert!(left.iter().all(|g| g.id.starts_with("stuck-")));
}

#[tokio::test(start_paused = true)]
async fn test_finish_reports_only_once() {
    let env = TestEngine::new(ScriptedGenerationApi::default());
    add_user(&env.pool, USER, 0);
    store_generation(&env, "gen-e");

    let update = done("https://cdn.example.com/e.mp4");
    assert_eq!(env.poller.finish("gen-e", CHAT, &update).await, PollOutcome::Delivered);
    assert_eq!(env.poller.finish("gen-e", CHAT, &update).await, PollOutcome::Skipped);
    assert_eq!(env.reporter.events().len(), 1);
}

// ============================================================================
// Catalog dialog
// ============================================================================

async fn walk_to_confirmation(env: &TestEngine) {
    let profile = add_user(&env.pool, USER, 1);
    let selected = env.engine.select_meme(CHAT, USER, "birthday_dance").await.expect("select");
    assert!(matches!(selected, SelectOutcome::Selected(ref m) if m.id == "birthday_dance"));

    let outcome = env.engine.handle_text(CHAT, &profile, "Анна").await.expect("text");
    assert_eq!(
        outcome,
        TextOutcome::AskGender {
            name: "Анна".to_string()
        }
    );

    let gender = env.engine.choose_gender(CHAT, Gender::Female).await;
    assert_eq!(
        gender,
        GenderOutcome::Confirm {
            meme_name: "Танцующий именинник".to_string(),
            name: "Анна".to_string(),
            gender: Gender::Female,
        }
    );
    assert_eq!(
        env.sessions.get(CHAT).await.state(),
        ConversationState::AwaitingConfirmation
    );
}

#[tokio::test(start_paused = true)]
async fn test_confirm_starts_generation_and_deducts_quota() {
    let env = TestEngine::new(ScriptedGenerationApi::default());
    walk_to_confirmation(&env).await;
    let profile = meemee::storage::db::UserProfile::new(USER);

    let outcome = env.engine.confirm_generation(CHAT, &profile).await.expect("confirm");

    assert_eq!(
        outcome,
        ConfirmOutcome::Started {
            generation_id: "gen-1".to_string()
        }
    );
    assert_eq!(quota_of(&env.pool, USER), 0);
    assert_eq!(env.sessions.get(CHAT).await.state(), ConversationState::Idle);
    assert!(env.reporter.events().contains(&Reported::Started("gen-1".to_string())));

    let request = env.api.requests.lock().expect("lock")[0].clone();
    assert_eq!(request.meme_id.as_deref(), Some("birthday_dance"));
    assert_eq!(request.name.as_deref(), Some("Анна"));
    assert_eq!(request.gender, Some(Gender::Female));
}

#[tokio::test]
async fn test_rejected_creation_refunds_quota() {
    let env = TestEngine::new(ScriptedGenerationApi::rejecting());
    walk_to_confirmation(&env).await;
    let profile = meemee::storage::db::UserProfile::new(USER);

    let outcome = env.engine.confirm_generation(CHAT, &profile).await.expect("confirm");

    assert_eq!(outcome, ConfirmOutcome::CreationFailed);
    assert_eq!(quota_of(&env.pool, USER), 1);
    let conn = get_connection(&env.pool).expect("connection");
    assert_eq!(generations::count_by_user(&conn, USER).expect("count"), 0);
}

#[tokio::test]
async fn test_confirm_without_collected_data_resets_flow() {
    let env = TestEngine::new(ScriptedGenerationApi::default());
    let profile = add_user(&env.pool, USER, 1);

    let outcome = env.engine.confirm_generation(CHAT, &profile).await.expect("confirm");

    assert_eq!(outcome, ConfirmOutcome::MissingData);
    assert_eq!(quota_of(&env.pool, USER), 1);
}

#[tokio::test]
async fn test_select_meme_edge_cases() {
    let env = TestEngine::new(ScriptedGenerationApi::default());
    add_user(&env.pool, USER, 0);

    let soon = env.engine.select_meme(CHAT, USER, "dragon_fire").await.expect("select");
    assert!(matches!(soon, SelectOutcome::ComingSoon(_)));
    assert_eq!(
        env.engine.select_meme(CHAT, USER, "missing").await.expect("select"),
        SelectOutcome::NotFound
    );
    assert_eq!(
        env.engine.select_meme(CHAT, USER, "birthday_dance").await.expect("select"),
        SelectOutcome::NoQuota
    );
    assert_eq!(env.sessions.get(CHAT).await.state(), ConversationState::Idle);
}
