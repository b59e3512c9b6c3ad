//! Common test utilities
//!
//! Shared fakes for the generation backend, the payment provider, the
//! result reporter and channel membership, plus a temporary database.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use meemee::catalog::Catalog;
use meemee::conversation::ConversationEngine;
use meemee::core::error::{AppError, AppResult};
use meemee::core::subscription::MembershipLookup;
use meemee::core::types::{GenerationStatus, MembershipStatus, OrderStatus};
use meemee::generation::{GenerationApi, GenerationPoller, GenerationRequest, PollPolicy, ResultReporter};
use meemee::payments::{CardPaymentRequest, CryptoInvoiceRequest, PaymentApi, PaymentLink, PaymentService};
use meemee::storage::db::{self, DbPool, UserProfile};
use meemee::storage::generations::{Generation, StatusUpdate};
use meemee::storage::{create_pool, get_connection, InMemorySessionStore, SessionStore};

pub const CATALOG_JSON: &str = r#"[
    {"id": "birthday_dance", "name": "Танцующий именинник", "status": "active",
     "video_url": "https://cdn.example.com/birthday.mp4", "preview_url": "https://cdn.example.com/birthday.jpg"},
    {"id": "dragon_fire", "name": "Дракон", "status": "soon"}
]"#;

/// Database in a temporary directory; keep the `TempDir` alive.
pub fn test_pool() -> (TempDir, Arc<DbPool>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.sqlite");
    let pool = create_pool(path.to_str().expect("utf-8 path")).expect("pool");
    (dir, Arc::new(pool))
}

pub fn add_user(pool: &DbPool, telegram_id: i64, quota: i64) -> UserProfile {
    let profile = UserProfile {
        telegram_id,
        username: Some(format!("user{}", telegram_id)),
        first_name: Some("Test".to_string()),
        last_name: None,
    };
    let conn = get_connection(pool).expect("connection");
    db::create_user(&conn, &profile, quota).expect("create user");
    profile
}

pub fn quota_of(pool: &DbPool, telegram_id: i64) -> i64 {
    let conn = get_connection(pool).expect("connection");
    db::get_user(&conn, telegram_id)
        .expect("query")
        .map(|u| u.quota)
        .unwrap_or_default()
}

pub fn pending() -> StatusUpdate {
    StatusUpdate::default()
}

pub fn done(url: &str) -> StatusUpdate {
    StatusUpdate {
        status: GenerationStatus::Done,
        video_url: Some(url.to_string()),
        ..StatusUpdate::default()
    }
}

pub fn failed(error_id: &str) -> StatusUpdate {
    StatusUpdate {
        status: GenerationStatus::Failed,
        error_id: Some(error_id.to_string()),
        ..StatusUpdate::default()
    }
}

/// Generation backend answering statuses from a script.
///
/// Once the script runs out the last status repeats.
#[derive(Default)]
pub struct ScriptedGenerationApi {
    pub reject_create: bool,
    script: Mutex<VecDeque<StatusUpdate>>,
    last: Mutex<StatusUpdate>,
    fixed: Mutex<HashMap<String, StatusUpdate>>,
    created: AtomicU32,
    status_calls: AtomicU32,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerationApi {
    pub fn new(script: Vec<StatusUpdate>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_create: true,
            ..Self::default()
        }
    }

    /// Appends a status to the script.
    pub fn push(&self, update: StatusUpdate) {
        self.script.lock().expect("lock").push_back(update);
    }

    /// Pins the status of one generation, bypassing the script.
    pub fn set_status_for(&self, generation_id: &str, update: StatusUpdate) {
        self.fixed
            .lock()
            .expect("lock")
            .insert(generation_id.to_string(), update);
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationApi for ScriptedGenerationApi {
    async fn create(&self, request: &GenerationRequest) -> AppResult<String> {
        self.requests.lock().expect("lock").push(request.clone());
        if self.reject_create {
            return Err(AppError::Backend("rejected".to_string()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("gen-{}", n))
    }

    async fn status(&self, generation_id: &str) -> AppResult<StatusUpdate> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fixed) = self.fixed.lock().expect("lock").get(generation_id) {
            return Ok(fixed.clone());
        }
        let mut script = self.script.lock().expect("lock");
        let mut last = self.last.lock().expect("lock");
        if let Some(next) = script.pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

/// Everything the reporter was asked to say
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reported {
    Started(String),
    Video(String),
    Failure(String),
    StillProcessing(String),
}

#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<Reported>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<Reported> {
        self.events.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ResultReporter for RecordingReporter {
    async fn generation_started(&self, _chat_id: i64, generation: &Generation) -> AppResult<()> {
        self.events
            .lock()
            .expect("lock")
            .push(Reported::Started(generation.id.clone()));
        Ok(())
    }

    async fn deliver_video(&self, _chat_id: i64, generation: &Generation) -> AppResult<Option<String>> {
        self.events
            .lock()
            .expect("lock")
            .push(Reported::Video(generation.id.clone()));
        Ok(Some(format!("file-{}", generation.id)))
    }

    async fn report_failure(&self, _chat_id: i64, generation: &Generation) -> AppResult<()> {
        self.events
            .lock()
            .expect("lock")
            .push(Reported::Failure(generation.id.clone()));
        Ok(())
    }

    async fn report_still_processing(&self, _chat_id: i64, generation_id: &str) -> AppResult<()> {
        self.events
            .lock()
            .expect("lock")
            .push(Reported::StillProcessing(generation_id.to_string()));
        Ok(())
    }
}

/// Payment provider with a settable order status
pub struct FakePaymentApi {
    pub fail_create: bool,
    pub status: Mutex<OrderStatus>,
    pub card_requests: Mutex<Vec<CardPaymentRequest>>,
}

impl FakePaymentApi {
    pub fn new() -> Self {
        Self {
            fail_create: false,
            status: Mutex::new(OrderStatus::Pending),
            card_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::new()
        }
    }

    pub fn set_status(&self, status: OrderStatus) {
        *self.status.lock().expect("lock") = status;
    }
}

#[async_trait]
impl PaymentApi for FakePaymentApi {
    async fn create_card_payment(&self, request: &CardPaymentRequest) -> AppResult<PaymentLink> {
        self.card_requests.lock().expect("lock").push(request.clone());
        if self.fail_create {
            return Err(AppError::Backend("provider down".to_string()));
        }
        Ok(PaymentLink {
            payment_url: format!("https://pay.example.com/{}", request.order_id),
        })
    }

    async fn create_crypto_invoice(&self, request: &CryptoInvoiceRequest) -> AppResult<PaymentLink> {
        if self.fail_create {
            return Err(AppError::Backend("provider down".to_string()));
        }
        Ok(PaymentLink {
            payment_url: format!("https://crypto.example.com/{}", request.order_id),
        })
    }

    async fn payment_status(&self, _order_id: &str) -> AppResult<OrderStatus> {
        Ok(*self.status.lock().expect("lock"))
    }
}

/// Membership answer; `None` simulates a lookup error
pub struct FakeMembership(pub Option<MembershipStatus>);

#[async_trait]
impl MembershipLookup for FakeMembership {
    async fn membership(&self, _channel: &str, _user_id: i64) -> AppResult<MembershipStatus> {
        self.0
            .ok_or_else(|| AppError::Backend("getChatMember failed".to_string()))
    }
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy::new().interval(Duration::from_secs(3)).max_attempts(10)
}

/// A fully wired engine over fakes
pub struct TestEngine {
    pub _dir: TempDir,
    pub pool: Arc<DbPool>,
    pub api: Arc<ScriptedGenerationApi>,
    pub payments_api: Arc<FakePaymentApi>,
    pub reporter: Arc<RecordingReporter>,
    pub poller: Arc<GenerationPoller>,
    pub sessions: Arc<dyn SessionStore>,
    pub engine: ConversationEngine,
}

impl TestEngine {
    pub fn new(api: ScriptedGenerationApi) -> Self {
        Self::with_payments(api, FakePaymentApi::new())
    }

    pub fn with_payments(api: ScriptedGenerationApi, payments_api: FakePaymentApi) -> Self {
        let (dir, pool) = test_pool();
        let api = Arc::new(api);
        let payments_api = Arc::new(payments_api);
        let reporter = Arc::new(RecordingReporter::default());
        let poller = Arc::new(GenerationPoller::new(
            api.clone(),
            Arc::clone(&pool),
            reporter.clone(),
            fast_policy(),
        ));
        let payments = Arc::new(PaymentService::new(payments_api.clone(), Arc::clone(&pool)));
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let catalog = Arc::new(Catalog::from_json(CATALOG_JSON).expect("catalog"));
        let engine = ConversationEngine::new(
            Arc::clone(&sessions),
            Arc::clone(&pool),
            api.clone(),
            Arc::clone(&poller),
            payments,
            catalog,
        );
        Self {
            _dir: dir,
            pool,
            api,
            payments_api,
            reporter,
            poller,
            sessions,
            engine,
        }
    }
}
