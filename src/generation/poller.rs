//! Generation completion polling.
//!
//! After a generation is accepted, its status is queried at a fixed interval
//! for a bounded number of attempts. A terminal status is persisted and
//! reported exactly once; when attempts run out the user is told the video
//! will arrive later and the [`PendingGenerationSweeper`](super::PendingGenerationSweeper)
//! takes over.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::GenerationApi;
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::types::GenerationStatus;
use crate::storage::db::{self, get_connection, DbPool};
use crate::storage::generations::{self, Generation, StatusUpdate};

/// Polling strategy.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay before every status query
    pub interval: Duration,
    /// Maximum number of status queries
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: config::poll::interval(),
            max_attempts: config::poll::MAX_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delay before each query.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the maximum number of queries.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// A generation is finished when it failed, or when it is done and has a video URL.
    pub fn is_terminal(&self, update: &StatusUpdate) -> bool {
        match update.status {
            GenerationStatus::Done => update.video_url.is_some(),
            GenerationStatus::Failed => true,
            GenerationStatus::Pending => false,
        }
    }
}

/// How a poll ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Video delivered to the user
    Delivered,
    /// Backend failed; quota refunded and the user notified
    Failed,
    /// Attempts exhausted; user told the video will come later
    StillProcessing,
    /// Someone else already reported this generation, or it could not be recorded
    Skipped,
}

/// User-facing side of generation results
#[async_trait]
pub trait ResultReporter: Send + Sync {
    /// Tells the user the generation was accepted.
    async fn generation_started(&self, chat_id: i64, generation: &Generation) -> AppResult<()>;

    /// Sends the finished video, returning the Telegram file id when known.
    async fn deliver_video(&self, chat_id: i64, generation: &Generation) -> AppResult<Option<String>>;

    async fn report_failure(&self, chat_id: i64, generation: &Generation) -> AppResult<()>;

    async fn report_still_processing(&self, chat_id: i64, generation_id: &str) -> AppResult<()>;
}

/// Waits for generations to finish and reports their results
pub struct GenerationPoller {
    api: Arc<dyn GenerationApi>,
    db_pool: Arc<DbPool>,
    reporter: Arc<dyn ResultReporter>,
    policy: PollPolicy,
}

impl GenerationPoller {
    pub fn new(
        api: Arc<dyn GenerationApi>,
        db_pool: Arc<DbPool>,
        reporter: Arc<dyn ResultReporter>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            api,
            db_pool,
            reporter,
            policy,
        }
    }

    pub fn api(&self) -> &Arc<dyn GenerationApi> {
        &self.api
    }

    pub fn reporter(&self) -> &Arc<dyn ResultReporter> {
        &self.reporter
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Polls until the generation finishes or attempts run out.
    ///
    /// Sleeps before each query. A failed status query still counts as an
    /// attempt. Never returns an error.
    pub async fn await_completion(&self, generation_id: &str, chat_id: i64) -> PollOutcome {
        for attempt in 1..=self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;

            match self.api.status(generation_id).await {
                Ok(update) if self.policy.is_terminal(&update) => {
                    log::info!(
                        "Generation {} finished as {} on attempt {}/{}",
                        generation_id,
                        update.status,
                        attempt,
                        self.policy.max_attempts
                    );
                    return self.finish(generation_id, chat_id, &update).await;
                }
                Ok(update) => {
                    log::debug!(
                        "Generation {} still {} (attempt {}/{})",
                        generation_id,
                        update.status,
                        attempt,
                        self.policy.max_attempts
                    );
                }
                Err(e) => {
                    log::warn!(
                        "Status query for generation {} failed (attempt {}/{}): {}",
                        generation_id,
                        attempt,
                        self.policy.max_attempts,
                        e
                    );
                }
            }
        }

        log::info!(
            "Generation {} not ready after {} attempts, handing over to the sweeper",
            generation_id,
            self.policy.max_attempts
        );
        if let Err(e) = self.reporter.report_still_processing(chat_id, generation_id).await {
            log::error!("Failed to send still-processing notice for {}: {}", generation_id, e);
        }
        PollOutcome::StillProcessing
    }

    /// Persists a terminal status and reports it, at most once per generation.
    ///
    /// Done: success counter incremented, video delivered.
    /// Failed: quota refunded, failure counter incremented, user notified.
    pub async fn finish(&self, generation_id: &str, chat_id: i64, update: &StatusUpdate) -> PollOutcome {
        let generation = match self.persist_and_claim(generation_id, update) {
            Ok(Some(generation)) => generation,
            Ok(None) => {
                log::debug!("Generation {} already reported", generation_id);
                return PollOutcome::Skipped;
            }
            Err(e) => {
                log::error!("Failed to record result of generation {}: {}", generation_id, e);
                return PollOutcome::Skipped;
            }
        };

        match generation.status {
            GenerationStatus::Done => {
                self.record_counter(generation.user_id, db::increment_successful_generations);
                match self.reporter.deliver_video(chat_id, &generation).await {
                    Ok(Some(file_id)) => self.remember_file_id(generation_id, &file_id),
                    Ok(None) => {}
                    Err(e) => log::error!("Failed to deliver generation {}: {}", generation_id, e),
                }
                PollOutcome::Delivered
            }
            _ => {
                self.compensate(&generation);
                if let Err(e) = self.reporter.report_failure(chat_id, &generation).await {
                    log::error!("Failed to report failure of generation {}: {}", generation_id, e);
                }
                PollOutcome::Failed
            }
        }
    }

    fn persist_and_claim(&self, generation_id: &str, update: &StatusUpdate) -> AppResult<Option<Generation>> {
        let conn = get_connection(&self.db_pool)?;
        generations::update_status(&conn, generation_id, update)?;
        if !generations::claim_delivery(&conn, generation_id)? {
            return Ok(None);
        }
        Ok(generations::get_generation(&conn, generation_id)?)
    }

    fn compensate(&self, generation: &Generation) {
        log::warn!(
            "Generation {} failed (error id {}), refunding user {}",
            generation.id,
            generation.error_id.as_deref().unwrap_or("UNKNOWN"),
            generation.user_id
        );
        self.record_counter(generation.user_id, db::refund_quota);
        self.record_counter(generation.user_id, db::increment_failed_generations);
    }

    fn record_counter(&self, user_id: i64, update: fn(&rusqlite::Connection, i64) -> rusqlite::Result<()>) {
        let result = get_connection(&self.db_pool)
            .map_err(crate::core::error::AppError::from)
            .and_then(|conn| update(&conn, user_id).map_err(Into::into));
        if let Err(e) = result {
            log::error!("Failed to update counters of user {}: {}", user_id, e);
        }
    }

    fn remember_file_id(&self, generation_id: &str, file_id: &str) {
        let result = get_connection(&self.db_pool)
            .map_err(crate::core::error::AppError::from)
            .and_then(|conn| generations::set_telegram_file_id(&conn, generation_id, file_id).map_err(Into::into));
        if let Err(e) = result {
            log::warn!("Failed to store file id for generation {}: {}", generation_id, e);
        }
    }
}
