//! Background delivery of generations that outlived the inline poll.
//!
//! Runs once at startup (picking up generations left over from a restart)
//! and then on a fixed interval. Delivery goes through
//! [`GenerationPoller::finish`], so the claim flag keeps the poller and the
//! sweeper from reporting the same generation twice.

use std::sync::Arc;
use std::time::Duration;

use super::GenerationPoller;
use crate::core::config;
use crate::core::error::AppResult;
use crate::generation::PollOutcome;
use crate::storage::db::{get_connection, DbPool};
use crate::storage::generations::{self, Generation, StatusUpdate};

/// Generations examined per sweep
pub const SWEEP_BATCH: usize = 50;

pub struct PendingGenerationSweeper {
    poller: Arc<GenerationPoller>,
    db_pool: Arc<DbPool>,
    interval: Duration,
    batch_size: usize,
}

/// Counts from one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl PendingGenerationSweeper {
    pub fn new(poller: Arc<GenerationPoller>, db_pool: Arc<DbPool>) -> Self {
        Self {
            poller,
            db_pool,
            interval: config::poll::sweep_interval(),
            batch_size: SWEEP_BATCH,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Spawns the sweep loop on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                // First tick completes immediately: recovery on startup
                ticker.tick().await;
                match self.sweep_once().await {
                    Ok(report) if report.delivered + report.failed > 0 => {
                        log::info!(
                            "Sweeper: checked {}, delivered {}, failed {}",
                            report.checked,
                            report.delivered,
                            report.failed
                        );
                    }
                    Ok(_) => {}
                    Err(e) => log::error!("Pending generation sweep failed: {}", e),
                }
            }
        })
    }

    /// Refreshes undelivered generations and reports the finished ones.
    ///
    /// Each sweep takes the least recently checked batch, so every pending
    /// generation is eventually looked at again.
    pub async fn sweep_once(&self) -> AppResult<SweepReport> {
        let pending = {
            let conn = get_connection(&self.db_pool)?;
            let pending = generations::list_undelivered(&conn, self.batch_size)?;
            for generation in &pending {
                generations::mark_checked(&conn, &generation.id)?;
            }
            pending
        };

        let mut report = SweepReport::default();
        for generation in pending {
            report.checked += 1;
            let Some(update) = self.terminal_update(&generation).await else {
                continue;
            };
            match self.poller.finish(&generation.id, generation.chat_id, &update).await {
                PollOutcome::Delivered => report.delivered += 1,
                PollOutcome::Failed => report.failed += 1,
                PollOutcome::StillProcessing | PollOutcome::Skipped => {}
            }
        }
        Ok(report)
    }

    /// Terminal status of a stored generation, asking the backend if needed.
    async fn terminal_update(&self, generation: &Generation) -> Option<StatusUpdate> {
        if generation.status.is_terminal() {
            return Some(StatusUpdate {
                status: generation.status,
                video_url: generation.video_url.clone(),
                error_id: generation.error_id.clone(),
                telegram_file_id: generation.telegram_file_id.clone(),
            });
        }

        match self.poller.api().status(&generation.id).await {
            Ok(update) if self.poller.policy().is_terminal(&update) => Some(update),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Sweeper status query for {} failed: {}", generation.id, e);
                None
            }
        }
    }
}
