//! Video generation backend, completion polling and late delivery

pub mod client;
pub mod poller;
pub mod sweeper;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::error::AppResult;
use crate::core::types::Gender;
use crate::storage::generations::StatusUpdate;

pub use client::HttpGenerationApi;
pub use poller::{GenerationPoller, PollOutcome, PollPolicy, ResultReporter};
pub use sweeper::PendingGenerationSweeper;

/// Request sent to the generation backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub user_id: i64,
    pub chat_id: i64,
    pub meme_id: Option<String>,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub custom_prompt: Option<String>,
}

/// The generation backend
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Submits a request and returns the backend's generation id.
    ///
    /// A backend-side rejection is an `Err(AppError::Backend)`.
    async fn create(&self, request: &GenerationRequest) -> AppResult<String>;

    /// Current status of a generation
    async fn status(&self, generation_id: &str) -> AppResult<StatusUpdate>;
}
