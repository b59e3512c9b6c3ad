//! HTTP client for the generation backend.
//!
//! `POST {base}/generations` with a JSON [`GenerationRequest`] answers
//! `{"generation_id": "..."}` or `{"error": "..."}`;
//! `GET {base}/generations/{id}` answers the current status.

use async_trait::async_trait;
use serde::Deserialize;
use std::str::FromStr;

use super::{GenerationApi, GenerationRequest};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::types::GenerationStatus;
use crate::storage::generations::StatusUpdate;

#[derive(Deserialize)]
struct CreateResponse {
    generation_id: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
    video_url: Option<String>,
    error_id: Option<String>,
    telegram_file_id: Option<String>,
}

/// reqwest-based [`GenerationApi`]
pub struct HttpGenerationApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGenerationApi {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config::network::backend_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Client configured from GENERATION_API_URL / GENERATION_API_KEY
    pub fn from_env() -> AppResult<Self> {
        Self::new(config::generation::API_URL.as_str(), config::generation::API_KEY.clone())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl GenerationApi for HttpGenerationApi {
    async fn create(&self, request: &GenerationRequest) -> AppResult<String> {
        let url = format!("{}/generations", self.base_url);
        let response = self.authorized(self.client.post(&url).json(request)).send().await?;

        let status = response.status();
        let body: CreateResponse = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(AppError::HttpStatus(status)),
            Err(e) => return Err(e.into()),
        };

        match (body.generation_id, body.error) {
            (_, Some(error)) => Err(AppError::Backend(error)),
            (Some(id), None) if status.is_success() => Ok(id),
            _ if !status.is_success() => Err(AppError::HttpStatus(status)),
            _ => Err(AppError::Backend("generation_id missing in response".to_string())),
        }
    }

    async fn status(&self, generation_id: &str) -> AppResult<StatusUpdate> {
        let url = format!("{}/generations/{}", self.base_url, generation_id);
        let response = self.authorized(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(AppError::HttpStatus(response.status()));
        }

        let body: StatusResponse = response.json().await?;
        let status = GenerationStatus::from_str(&body.status).map_err(AppError::Backend)?;

        Ok(StatusUpdate {
            status,
            video_url: body.video_url,
            error_id: body.error_id,
            telegram_file_id: body.telegram_file_id,
        })
    }
}
