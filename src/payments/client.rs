//! HTTP client for the payment provider.
//!
//! `POST {base}/payments/card` and `POST {base}/payments/crypto` answer
//! `{"payment_url": "..."}` or `{"error": "..."}`;
//! `GET {base}/payments/{order_id}` answers `{"status": "..."}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{CardPaymentRequest, CryptoInvoiceRequest, PaymentApi, PaymentLink};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::types::OrderStatus;

#[derive(Deserialize)]
struct CreateResponse {
    payment_url: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

/// reqwest-based [`PaymentApi`]
pub struct HttpPaymentApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPaymentApi {
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

    /// Client configured from PAYMENT_API_URL / PAYMENT_API_KEY
    pub fn from_env() -> AppResult<Self> {
        Self::new(config::payment::API_URL.as_str(), config::payment::API_KEY.clone())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn create<T: Serialize + Sync>(&self, path: &str, body: &T) -> AppResult<PaymentLink> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.authorized(self.client.post(&url).json(body)).send().await?;

        let status = response.status();
        let body: CreateResponse = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(AppError::HttpStatus(status)),
            Err(e) => return Err(e.into()),
        };

        match (body.payment_url, body.error) {
            (_, Some(error)) => Err(AppError::Backend(error)),
            (Some(payment_url), None) if status.is_success() => Ok(PaymentLink { payment_url }),
            _ if !status.is_success() => Err(AppError::HttpStatus(status)),
            _ => Err(AppError::Backend("payment_url missing in response".to_string())),
        }
    }
}

#[async_trait]
impl PaymentApi for HttpPaymentApi {
    async fn create_card_payment(&self, request: &CardPaymentRequest) -> AppResult<PaymentLink> {
        self.create("payments/card", request).await
    }

    async fn create_crypto_invoice(&self, request: &CryptoInvoiceRequest) -> AppResult<PaymentLink> {
        self.create("payments/crypto", request).await
    }

    async fn payment_status(&self, order_id: &str) -> AppResult<OrderStatus> {
        let url = format!("{}/payments/{}", self.base_url, order_id);
        let response = self.authorized(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(AppError::HttpStatus(response.status()));
        }

        let body: StatusResponse = response.json().await?;
        OrderStatus::from_str(&body.status).map_err(AppError::Backend)
    }
}
