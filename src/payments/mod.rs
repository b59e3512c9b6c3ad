//! Payments: packages, provider backend and order handling

pub mod client;
pub mod service;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::error::AppResult;
use crate::core::types::OrderStatus;

pub use client::HttpPaymentApi;
pub use service::{PaymentCheck, PaymentService, StartedPayment};

/// A purchasable bundle of generations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub key: &'static str,
    pub title: &'static str,
    pub generations: i64,
    /// Card price in rubles
    pub rub: i64,
    /// Crypto price in USD, as a decimal string
    pub usd: &'static str,
    /// Telegram Stars price
    pub stars: i64,
}

pub const PACKAGES: &[Package] = &[
    Package {
        key: "single",
        title: "1 видео",
        generations: 1,
        rub: 149,
        usd: "1.99",
        stars: 100,
    },
    Package {
        key: "pack",
        title: "3 видео",
        generations: 3,
        rub: 349,
        usd: "4.49",
        stars: 250,
    },
    Package {
        key: "10",
        title: "10 видео",
        generations: 10,
        rub: 990,
        usd: "12.99",
        stars: 700,
    },
    Package {
        key: "50",
        title: "50 видео",
        generations: 50,
        rub: 3990,
        usd: "49.99",
        stars: 2800,
    },
    Package {
        key: "100",
        title: "100 видео",
        generations: 100,
        rub: 6990,
        usd: "89.99",
        stars: 5000,
    },
    Package {
        key: "500",
        title: "500 видео",
        generations: 500,
        rub: 29990,
        usd: "379.99",
        stars: 21000,
    },
];

pub fn find_package(key: &str) -> Option<&'static Package> {
    PACKAGES.iter().find(|p| p.key == key)
}

/// A cryptocurrency accepted for payment and the networks it can be sent over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoAsset {
    pub symbol: &'static str,
    pub chains: &'static [&'static str],
}

pub const SUPPORTED_CRYPTO: &[CryptoAsset] = &[
    CryptoAsset {
        symbol: "USDT",
        chains: &["TRC20", "TON", "ERC20"],
    },
    CryptoAsset {
        symbol: "TON",
        chains: &["TON"],
    },
    CryptoAsset {
        symbol: "BTC",
        chains: &["BTC"],
    },
    CryptoAsset {
        symbol: "ETH",
        chains: &["ERC20"],
    },
];

pub fn find_crypto(symbol: &str) -> Option<&'static CryptoAsset> {
    SUPPORTED_CRYPTO.iter().find(|c| c.symbol == symbol)
}

pub fn is_supported_chain(symbol: &str, chain: &str) -> bool {
    find_crypto(symbol).is_some_and(|c| c.chains.contains(&chain))
}

/// Card payment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardPaymentRequest {
    pub order_id: String,
    pub user_id: i64,
    pub amount: String,
    pub currency: String,
    pub email: String,
    pub bank: String,
    pub description: String,
}

/// Crypto invoice request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CryptoInvoiceRequest {
    pub order_id: String,
    pub user_id: i64,
    pub amount: String,
    pub currency: String,
    pub chain: String,
    pub description: String,
}

/// Where the user pays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    pub payment_url: String,
}

/// The payment provider
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn create_card_payment(&self, request: &CardPaymentRequest) -> AppResult<PaymentLink>;

    async fn create_crypto_invoice(&self, request: &CryptoInvoiceRequest) -> AppResult<PaymentLink>;

    async fn payment_status(&self, order_id: &str) -> AppResult<OrderStatus>;
}
