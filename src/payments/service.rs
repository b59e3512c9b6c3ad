//! Order handling on top of the payment provider.

use std::sync::Arc;

use super::{find_package, is_supported_chain, CardPaymentRequest, CryptoInvoiceRequest, Package, PaymentApi};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{OrderStatus, PaymentMethod};
use crate::storage::db::{self, get_connection, DbPool};
use crate::storage::orders::{self, NewOrder};

/// A payment waiting for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedPayment {
    pub order_id: String,
    pub payment_url: String,
    pub package: &'static Package,
    pub amount: String,
    pub currency: String,
}

/// Result of checking an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCheck {
    Pending,
    /// `newly_credited` is false when a previous check already added the generations
    Paid { generations: i64, newly_credited: bool },
    Failed,
    NotFound,
}

pub struct PaymentService {
    api: Arc<dyn PaymentApi>,
    db_pool: Arc<DbPool>,
}

impl PaymentService {
    pub fn new(api: Arc<dyn PaymentApi>, db_pool: Arc<DbPool>) -> Self {
        Self { api, db_pool }
    }

    fn new_order_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn package(package_key: &str) -> AppResult<&'static Package> {
        find_package(package_key).ok_or_else(|| AppError::NotFound(format!("package {}", package_key)))
    }

    /// Creates a card payment for `package_key`; the receipt goes to `email`.
    pub async fn start_card_payment(&self, user_id: i64, package_key: &str, email: &str) -> AppResult<StartedPayment> {
        let package = Self::package(package_key)?;
        let order = NewOrder {
            id: Self::new_order_id(),
            user_id,
            package_key: package.key.to_string(),
            method: PaymentMethod::Card,
            amount: package.rub.to_string(),
            currency: "RUB".to_string(),
            crypto: None,
            chain: None,
            email: Some(email.to_string()),
        };
        orders::create_order(&*get_connection(&self.db_pool)?, &order)?;

        let request = CardPaymentRequest {
            order_id: order.id.clone(),
            user_id,
            amount: order.amount.clone(),
            currency: order.currency.clone(),
            email: email.to_string(),
            bank: config::payment::CARD_BANK.to_string(),
            description: format!("Пакет «{}»", package.title),
        };

        let link = match self.api.create_card_payment(&request).await {
            Ok(link) => link,
            Err(e) => {
                self.mark_failed(&order.id);
                return Err(e);
            }
        };
        orders::set_payment_url(&*get_connection(&self.db_pool)?, &order.id, &link.payment_url)?;

        log::info!("Card order {} created for user {} ({})", order.id, user_id, package.key);
        Ok(StartedPayment {
            order_id: order.id,
            payment_url: link.payment_url,
            package,
            amount: order.amount,
            currency: order.currency,
        })
    }

    /// Creates a crypto invoice for `package_key` paid in `crypto` over `chain`.
    pub async fn start_crypto_payment(
        &self,
        user_id: i64,
        package_key: &str,
        crypto: &str,
        chain: &str,
    ) -> AppResult<StartedPayment> {
        let package = Self::package(package_key)?;
        if !is_supported_chain(crypto, chain) {
            return Err(AppError::Validation(format!("unsupported network {} for {}", chain, crypto)));
        }

        let order = NewOrder {
            id: Self::new_order_id(),
            user_id,
            package_key: package.key.to_string(),
            method: PaymentMethod::Crypto,
            amount: package.usd.to_string(),
            currency: crypto.to_string(),
            crypto: Some(crypto.to_string()),
            chain: Some(chain.to_string()),
            email: None,
        };
        orders::create_order(&*get_connection(&self.db_pool)?, &order)?;

        let request = CryptoInvoiceRequest {
            order_id: order.id.clone(),
            user_id,
            amount: order.amount.clone(),
            currency: crypto.to_string(),
            chain: chain.to_string(),
            description: format!("Пакет «{}»", package.title),
        };

        let link = match self.api.create_crypto_invoice(&request).await {
            Ok(link) => link,
            Err(e) => {
                self.mark_failed(&order.id);
                return Err(e);
            }
        };
        orders::set_payment_url(&*get_connection(&self.db_pool)?, &order.id, &link.payment_url)?;

        log::info!(
            "Crypto order {} created for user {} ({} {} via {})",
            order.id,
            user_id,
            package.key,
            crypto,
            chain
        );
        Ok(StartedPayment {
            order_id: order.id,
            payment_url: link.payment_url,
            package,
            amount: order.amount,
            currency: crypto.to_string(),
        })
    }

    /// Asks the provider about an order of `user_id` and credits it once when paid.
    ///
    /// Crediting adds the package generations and accrues the expert's cashback.
    pub async fn check_payment(&self, user_id: i64, order_id: &str) -> AppResult<PaymentCheck> {
        let order = match orders::get_order(&*get_connection(&self.db_pool)?, order_id)? {
            Some(order) if order.user_id == user_id => order,
            _ => return Ok(PaymentCheck::NotFound),
        };
        let package = Self::package(&order.package_key)?;

        let status = match order.status {
            OrderStatus::Pending => {
                let remote = self.api.payment_status(order_id).await?;
                if remote != OrderStatus::Pending {
                    orders::set_status(&*get_connection(&self.db_pool)?, order_id, remote)?;
                }
                remote
            }
            stored => stored,
        };

        match status {
            OrderStatus::Pending => Ok(PaymentCheck::Pending),
            OrderStatus::Failed => Ok(PaymentCheck::Failed),
            OrderStatus::Paid => {
                let newly_credited = self.credit(user_id, order_id, package)?;
                Ok(PaymentCheck::Paid {
                    generations: package.generations,
                    newly_credited,
                })
            }
        }
    }

    fn credit(&self, user_id: i64, order_id: &str, package: &Package) -> AppResult<bool> {
        let mut conn = get_connection(&self.db_pool)?;
        let tx = conn.transaction()?;
        if !orders::claim_credit(&tx, order_id)? {
            return Ok(false);
        }
        db::add_quota(&tx, user_id, package.generations)?;

        if let Some(expert_id) = db::get_user(&tx, user_id)?.and_then(|u| u.expert_id) {
            let cashback = package.rub * *config::referral::EXPERT_CASHBACK_PERCENT / 100;
            db::add_expert_balance(&tx, expert_id, cashback)?;
            log::info!("Expert {} earned {} ₽ from order {}", expert_id, cashback, order_id);
        }
        tx.commit()?;

        log::info!(
            "Order {} credited: +{} generations for user {}",
            order_id,
            package.generations,
            user_id
        );
        Ok(true)
    }

    fn mark_failed(&self, order_id: &str) {
        let result = get_connection(&self.db_pool)
            .map_err(AppError::from)
            .and_then(|conn| orders::set_status(&conn, order_id, OrderStatus::Failed).map_err(AppError::from));
        if let Err(e) = result {
            log::error!("Failed to mark order {} as failed: {}", order_id, e);
        }
    }
}
