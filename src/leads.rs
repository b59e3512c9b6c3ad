//! Lead bot flow: name → confirmation → optional subscription check → saved lead.

use std::sync::Arc;

use crate::conversation::session::{SessionField, SessionPatch};
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::subscription::{self, MembershipLookup};
use crate::core::utils::today_string;
use crate::core::validation::normalize_lead_name;
use crate::storage::db::{get_connection, DbPool};
use crate::storage::leads::{self, Lead};
use crate::storage::sessions::SessionStore;

/// Lead bot settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadPolicy {
    /// Channel to join before a lead is saved; `None` disables the check
    pub subscription_channel: Option<String>,
    /// One submission per username across all sources
    pub single_submission: bool,
    /// Source used when /start carried no payload
    pub default_utm: String,
}

impl Default for LeadPolicy {
    fn default() -> Self {
        Self {
            subscription_channel: None,
            single_submission: true,
            default_utm: "default".to_string(),
        }
    }
}

impl LeadPolicy {
    pub fn from_env() -> Self {
        let subscription_channel = if *config::leads::SUBSCRIPTION_CHECK_ENABLED {
            config::leads::SUBSCRIPTION_CHANNEL.clone()
        } else {
            None
        };
        Self {
            subscription_channel,
            single_submission: *config::leads::USER_SINGLE_SUBMISSION_ENFORCE,
            default_utm: config::leads::UTM_SOURCE.clone(),
        }
    }

    #[must_use]
    pub fn with_subscription_channel(mut self, channel: impl Into<String>) -> Self {
        self.subscription_channel = Some(channel.into());
        self
    }

    #[must_use]
    pub fn with_single_submission(mut self, enforce: bool) -> Self {
        self.single_submission = enforce;
        self
    }

    #[must_use]
    pub fn with_default_utm(mut self, utm: impl Into<String>) -> Self {
        self.default_utm = utm.into();
        self
    }
}

/// Identity stored with a lead: `@username`, or `id:<n>` without one.
pub fn lead_username(username: Option<&str>, user_id: i64) -> String {
    match username {
        Some(name) if !name.is_empty() => format!("@{}", name),
        _ => format!("id:{}", user_id),
    }
}

/// Outcome of confirming a name or re-checking the subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadSubmission {
    Saved(Lead),
    /// Same (utm_source, username) pair already stored
    Duplicate,
    /// Single-submission policy blocked a second lead
    AlreadySubmitted,
    /// The user has to join the channel first
    NeedsSubscription { channel: String },
    NotSubscribed,
    /// Subscription re-check without a configured channel
    NotConfigured,
    NoPendingName,
}

pub struct LeadFlow {
    policy: LeadPolicy,
    sessions: Arc<dyn SessionStore>,
    db_pool: Arc<DbPool>,
    membership: Arc<dyn MembershipLookup>,
}

impl LeadFlow {
    pub fn new(
        policy: LeadPolicy,
        sessions: Arc<dyn SessionStore>,
        db_pool: Arc<DbPool>,
        membership: Arc<dyn MembershipLookup>,
    ) -> Self {
        Self {
            policy,
            sessions,
            db_pool,
            membership,
        }
    }

    pub fn policy(&self) -> &LeadPolicy {
        &self.policy
    }

    /// Remembers the /start payload as the UTM source.
    pub async fn start(&self, chat_id: i64, payload: &str) {
        let payload = payload.trim();
        if payload.is_empty() {
            return;
        }
        self.sessions
            .set(
                chat_id,
                SessionPatch {
                    utm_source: Some(payload.to_string()),
                    ..SessionPatch::default()
                },
            )
            .await;
    }

    /// Normalizes the name and keeps it for confirmation; `None` for blank input.
    pub async fn propose_name(&self, chat_id: i64, text: &str) -> Option<String> {
        let name = normalize_lead_name(text)?;
        self.sessions
            .set(
                chat_id,
                SessionPatch {
                    pending_name: Some(name.clone()),
                    ..SessionPatch::default()
                },
            )
            .await;
        Some(name)
    }

    pub async fn reject_name(&self, chat_id: i64) {
        self.sessions.clear(chat_id, SessionField::PendingName).await;
    }

    /// "Yes" on the confirmation: saves the lead or asks to subscribe first.
    pub async fn confirm(&self, chat_id: i64, username: &str) -> AppResult<LeadSubmission> {
        let session = self.sessions.get(chat_id).await;
        if session.pending_name.is_none() {
            log::error!("Confirmation without pending name by {}", username);
            return Ok(LeadSubmission::NoPendingName);
        }

        if let Some(channel) = &self.policy.subscription_channel {
            log::info!("User {} prompted to subscribe to {}", username, channel);
            return Ok(LeadSubmission::NeedsSubscription {
                channel: channel.clone(),
            });
        }

        self.save(chat_id, username).await
    }

    /// "Check subscription" button: saves the lead once the user is in the channel.
    pub async fn check_subscription(&self, chat_id: i64, user_id: i64, username: &str) -> AppResult<LeadSubmission> {
        let Some(channel) = self.policy.subscription_channel.as_deref() else {
            log::error!("Subscription check requested but no channel is configured");
            return Ok(LeadSubmission::NotConfigured);
        };
        if self.sessions.get(chat_id).await.pending_name.is_none() {
            return Ok(LeadSubmission::NoPendingName);
        }

        if !subscription::is_subscribed(self.membership.as_ref(), user_id, channel).await {
            log::info!("User {} is NOT subscribed to {}", username, channel);
            return Ok(LeadSubmission::NotSubscribed);
        }

        self.save(chat_id, username).await
    }

    async fn save(&self, chat_id: i64, username: &str) -> AppResult<LeadSubmission> {
        let session = self.sessions.get(chat_id).await;
        let Some(name) = session.pending_name else {
            return Ok(LeadSubmission::NoPendingName);
        };

        let lead = Lead {
            date: today_string(),
            utm_source: session.utm_source.unwrap_or_else(|| self.policy.default_utm.clone()),
            username: username.to_string(),
            video_generate_name: name,
        };

        let inserted = {
            let conn = get_connection(&self.db_pool)?;
            if self.policy.single_submission && leads::has_any_submission(&conn, username)? {
                log::info!("User {} attempted an additional submission, blocked by policy", username);
                return Ok(LeadSubmission::AlreadySubmitted);
            }
            leads::add_lead(&conn, &lead)?
        };

        if !inserted {
            log::info!("Lead already stored for {} (utm {})", username, lead.utm_source);
            return Ok(LeadSubmission::Duplicate);
        }

        self.sessions.clear(chat_id, SessionField::PendingName).await;
        log::info!(
            "Saved lead: {}, utm={}, date={}, name={}",
            lead.username,
            lead.utm_source,
            lead.date,
            lead.video_generate_name
        );
        Ok(LeadSubmission::Saved(lead))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_username() {
        assert_eq!(lead_username(Some("alex"), 42), "@alex");
        assert_eq!(lead_username(None, 42), "id:42");
        assert_eq!(lead_username(Some(""), 7), "id:7");
    }

    #[test]
    fn test_policy_builder() {
        let policy = LeadPolicy::default()
            .with_subscription_channel("@memes")
            .with_single_submission(false)
            .with_default_utm("tiktok");
        assert_eq!(policy.subscription_channel.as_deref(), Some("@memes"));
        assert!(!policy.single_submission);
        assert_eq!(policy.default_utm, "tiktok");
    }
}
