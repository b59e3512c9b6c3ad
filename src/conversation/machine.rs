//! Commerce bot conversation engine.
//!
//! Interprets button presses and free text against the chat session,
//! moves the session between states and performs the side effects
//! (quota deduction, generation creation, payment creation). Rendering is
//! left to the caller: every operation returns an outcome enum.

use std::sync::Arc;

use chrono::Utc;

use super::session::{ConversationState, CustomPromptData, SessionField, SessionPatch};
use crate::catalog::{Catalog, Meme};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{Gender, WaitingFor};
use crate::core::validation::{self, ValidationError};
use crate::generation::{GenerationApi, GenerationPoller, GenerationRequest, PollOutcome};
use crate::payments::{find_package, PaymentService, StartedPayment};
use crate::storage::db::{self, get_connection, DbPool, UserProfile};
use crate::storage::generations::{self, Generation, NewGeneration};
use crate::storage::sessions::SessionStore;

/// Result of picking a catalog item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Meme stored, name requested
    Selected(Meme),
    ComingSoon(Meme),
    NotFound,
    NoQuota,
}

/// Result of a free-text message
#[derive(Debug, Clone, PartialEq)]
pub enum TextOutcome {
    /// Nothing was expected
    Idle,
    /// Input rejected; the state is unchanged
    Invalid {
        state: ConversationState,
        error: ValidationError,
    },
    /// Name stored, gender requested
    AskGender { name: String },
    /// A button press is expected, not text
    ExpectingButton(ConversationState),
    /// No generations left; back to idle
    NoQuota,
    /// Backend rejected the request; the quota was refunded
    CreationFailed,
    /// Custom prompt accepted; the result is delivered later
    PromptAccepted { generation_id: String },
    /// Free prompt generation polled to an end
    FreeGenerationFinished { generation_id: String, outcome: PollOutcome },
    /// E-mail rejected; the request is shown again
    EmailInvalid { package_key: Option<String> },
    PaymentCreated(StartedPayment),
    /// Package missing from the session or provider error
    PaymentFailed,
}

/// Result of a gender button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenderOutcome {
    Confirm {
        meme_name: String,
        name: String,
        gender: Gender,
    },
    NotExpected,
}

/// Result of the confirm button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Started { generation_id: String },
    NoQuota,
    /// Meme, name or gender missing; the flow was reset
    MissingData,
    CreationFailed,
}

enum Submission {
    Accepted(Generation),
    NoQuota,
    Failed,
}

pub struct ConversationEngine {
    sessions: Arc<dyn SessionStore>,
    db_pool: Arc<DbPool>,
    generation_api: Arc<dyn GenerationApi>,
    poller: Arc<GenerationPoller>,
    payments: Arc<PaymentService>,
    catalog: Arc<Catalog>,
}

impl ConversationEngine {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        db_pool: Arc<DbPool>,
        generation_api: Arc<dyn GenerationApi>,
        poller: Arc<GenerationPoller>,
        payments: Arc<PaymentService>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            sessions,
            db_pool,
            generation_api,
            poller,
            payments,
            catalog,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn payments(&self) -> &Arc<PaymentService> {
        &self.payments
    }

    /// Creates the user with the starting quota or refreshes the profile.
    ///
    /// Returns `true` for a new user.
    pub fn register_user(&self, profile: &UserProfile) -> AppResult<bool> {
        let conn = get_connection(&self.db_pool)?;
        if db::create_user(&conn, profile, *config::FREE_QUOTA)? {
            log::info!("New user {} ({:?})", profile.telegram_id, profile.username);
            return Ok(true);
        }
        db::update_profile(&conn, profile)?;
        Ok(false)
    }

    pub fn quota(&self, user_id: i64) -> AppResult<i64> {
        let conn = get_connection(&self.db_pool)?;
        Ok(db::get_user(&conn, user_id)?.map(|u| u.quota).unwrap_or(0))
    }

    /// idle → awaiting_name
    pub async fn select_meme(&self, chat_id: i64, user_id: i64, meme_id: &str) -> AppResult<SelectOutcome> {
        let Some(meme) = self.catalog.get(meme_id).cloned() else {
            return Ok(SelectOutcome::NotFound);
        };
        if !meme.is_available() {
            return Ok(SelectOutcome::ComingSoon(meme));
        }
        if self.quota(user_id)? <= 0 {
            return Ok(SelectOutcome::NoQuota);
        }

        self.sessions.clear_many(chat_id, &SessionField::GENERATION_FLOW).await;
        self.sessions
            .set(
                chat_id,
                SessionPatch {
                    waiting_for: Some(WaitingFor::Name),
                    meme_id: Some(meme.id.clone()),
                    selected_meme: Some(meme.name.clone()),
                    ..SessionPatch::default()
                },
            )
            .await;
        log::debug!("Chat {} selected meme {}", chat_id, meme.id);
        Ok(SelectOutcome::Selected(meme))
    }

    /// Enters awaiting_custom_prompt.
    pub async fn enter_custom_prompt(&self, chat_id: i64) {
        self.sessions
            .set(chat_id, SessionPatch::waiting_for(WaitingFor::CustomPrompt))
            .await;
    }

    /// Enters awaiting_free_prompt when the user has quota; returns whether it did.
    pub async fn enter_free_prompt(&self, chat_id: i64, user_id: i64) -> AppResult<bool> {
        if self.quota(user_id)? <= 0 {
            return Ok(false);
        }
        self.sessions
            .set(chat_id, SessionPatch::waiting_for(WaitingFor::FreePrompt))
            .await;
        Ok(true)
    }

    /// Remembers the package and asks for an e-mail; false for an unknown package.
    pub async fn enter_email(&self, chat_id: i64, package_key: &str) -> bool {
        if find_package(package_key).is_none() {
            return false;
        }
        self.sessions
            .set(
                chat_id,
                SessionPatch {
                    waiting_for: Some(WaitingFor::Email),
                    selected_package: Some(package_key.to_string()),
                    ..SessionPatch::default()
                },
            )
            .await;
        true
    }

    /// Dispatches free text on the current state.
    pub async fn handle_text(&self, chat_id: i64, user: &UserProfile, text: &str) -> AppResult<TextOutcome> {
        let session = self.sessions.get(chat_id).await;
        let state = session.state();

        match state {
            ConversationState::Idle => Ok(TextOutcome::Idle),
            ConversationState::AwaitingGender | ConversationState::AwaitingConfirmation => {
                Ok(TextOutcome::ExpectingButton(state))
            }
            ConversationState::AwaitingName => match validation::validate_name(text) {
                Ok(name) => {
                    self.sessions
                        .set(
                            chat_id,
                            SessionPatch {
                                waiting_for: Some(WaitingFor::Gender),
                                generation_name: Some(name.clone()),
                                ..SessionPatch::default()
                            },
                        )
                        .await;
                    Ok(TextOutcome::AskGender { name })
                }
                Err(error) => Ok(TextOutcome::Invalid { state, error }),
            },
            ConversationState::AwaitingCustomPrompt => match validation::validate_custom_prompt(text) {
                Ok(prompt) => self.submit_custom_prompt(chat_id, user, prompt).await,
                Err(error) => Ok(TextOutcome::Invalid { state, error }),
            },
            ConversationState::AwaitingFreePrompt => match validation::validate_free_prompt(text) {
                Ok(prompt) => self.submit_free_prompt(chat_id, user, prompt).await,
                Err(error) => Ok(TextOutcome::Invalid { state, error }),
            },
            ConversationState::AwaitingEmail => match validation::validate_email(text) {
                Ok(email) => self.submit_email(chat_id, user.telegram_id, session.selected_package, email).await,
                Err(_) => Ok(TextOutcome::EmailInvalid {
                    package_key: session.selected_package,
                }),
            },
        }
    }

    /// awaiting_gender → awaiting_confirmation; pressing again changes the gender.
    pub async fn choose_gender(&self, chat_id: i64, gender: Gender) -> GenderOutcome {
        let session = self.sessions.get(chat_id).await;
        if !matches!(
            session.state(),
            ConversationState::AwaitingGender | ConversationState::AwaitingConfirmation
        ) {
            return GenderOutcome::NotExpected;
        }
        let (Some(meme_name), Some(name)) = (session.selected_meme, session.generation_name) else {
            return GenderOutcome::NotExpected;
        };

        self.sessions
            .set(
                chat_id,
                SessionPatch {
                    generation_gender: Some(gender),
                    ..SessionPatch::default()
                },
            )
            .await;
        GenderOutcome::Confirm { meme_name, name, gender }
    }

    /// awaiting_confirmation → idle. The poller runs in a background task.
    pub async fn confirm_generation(&self, chat_id: i64, user: &UserProfile) -> AppResult<ConfirmOutcome> {
        let session = self.sessions.get(chat_id).await;
        let collected = match (
            session.state(),
            session.meme_id,
            session.generation_name,
            session.generation_gender,
        ) {
            (ConversationState::AwaitingConfirmation, Some(meme_id), Some(name), Some(gender)) => {
                Some((meme_id, name, gender))
            }
            _ => None,
        };
        let Some((meme_id, name, gender)) = collected else {
            self.sessions.clear_many(chat_id, &SessionField::GENERATION_FLOW).await;
            return Ok(ConfirmOutcome::MissingData);
        };

        let request = GenerationRequest {
            user_id: user.telegram_id,
            chat_id,
            meme_id: Some(meme_id),
            name: Some(name),
            gender: Some(gender),
            custom_prompt: None,
        };
        let submission = self.submit(request, session.selected_meme).await?;
        self.sessions.clear_many(chat_id, &SessionField::GENERATION_FLOW).await;

        match submission {
            Submission::NoQuota => Ok(ConfirmOutcome::NoQuota),
            Submission::Failed => Ok(ConfirmOutcome::CreationFailed),
            Submission::Accepted(generation) => {
                self.announce(chat_id, &generation).await;
                let poller = Arc::clone(&self.poller);
                let generation_id = generation.id.clone();
                tokio::spawn(async move {
                    poller.await_completion(&generation_id, chat_id).await;
                });
                Ok(ConfirmOutcome::Started {
                    generation_id: generation.id,
                })
            }
        }
    }

    async fn submit_custom_prompt(&self, chat_id: i64, user: &UserProfile, prompt: String) -> AppResult<TextOutcome> {
        let request = GenerationRequest {
            user_id: user.telegram_id,
            chat_id,
            custom_prompt: Some(prompt.clone()),
            ..GenerationRequest::default()
        };
        let submission = self.submit(request, None).await?;
        self.sessions.clear(chat_id, SessionField::WaitingFor).await;

        match submission {
            Submission::NoQuota => Ok(TextOutcome::NoQuota),
            Submission::Failed => Ok(TextOutcome::CreationFailed),
            Submission::Accepted(generation) => {
                self.sessions
                    .set(
                        chat_id,
                        SessionPatch {
                            custom_prompt_data: Some(CustomPromptData {
                                user_id: user.telegram_id,
                                username: user.username.clone(),
                                first_name: user.first_name.clone(),
                                prompt,
                                generation_id: generation.id.clone(),
                                timestamp: Utc::now(),
                            }),
                            ..SessionPatch::default()
                        },
                    )
                    .await;
                Ok(TextOutcome::PromptAccepted {
                    generation_id: generation.id,
                })
            }
        }
    }

    /// The state is cleared only after the poller returns.
    async fn submit_free_prompt(&self, chat_id: i64, user: &UserProfile, prompt: String) -> AppResult<TextOutcome> {
        let request = GenerationRequest {
            user_id: user.telegram_id,
            chat_id,
            custom_prompt: Some(prompt),
            ..GenerationRequest::default()
        };
        let outcome = match self.submit(request, None).await {
            Ok(Submission::Accepted(generation)) => {
                self.announce(chat_id, &generation).await;
                let outcome = self.poller.await_completion(&generation.id, chat_id).await;
                TextOutcome::FreeGenerationFinished {
                    generation_id: generation.id,
                    outcome,
                }
            }
            Ok(Submission::NoQuota) => TextOutcome::NoQuota,
            Ok(Submission::Failed) => TextOutcome::CreationFailed,
            Err(e) => {
                self.sessions.clear(chat_id, SessionField::WaitingFor).await;
                return Err(e);
            }
        };
        self.sessions.clear(chat_id, SessionField::WaitingFor).await;
        Ok(outcome)
    }

    async fn submit_email(
        &self,
        chat_id: i64,
        user_id: i64,
        package_key: Option<String>,
        email: String,
    ) -> AppResult<TextOutcome> {
        self.sessions
            .clear_many(chat_id, &[SessionField::WaitingFor, SessionField::SelectedPackage])
            .await;
        let Some(package_key) = package_key else {
            return Ok(TextOutcome::PaymentFailed);
        };

        self.sessions
            .set(
                chat_id,
                SessionPatch {
                    email: Some(email.clone()),
                    ..SessionPatch::default()
                },
            )
            .await;

        match self.payments.start_card_payment(user_id, &package_key, &email).await {
            Ok(started) => Ok(TextOutcome::PaymentCreated(started)),
            Err(e) => {
                log::error!("Card payment for user {} ({}) failed: {}", user_id, package_key, e);
                Ok(TextOutcome::PaymentFailed)
            }
        }
    }

    /// Deducts one generation, creates it on the backend and records it.
    ///
    /// Any failure after the deduction refunds it before returning.
    async fn submit(&self, request: GenerationRequest, meme_name: Option<String>) -> AppResult<Submission> {
        let user_id = request.user_id;
        match db::deduct_quota(&*get_connection(&self.db_pool)?, user_id) {
            Ok(()) => {}
            Err(AppError::InsufficientQuota(_)) => {
                log::info!("User {} has no generations left", user_id);
                return Ok(Submission::NoQuota);
            }
            Err(e) => return Err(e),
        }

        let generation_id = match self.generation_api.create(&request).await {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Generation request of user {} rejected: {}", user_id, e);
                self.refund(user_id);
                return Ok(Submission::Failed);
            }
        };

        match self.record(&generation_id, &request, meme_name) {
            Ok(generation) => {
                log::info!("Generation {} accepted for user {}", generation.id, user_id);
                Ok(Submission::Accepted(generation))
            }
            Err(e) => {
                self.refund(user_id);
                Err(e)
            }
        }
    }

    fn record(&self, generation_id: &str, request: &GenerationRequest, meme_name: Option<String>) -> AppResult<Generation> {
        let conn = get_connection(&self.db_pool)?;
        let new = NewGeneration {
            id: generation_id.to_string(),
            user_id: request.user_id,
            chat_id: request.chat_id,
            meme_id: request.meme_id.clone(),
            meme_name,
            name: request.name.clone(),
            gender: request.gender,
            custom_prompt: request.custom_prompt.clone(),
        };
        generations::create_generation(&conn, &new)?;
        generations::get_generation(&conn, generation_id)?
            .ok_or_else(|| AppError::NotFound(format!("generation {}", generation_id)))
    }

    fn refund(&self, user_id: i64) {
        let result = get_connection(&self.db_pool)
            .map_err(AppError::from)
            .and_then(|conn| db::refund_quota(&conn, user_id).map_err(AppError::from));
        match result {
            Ok(()) => log::info!("Refunded one generation to user {}", user_id),
            Err(e) => log::error!("Failed to refund user {}: {}", user_id, e),
        }
    }

    async fn announce(&self, chat_id: i64, generation: &Generation) {
        if let Err(e) = self.poller.reporter().generation_started(chat_id, generation).await {
            log::warn!("Failed to announce generation {}: {}", generation.id, e);
        }
    }
}
