//! Per-chat conversation session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{Gender, WaitingFor};

/// Snapshot of the last accepted custom prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPromptData {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub prompt: String,
    pub generation_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything remembered about a chat between updates.
///
/// `waiting_for` holds at most one expectation; setting a new one replaces the old.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub waiting_for: Option<WaitingFor>,
    /// Lead bot: normalized name awaiting confirmation
    pub pending_name: Option<String>,
    pub generation_name: Option<String>,
    pub generation_gender: Option<Gender>,
    pub meme_id: Option<String>,
    /// Display name of the selected catalog item
    pub selected_meme: Option<String>,
    pub selected_package: Option<String>,
    pub email: Option<String>,
    pub utm_source: Option<String>,
    pub custom_prompt_data: Option<CustomPromptData>,
}

/// Conversation state derived from the session fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    AwaitingName,
    AwaitingGender,
    /// Waiting for the confirm button; gender is already chosen
    AwaitingConfirmation,
    AwaitingCustomPrompt,
    AwaitingFreePrompt,
    AwaitingEmail,
}

impl Session {
    pub fn state(&self) -> ConversationState {
        match self.waiting_for {
            None => ConversationState::Idle,
            Some(WaitingFor::Name) => ConversationState::AwaitingName,
            Some(WaitingFor::Gender) if self.generation_gender.is_some() => ConversationState::AwaitingConfirmation,
            Some(WaitingFor::Gender) => ConversationState::AwaitingGender,
            Some(WaitingFor::CustomPrompt) => ConversationState::AwaitingCustomPrompt,
            Some(WaitingFor::FreePrompt) => ConversationState::AwaitingFreePrompt,
            Some(WaitingFor::Email) => ConversationState::AwaitingEmail,
        }
    }

    /// Merges a patch: every field present in the patch replaces the stored one.
    pub fn apply(&mut self, patch: SessionPatch) {
        let SessionPatch {
            waiting_for,
            pending_name,
            generation_name,
            generation_gender,
            meme_id,
            selected_meme,
            selected_package,
            email,
            utm_source,
            custom_prompt_data,
        } = patch;

        if waiting_for.is_some() {
            self.waiting_for = waiting_for;
        }
        if pending_name.is_some() {
            self.pending_name = pending_name;
        }
        if generation_name.is_some() {
            self.generation_name = generation_name;
        }
        if generation_gender.is_some() {
            self.generation_gender = generation_gender;
        }
        if meme_id.is_some() {
            self.meme_id = meme_id;
        }
        if selected_meme.is_some() {
            self.selected_meme = selected_meme;
        }
        if selected_package.is_some() {
            self.selected_package = selected_package;
        }
        if email.is_some() {
            self.email = email;
        }
        if utm_source.is_some() {
            self.utm_source = utm_source;
        }
        if custom_prompt_data.is_some() {
            self.custom_prompt_data = custom_prompt_data;
        }
    }

    pub fn clear(&mut self, field: SessionField) {
        match field {
            SessionField::WaitingFor => self.waiting_for = None,
            SessionField::PendingName => self.pending_name = None,
            SessionField::GenerationName => self.generation_name = None,
            SessionField::GenerationGender => self.generation_gender = None,
            SessionField::MemeId => self.meme_id = None,
            SessionField::SelectedMeme => self.selected_meme = None,
            SessionField::SelectedPackage => self.selected_package = None,
            SessionField::Email => self.email = None,
            SessionField::UtmSource => self.utm_source = None,
            SessionField::CustomPromptData => self.custom_prompt_data = None,
        }
    }
}

/// Partial session update for [`SessionStore::set`](crate::storage::sessions::SessionStore::set)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub waiting_for: Option<WaitingFor>,
    pub pending_name: Option<String>,
    pub generation_name: Option<String>,
    pub generation_gender: Option<Gender>,
    pub meme_id: Option<String>,
    pub selected_meme: Option<String>,
    pub selected_package: Option<String>,
    pub email: Option<String>,
    pub utm_source: Option<String>,
    pub custom_prompt_data: Option<CustomPromptData>,
}

impl SessionPatch {
    pub fn waiting_for(waiting_for: WaitingFor) -> Self {
        Self {
            waiting_for: Some(waiting_for),
            ..Self::default()
        }
    }
}

/// A single clearable session field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    WaitingFor,
    PendingName,
    GenerationName,
    GenerationGender,
    MemeId,
    SelectedMeme,
    SelectedPackage,
    Email,
    UtmSource,
    CustomPromptData,
}

impl SessionField {
    /// Fields collected by the catalog flow (meme → name → gender → confirm)
    pub const GENERATION_FLOW: [SessionField; 5] = [
        SessionField::WaitingFor,
        SessionField::MemeId,
        SessionField::SelectedMeme,
        SessionField::GenerationName,
        SessionField::GenerationGender,
    ];
}
