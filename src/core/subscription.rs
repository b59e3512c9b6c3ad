//! Channel subscription gate
//!
//! Answers one question: is this user currently in the required channel?
//! A single membership query, no retries. Any lookup error counts as "not subscribed".

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberStatus, Recipient};

use crate::core::error::AppResult;
use crate::core::types::MembershipStatus;

/// Source of channel membership information
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    async fn membership(&self, channel: &str, user_id: i64) -> AppResult<MembershipStatus>;
}

#[async_trait]
impl MembershipLookup for Bot {
    async fn membership(&self, channel: &str, user_id: i64) -> AppResult<MembershipStatus> {
        let member = self
            .get_chat_member(channel_recipient(channel), UserId(user_id as u64))
            .await?;

        Ok(match member.status() {
            ChatMemberStatus::Owner => MembershipStatus::Creator,
            ChatMemberStatus::Administrator => MembershipStatus::Administrator,
            ChatMemberStatus::Member => MembershipStatus::Member,
            ChatMemberStatus::Restricted => MembershipStatus::Restricted,
            ChatMemberStatus::Left => MembershipStatus::Left,
            ChatMemberStatus::Banned => MembershipStatus::Kicked,
        })
    }
}

/// Checks whether `user_id` is subscribed to `channel`.
///
/// Creator, administrator, member and restricted count as subscribed.
/// Left, kicked and lookup errors do not.
pub async fn is_subscribed(lookup: &dyn MembershipLookup, user_id: i64, channel: &str) -> bool {
    let channel = normalize_channel(channel);
    match lookup.membership(&channel, user_id).await {
        Ok(status) => {
            log::debug!("Membership of {} in {}: {}", user_id, channel, status);
            status.is_subscribed()
        }
        Err(e) => {
            log::error!("getChatMember failed for {} in {}: {}", user_id, channel, e);
            false
        }
    }
}

/// Normalizes a configured channel reference.
///
/// Accepts `@name`, `name`, `https://t.me/name` and numeric chat ids.
pub fn normalize_channel(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_link = trimmed
        .strip_prefix("https://t.me/")
        .or_else(|| trimmed.strip_prefix("http://t.me/"))
        .or_else(|| trimmed.strip_prefix("t.me/"))
        .unwrap_or(trimmed)
        .trim_end_matches('/');

    if without_link.parse::<i64>().is_ok() || without_link.starts_with('@') {
        without_link.to_string()
    } else {
        format!("@{}", without_link)
    }
}

/// Public link to a channel, when it has a username.
pub fn channel_link(channel: &str) -> Option<String> {
    let normalized = normalize_channel(channel);
    normalized
        .strip_prefix('@')
        .map(|name| format!("https://t.me/{}", name))
}

fn channel_recipient(channel: &str) -> Recipient {
    match channel.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(channel.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_channel() {
        assert_eq!(normalize_channel("@memes"), "@memes");
        assert_eq!(normalize_channel("memes"), "@memes");
        assert_eq!(normalize_channel(" https://t.me/memes/ "), "@memes");
        assert_eq!(normalize_channel("-1001234567890"), "-1001234567890");
    }

    #[test]
    fn test_channel_link() {
        assert_eq!(channel_link("@memes").as_deref(), Some("https://t.me/memes"));
        assert_eq!(channel_link("-1001234567890"), None);
    }
}
