//! Single-channel membership lookup.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, Recipient, UserId};

use crate::error::BotResult;

/// Answers "is this user in that channel right now".
#[async_trait]
pub trait MembershipChecker: Send + Sync {
    async fn is_member(&self, channel: &Recipient, user: UserId) -> BotResult<bool>;
}

#[async_trait]
impl MembershipChecker for Bot {
    async fn is_member(&self, channel: &Recipient, user: UserId) -> BotResult<bool> {
        let member = self.get_chat_member(channel.clone(), user).await?;
        Ok(matches!(
            member.kind,
            ChatMemberKind::Owner(_) | ChatMemberKind::Administrator(_) | ChatMemberKind::Member
        ))
    }
}
