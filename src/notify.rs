//! Outbound notifications.
//!
//! Broadcasts and referral confirmations go through [`Notifier`] so they
//! can run against the real bot or a recording fake.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode, UserId};

use crate::bot::dispatcher::ThrottledBot;
use crate::error::BotResult;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send an HTML-formatted message to a user's private chat.
    async fn notify(&self, user: UserId, html: &str) -> BotResult<()>;
}

#[async_trait]
impl Notifier for ThrottledBot {
    async fn notify(&self, user: UserId, html: &str) -> BotResult<()> {
        self.send_message(ChatId::from(user), html)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}
