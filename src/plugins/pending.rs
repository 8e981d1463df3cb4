//! Plain text answering an earlier prompt.
//!
//! Text with nothing pending is ignored.

use teloxide::prelude::*;
use teloxide::types::{ParseMode, User, UserId};
use tracing::debug;

use super::admin::{run_broadcast, run_direct};
use super::menu::{profile_keyboard, profile_text};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::catalog::catalog;
use crate::database::PendingAction;
use crate::utils::parse_user_id;

pub const MIN_USERNAME: usize = 3;
pub const MAX_USERNAME: usize = 32;

/// Normalize a custom username. The error is the reply to send.
pub fn validate_custom_username(text: &str) -> Result<&str, &'static str> {
    let name = text.trim();
    let name = name.strip_prefix('@').unwrap_or(name);

    let len = name.chars().count();
    if !(MIN_USERNAME..=MAX_USERNAME).contains(&len) {
        return Err("❌ Username must be 3-32 characters long.");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("❌ Username can only contain letters, numbers and underscores.");
    }
    Ok(name)
}

pub async fn pending_text(bot: ThrottledBot, msg: Message, user: User, state: AppState) -> anyhow::Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(action) = state.pending.get(user.id).await? else {
        return Ok(());
    };

    if action.is_admin_flow() && !state.is_admin(user.id) {
        debug!("Dropping admin flow {:?} for user {}", action, user.id);
        state.pending.clear(user.id).await?;
        return Ok(());
    }

    match action {
        PendingAction::SetUsername => {
            let name = match validate_custom_username(text) {
                Ok(name) => name,
                Err(reason) => {
                    bot.send_message(msg.chat.id, reason).await?;
                    return Ok(());
                }
            };

            state.users.set_custom_username(user.id, name).await?;
            state.pending.clear(user.id).await?;
            bot.send_message(msg.chat.id, format!("✅ Username set to: @{name}"))
                .await?;

            if let Some(record) = state.users.get(user.id).await? {
                bot.send_message(msg.chat.id, profile_text(&record, catalog().mining.referrals_needed))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(profile_keyboard(&record))
                    .await?;
            }
        }
        PendingAction::AwaitTarget => {
            let Some(target) = parse_user_id(text) else {
                bot.send_message(msg.chat.id, "❌ Invalid user ID. Please send a number only.")
                    .await?;
                return Ok(());
            };

            state
                .pending
                .set(user.id, &PendingAction::AwaitDirectText { target: target.0 })
                .await?;
            bot.send_message(
                msg.chat.id,
                format!("✅ User ID set: <code>{target}</code>\n\nNow please type your message:"),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        PendingAction::AwaitDirectText { target } => {
            state.pending.clear(user.id).await?;
            run_direct(&bot, msg.chat.id, &state, user.id, UserId(target), text).await?;
        }
        PendingAction::AwaitBroadcastText => {
            state.pending.clear(user.id).await?;
            run_broadcast(&bot, msg.chat.id, &state, user.id, text).await?;
        }
    }
    Ok(())
}
