//! /request: forward a support request to the admin.

use teloxide::prelude::*;
use teloxide::types::{ParseMode, User};
use tracing::{error, info};

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::notify::Notifier;
use crate::utils::{format_username, html_escape};

pub const MIN_REQUEST: usize = 3;
pub const MAX_REQUEST: usize = 1000;

const USAGE: &str = "💬 <b>Send a Request to Admin</b>\n\n\
Usage: <code>/request your message here</code>\n\n\
Example: <code>/request I need help with withdrawal</code>";

/// Check a request's length. The error is the reply to send.
pub fn validate_request(text: &str) -> Result<&str, &'static str> {
    let text = text.trim();
    let len = text.chars().count();
    if len > MAX_REQUEST {
        return Err("❌ Message too long! Please keep it under 1000 characters.");
    }
    if len < MIN_REQUEST {
        return Err("❌ Message too short! Please provide more details.");
    }
    Ok(text)
}

/// What the admin receives, with a ready-made reply line.
pub fn admin_notice(user: &User, text: &str) -> String {
    format!(
        "📩 <b>New User Request</b>\n\n\
         👤 From: {} ({})\n\
         🆔 ID: <code>{}</code>\n\
         📝 Message: {}\n\n\
         Reply with: <code>/reply {} your response</code>",
        html_escape(&user.first_name),
        html_escape(&format_username(user.username.as_deref())),
        user.id,
        html_escape(text),
        user.id,
    )
}

/// Handle the /request command.
pub async fn request_command(
    bot: ThrottledBot,
    msg: Message,
    user: User,
    state: AppState,
    text: String,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        bot.send_message(msg.chat.id, USAGE)
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    let text = match validate_request(&text) {
        Ok(text) => text,
        Err(reason) => {
            bot.send_message(msg.chat.id, reason).await?;
            return Ok(());
        }
    };

    let reply = match bot.notify(state.admin.admin_id(), &admin_notice(&user, text)).await {
        Ok(()) => {
            info!("Request sent from user {}: {:.50}", user.id, text);
            "✅ Your request has been sent to admin!\nYou'll receive a reply soon."
        }
        Err(e) => {
            error!("Failed to send request from user {}: {}", user.id, e);
            "❌ Failed to send request. Please try again later."
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
