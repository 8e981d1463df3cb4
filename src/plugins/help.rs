//! /help, the unknown-command reply and the command menu.

use teloxide::prelude::*;
use teloxide::types::{BotCommand, ParseMode};

use crate::bot::dispatcher::ThrottledBot;
use crate::error::BotError;
use crate::utils::html_escape;

const HELP_TEXT: &str = "🤖 <b>Bot Commands Help</b>\n\n\
📌 <b>Available Commands:</b>\n\
• <code>/start</code> - Start the bot and access main menu\n\
• <code>/verify</code> - Check your channel membership\n\
• <code>/bots</code> - Browse partner bots\n\
• <code>/help</code> - Show this help message\n\
• <code>/request</code> - Send a message to admin\n\
• <code>/restart</code> - Restart your bot session\n\n\
💡 <b>How to use:</b>\n\
1. Join our channels to get verified\n\
2. Use referrals to unlock more bots\n\
3. Use /request to contact admin for support\n\n\
🔗 <b>Quick Access:</b>\n\
Use /start to return to main menu anytime!";

/// Commands shown in the Telegram command menu.
pub fn menu_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Start the bot and access main menu"),
        BotCommand::new("verify", "Check your channel membership"),
        BotCommand::new("bots", "Browse partner bots"),
        BotCommand::new("help", "Show help information"),
        BotCommand::new("request", "Send a message to admin"),
        BotCommand::new("restart", "Restart your bot session"),
        BotCommand::new("stats", "Show bot statistics (Admin only)"),
        BotCommand::new("export", "Export user data (Admin only)"),
        BotCommand::new("backup", "Backup database (Admin only)"),
        BotCommand::new("ban", "Ban a user (Admin only)"),
        BotCommand::new("unban", "Unban a user (Admin only)"),
    ]
}

/// Handle the /help command.
pub async fn help_command(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, HELP_TEXT)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub fn unknown_command_text(command: &str) -> String {
    let error = BotError::UnknownCommand(command.to_string());
    format!(
        "<b>{}</b>\n\n\
         Available commands:\n\
         • <code>/start</code> - Start the bot\n\
         • <code>/help</code> - Show help\n\
         • <code>/request</code> - Contact admin\n\
         • <code>/restart</code> - Restart session\n\n\
         Use <code>/help</code> for more information.",
        html_escape(&error.user_message())
    )
}

/// Reply to a slash command nobody handles.
pub async fn unknown_command(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    let command = msg
        .text()
        .and_then(|t| t.split_whitespace().next())
        .unwrap_or("/");

    bot.send_message(msg.chat.id, unknown_command_text(command))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}
