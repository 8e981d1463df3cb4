//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding the handler to `command_handler()` or `callback_handler()`

pub mod admin;
pub mod callbacks;
pub mod directory;
pub mod help;
pub mod menu;
pub mod pending;
pub mod request;
pub mod start;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use crate::bot::dispatcher::ThrottledBot;
use crate::error::BotError;

pub use callbacks::CallbackAction;

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and access main menu")]
    Start(String),

    #[command(description = "Check your channel membership")]
    Verify,

    #[command(description = "Browse partner bots")]
    Bots,

    #[command(description = "Show help information")]
    Help,

    #[command(description = "Send a message to admin")]
    Request(String),

    #[command(description = "Restart your bot session")]
    Restart,

    // Admin commands
    #[command(description = "Broadcast to all users (Admin only)")]
    Broadcast(String),

    #[command(description = "Reply to a user (Admin only)")]
    Reply(String),

    #[command(description = "Open the message panel (Admin only)")]
    Sendmessage,

    #[command(description = "List users (Admin only)")]
    Users(String),

    #[command(description = "Show bot statistics (Admin only)")]
    Stats,

    #[command(description = "Export user data (Admin only)")]
    Export,

    #[command(description = "Backup database (Admin only)")]
    Backup,

    #[command(description = "Ban a user (Admin only)")]
    Ban(String),

    #[command(description = "Unban a user (Admin only)")]
    Unban(String),
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start(payload)].endpoint(start::start_command))
        .branch(case![Command::Verify].endpoint(start::verify_command))
        .branch(case![Command::Bots].endpoint(menu::bots_command))
        .branch(case![Command::Help].endpoint(help::help_command))
        .branch(case![Command::Request(text)].endpoint(request::request_command))
        .branch(case![Command::Restart].endpoint(start::restart_command))
        // Admin
        .branch(case![Command::Broadcast(text)].endpoint(admin::broadcast_command))
        .branch(case![Command::Reply(args)].endpoint(admin::reply_command))
        .branch(case![Command::Sendmessage].endpoint(admin::sendmessage_command))
        .branch(case![Command::Users(args)].endpoint(admin::users_command))
        .branch(case![Command::Stats].endpoint(admin::stats_command))
        .branch(case![Command::Export].endpoint(admin::export_command))
        .branch(case![Command::Backup].endpoint(admin::backup_command))
        .branch(case![Command::Ban(args)].endpoint(admin::ban_command))
        .branch(case![Command::Unban(args)].endpoint(admin::unban_command))
}

/// Slash-prefixed messages that did not parse as a [`Command`].
pub fn unknown_command_handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
        .endpoint(help::unknown_command)
}

/// Plain text goes to the sender's pending flow, if any.
pub fn text_handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(pending::pending_text)
}

/// Build the callback query handler.
pub fn callback_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    let actions = dptree::filter_map(|q: CallbackQuery| q.data.as_deref().and_then(CallbackAction::parse))
        .branch(case![CallbackAction::Verify].endpoint(start::verify_callback))
        .branch(case![CallbackAction::ShowChannels].endpoint(start::channels_callback))
        .branch(case![CallbackAction::MainMenu].endpoint(menu::main_menu_callback))
        .branch(case![CallbackAction::Profile].endpoint(menu::profile_callback))
        .branch(case![CallbackAction::Referral].endpoint(menu::referral_callback))
        .branch(case![CallbackAction::About].endpoint(menu::about_callback))
        .branch(case![CallbackAction::SetUsername].endpoint(menu::set_username_callback))
        .branch(case![CallbackAction::Withdraw].endpoint(directory::withdraw_callback))
        .branch(case![CallbackAction::AllBots].endpoint(directory::all_bots_callback))
        .branch(case![CallbackAction::Premium].endpoint(directory::premium_callback))
        .branch(case![CallbackAction::Mining].endpoint(directory::mining_callback))
        .branch(case![CallbackAction::Page { section, page }].endpoint(directory::page_callback))
        .branch(case![CallbackAction::NeedRefs].endpoint(directory::need_refs_callback))
        .branch(case![CallbackAction::MiningLocked].endpoint(directory::mining_locked_callback))
        .branch(case![CallbackAction::Locked(index)].endpoint(directory::locked_callback))
        .branch(case![CallbackAction::AdminSendSpecific].endpoint(admin::send_specific_callback))
        .branch(case![CallbackAction::AdminSendAll].endpoint(admin::send_all_callback))
        .branch(case![CallbackAction::AdminCancel].endpoint(admin::cancel_callback))
        .branch(case![CallbackAction::UsersPage(page)].endpoint(admin::users_page_callback));

    dptree::entry()
        .branch(actions)
        .branch(dptree::endpoint(unknown_callback))
}

async fn unknown_callback(bot: ThrottledBot, q: CallbackQuery) -> anyhow::Result<()> {
    debug!("Unknown callback data from {}: {:?}", q.from.id, q.data);
    alert(&bot, &q, "⚠️ Unknown action. Please try again.").await
}

/// Acknowledge a button press without a notice.
pub(crate) async fn answer(bot: &ThrottledBot, q: &CallbackQuery) -> anyhow::Result<()> {
    bot.answer_callback_query(&q.id).await?;
    Ok(())
}

/// Answer a button press with a popup.
pub(crate) async fn alert(bot: &ThrottledBot, q: &CallbackQuery, text: impl Into<String>) -> anyhow::Result<()> {
    bot.answer_callback_query(&q.id)
        .text(text)
        .show_alert(true)
        .await?;
    Ok(())
}

/// Replace the pressed message with `text`, or send a new message when the
/// pressed message is no longer accessible.
pub(crate) async fn show(
    bot: &ThrottledBot,
    q: &CallbackQuery,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> anyhow::Result<()> {
    let text = text.into();

    let Some(message) = &q.message else {
        let mut request = bot.send_message(q.from.id, text).parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await?;
        return Ok(());
    };

    let mut request = bot
        .edit_message_text(message.chat().id, message.id(), text)
        .parse_mode(ParseMode::Html);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }

    match request.await {
        Ok(_) => Ok(()),
        // Pressing the same button twice.
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Reply with the user-facing form of `error`. Internal failures are logged.
pub(crate) async fn report_error(bot: &ThrottledBot, chat_id: ChatId, error: BotError) -> anyhow::Result<()> {
    match &error {
        BotError::PermissionDenied(_) | BotError::InvalidInput(_) | BotError::UnknownCommand(_) => {
            debug!("Command in chat {} rejected: {}", chat_id, error);
        }
        _ => warn!("Command in chat {} failed: {}", chat_id, error),
    }

    bot.send_message(chat_id, error.user_message()).await?;
    Ok(())
}
