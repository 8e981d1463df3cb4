//! Admin commands and the message panel.
//!
//! Authorization lives in [`AdminTools`](crate::admin::AdminTools); these
//! handlers only parse arguments and render results.

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode, User, UserId};
use tracing::info;

use super::{CallbackAction, alert, answer, report_error, show};
use crate::admin::{BroadcastReport, UserPage};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{PendingAction, UserStats};
use crate::error::BotError;
use crate::utils::{format_username, html_escape, parse_user_id, split_first_arg};

pub fn broadcast_report_text(report: &BroadcastReport) -> String {
    format!(
        "📊 <b>Broadcast Complete</b>\n\n\
         ✅ Sent: {}\n\
         ❌ Failed: {}\n\
         👥 Total users: {}",
        report.delivered,
        report.failed.len(),
        report.attempted
    )
}

pub fn stats_text(stats: &UserStats) -> String {
    if stats.total == 0 {
        return "📊 No users found in database".to_string();
    }

    let top = match &stats.top_referrer {
        Some((name, count)) => format!("{} ({} refs)", html_escape(name), count),
        None => "N/A".to_string(),
    };

    format!(
        "📊 <b>Bot Statistics</b>\n\n\
         👥 Total Users: {}\n\
         ✅ Verified: {} ({:.1}%)\n\
         📈 Total Referrals: {}\n\
         📊 Avg Referrals: {:.1}\n\
         🏆 Top Referrer: {}\n\n\
         🎯 Mining Bot Access: {} users",
        stats.total,
        stats.verified,
        stats.verified_percent(),
        stats.total_referrals,
        stats.average_referrals(),
        top,
        stats.mining_access,
    )
}

pub fn user_page_text(page: &UserPage) -> String {
    let mut text = format!(
        "👥 <b>Users</b> (page {}/{}, {} total)\n\n",
        page.page + 1,
        page.pages,
        page.total
    );

    let first = page.page * crate::admin::USERS_PER_PAGE + 1;
    for (i, user) in page.users.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} ({}) <code>{}</code> | {} refs | {}\n",
            first + i as i64,
            html_escape(&user.first_name),
            html_escape(&format_username(user.display_username())),
            user.user_id,
            user.referral_count,
            if user.verified { "✅" } else { "❌" },
        ));
    }
    text
}

pub fn user_page_keyboard(page: &UserPage) -> Option<InlineKeyboardMarkup> {
    let mut nav = Vec::new();
    if page.page > 0 {
        nav.push(InlineKeyboardButton::callback("⬅️ Prev", CallbackAction::UsersPage(page.page - 1).data()));
    }
    if page.page + 1 < page.pages {
        nav.push(InlineKeyboardButton::callback("Next ➡️", CallbackAction::UsersPage(page.page + 1).data()));
    }
    (!nav.is_empty()).then(|| InlineKeyboardMarkup::new(vec![nav]))
}

/// Zero-based page from the 1-based `/users` argument. Anything unusable
/// means the first page.
pub fn page_from_arg(arg: &str) -> i64 {
    arg.trim()
        .parse::<i64>()
        .map_or(0, |p| p.saturating_sub(1).max(0))
}

/// Broadcast and tell the admin how it went.
pub(crate) async fn run_broadcast(bot: &ThrottledBot, chat_id: ChatId, state: &AppState, caller: UserId, text: &str) -> anyhow::Result<()> {
    match state.admin.broadcast(caller, bot, text).await {
        Ok(report) => {
            bot.send_message(chat_id, broadcast_report_text(&report))
                .parse_mode(ParseMode::Html)
                .await?;
            Ok(())
        }
        Err(e) => report_error(bot, chat_id, e).await,
    }
}

/// Send one user a message and tell the admin how it went.
pub(crate) async fn run_direct(
    bot: &ThrottledBot,
    chat_id: ChatId,
    state: &AppState,
    caller: UserId,
    target: UserId,
    text: &str,
) -> anyhow::Result<()> {
    match state.admin.send_to(caller, bot, target, text).await {
        Ok(()) => {
            bot.send_message(chat_id, format!("✅ Message sent to user {target}")).await?;
            Ok(())
        }
        Err(e) => report_error(bot, chat_id, e).await,
    }
}

/// Handle the /broadcast command.
pub async fn broadcast_command(bot: ThrottledBot, msg: Message, user: User, state: AppState, text: String) -> anyhow::Result<()> {
    if let Err(e) = state.admin.authorize(user.id) {
        return report_error(&bot, msg.chat.id, e).await;
    }

    if text.trim().is_empty() {
        bot.send_message(
            msg.chat.id,
            "📢 <b>Broadcast to All Users</b>\n\n\
             Usage: <code>/broadcast your message here</code>\n\n\
             Example: <code>/broadcast Important update: New bots added!</code>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    run_broadcast(&bot, msg.chat.id, &state, user.id, &text).await
}

/// Handle the /reply command: `/reply <user id> <text>`.
pub async fn reply_command(bot: ThrottledBot, msg: Message, user: User, state: AppState, args: String) -> anyhow::Result<()> {
    if let Err(e) = state.admin.authorize(user.id) {
        return report_error(&bot, msg.chat.id, e).await;
    }

    let Some((raw_id, text)) = split_first_arg(&args).filter(|(_, text)| !text.is_empty()) else {
        bot.send_message(
            msg.chat.id,
            "Usage: <code>/reply user_id your message here</code>\n\
             Example: <code>/reply 123456789 Your issue has been resolved</code>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    };

    let Some(target) = parse_user_id(raw_id) else {
        bot.send_message(msg.chat.id, "❌ Invalid user ID format").await?;
        return Ok(());
    };

    run_direct(&bot, msg.chat.id, &state, user.id, target, text).await
}

/// Handle the /sendmessage command.
pub async fn sendmessage_command(bot: ThrottledBot, msg: Message, user: User, state: AppState) -> anyhow::Result<()> {
    if let Err(e) = state.admin.authorize(user.id) {
        return report_error(&bot, msg.chat.id, e).await;
    }

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📤 Send to Specific User", "admin_send_specific")],
        vec![InlineKeyboardButton::callback("📢 Send to All Users", "admin_send_all")],
        vec![InlineKeyboardButton::callback("❌ Cancel", "admin_cancel")],
    ]);

    bot.send_message(
        msg.chat.id,
        "👑 <b>Admin Message Panel</b>\n\nChoose how you want to send your message:",
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

pub async fn send_specific_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    if !state.is_admin(q.from.id) {
        return alert(&bot, &q, "❌ Admin only!").await;
    }

    answer(&bot, &q).await?;
    state.pending.set(q.from.id, &PendingAction::AwaitTarget).await?;
    show(
        &bot,
        &q,
        "👤 <b>Send to Specific User</b>\n\nPlease send the user ID (number only):",
        None,
    )
    .await
}

pub async fn send_all_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    if !state.is_admin(q.from.id) {
        return alert(&bot, &q, "❌ Admin only!").await;
    }

    answer(&bot, &q).await?;
    state.pending.set(q.from.id, &PendingAction::AwaitBroadcastText).await?;
    show(&bot, &q, "📢 <b>Send to All Users</b>\n\nPlease type your message:", None).await
}

pub async fn cancel_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    if !state.is_admin(q.from.id) {
        return alert(&bot, &q, "❌ Admin only!").await;
    }

    answer(&bot, &q).await?;
    state.pending.clear(q.from.id).await?;
    show(&bot, &q, "❌ Action cancelled.", None).await
}

/// Handle the /users command: `/users [page]`, pages start at 1.
pub async fn users_command(bot: ThrottledBot, msg: Message, user: User, state: AppState, args: String) -> anyhow::Result<()> {
    let page = page_from_arg(&args);

    match state.admin.list_users(user.id, page).await {
        Ok(page) => {
            let mut request = bot
                .send_message(msg.chat.id, user_page_text(&page))
                .parse_mode(ParseMode::Html);
            if let Some(keyboard) = user_page_keyboard(&page) {
                request = request.reply_markup(keyboard);
            }
            request.await?;
            Ok(())
        }
        Err(e) => report_error(&bot, msg.chat.id, e).await,
    }
}

pub async fn users_page_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState, page: i64) -> anyhow::Result<()> {
    match state.admin.list_users(q.from.id, page).await {
        Ok(page) => {
            answer(&bot, &q).await?;
            show(&bot, &q, user_page_text(&page), user_page_keyboard(&page)).await
        }
        Err(BotError::PermissionDenied(_)) => alert(&bot, &q, "❌ Admin only!").await,
        Err(e) => Err(e.into()),
    }
}

/// Handle the /stats command.
pub async fn stats_command(bot: ThrottledBot, msg: Message, user: User, state: AppState) -> anyhow::Result<()> {
    match state.admin.stats(user.id).await {
        Ok(stats) => {
            bot.send_message(msg.chat.id, stats_text(&stats))
                .parse_mode(ParseMode::Html)
                .await?;
            Ok(())
        }
        Err(e) => report_error(&bot, msg.chat.id, e).await,
    }
}

/// Handle the /export command: all user records as a CSV document.
pub async fn export_command(bot: ThrottledBot, msg: Message, user: User, state: AppState) -> anyhow::Result<()> {
    let (csv, rows) = match state.admin.export_csv(user.id).await {
        Ok(export) => export,
        Err(e) => return report_error(&bot, msg.chat.id, e).await,
    };

    let file_name = format!("users_export_{}.csv", Utc::now().format("%Y%m%d_%H%M"));
    bot.send_document(msg.chat.id, InputFile::memory(csv.into_bytes()).file_name(file_name))
        .caption(format!("📊 User export completed\nTotal users: {rows}"))
        .await?;

    info!("Exported {} users", rows);
    Ok(())
}

/// Handle the /backup command: back up now and send the file.
pub async fn backup_command(bot: ThrottledBot, msg: Message, user: User, state: AppState) -> anyhow::Result<()> {
    if let Err(e) = state.admin.authorize(user.id) {
        return report_error(&bot, msg.chat.id, e).await;
    }

    bot.send_message(msg.chat.id, "💾 Creating database backup...").await?;

    let path = match state.admin.backup(user.id).await {
        Ok(path) => path,
        Err(e) => return report_error(&bot, msg.chat.id, e).await,
    };

    bot.send_document(msg.chat.id, InputFile::file(path))
        .caption("💾 Database backup created successfully")
        .await?;
    Ok(())
}

/// Handle the /ban command: `/ban <user id> [reason]`.
pub async fn ban_command(bot: ThrottledBot, msg: Message, user: User, state: AppState, args: String) -> anyhow::Result<()> {
    if let Err(e) = state.admin.authorize(user.id) {
        return report_error(&bot, msg.chat.id, e).await;
    }

    let Some((raw_id, reason)) = split_first_arg(&args) else {
        bot.send_message(
            msg.chat.id,
            "Usage: <code>/ban user_id [reason]</code>\nExample: <code>/ban 123456789 Spam behavior</code>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    };

    let Some(target) = parse_user_id(raw_id) else {
        bot.send_message(msg.chat.id, "❌ Invalid user ID format").await?;
        return Ok(());
    };

    match state.admin.ban(user.id, &bot, target, reason).await {
        Ok(()) => {
            let reason = if reason.is_empty() { "No reason provided" } else { reason };
            bot.send_message(msg.chat.id, format!("✅ User {target} banned\nReason: {reason}"))
                .await?;
            Ok(())
        }
        Err(e) => report_error(&bot, msg.chat.id, e).await,
    }
}

/// Handle the /unban command: `/unban <user id>`.
pub async fn unban_command(bot: ThrottledBot, msg: Message, user: User, state: AppState, args: String) -> anyhow::Result<()> {
    if let Err(e) = state.admin.authorize(user.id) {
        return report_error(&bot, msg.chat.id, e).await;
    }

    let Some(target) = split_first_arg(&args).and_then(|(raw_id, _)| parse_user_id(raw_id)) else {
        bot.send_message(
            msg.chat.id,
            "Usage: <code>/unban user_id</code>\nExample: <code>/unban 123456789</code>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    };

    let reply = match state.admin.unban(user.id, &bot, target).await {
        Ok(true) => format!("✅ User {target} unbanned"),
        Ok(false) => format!("ℹ️ User {target} was not banned"),
        Err(e) => return report_error(&bot, msg.chat.id, e).await,
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::UserRecord;

    #[test]
    fn broadcast_report_counts() {
        let report = BroadcastReport {
            attempted: 4,
            delivered: 3,
            failed: vec![UserId(9)],
        };
        assert_eq!(
            broadcast_report_text(&report),
            "📊 <b>Broadcast Complete</b>\n\n✅ Sent: 3\n❌ Failed: 1\n👥 Total users: 4"
        );
    }

    #[test]
    fn users_page_argument_is_one_based_and_clamped() {
        assert_eq!(page_from_arg(""), 0);
        assert_eq!(page_from_arg("1"), 0);
        assert_eq!(page_from_arg(" 3 "), 2);
        assert_eq!(page_from_arg("0"), 0);
        assert_eq!(page_from_arg("abc"), 0);
        assert_eq!(page_from_arg(&i64::MIN.to_string()), 0);
        assert_eq!(page_from_arg(&i64::MAX.to_string()), i64::MAX - 1);
    }

    #[test]
    fn stats_text_formats_percentages() {
        let stats = UserStats {
            total: 4,
            verified: 3,
            total_referrals: 6,
            top_referrer: Some(("Ana".into(), 5)),
            mining_access: 1,
        };
        let text = stats_text(&stats);
        assert!(text.contains("Verified: 3 (75.0%)"));
        assert!(text.contains("Avg Referrals: 1.5"));
        assert!(text.contains("Top Referrer: Ana (5 refs)"));
        assert!(text.contains("Mining Bot Access: 1 users"));

        assert_eq!(stats_text(&UserStats::default()), "📊 No users found in database");
    }

    #[test]
    fn user_page_numbers_continue_across_pages() {
        let now = Utc::now();
        let user = UserRecord {
            user_id: 42,
            first_name: "Ana".into(),
            username: Some("ana".into()),
            custom_username: None,
            referral_count: 2,
            verified: true,
            referred_by: None,
            joined_at: now,
            last_check: None,
            last_seen: now,
        };
        let page = UserPage {
            page: 1,
            pages: 3,
            total: 41,
            users: vec![user],
        };

        let text = user_page_text(&page);
        assert!(text.contains("page 2/3, 41 total"));
        assert!(text.contains("21. Ana (@ana) <code>42</code> | 2 refs | ✅"));

        let keyboard = user_page_keyboard(&page).unwrap();
        assert_eq!(keyboard.inline_keyboard[0].len(), 2);

        let single = UserPage { page: 0, pages: 1, total: 1, users: vec![] };
        assert!(user_page_keyboard(&single).is_none());
    }
}
