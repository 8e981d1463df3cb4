//! Main menu, profile, referral and about screens.

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, User, UserId};

use super::{answer, show, start};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::catalog::{Catalog, catalog};
use crate::database::{PendingAction, UserRecord};
use crate::error::BotResult;
use crate::referral::ReferralCode;
use crate::utils::{format_username, html_escape, progress_bar};

const MENU_TEXT: &str = "🎮 <b>Main Menu</b> 🎮\n\nChoose a category:";

const ABOUT_TEXT: &str = "ℹ️ <b>About Earning Club Bot</b>\n\n\
Your ultimate crypto earning platform with:\n\
• 50+ verified earning bots\n\
• Instant withdrawal options\n\
• Premium mining opportunities\n\
• Referral rewards system\n\n\
Start small, earn big, and grow your crypto portfolio!\n\n\
💡 <b>Tip:</b> Invite friends to unlock more features!";

const SESSION_EXPIRED: &str = "❌ Session expired! Please verify again.";

pub fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("⬅️ Back", "main_menu")]])
}

/// Main menu buttons. Mining shows progress until it unlocks.
pub fn main_menu_keyboard(referrals: i64, mining_needed: i64) -> InlineKeyboardMarkup {
    let mining = if referrals >= mining_needed {
        InlineKeyboardButton::callback("⛏️ Mining Bots", "mining")
    } else {
        InlineKeyboardButton::callback(
            format!("🔒 Mining Bots ({referrals}/{mining_needed} refs)"),
            "mining_locked",
        )
    };

    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🆓 Withdrawable Bots", "withdraw")],
        vec![InlineKeyboardButton::callback("💎 Premium Bots", "premium")],
        vec![mining],
        vec![
            InlineKeyboardButton::callback("👤 Profile", "profile"),
            InlineKeyboardButton::callback("📤 Referral", "referral"),
        ],
        vec![InlineKeyboardButton::callback("ℹ️ About Us", "about")],
    ])
}

pub fn profile_text(record: &UserRecord, mining_needed: i64) -> String {
    format!(
        "👤 <b>Your Profile</b>\n\n\
         Name: {}\n\
         Username: {}\n\
         Join Date: {}\n\
         Referrals: {}\n\
         Mining: {}\n\
         Status: {}",
        html_escape(&record.first_name),
        html_escape(&format_username(record.display_username())),
        record.joined_at.format("%Y-%m-%d"),
        record.referral_count,
        progress_bar(record.referral_count, mining_needed),
        if record.verified { "✅ Verified" } else { "❌ Not Verified" },
    )
}

/// "Set Username" is offered only to users without a Telegram username.
pub fn profile_keyboard(record: &UserRecord) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if record.username.as_deref().is_none_or(str::is_empty) {
        rows.push(vec![InlineKeyboardButton::callback("📝 Set Username", "set_username")]);
    }
    rows.push(vec![InlineKeyboardButton::callback("⬅️ Back", "main_menu")]);
    InlineKeyboardMarkup::new(rows)
}

pub fn referral_text(referrals: i64, link: &str, catalog: &Catalog) -> String {
    let mut text = format!(
        "📤 <b>Referral Program</b>\n\n\
         Your referrals: {referrals}\n\n\
         🔗 Your referral link:\n\
         <code>{link}</code>\n\n\
         🎁 <b>Rewards:</b>\n\
         • {} refs = Unlock ALL withdrawal bots\n",
        catalog.all.referrals_needed,
    );
    for special in &catalog.special {
        text.push_str(&format!(
            "• {} refs = Unlock {}\n",
            special.referrals_needed,
            html_escape(&special.name)
        ));
    }
    text.push_str(&format!(
        "• {} refs = Unlock mining bots\n\nShare and earn together! 🚀",
        catalog.mining.referrals_needed
    ));
    text
}

/// The user's record when they may open the menu.
///
/// Membership is checked again when the last successful check is older
/// than the re-check window. A referral that becomes creditable here is
/// announced like any other.
pub async fn menu_access(bot: &ThrottledBot, state: &AppState, user: UserId) -> BotResult<Option<UserRecord>> {
    let Some(record) = state.users.get(user).await? else {
        return Ok(None);
    };

    let window = chrono::Duration::from_std(state.config.membership_recheck).unwrap_or_else(|_| chrono::Duration::zero());
    if record.verified && record.checked_within(window, Utc::now()) {
        return Ok(Some(record));
    }

    let outcome = state.referrals.verify(user, true).await?;
    if let Some(credit) = &outcome.credit {
        state.referrals.announce(bot, credit, &record.first_name).await;
    }
    if !outcome.is_verified() {
        return Ok(None);
    }
    state.users.get(user).await
}

/// Send the main menu as a new message.
pub async fn send_main_menu(bot: &ThrottledBot, state: &AppState, chat_id: ChatId, user: UserId) -> anyhow::Result<()> {
    let Some(record) = menu_access(bot, state, user).await? else {
        bot.send_message(chat_id, SESSION_EXPIRED)
            .reply_markup(start::channels_keyboard(state.verifier.channels()))
            .await?;
        return Ok(());
    };

    bot.send_message(chat_id, MENU_TEXT)
        .parse_mode(ParseMode::Html)
        .reply_markup(main_menu_keyboard(record.referral_count, catalog().mining.referrals_needed))
        .await?;
    Ok(())
}

/// Handle the /bots command.
pub async fn bots_command(bot: ThrottledBot, msg: Message, user: User, state: AppState) -> anyhow::Result<()> {
    send_main_menu(&bot, &state, msg.chat.id, user.id).await
}

pub async fn main_menu_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    answer(&bot, &q).await?;

    match menu_access(&bot, &state, q.from.id).await? {
        Some(record) => {
            let keyboard = main_menu_keyboard(record.referral_count, catalog().mining.referrals_needed);
            show(&bot, &q, MENU_TEXT, Some(keyboard)).await
        }
        None => {
            let keyboard = start::channels_keyboard(state.verifier.channels());
            show(&bot, &q, SESSION_EXPIRED, Some(keyboard)).await
        }
    }
}

pub async fn profile_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    answer(&bot, &q).await?;

    // Leaving the username prompt through "Cancel" lands here.
    state.pending.clear(q.from.id).await?;

    let Some(record) = state.users.get(q.from.id).await? else {
        return show(&bot, &q, "Please use /start first.", None).await;
    };
    let text = profile_text(&record, catalog().mining.referrals_needed);
    show(&bot, &q, text, Some(profile_keyboard(&record))).await
}

pub async fn referral_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    answer(&bot, &q).await?;

    let referrals = state
        .users
        .get(q.from.id)
        .await?
        .map_or(0, |record| record.referral_count);
    let link = ReferralCode::for_user(q.from.id).link(&state.bot_username);

    show(&bot, &q, referral_text(referrals, &link, catalog()), Some(back_keyboard())).await
}

pub async fn about_callback(bot: ThrottledBot, q: CallbackQuery) -> anyhow::Result<()> {
    answer(&bot, &q).await?;
    show(&bot, &q, ABOUT_TEXT, Some(back_keyboard())).await
}

/// Start the custom username flow.
pub async fn set_username_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    answer(&bot, &q).await?;
    state.pending.set(q.from.id, &PendingAction::SetUsername).await?;

    let cancel = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("❌ Cancel", "profile")]]);
    show(
        &bot,
        &q,
        "📝 <b>Set Your Username</b>\n\n\
         Please send your desired username (without @):\n\n\
         Example: <code>myusername</code>\n\n\
         Note: This will be stored in your profile for display purposes.",
        Some(cancel),
    )
    .await
}
