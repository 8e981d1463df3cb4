//! /start, /verify and /restart.
//!
//! The welcome flow: register the user, record a referral on first
//! contact, then either open the main menu or ask for the channels.

use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, User, UserId};
use tracing::info;

use super::menu;
use super::{answer, show};
use crate::bot::dispatcher::{AppState, FirstContact, ThrottledBot};
use crate::config::RequiredChannel;
use crate::database::Contact;
use crate::error::BotResult;
use crate::membership::Verification;
use crate::referral::VerifyOutcome;
use crate::utils::html_escape;

const WELCOME: &str = "🌟 <b>Welcome to Earning Club Bot!</b> 🌟\n\n\
Your complete crypto earning solution with:\n\
- 🆓 Free withdrawal bots\n\
- 💎 Premium earning platforms\n\
- ⛏️ Mining opportunities\n\n\
🔐 <b>Verification Required:</b> Join our channels to unlock all features!";

const UNLOCK_STEPS: &str = "🔑 <b>To unlock all features:</b>\n\n\
1️⃣ Join all our channels above\n\
2️⃣ Click 'Verify Membership' button\n\
3️⃣ Access all earning bots!";

const VERIFIED: &str = "✅ <b>Verification Successful!</b>\n\n\
Welcome to Earning Club! You now have access to all features.";

/// Join buttons for every channel with a public link, then "Verify".
pub fn channels_keyboard(channels: &[RequiredChannel]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = channels
        .iter()
        .filter_map(|channel| {
            let url = channel.url.clone()?;
            Some(vec![InlineKeyboardButton::url(format!("Join {}", channel.name), url)])
        })
        .collect();

    rows.push(vec![InlineKeyboardButton::callback("✅ Verify Membership", "verify")]);
    InlineKeyboardMarkup::new(rows)
}

/// Failure notice listing what is still missing.
pub fn verification_failed_text(verification: &Verification) -> String {
    let mut text = String::from("❌ <b>Verification Failed!</b>\n\nPlease join ALL channels first:\n");
    for name in &verification.missing {
        text.push_str(&format!("• {}\n", html_escape(name)));
    }
    if !verification.unavailable.is_empty() {
        text.push_str("\n⚠️ Could not check: ");
        text.push_str(&html_escape(&verification.unavailable.join(", ")));
        text.push('\n');
    }
    text.push_str("\nThen click 'Try Again'");
    text
}

fn retry_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🔄 Try Again", "verify")],
        vec![InlineKeyboardButton::callback("⬅️ Back to Channels", "show_channels")],
    ])
}

/// Handle the /start command.
pub async fn start_command(
    bot: ThrottledBot,
    msg: Message,
    user: User,
    state: AppState,
    first: FirstContact,
    payload: String,
) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    let outcome = state
        .referrals
        .start(&Contact::from(&user), &payload, first.0)
        .await?;

    if outcome.first_contact {
        info!("New user {} ({})", user.id, user.first_name);
    }
    announce(&bot, &state, &outcome.verify, &user.first_name).await;

    bot.send_message(chat_id, WELCOME)
        .parse_mode(ParseMode::Html)
        .await?;

    if outcome.verify.is_verified() {
        return menu::send_main_menu(&bot, &state, chat_id, user.id).await;
    }

    bot.send_message(chat_id, UNLOCK_STEPS)
        .parse_mode(ParseMode::Html)
        .reply_markup(channels_keyboard(state.verifier.channels()))
        .await?;
    Ok(())
}

/// Handle the /verify command.
pub async fn verify_command(bot: ThrottledBot, msg: Message, user: User, state: AppState) -> anyhow::Result<()> {
    let outcome = state.referrals.verify(user.id, true).await?;
    announce(&bot, &state, &outcome, &user.first_name).await;

    if outcome.is_verified() {
        bot.send_message(msg.chat.id, VERIFIED)
            .parse_mode(ParseMode::Html)
            .await?;
        return menu::send_main_menu(&bot, &state, msg.chat.id, user.id).await;
    }

    bot.send_message(msg.chat.id, verification_failed_text(&outcome.verification))
        .parse_mode(ParseMode::Html)
        .reply_markup(retry_keyboard())
        .await?;
    Ok(())
}

/// "Verify Membership" / "Try Again" button.
pub async fn verify_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    answer(&bot, &q).await?;

    let outcome = state.referrals.verify(q.from.id, true).await?;
    announce(&bot, &state, &outcome, &q.from.first_name).await;

    if !outcome.is_verified() {
        return show(&bot, &q, verification_failed_text(&outcome.verification), Some(retry_keyboard())).await;
    }

    show(&bot, &q, VERIFIED, None).await?;
    menu::send_main_menu(&bot, &state, ChatId::from(q.from.id), q.from.id).await
}

/// "Back to Channels" button.
pub async fn channels_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    answer(&bot, &q).await?;
    show(
        &bot,
        &q,
        "🔑 <b>Join Required Channels:</b>\n\nPlease join all channels below and then verify:",
        Some(channels_keyboard(state.verifier.channels())),
    )
    .await
}

/// Drop verification and any half-finished flow. Credits already granted
/// are kept.
pub async fn reset_session(state: &AppState, user: UserId) -> BotResult<()> {
    state.referrals.reset(user).await?;
    state.pending.clear(user).await
}

/// Handle the /restart command.
pub async fn restart_command(bot: ThrottledBot, msg: Message, user: User, state: AppState) -> anyhow::Result<()> {
    reset_session(&state, user.id).await?;
    info!("User {} reset their session", user.id);

    bot.send_message(
        msg.chat.id,
        "🔄 <b>Bot Restarted!</b>\n\nYour session has been reset. Please use /start to begin again.",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

async fn announce(bot: &ThrottledBot, state: &AppState, outcome: &VerifyOutcome, referred_name: &str) {
    if let Some(credit) = &outcome.credit {
        state.referrals.announce(bot, credit, referred_name).await;
    }
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;
    use crate::database::PendingAction;
    use crate::testing::{StaticChecker, app_state, channels, contact, memory_db};

    #[test]
    fn keyboard_has_join_buttons_then_verify() {
        let mut list = channels();
        list.push(RequiredChannel::parse("Private=-100123").unwrap());

        let keyboard = channels_keyboard(&list);
        let texts: Vec<&str> = keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| b.text.as_str())
            .collect();

        // The private channel has no link to join.
        assert_eq!(texts, vec!["Join First", "Join Second", "✅ Verify Membership"]);
        assert!(matches!(
            &keyboard.inline_keyboard[2][0].kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "verify"
        ));
    }

    #[test]
    fn failure_text_lists_missing_and_unreachable_channels() {
        let verification = Verification {
            missing: vec!["First".into()],
            unavailable: vec!["Second".into()],
        };
        let text = verification_failed_text(&verification);
        assert!(text.contains("• First"));
        assert!(text.contains("Could not check: Second"));
    }

    #[tokio::test]
    async fn restart_clears_verification_and_pending_flow() {
        let state = app_state(memory_db().await, StaticChecker::with_members([7]), |_| None);
        let user = UserId(7);

        state.users.ensure(&contact(7, "Ana")).await.unwrap();
        assert!(state.referrals.verify(user, true).await.unwrap().is_verified());
        state.pending.set(user, &PendingAction::SetUsername).await.unwrap();

        reset_session(&state, user).await.unwrap();

        let record = state.users.get(user).await.unwrap().unwrap();
        assert!(!record.verified);
        assert!(record.last_check.is_none());
        assert_eq!(state.pending.get(user).await.unwrap(), None);
    }
}
