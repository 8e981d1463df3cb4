//! Partner bot directory screens.
//!
//! Every screen needs the verified flag. Section entry points also re-check
//! membership live unless `DEV_MODE` is set; page turns do not.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::debug;

use super::{CallbackAction, alert, answer, show};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::catalog::{Catalog, PagedSection, catalog, listing_rows, paged_keyboard};
use crate::database::UserRecord;

fn back_row() -> Vec<InlineKeyboardButton> {
    vec![InlineKeyboardButton::callback("⬅️ Back", "main_menu")]
}

/// Free bots, then "ALL BOTS" once the user has enough referrals.
pub fn withdraw_keyboard(catalog: &Catalog, referrals: i64) -> InlineKeyboardMarkup {
    let mut rows = listing_rows(&catalog.free, 1);

    let needed = catalog.all.referrals_needed;
    rows.push(vec![if referrals >= needed {
        InlineKeyboardButton::callback("🌟 ALL BOTS", "all_bots")
    } else {
        InlineKeyboardButton::callback(format!("🔒 ALL BOTS ({referrals}/{needed} refs)"), "need_refs")
    }]);

    rows.push(back_row());
    InlineKeyboardMarkup::new(rows)
}

/// Premium bots, then the gated specials numbered after them.
pub fn premium_keyboard(catalog: &Catalog, referrals: i64) -> InlineKeyboardMarkup {
    let mut rows = listing_rows(&catalog.premium, 1);

    for (index, special) in catalog.special.iter().enumerate() {
        let number = catalog.premium.len() + index + 1;
        let unlocked = referrals >= special.referrals_needed;

        let button = match url::Url::parse(&special.url) {
            Ok(url) if unlocked => InlineKeyboardButton::url(format!("{number}. 🐝 {}", special.name), url),
            _ => InlineKeyboardButton::callback(
                format!(
                    "{number}. 🔒 {} ({referrals}/{} refs)",
                    special.name, special.referrals_needed
                ),
                CallbackAction::Locked(index).data(),
            ),
        };
        rows.push(vec![button]);
    }

    rows.push(back_row());
    InlineKeyboardMarkup::new(rows)
}

pub fn section_text(section: PagedSection, catalog: &Catalog) -> String {
    let title = match section {
        PagedSection::AllBots => "🌟 <b>All Withdrawable Bots</b>",
        PagedSection::Mining => "⛏️ <b>Mining Bots</b>",
    };
    format!(
        "{title}\n\nTotal: {} bots available",
        section.section(catalog).listings.len()
    )
}

/// The caller's record if they may browse the directory. Refusals are
/// answered with an alert; otherwise the query is left unanswered.
async fn directory_access(
    bot: &ThrottledBot,
    q: &CallbackQuery,
    state: &AppState,
    live: bool,
) -> anyhow::Result<Option<UserRecord>> {
    let record = state.users.get(q.from.id).await?.filter(|r| r.verified);

    let allowed = match &record {
        None => false,
        Some(_) if !live || state.config.dev_mode => true,
        Some(_) => state.verifier.verify_fresh(q.from.id).await.is_verified(),
    };

    if !allowed {
        debug!("Directory refused for user {}", q.from.id);
        if record.is_some() {
            state.users.set_verified(q.from.id, false).await?;
        }
        alert(bot, q, "❌ Please verify first!").await?;
        return Ok(None);
    }
    Ok(record)
}

async fn show_section(
    bot: &ThrottledBot,
    q: &CallbackQuery,
    record: &UserRecord,
    section: PagedSection,
    page: usize,
) -> anyhow::Result<()> {
    let catalog = catalog();
    let gate = section.section(catalog);

    if record.referral_count < gate.referrals_needed {
        let missing = gate.referrals_needed - record.referral_count;
        return alert(bot, q, format!("❌ Need {missing} more referrals!")).await;
    }

    answer(bot, q).await?;
    let keyboard = paged_keyboard(section, &gate.listings, page);
    show(bot, q, section_text(section, catalog), Some(keyboard)).await
}

pub async fn withdraw_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    let Some(record) = directory_access(&bot, &q, &state, true).await? else {
        return Ok(());
    };

    answer(&bot, &q).await?;
    show(
        &bot,
        &q,
        "🆓 <b>Withdrawable Bots</b>\n\nFree instant withdrawal bots:",
        Some(withdraw_keyboard(catalog(), record.referral_count)),
    )
    .await
}

pub async fn all_bots_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    let Some(record) = directory_access(&bot, &q, &state, false).await? else {
        return Ok(());
    };
    show_section(&bot, &q, &record, PagedSection::AllBots, 0).await
}

pub async fn premium_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    let Some(record) = directory_access(&bot, &q, &state, true).await? else {
        return Ok(());
    };

    let catalog = catalog();
    answer(&bot, &q).await?;
    show(
        &bot,
        &q,
        format!(
            "💎 <b>Premium Bots</b>\n\nTotal: {} premium bots available",
            catalog.premium.len() + catalog.special.len()
        ),
        Some(premium_keyboard(catalog, record.referral_count)),
    )
    .await
}

pub async fn mining_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    let Some(record) = directory_access(&bot, &q, &state, true).await? else {
        return Ok(());
    };
    show_section(&bot, &q, &record, PagedSection::Mining, 0).await
}

/// Prev/Next in a paged section.
pub async fn page_callback(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
    (section, page): (PagedSection, usize),
) -> anyhow::Result<()> {
    let Some(record) = directory_access(&bot, &q, &state, false).await? else {
        return Ok(());
    };
    show_section(&bot, &q, &record, section, page).await
}

pub async fn need_refs_callback(bot: ThrottledBot, q: CallbackQuery) -> anyhow::Result<()> {
    let needed = catalog().all.referrals_needed;
    alert(
        &bot,
        &q,
        format!("❌ You need {needed} referrals to unlock all bots! Use the referral menu to invite friends."),
    )
    .await
}

pub async fn mining_locked_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    let needed = catalog().mining.referrals_needed;
    let have = referral_count(&state, &q).await?;
    alert(
        &bot,
        &q,
        format!(
            "❌ Mining bots need {needed} referrals! You need {} more. Use referral menu to invite friends.",
            (needed - have).max(0)
        ),
    )
    .await
}

/// A locked special listing.
pub async fn locked_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState, index: usize) -> anyhow::Result<()> {
    let Some(special) = catalog().special.get(index) else {
        return alert(&bot, &q, "⚠️ Unknown action. Please try again.").await;
    };

    let have = referral_count(&state, &q).await?;
    alert(
        &bot,
        &q,
        format!(
            "🐝 To unlock {} you will have to refer {} friends! You need {} more referrals.",
            special.name,
            special.referrals_needed,
            (special.referrals_needed - have).max(0)
        ),
    )
    .await
}

async fn referral_count(state: &AppState, q: &CallbackQuery) -> anyhow::Result<i64> {
    Ok(state
        .users
        .get(q.from.id)
        .await?
        .map_or(0, |record| record.referral_count))
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;
    use crate::catalog::{GatedListing, Listing, Section};

    fn sample() -> Catalog {
        let listing = |name: &str| Listing {
            name: name.into(),
            url: format!("https://t.me/{name}"),
        };
        Catalog {
            free: vec![listing("Trx"), listing("Ton"), listing("Usd")],
            all: Section {
                referrals_needed: 2,
                listings: vec![listing("A"); 10],
            },
            premium: vec![listing("Gold")],
            special: vec![GatedListing {
                name: "CLICK BEE VIP".into(),
                url: "https://t.me/clickbee".into(),
                referrals_needed: 3,
            }],
            mining: Section {
                referrals_needed: 5,
                listings: vec![listing("M")],
            },
        }
    }

    fn last_callbacks(keyboard: &InlineKeyboardMarkup) -> Vec<Option<String>> {
        keyboard
            .inline_keyboard
            .iter()
            .map(|row| match &row[0].kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn all_bots_button_unlocks_at_threshold() {
        let catalog = sample();

        let locked = withdraw_keyboard(&catalog, 1);
        // Three free bots in two rows, then the gate and Back.
        assert_eq!(
            last_callbacks(&locked),
            vec![None, None, Some("need_refs".into()), Some("main_menu".into())]
        );
        assert_eq!(locked.inline_keyboard[2][0].text, "🔒 ALL BOTS (1/2 refs)");

        let open = withdraw_keyboard(&catalog, 2);
        assert_eq!(last_callbacks(&open)[2], Some("all_bots".into()));
    }

    #[test]
    fn special_listing_is_gated_per_entry() {
        let catalog = sample();

        let locked = premium_keyboard(&catalog, 2);
        assert_eq!(locked.inline_keyboard[1][0].text, "2. 🔒 CLICK BEE VIP (2/3 refs)");
        assert_eq!(last_callbacks(&locked)[1], Some("locked:0".into()));

        let open = premium_keyboard(&catalog, 3);
        assert_eq!(open.inline_keyboard[1][0].text, "2. 🐝 CLICK BEE VIP");
        assert!(matches!(open.inline_keyboard[1][0].kind, InlineKeyboardButtonKind::Url(_)));
    }

    #[test]
    fn section_text_counts_listings() {
        let catalog = sample();
        assert_eq!(
            section_text(PagedSection::AllBots, &catalog),
            "🌟 <b>All Withdrawable Bots</b>\n\nTotal: 10 bots available"
        );
    }
}
