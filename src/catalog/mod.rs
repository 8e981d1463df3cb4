//! Partner bot directory.
//!
//! The catalog is embedded at compile time from `partners.json` and parsed
//! once on first use.

use once_cell::sync::Lazy;
use serde::Deserialize;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::warn;
use url::Url;

/// Entries per directory page.
pub const PAGE_SIZE: usize = 8;

/// Buttons per keyboard row.
const ROW_WIDTH: usize = 2;

static CATALOG: Lazy<Catalog> = Lazy::new(|| {
    serde_json::from_str(include_str!("partners.json")).unwrap_or_else(|e| {
        warn!("Embedded partner catalog is invalid: {}", e);
        Catalog::default()
    })
});

/// The embedded catalog.
pub fn catalog() -> &'static Catalog {
    &CATALOG
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Listing {
    pub name: String,
    pub url: String,
}

impl Listing {
    fn parsed_url(&self) -> Option<Url> {
        match Url::parse(&self.url) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Skipping partner {} with bad url: {}", self.name, e);
                None
            }
        }
    }
}

/// A listing with its own referral requirement.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GatedListing {
    pub name: String,
    pub url: String,
    pub referrals_needed: i64,
}

/// A section that unlocks as a whole.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Section {
    pub referrals_needed: i64,
    pub listings: Vec<Listing>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Catalog {
    /// Free withdrawal bots, open to every verified user.
    pub free: Vec<Listing>,
    pub all: Section,
    pub premium: Vec<Listing>,
    pub special: Vec<GatedListing>,
    pub mining: Section,
}

/// Paginated sections, addressed by callback data `<key>_page_<n>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagedSection {
    AllBots,
    Mining,
}

impl PagedSection {
    pub fn key(self) -> &'static str {
        match self {
            Self::AllBots => "all_bots",
            Self::Mining => "mining_bots",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "all_bots" => Some(Self::AllBots),
            "mining_bots" => Some(Self::Mining),
            _ => None,
        }
    }

    pub fn section(self, catalog: &Catalog) -> &Section {
        match self {
            Self::AllBots => &catalog.all,
            Self::Mining => &catalog.mining,
        }
    }
}

/// Number of pages needed for `len` entries.
pub fn page_count(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE).max(1)
}

fn back_row() -> Vec<InlineKeyboardButton> {
    vec![InlineKeyboardButton::callback("⬅️ Back", "main_menu")]
}

/// Numbered URL buttons, two per row. Numbering starts at `first_number`.
pub fn listing_rows(listings: &[Listing], first_number: usize) -> Vec<Vec<InlineKeyboardButton>> {
    let buttons: Vec<InlineKeyboardButton> = listings
        .iter()
        .enumerate()
        .filter_map(|(i, listing)| {
            let url = listing.parsed_url()?;
            Some(InlineKeyboardButton::url(
                format!("{}. {}", first_number + i, listing.name),
                url,
            ))
        })
        .collect();

    buttons.chunks(ROW_WIDTH).map(<[_]>::to_vec).collect()
}

/// One page of a paged section, with Prev/Next where a neighbour exists and
/// a Back button. Out of range pages are clamped.
pub fn paged_keyboard(section: PagedSection, listings: &[Listing], page: usize) -> InlineKeyboardMarkup {
    let pages = page_count(listings.len());
    let page = page.min(pages - 1);
    let start = page * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(listings.len());

    let mut rows = listing_rows(&listings[start..end], start + 1);

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(InlineKeyboardButton::callback(
            "⬅️ Prev",
            format!("{}_page_{}", section.key(), page - 1),
        ));
    }
    if page + 1 < pages {
        nav.push(InlineKeyboardButton::callback(
            "Next ➡️",
            format!("{}_page_{}", section.key(), page + 1),
        ));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    rows.push(back_row());
    InlineKeyboardMarkup::new(rows)
}
