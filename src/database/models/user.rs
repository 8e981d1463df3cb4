//! User record model.
//!
//! One row per Telegram user that ever talked to the bot.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use teloxide::types::{User, UserId};

/// Stored user record.
#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct UserRecord {
    /// Telegram user ID.
    pub user_id: i64,
    pub first_name: String,
    /// Telegram username without @.
    pub username: Option<String>,
    /// Username picked through the profile flow, shown instead of `username`.
    pub custom_username: Option<String>,
    /// Number of credited referrals. Only the referral ledger changes it.
    pub referral_count: i64,
    pub verified: bool,
    /// Referrer resolved from the first /start payload.
    pub referred_by: Option<i64>,
    pub joined_at: DateTime<Utc>,
    /// Last successful membership check.
    pub last_check: Option<DateTime<Utc>>,
    pub last_seen: DateTime<Utc>,
}

impl UserRecord {
    /// Username to display: the custom one wins over Telegram's.
    pub fn display_username(&self) -> Option<&str> {
        self.custom_username
            .as_deref()
            .or(self.username.as_deref())
    }

    /// Whether the last membership check happened within `window`.
    pub fn checked_within(&self, window: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.last_check.is_some_and(|at| now - at <= window)
    }
}

/// Profile data taken from an inbound update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub id: UserId,
    pub first_name: String,
    pub username: Option<String>,
}

impl From<&User> for Contact {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            username: user.username.clone(),
        }
    }
}

/// Aggregates shown by /stats and the daily report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserStats {
    pub total: i64,
    pub verified: i64,
    pub total_referrals: i64,
    /// First name and referral count of the user with most referrals.
    pub top_referrer: Option<(String, i64)>,
    /// Users at or above the mining threshold.
    pub mining_access: i64,
}

impl UserStats {
    pub fn verified_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.verified as f64 * 100.0 / self.total as f64
        }
    }

    pub fn average_referrals(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.total_referrals as f64 / self.total as f64
        }
    }
}
