//! Referral codes carried in `/start` deep links.

use std::fmt;

use teloxide::types::UserId;

/// `ref_<referrer id>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferralCode(UserId);

impl ReferralCode {
    pub const PREFIX: &'static str = "ref_";

    pub fn for_user(user: UserId) -> Self {
        Self(user)
    }

    /// Parse a `/start` payload. Anything but `ref_<positive integer>` is
    /// not a referral code.
    pub fn parse(payload: &str) -> Option<Self> {
        let id = payload.trim().strip_prefix(Self::PREFIX)?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match id.parse::<u64>() {
            Ok(0) | Err(_) => None,
            Ok(id) => Some(Self(UserId(id))),
        }
    }

    pub fn referrer(&self) -> UserId {
        self.0
    }

    /// Deep link that starts the bot with this code.
    pub fn link(&self, bot_username: &str) -> String {
        format!("https://t.me/{}?start={}", bot_username, self)
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0.0)
    }
}
