//! Configuration module for Earning Club bot.
//!
//! Loads configuration from environment variables. Every value except the
//! token and the admin id has a default, so a bare `.env` with two lines is
//! enough to run the bot in polling mode.

use std::env;
use std::time::Duration;

use serde::Deserialize;
use teloxide::types::{ChatId, Recipient, UserId};
use thiserror::Error;
use url::Url;

/// Channels every user has to join before the bot unlocks anything.
const DEFAULT_CHANNELS: &str = "Earning Club Tele=@earningclubtele,\
Earning Club Latest=@earningclubletest,\
Soloaex=@soloaex";

/// Longest accepted membership re-check window (7 days).
const MAX_RECHECK_SECS: u64 = 7 * 24 * 60 * 60;

/// Errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Bot running mode
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

/// A channel the user must be a member of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredChannel {
    /// Display name used on join buttons.
    pub name: String,
    /// Chat identifier passed to `getChatMember`.
    pub chat: Recipient,
    /// Public link, if the channel has a username.
    pub url: Option<Url>,
}

impl RequiredChannel {
    /// Parse `Name=@handle`, `@handle` or a numeric chat id.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            name: "REQUIRED_CHANNELS",
            reason: format!("{raw:?}: {reason}"),
        };

        let (name, ident) = match raw.split_once('=') {
            Some((name, ident)) => (Some(name.trim()), ident.trim()),
            None => (None, raw.trim()),
        };

        if ident.is_empty() {
            return Err(invalid("empty channel identifier"));
        }

        if let Some(handle) = ident.strip_prefix('@') {
            if handle.is_empty() {
                return Err(invalid("empty channel username"));
            }
            let url = Url::parse(&format!("https://t.me/{handle}"))
                .map_err(|e| invalid(&e.to_string()))?;
            return Ok(Self {
                name: name.unwrap_or(handle).to_string(),
                chat: Recipient::ChannelUsername(ident.to_string()),
                url: Some(url),
            });
        }

        let id: i64 = ident
            .parse()
            .map_err(|_| invalid("expected @username or numeric chat id"))?;

        Ok(Self {
            name: name.unwrap_or(ident).to_string(),
            chat: Recipient::Id(ChatId(id)),
            url: None,
        })
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<Url>,
    pub webhook_secret: Option<String>,

    /// Bot username (without @) for referral links.
    /// Optional - will be fetched via getMe if not set.
    pub bot_username: Option<String>,

    /// The single user allowed to run admin commands.
    pub admin_id: UserId,

    /// Verbose logging; directory access trusts the stored verified flag.
    pub dev_mode: bool,

    /// Non-admin users only get a maintenance notice.
    pub maintenance_mode: bool,

    // Storage
    pub database_url: String,
    pub backup_dir: String,

    /// Port for the keep-alive server (and the webhook in webhook mode).
    pub port: u16,

    pub required_channels: Vec<RequiredChannel>,

    /// How long a positive membership check stays valid.
    pub membership_recheck: Duration,

    /// Messages a user may send per minute.
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = var("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        if bot_token.len() < 20 {
            return Err(ConfigError::Invalid {
                name: "BOT_TOKEN",
                reason: "token is too short".into(),
            });
        }

        let admin_id = var("ADMIN_ID")
            .ok_or(ConfigError::Missing("ADMIN_ID"))?
            .parse::<u64>()
            .map(UserId)
            .map_err(|e| ConfigError::Invalid {
                name: "ADMIN_ID",
                reason: e.to_string(),
            })?;

        let bot_mode = match var("BOT_MODE").map(|m| m.to_lowercase()).as_deref() {
            None | Some("polling") => BotMode::Polling,
            Some("webhook") => BotMode::Webhook,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "BOT_MODE",
                    reason: format!("unknown mode {other:?}"),
                });
            }
        };

        let webhook_url = var("WEBHOOK_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                    name: "WEBHOOK_URL",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            return Err(ConfigError::Missing("WEBHOOK_URL"));
        }

        let bot_username = var("BOT_USERNAME")
            .map(|s| s.trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty());

        let required_channels = var("REQUIRED_CHANNELS")
            .unwrap_or_else(|| DEFAULT_CHANNELS.to_string())
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(RequiredChannel::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let recheck_secs: u64 = parse_number(var("MEMBERSHIP_RECHECK_SECS"), "MEMBERSHIP_RECHECK_SECS", 3600)?;
        if recheck_secs > MAX_RECHECK_SECS {
            return Err(ConfigError::Invalid {
                name: "MEMBERSHIP_RECHECK_SECS",
                reason: format!("must be at most {MAX_RECHECK_SECS}"),
            });
        }

        if required_channels.is_empty() {
            return Err(ConfigError::Invalid {
                name: "REQUIRED_CHANNELS",
                reason: "at least one channel is required".into(),
            });
        }

        Ok(Self {
            bot_token,
            bot_mode,
            webhook_url,
            webhook_secret: var("WEBHOOK_SECRET"),
            bot_username,
            admin_id,
            dev_mode: parse_flag(var("DEV_MODE")),
            maintenance_mode: parse_flag(var("MAINTENANCE_MODE")),
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite://bot_data.db".to_string()),
            backup_dir: var("BACKUP_DIR").unwrap_or_else(|| "backups".to_string()),
            port: parse_number(var("PORT"), "PORT", 10000)?,
            required_channels,
            membership_recheck: Duration::from_secs(recheck_secs),
            rate_limit_per_minute: parse_number(
                var("RATE_LIMIT_PER_MINUTE"),
                "RATE_LIMIT_PER_MINUTE",
                10,
            )?,
        })
    }

    /// Check if a user is the configured admin.
    #[inline]
    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_id == user_id
    }
}

fn parse_flag(value: Option<String>) -> bool {
    matches!(
        value.map(|v| v.to_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}

fn parse_number<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const TOKEN: &str = "123456:ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_with_only_required_vars() {
        let config = load(&[("BOT_TOKEN", TOKEN), ("ADMIN_ID", "42")]).unwrap();

        assert_eq!(config.admin_id, UserId(42));
        assert_eq!(config.bot_mode, BotMode::Polling);
        assert_eq!(config.port, 10000);
        assert_eq!(config.database_url, "sqlite://bot_data.db");
        assert_eq!(config.rate_limit_per_minute, 10);
        assert_eq!(config.membership_recheck, Duration::from_secs(3600));
        assert!(!config.dev_mode);
        assert!(!config.maintenance_mode);
        assert_eq!(config.required_channels.len(), 3);
        assert_eq!(config.required_channels[0].name, "Earning Club Tele");
    }

    #[test]
    fn missing_token_is_reported() {
        let err = load(&[("ADMIN_ID", "42")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("BOT_TOKEN")));
    }

    #[test]
    fn non_numeric_admin_is_rejected() {
        let err = load(&[("BOT_TOKEN", TOKEN), ("ADMIN_ID", "admin")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ADMIN_ID", .. }));
    }

    #[test]
    fn webhook_mode_requires_url() {
        let err = load(&[("BOT_TOKEN", TOKEN), ("ADMIN_ID", "1"), ("BOT_MODE", "webhook")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WEBHOOK_URL")));
    }

    #[test]
    fn recheck_window_is_capped() {
        let week = load(&[("BOT_TOKEN", TOKEN), ("ADMIN_ID", "1"), ("MEMBERSHIP_RECHECK_SECS", "604800")])
            .unwrap();
        assert_eq!(week.membership_recheck, Duration::from_secs(604_800));

        let err = load(&[
            ("BOT_TOKEN", TOKEN),
            ("ADMIN_ID", "1"),
            ("MEMBERSHIP_RECHECK_SECS", "18446744073709551615"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MEMBERSHIP_RECHECK_SECS", .. }));
    }

    #[test]
    fn flags_accept_common_spellings() {
        let config = load(&[
            ("BOT_TOKEN", TOKEN),
            ("ADMIN_ID", "1"),
            ("DEV_MODE", "TRUE"),
            ("MAINTENANCE_MODE", "1"),
        ])
        .unwrap();
        assert!(config.dev_mode);
        assert!(config.maintenance_mode);
    }

    #[test]
    fn channel_entries_parse() {
        let named = RequiredChannel::parse("News=@club_news").unwrap();
        assert_eq!(named.name, "News");
        assert_eq!(named.chat, Recipient::ChannelUsername("@club_news".into()));
        assert_eq!(named.url.unwrap().as_str(), "https://t.me/club_news");

        let numeric = RequiredChannel::parse("-1001234").unwrap();
        assert_eq!(numeric.chat, Recipient::Id(ChatId(-1001234)));
        assert!(numeric.url.is_none());

        assert!(RequiredChannel::parse("Name=").is_err());
        assert!(RequiredChannel::parse("not a channel").is_err());
    }
}
