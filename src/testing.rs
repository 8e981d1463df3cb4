//! Fixtures shared by unit tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use teloxide::types::{Recipient, UserId};
use teloxide::{ApiError, RequestError};

use crate::bot::dispatcher::AppState;
use crate::config::{Config, RequiredChannel};
use crate::database::{Contact, Database};
use crate::error::{BotError, BotResult};
use crate::membership::MembershipChecker;
use crate::notify::Notifier;

pub async fn memory_db() -> Database {
    Database::in_memory().await.expect("in-memory database")
}

/// Database file inside `dir`, for code that needs real files (backups).
pub async fn file_db(dir: &Path) -> Database {
    let url = format!("sqlite://{}", dir.join("live.db").display());
    Database::connect(&url).await.expect("file database")
}

pub fn contact(id: u64, first_name: &str) -> Contact {
    Contact {
        id: UserId(id),
        first_name: first_name.to_string(),
        username: None,
    }
}

/// Admin 1, the two test channels, plus any `overrides`.
pub fn config(overrides: impl Fn(&str) -> Option<String>) -> Config {
    Config::from_lookup(|key| {
        overrides(key).or_else(|| match key {
            "BOT_TOKEN" => Some("123456:TEST-TOKEN-abcdefghijklmnop".to_string()),
            "ADMIN_ID" => Some("1".to_string()),
            "REQUIRED_CHANNELS" => Some("First=@first,Second=@second".to_string()),
            "BACKUP_DIR" => Some(std::env::temp_dir().join("earning-club-bot-tests").display().to_string()),
            _ => None,
        })
    })
    .expect("valid test config")
}

/// Application state over `db` and a fake membership checker.
pub fn app_state(
    db: Database,
    checker: StaticChecker,
    overrides: impl Fn(&str) -> Option<String>,
) -> AppState {
    AppState::with_checker(
        Arc::new(checker),
        Arc::new(config(overrides)),
        &db,
        "earning_club_bot".to_string(),
    )
}

/// Two channels, `@first` and `@second`.
pub fn channels() -> Vec<RequiredChannel> {
    vec![
        RequiredChannel::parse("First=@first").expect("valid channel"),
        RequiredChannel::parse("Second=@second").expect("valid channel"),
    ]
}

fn channel_key(channel: &Recipient) -> String {
    match channel {
        Recipient::ChannelUsername(name) => name.clone(),
        Recipient::Id(id) => id.to_string(),
    }
}

/// Membership checker backed by an in-memory member list.
pub struct StaticChecker {
    members: Mutex<HashSet<u64>>,
    left: Mutex<HashSet<(String, u64)>>,
    failing: bool,
}

impl StaticChecker {
    /// Users that are in every channel.
    pub fn with_members(members: impl IntoIterator<Item = u64>) -> Self {
        Self {
            members: Mutex::new(members.into_iter().collect()),
            left: Mutex::new(HashSet::new()),
            failing: false,
        }
    }

    /// Every lookup fails like an unreachable API.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::with_members([])
        }
    }

    pub fn admit(&self, user: u64) {
        self.members.lock().insert(user);
    }

    pub fn remove(&self, user: u64) {
        self.members.lock().remove(&user);
    }

    /// Remove a member from one channel only.
    pub fn leave(&self, channel: &str, user: u64) {
        self.left.lock().insert((channel.to_string(), user));
    }
}

#[async_trait]
impl MembershipChecker for StaticChecker {
    async fn is_member(&self, channel: &Recipient, user: UserId) -> BotResult<bool> {
        if self.failing {
            return Err(BotError::ExternalApi(RequestError::Api(ApiError::Unknown(
                "Bad Request: chat not found".into(),
            ))));
        }
        if self.left.lock().contains(&(channel_key(channel), user.0)) {
            return Ok(false);
        }
        Ok(self.members.lock().contains(&user.0))
    }
}

/// Notifier that records every attempt and fails for chosen users.
#[derive(Default)]
pub struct RecordingNotifier {
    fail_for: HashSet<u64>,
    attempted: Mutex<Vec<UserId>>,
    delivered: Mutex<Vec<(UserId, String)>>,
}

impl RecordingNotifier {
    pub fn failing_for(users: impl IntoIterator<Item = u64>) -> Self {
        Self {
            fail_for: users.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn attempted(&self) -> Vec<UserId> {
        self.attempted.lock().clone()
    }

    pub fn delivered(&self) -> Vec<(UserId, String)> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user: UserId, html: &str) -> BotResult<()> {
        self.attempted.lock().push(user);
        if self.fail_for.contains(&user.0) {
            return Err(BotError::ExternalApi(RequestError::Api(ApiError::BotBlocked)));
        }
        self.delivered.lock().push((user, html.to_string()));
        Ok(())
    }
}
